//! Crawl Pipeline (component C): per-paper orchestration over category
//! URLs, using the Link Extractor (component A) to classify anchors and
//! persisting Articles idempotently on their canonical URL.
//!
//! A failed category fetch is logged and skipped rather than aborting the
//! whole paper's crawl; per-paper downloaded/failed counts are tracked
//! throughout.

use crate::decompress::decompress_if_needed;
use chrono::Utc;
use newsscope_core::error::Result;
use newsscope_core::types::{Article, Crawl, CrawlStatus, Paper};
use newsscope_extractor::{canonicalize, extract_links};
use scraper::Html;
use sqlx::PgPool;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/128.0.0.0 Safari/537.36";
const FETCH_TIMEOUT: Duration = Duration::from_secs(20);

pub struct CrawlOptions {
    pub max_articles: Option<i32>,
    pub ignore_cache: bool,
}

pub struct Crawler {
    http: reqwest::Client,
}

impl Default for Crawler {
    fn default() -> Self {
        Self::new()
    }
}

impl Crawler {
    pub fn new() -> Self {
        let http = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .expect("reqwest client");
        Self { http }
    }

    /// Crawl one paper: create a Crawl row, fetch+classify every category
    /// URL in sequence, persist accepted articles, and mark the crawl
    /// COMPLETED regardless of how many articles it found (a zero-article
    /// crawl is a logged failure, not an error).
    pub async fn crawl_paper(
        &self,
        pool: &PgPool,
        paper: &Paper,
        opts: CrawlOptions,
    ) -> Result<Crawl> {
        let mut crawl = Crawl::started(paper.id.clone(), opts.max_articles);
        persist_crawl(pool, &crawl).await?;

        let mut seen_in_crawl: HashSet<Url> = HashSet::new();
        let mut saved = 0i32;

        'categories: for category_url in &paper.category_urls {
            let Ok(base) = Url::parse(category_url) else {
                warn!(category_url, "invalid category URL, skipping");
                continue;
            };

            let body = match self.fetch(category_url).await {
                Ok(b) => b,
                Err(e) => {
                    warn!(category_url, error = %e, "category fetch failed, continuing");
                    continue;
                }
            };

            let html = String::from_utf8_lossy(&body).to_string();
            let document = Html::parse_document(&html);
            let links = extract_links(&document, &base, &paper.whitelist);

            for link in links {
                if let Some(max) = opts.max_articles {
                    if saved >= max {
                        break 'categories;
                    }
                }

                let canonical = canonicalize(&link.url);
                if !seen_in_crawl.insert(canonical.clone()) {
                    continue;
                }

                let article = Article {
                    url: canonical.to_string(),
                    img_url: String::new(),
                    title: link.title,
                    title_translated: None,
                    title_embedding: None,
                    lang: paper.lang.clone(),
                    publish_at: Utc::now().date_naive(),
                    paper_id: paper.id.clone(),
                    crawl_id: crawl.id,
                };

                match upsert_article(pool, &article, opts.ignore_cache).await {
                    Ok(true) => {
                        saved += 1;
                        crawl.stats.downloaded += 1;
                    }
                    Ok(false) => {
                        // cache hit, not re-processed
                    }
                    Err(e) => {
                        warn!(url = %article.url, error = %e, "article persistence failed, continuing");
                        crawl.stats.failed += 1;
                    }
                }
            }
        }

        crawl.status = CrawlStatus::Completed;
        finalize_crawl(pool, &crawl).await?;

        if crawl.stats.downloaded == 0 {
            warn!(paper_id = %paper.id, "crawl produced zero articles");
        }
        info!(
            paper_id = %paper.id,
            downloaded = crawl.stats.downloaded,
            failed = crawl.stats.failed,
            "crawl complete"
        );

        Ok(crawl)
    }

    async fn fetch(&self, url: &str) -> anyhow::Result<Vec<u8>> {
        let resp = self.http.get(url).send().await?;
        let resp = resp.error_for_status()?;
        let content_encoding_negotiated = resp.headers().contains_key(reqwest::header::CONTENT_ENCODING);
        let bytes = resp.bytes().await?;
        Ok(decompress_if_needed(&bytes, content_encoding_negotiated))
    }
}

async fn persist_crawl(pool: &PgPool, crawl: &Crawl) -> Result<()> {
    sqlx::query(
        "INSERT INTO crawl (id, paper_id, created_at, status, max_articles, downloaded, failed)
         VALUES ($1, $2, $3, 'STARTED', $4, 0, 0)",
    )
    .bind(crawl.id)
    .bind(&crawl.paper_id)
    .bind(crawl.created_at)
    .bind(crawl.max_articles)
    .execute(pool)
    .await?;
    Ok(())
}

async fn finalize_crawl(pool: &PgPool, crawl: &Crawl) -> Result<()> {
    sqlx::query(
        "UPDATE crawl SET status = 'COMPLETED', downloaded = $2, failed = $3 WHERE id = $1",
    )
    .bind(crawl.id)
    .bind(crawl.stats.downloaded)
    .bind(crawl.stats.failed)
    .execute(pool)
    .await?;
    Ok(())
}

/// Upserts on the article's canonical URL. Returns `Ok(false)` without
/// writing when `ignore_cache` is false and a titled row already exists
/// (a cache hit), `Ok(true)` when the row was written.
async fn upsert_article(pool: &PgPool, article: &Article, ignore_cache: bool) -> Result<bool> {
    if !ignore_cache {
        let existing: Option<(Option<String>,)> =
            sqlx::query_as("SELECT title FROM article WHERE url = $1 AND title IS NOT NULL")
                .bind(&article.url)
                .fetch_optional(pool)
                .await?;
        if existing.is_some() {
            return Ok(false);
        }
    }

    sqlx::query(
        r#"
        INSERT INTO article (url, img_url, title, lang, publish_at, paper_id, crawl_id)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (url) DO UPDATE SET
            title = EXCLUDED.title,
            img_url = EXCLUDED.img_url,
            crawl_id = EXCLUDED.crawl_id
        "#,
    )
    .bind(&article.url)
    .bind(&article.img_url)
    .bind(&article.title)
    .bind(&article.lang)
    .bind(article.publish_at)
    .bind(&article.paper_id)
    .bind(article.crawl_id)
    .execute(pool)
    .await?;

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_crawler_constructs() {
        let _crawler = Crawler::new();
    }
}
