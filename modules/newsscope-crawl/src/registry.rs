//! Paper Registry: syncs a declared newspaper roster into the store.
//!
//! Upsert-then-optional-prune, reading a declaration-driven roster (a JSON
//! array of paper declarations) rather than a compiled-in list.

use newsscope_core::error::Result;
use newsscope_core::types::Paper;
use serde::Deserialize;
use sqlx::PgPool;
use tracing::info;

/// One element of the newspaper declaration file.
#[derive(Debug, Clone, Deserialize)]
pub struct PaperDeclaration {
    pub url: String,
    pub country: String,
    #[serde(rename = "ISO")]
    pub iso: String,
    pub lang: String,
    pub category_urls: Vec<String>,
    #[serde(default)]
    pub whitelist: Vec<String>,
}

impl PaperDeclaration {
    pub fn into_paper(self) -> Paper {
        let id = Paper::stable_id(&self.url);
        Paper {
            id,
            url: self.url,
            country: self.country,
            iso: self.iso,
            lang: self.lang,
            category_urls: self.category_urls,
            whitelist: self.whitelist,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SyncOptions {
    pub prune_categories: bool,
    pub prune_papers: bool,
    pub dry_run: bool,
}

#[derive(Debug, Clone, Default)]
pub struct SyncStats {
    pub upserted: usize,
    pub categories_pruned: usize,
    pub papers_pruned: usize,
}

/// Upsert every declared paper and its category URLs in a single
/// transaction, optionally pruning categories/papers absent from the
/// declaration. A dry run runs every statement but rolls back instead of
/// committing, so callers can preview the diff.
pub async fn sync(
    pool: &PgPool,
    declarations: Vec<PaperDeclaration>,
    opts: SyncOptions,
) -> Result<SyncStats> {
    let mut tx = pool.begin().await?;
    let mut stats = SyncStats::default();

    let papers: Vec<Paper> = declarations.into_iter().map(|d| d.into_paper()).collect();
    let declared_ids: Vec<String> = papers.iter().map(|p| p.id.clone()).collect();

    for paper in &papers {
        sqlx::query(
            r#"
            INSERT INTO paper (id, url, country, iso, lang, whitelist)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE SET
                url = EXCLUDED.url,
                country = EXCLUDED.country,
                iso = EXCLUDED.iso,
                lang = EXCLUDED.lang,
                whitelist = EXCLUDED.whitelist
            "#,
        )
        .bind(&paper.id)
        .bind(&paper.url)
        .bind(&paper.country)
        .bind(&paper.iso)
        .bind(&paper.lang)
        .bind(serde_json::to_value(&paper.whitelist).unwrap_or_default())
        .execute(&mut *tx)
        .await?;

        for category_url in &paper.category_urls {
            sqlx::query(
                r#"
                INSERT INTO category_url (paper_id, url)
                VALUES ($1, $2)
                ON CONFLICT (paper_id, url) DO NOTHING
                "#,
            )
            .bind(&paper.id)
            .bind(category_url)
            .execute(&mut *tx)
            .await?;
        }

        if opts.prune_categories {
            let declared: Vec<String> = paper.category_urls.clone();
            let result = sqlx::query(
                "DELETE FROM category_url WHERE paper_id = $1 AND NOT (url = ANY($2))",
            )
            .bind(&paper.id)
            .bind(&declared)
            .execute(&mut *tx)
            .await?;
            stats.categories_pruned += result.rows_affected() as usize;
        }

        stats.upserted += 1;
    }

    if opts.prune_papers {
        let result = sqlx::query("DELETE FROM paper WHERE NOT (id = ANY($1))")
            .bind(&declared_ids)
            .execute(&mut *tx)
            .await?;
        stats.papers_pruned += result.rows_affected() as usize;
    }

    if opts.dry_run {
        tx.rollback().await?;
        info!(?stats, "registry sync dry run complete (rolled back)");
    } else {
        tx.commit().await?;
        info!(?stats, "registry sync committed");
    }

    Ok(stats)
}

#[derive(sqlx::FromRow)]
struct PaperRow {
    id: String,
    url: String,
    country: String,
    iso: String,
    lang: String,
    whitelist: serde_json::Value,
}

impl PaperRow {
    fn into_paper(self, category_urls: Vec<String>) -> Paper {
        let whitelist: Vec<String> = serde_json::from_value(self.whitelist).unwrap_or_default();
        Paper {
            id: self.id,
            url: self.url,
            country: self.country,
            iso: self.iso,
            lang: self.lang,
            category_urls,
            whitelist,
        }
    }
}

pub async fn get_all(pool: &PgPool) -> Result<Vec<Paper>> {
    let rows: Vec<PaperRow> =
        sqlx::query_as("SELECT id, url, country, iso, lang, whitelist FROM paper")
            .fetch_all(pool)
            .await?;

    let mut papers = Vec::with_capacity(rows.len());
    for row in rows {
        let categories: Vec<(String,)> =
            sqlx::query_as("SELECT url FROM category_url WHERE paper_id = $1")
                .bind(&row.id)
                .fetch_all(pool)
                .await?;
        let category_urls = categories.into_iter().map(|(u,)| u).collect();
        papers.push(row.into_paper(category_urls));
    }
    Ok(papers)
}

pub async fn get_by_id(pool: &PgPool, id: &str) -> Result<Option<Paper>> {
    let row: Option<PaperRow> =
        sqlx::query_as("SELECT id, url, country, iso, lang, whitelist FROM paper WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;
    let Some(row) = row else {
        return Ok(None);
    };
    let categories: Vec<(String,)> =
        sqlx::query_as("SELECT url FROM category_url WHERE paper_id = $1")
            .bind(id)
            .fetch_all(pool)
            .await?;
    Ok(Some(row.into_paper(categories.into_iter().map(|(u,)| u).collect())))
}

pub async fn get_by_url(pool: &PgPool, url: &str) -> Result<Option<Paper>> {
    get_by_id(pool, &Paper::stable_id(url)).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declaration_derives_stable_id_from_url() {
        let decl = PaperDeclaration {
            url: "https://example.com/".to_string(),
            country: "Testland".to_string(),
            iso: "TST".to_string(),
            lang: "en".to_string(),
            category_urls: vec!["https://example.com/world/".to_string()],
            whitelist: vec![],
        };
        let paper = decl.into_paper();
        assert_eq!(paper.id, Paper::stable_id("https://example.com/"));
    }
}
