//! Query Path (component I): cache-first spectrum retrieval with a
//! degraded, non-persisted fallback when no cache exists.
//!
//! Resolves the cache date by exact topic match, otherwise retrieves the
//! most similar recent articles via pgvector similarity (threshold 0.63,
//! capped at 200 rows), filters to countries meeting a minimum article
//! count, and builds a four-point "Article Volume" spectrum from relative
//! coverage counts when no precomputed topic spectrum exists.

use chrono::NaiveDate;
use futures::stream::{self, StreamExt};
use newsscope_core::error::Result;
use newsscope_core::types::{CountryArticle, CountryEntry, SpectrumPoint, SpectrumRecord};
use sqlx::PgPool;
use std::collections::HashMap;

pub const SIMILARITY_THRESHOLD: f32 = 0.63;
pub const RETRIEVAL_CAP: i64 = 200;
pub const MIN_ARTICLES_PER_COUNTRY: usize = 3;
const DEGRADED_POINT_COUNT: i32 = 4;
const SUMMARY_WORKERS: usize = 4;

#[derive(Debug, Clone)]
struct RetrievedArticle {
    url: String,
    title: String,
    lang: String,
    publish_at: NaiveDate,
    country_iso: String,
    country_name: String,
    similarity: f32,
}

/// Resolves which `topic_date` a query should be cached under: the most
/// recent `DATE(created_at)` of a matching DailyTopic if the query text
/// is an exact topic label, else `date_end`.
pub async fn resolve_cache_date(
    pool: &PgPool,
    query: &str,
    date_end: NaiveDate,
) -> Result<NaiveDate> {
    let resolved = newsscope_spectrum::latest_topic_date(pool, query).await?;
    Ok(resolved.unwrap_or(date_end))
}

/// Phase 3-equivalent for the cache-miss path: retrieve, filter, and
/// build a degraded volume-based spectrum without invoking the LLM
/// pipeline. Never persisted.
pub async fn build_degraded_spectrum(
    gemini: Option<&ai_client::Gemini>,
    pool: &PgPool,
    query: &str,
    date_start: NaiveDate,
    date_end: NaiveDate,
) -> Result<SpectrumRecord> {
    let query_embedding = match gemini {
        Some(g) => g.embed(query).await.ok(),
        None => None,
    };

    let Some(query_embedding) = query_embedding else {
        return Ok(SpectrumRecord::empty(query, date_end));
    };

    let retrieved = retrieve_similar_articles(pool, &query_embedding, date_start, date_end).await?;
    let by_country = group_and_filter_by_country(retrieved);

    if by_country.is_empty() {
        return Ok(SpectrumRecord::empty(query, date_end));
    }

    let counts: Vec<usize> = by_country.values().map(|v| v.len()).collect();
    let min_count = *counts.iter().min().unwrap_or(&0);
    let max_count = *counts.iter().max().unwrap_or(&0);

    let spectrum_points = volume_spectrum_points(min_count, max_count);

    let per_country: Vec<(String, String, i32, Vec<RetrievedArticle>)> = by_country
        .into_iter()
        .map(|(iso, articles)| {
            let count = articles.len();
            let point_id = normalize_count_to_point(count, min_count, max_count);
            let country_name = articles[0].country_name.clone();
            (iso, country_name, point_id, articles)
        })
        .collect();

    let summarized: Vec<(String, String, i32, Vec<RetrievedArticle>, Option<String>)> =
        stream::iter(per_country.into_iter().map(|(iso, country_name, point_id, articles)| async move {
            let summary = if articles.len() >= MIN_ARTICLES_PER_COUNTRY {
                match gemini {
                    Some(g) => summarize_country(g, &country_name, &articles).await,
                    None => None,
                }
            } else {
                None
            };
            (iso, country_name, point_id, articles, summary)
        }))
        .buffer_unordered(SUMMARY_WORKERS)
        .collect()
        .await;

    let mut articles_by_country = std::collections::BTreeMap::new();
    for (iso, country_name, point_id, articles, summary) in summarized {
        let country_article_entries: Vec<CountryArticle> = articles
            .iter()
            .map(|a| CountryArticle {
                url: a.url.clone(),
                title: a.title.clone(),
                publish_at: a.publish_at,
                lang: a.lang.clone(),
                point_id: Some(point_id),
            })
            .collect();

        articles_by_country.insert(
            iso,
            CountryEntry {
                country_name,
                summary,
                articles: country_article_entries,
            },
        );
    }

    Ok(SpectrumRecord {
        topic_label: query.to_string(),
        topic_date: date_end,
        spectrum_name: Some("Article Volume".to_string()),
        spectrum_description: Some(
            "Countries ranked by how much coverage they gave this topic.".to_string(),
        ),
        spectrum_points,
        articles_by_country,
    })
}

fn volume_spectrum_points(min_count: usize, max_count: usize) -> Vec<SpectrumPoint> {
    let labels = ["Least coverage", "Light coverage", "Moderate coverage", "Heaviest coverage"];
    labels
        .iter()
        .enumerate()
        .map(|(i, label)| SpectrumPoint {
            point_id: (i + 1) as i32,
            label: label.to_string(),
            description: format!(
                "Countries with article counts near {}",
                min_count + (i * (max_count.saturating_sub(min_count)) / 3)
            ),
        })
        .collect()
}

fn normalize_count_to_point(count: usize, min_count: usize, max_count: usize) -> i32 {
    if max_count == min_count {
        return 1;
    }
    let fraction = (count - min_count) as f64 / (max_count - min_count) as f64;
    let scaled = 1.0 + fraction * (DEGRADED_POINT_COUNT as f64 - 1.0);
    scaled.round().clamp(1.0, DEGRADED_POINT_COUNT as f64) as i32
}

async fn summarize_country(
    gemini: &ai_client::Gemini,
    country_name: &str,
    articles: &[RetrievedArticle],
) -> Option<String> {
    let titles: Vec<&str> = articles.iter().take(8).map(|a| a.title.as_str()).collect();
    let prompt = format!("Country: {country_name}\nHeadlines:\n{}", titles.join("\n"));
    let system = "Write a short, neutral narrative summary (about 40 words) of this country's \
        news coverage on this topic, based only on the headlines given.";
    gemini.chat_completion(system, &prompt).await.ok()
}

async fn retrieve_similar_articles(
    pool: &PgPool,
    query_embedding: &[f32],
    date_start: NaiveDate,
    date_end: NaiveDate,
) -> Result<Vec<RetrievedArticle>> {
    let vector = pgvector::Vector::from(query_embedding.to_vec());

    let rows: Vec<(String, String, String, NaiveDate, String, String, f32)> = sqlx::query_as(
        r#"
        SELECT a.url, a.title_translated, a.lang, a.publish_at, p.iso, p.country,
               1 - (a.title_embedding <=> $1) AS similarity
        FROM article a
        JOIN paper p ON p.id = a.paper_id
        WHERE a.title_embedding IS NOT NULL
          AND a.publish_at BETWEEN $2 AND $3
        ORDER BY similarity DESC
        LIMIT $4
        "#,
    )
    .bind(vector)
    .bind(date_start)
    .bind(date_end)
    .bind(RETRIEVAL_CAP)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .filter(|(_, _, _, _, _, _, sim)| *sim > SIMILARITY_THRESHOLD)
        .map(|(url, title, lang, publish_at, iso, country, similarity)| RetrievedArticle {
            url,
            title,
            lang,
            publish_at,
            country_iso: iso,
            country_name: country,
            similarity,
        })
        .collect())
}

fn group_and_filter_by_country(
    articles: Vec<RetrievedArticle>,
) -> HashMap<String, Vec<RetrievedArticle>> {
    let mut by_country: HashMap<String, Vec<RetrievedArticle>> = HashMap::new();
    for article in articles {
        by_country.entry(article.country_iso.clone()).or_default().push(article);
    }
    by_country.retain(|_, v| v.len() >= MIN_ARTICLES_PER_COUNTRY);
    by_country
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(iso: &str, similarity: f32) -> RetrievedArticle {
        RetrievedArticle {
            url: "https://x/a".into(),
            title: "headline".into(),
            lang: "en".into(),
            publish_at: chrono::Utc::now().date_naive(),
            country_iso: iso.to_string(),
            country_name: iso.to_string(),
            similarity,
        }
    }

    #[test]
    fn countries_below_minimum_are_dropped() {
        let articles = vec![article("USA", 0.9), article("USA", 0.8)];
        let grouped = group_and_filter_by_country(articles);
        assert!(grouped.is_empty());
    }

    #[test]
    fn countries_at_minimum_survive() {
        let articles = vec![article("USA", 0.9), article("USA", 0.8), article("USA", 0.7)];
        let grouped = group_and_filter_by_country(articles);
        assert_eq!(grouped.get("USA").unwrap().len(), 3);
    }

    #[test]
    fn count_normalizes_to_four_equally_spaced_points() {
        assert_eq!(normalize_count_to_point(3, 3, 30), 1);
        assert_eq!(normalize_count_to_point(30, 3, 30), 4);
        assert_eq!(normalize_count_to_point(3, 3, 3), 1);
    }

    #[test]
    fn volume_points_has_four_entries_in_order() {
        let points = volume_spectrum_points(3, 30);
        assert_eq!(points.len(), 4);
        assert_eq!(points[0].point_id, 1);
        assert_eq!(points[3].point_id, 4);
    }
}
