//! Resolves the article set a mined `DailyTopic` applies to, for handoff
//! into the analyzer. Topics carry only a label, not a stored membership
//! list, so the label is embedded and the same similarity-retrieval query
//! the Query Path uses picks out its matching articles.

use ai_client::Gemini;
use chrono::{Duration, NaiveDate, Utc};
use newsscope_core::error::Result;
use sqlx::PgPool;

use crate::analyzer::SpectrumArticle;

const SIMILARITY_THRESHOLD: f32 = 0.63;
const RETRIEVAL_CAP: i64 = 200;
const LOOKBACK_DAYS: i64 = 2;

/// Embeds `topic_label` and retrieves the recent-window articles whose
/// translated title is most similar, assigning sequential 1-based
/// `article_id`s that stay stable across the analyzer's three phases.
pub async fn fetch_topic_articles(
    pool: &PgPool,
    gemini: &Gemini,
    topic_label: &str,
) -> Result<Vec<SpectrumArticle>> {
    let embedding = gemini.embed(topic_label).await?;
    let vector = pgvector::Vector::from(embedding);
    let cutoff = (Utc::now() - Duration::days(LOOKBACK_DAYS)).date_naive();

    let rows: Vec<(String, String, String, NaiveDate, String, String, f32)> = sqlx::query_as(
        r#"
        SELECT a.url, a.title_translated, a.lang, a.publish_at, p.iso, p.country,
               1 - (a.title_embedding <=> $1) AS similarity
        FROM article a
        JOIN paper p ON p.id = a.paper_id
        WHERE a.title_embedding IS NOT NULL
          AND a.title_translated IS NOT NULL
          AND a.publish_at >= $2
        ORDER BY similarity DESC
        LIMIT $3
        "#,
    )
    .bind(vector)
    .bind(cutoff)
    .bind(RETRIEVAL_CAP)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .filter(|(_, _, _, _, _, _, similarity)| *similarity > SIMILARITY_THRESHOLD)
        .enumerate()
        .map(|(i, (url, title, lang, publish_at, iso, country, _))| SpectrumArticle {
            article_id: (i + 1) as i64,
            url,
            title,
            country_iso: iso,
            country_name: country,
            lang,
            publish_at,
        })
        .collect())
}
