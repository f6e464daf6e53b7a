//! Country-Reference Extractor (component J): for each translated article
//! lacking a reference row, ask the LLM which country (if any) it targets
//! and how favorably, then upsert and refresh the aggregate.

use ai_client::Gemini;
use chrono::{Duration, Utc};
use newsscope_core::error::Result;
use newsscope_core::types::{ArticleCountryReference, Favorability};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::{info, warn};

const LOOKBACK_DAYS: i64 = 2;

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
struct CountryReferenceGuess {
    target_country_iso: Option<String>,
    favorability: i32,
}

#[derive(Debug, Default, Clone)]
pub struct CountryReferenceStats {
    pub extracted: usize,
    pub failed: usize,
}

pub struct CountryReferenceExtractor<'a> {
    gemini: &'a Gemini,
}

impl<'a> CountryReferenceExtractor<'a> {
    pub fn new(gemini: &'a Gemini) -> Self {
        Self { gemini }
    }

    pub async fn run(&self, pool: &PgPool) -> Result<CountryReferenceStats> {
        let candidates = fetch_candidates(pool).await?;
        let mut stats = CountryReferenceStats::default();

        for (url, title, source_iso) in &candidates {
            match self.classify(url, title, source_iso).await {
                Ok(reference) => {
                    persist_reference(pool, url, source_iso, &reference).await?;
                    stats.extracted += 1;
                }
                Err(e) => {
                    warn!(url, error = %e, "country-reference extraction failed, skipping");
                    stats.failed += 1;
                }
            }
        }

        if stats.extracted > 0 {
            refresh_aggregate(pool).await?;
        }

        info!(?stats, "country-reference pass complete");
        Ok(stats)
    }

    async fn classify(
        &self,
        url: &str,
        title: &str,
        source_iso: &str,
    ) -> Result<ArticleCountryReference> {
        let system = format!(
            "This headline was published by a newspaper whose source country ISO code is {source_iso}. \
             Identify the 3-letter ISO code of the country the headline is primarily ABOUT, \
             or null if it names no specific foreign or domestic country as its subject. \
             Also classify the tone toward that country as favorability: -1 (negative), \
             0 (neutral), or 1 (positive)."
        );

        let guess: CountryReferenceGuess = self.gemini.extract(&system, title).await?;

        let target_country_iso = guess
            .target_country_iso
            .filter(|iso| iso.len() == 3)
            .map(|iso| iso.to_uppercase());

        Ok(ArticleCountryReference {
            article_url: url.to_string(),
            source_country_iso: source_iso.to_string(),
            target_country_iso,
            favorability: Favorability::clamp_from_i32(guess.favorability),
        })
    }
}

async fn fetch_candidates(pool: &PgPool) -> Result<Vec<(String, String, String)>> {
    let cutoff = (Utc::now() - Duration::days(LOOKBACK_DAYS)).date_naive();
    let rows: Vec<(String, String, String)> = sqlx::query_as(
        r#"
        SELECT a.url, a.title_translated, p.iso
        FROM article a
        JOIN paper p ON p.id = a.paper_id
        LEFT JOIN article_country_reference r ON r.article_url = a.url
        WHERE a.title_translated IS NOT NULL
          AND a.publish_at >= $1
          AND r.article_url IS NULL
        "#,
    )
    .bind(cutoff)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

async fn persist_reference(
    pool: &PgPool,
    url: &str,
    source_iso: &str,
    reference: &ArticleCountryReference,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO article_country_reference
            (article_url, source_country_iso, target_country_iso, favorability)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (article_url, target_country_iso) DO UPDATE SET
            favorability = EXCLUDED.favorability
        "#,
    )
    .bind(url)
    .bind(source_iso)
    .bind(&reference.target_country_iso)
    .bind(reference.favorability.as_i32())
    .execute(pool)
    .await?;
    Ok(())
}

/// Refreshes the downstream materialized rollup of reference counts per
/// (source, target) pair used by cross-country comparison views. A
/// refresh failure is logged and absorbed; the underlying rows are
/// already committed and the next pass will refresh again.
async fn refresh_aggregate(pool: &PgPool) -> Result<()> {
    let result = sqlx::query("REFRESH MATERIALIZED VIEW CONCURRENTLY country_reference_aggregate")
        .execute(pool)
        .await;
    if let Err(e) = result {
        warn!(error = %e, "aggregate refresh failed, will retry on next pass");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_length_iso_is_dropped() {
        let guess = CountryReferenceGuess {
            target_country_iso: Some("US".to_string()),
            favorability: 1,
        };
        let cleaned = guess.target_country_iso.filter(|iso| iso.len() == 3);
        assert!(cleaned.is_none());
    }

    #[test]
    fn favorability_out_of_range_clamps_to_nearest_bucket() {
        assert_eq!(Favorability::clamp_from_i32(42), Favorability::Positive);
        assert_eq!(Favorability::clamp_from_i32(-42), Favorability::Negative);
    }
}
