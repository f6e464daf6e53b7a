//! Spectrum Cache (component H): persisted SpectrumRecords keyed by
//! `(topic_label, topic_date)`, upsert-by-timestamp with latest-wins reads.

use chrono::NaiveDate;
use newsscope_core::error::Result;
use newsscope_core::types::SpectrumRecord;
use sqlx::PgPool;
use tracing::info;

/// Upserts a spectrum record for `(topic_label, topic_date)`. A repeat
/// write for the same key replaces the JSON payload and bumps
/// `created_at`, so the next read sees it as the newest row.
pub async fn cache_spectrum_analysis(pool: &PgPool, record: &SpectrumRecord) -> Result<()> {
    let spectrum_points = serde_json::to_value(&record.spectrum_points)?;
    let articles_by_country = serde_json::to_value(&record.articles_by_country)?;

    sqlx::query(
        r#"
        INSERT INTO topic_spectrum_cache
            (topic_label, topic_date, spectrum_name, spectrum_description, spectrum_points, articles_by_country, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, NOW())
        ON CONFLICT (topic_label, topic_date) DO UPDATE SET
            spectrum_name = EXCLUDED.spectrum_name,
            spectrum_description = EXCLUDED.spectrum_description,
            spectrum_points = EXCLUDED.spectrum_points,
            articles_by_country = EXCLUDED.articles_by_country,
            created_at = NOW()
        "#,
    )
    .bind(&record.topic_label)
    .bind(record.topic_date)
    .bind(&record.spectrum_name)
    .bind(&record.spectrum_description)
    .bind(spectrum_points)
    .bind(articles_by_country)
    .execute(pool)
    .await?;

    info!(topic_label = record.topic_label, topic_date = %record.topic_date, "spectrum cached");
    Ok(())
}

/// Reads the most recently written record for `(topic_label, topic_date)`,
/// or `None` if the topic has never been cached for that date.
pub async fn get_cached_spectrum_analysis(
    pool: &PgPool,
    topic_label: &str,
    topic_date: NaiveDate,
) -> Result<Option<SpectrumRecord>> {
    let row: Option<(Option<String>, Option<String>, serde_json::Value, serde_json::Value)> = sqlx::query_as(
        r#"
        SELECT spectrum_name, spectrum_description, spectrum_points, articles_by_country
        FROM topic_spectrum_cache
        WHERE topic_label = $1 AND topic_date = $2
        ORDER BY created_at DESC
        LIMIT 1
        "#,
    )
    .bind(topic_label)
    .bind(topic_date)
    .fetch_optional(pool)
    .await?;

    let Some((spectrum_name, spectrum_description, spectrum_points, articles_by_country)) = row else {
        return Ok(None);
    };

    Ok(Some(SpectrumRecord {
        topic_label: topic_label.to_string(),
        topic_date,
        spectrum_name,
        spectrum_description,
        spectrum_points: serde_json::from_value(spectrum_points)?,
        articles_by_country: serde_json::from_value(articles_by_country)?,
    }))
}

/// Whether `topic_label` names a precomputed DailyTopic, as opposed to a
/// free-text query the Query Path would otherwise have to embed and
/// retrieve for.
pub async fn is_topic_predefined(pool: &PgPool, topic_label: &str) -> Result<bool> {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM daily_topics WHERE topic_label = $1")
        .bind(topic_label)
        .fetch_one(pool)
        .await?;
    Ok(count.0 > 0)
}

/// The most recent `DATE(created_at)` among DailyTopic rows matching
/// `topic_label`, used to resolve which date's cache to consult when the
/// query text matches a known topic exactly.
pub async fn latest_topic_date(pool: &PgPool, topic_label: &str) -> Result<Option<NaiveDate>> {
    let row: Option<(NaiveDate,)> = sqlx::query_as(
        "SELECT DATE(created_at) FROM daily_topics WHERE topic_label = $1 ORDER BY created_at DESC LIMIT 1",
    )
    .bind(topic_label)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(|(d,)| d))
}

#[cfg(test)]
mod tests {
    use super::*;
    use newsscope_core::types::SpectrumRecord;

    #[test]
    fn empty_record_serializes_to_null_scalars_and_empty_collections() {
        let record = SpectrumRecord::empty("trade war", chrono::Utc::now().date_naive());
        assert!(record.spectrum_name.is_none());
        assert!(record.spectrum_points.is_empty());
        assert!(record.articles_by_country.is_empty());
    }
}
