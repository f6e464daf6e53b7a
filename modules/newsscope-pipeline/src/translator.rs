//! Translator (component D): fills in `title_translated` for recent
//! non-English articles, batched by source language.
//!
//! Same-language articles bypass the LLM. Others are batched and sent as
//! one numbered in/out list per call; a batch that comes back the wrong
//! length falls back to translating its items one at a time.

use ai_client::Gemini;
use chrono::{Duration, Utc};
use newsscope_core::error::{PipelineError, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::collections::HashMap;
use tracing::{info, warn};

pub const TARGET_LANG: &str = "en";
pub const BATCH_SIZE: usize = 50;
const LOOKBACK_DAYS: i64 = 2;

#[derive(Debug, Clone)]
pub struct TranslationCandidate {
    pub url: String,
    pub title: String,
    pub lang: String,
}

#[derive(Debug, Default, Clone)]
pub struct TranslationStats {
    pub translated: usize,
    pub fallback_singletons: usize,
    pub failed: usize,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
struct TranslationBatch {
    translations: Vec<String>,
}

pub struct Translator<'a> {
    gemini: &'a Gemini,
}

impl<'a> Translator<'a> {
    pub fn new(gemini: &'a Gemini) -> Self {
        Self { gemini }
    }

    pub async fn run(&self, pool: &PgPool) -> Result<TranslationStats> {
        let candidates = fetch_candidates(pool).await?;
        let mut stats = TranslationStats::default();

        let mut by_lang: HashMap<String, Vec<TranslationCandidate>> = HashMap::new();
        for c in candidates {
            by_lang.entry(c.lang.clone()).or_default().push(c);
        }

        for (lang, items) in by_lang {
            if lang == TARGET_LANG {
                let pairs: Vec<(&str, &str)> = items
                    .iter()
                    .map(|c| (c.url.as_str(), c.title.as_str()))
                    .collect();
                persist_translations(pool, &pairs).await?;
                stats.translated += items.len();
                continue;
            }

            for chunk in items.chunks(BATCH_SIZE) {
                match self.translate_batch(&lang, chunk).await {
                    Ok(translations) => {
                        let pairs: Vec<(&str, &str)> = chunk
                            .iter()
                            .zip(translations.iter())
                            .map(|(item, t)| (item.url.as_str(), t.as_str()))
                            .collect();
                        persist_translations(pool, &pairs).await?;
                        stats.translated += chunk.len();
                    }
                    Err(e) => {
                        warn!(lang, batch_len = chunk.len(), error = %e, "batch translation failed, falling back per title");
                        let mut fallback_pairs: Vec<(String, String)> = Vec::new();
                        for item in chunk {
                            match self.translate_single(&lang, &item.title).await {
                                Ok(translated) => {
                                    fallback_pairs.push((item.url.clone(), translated));
                                    stats.fallback_singletons += 1;
                                }
                                Err(e) => {
                                    warn!(url = item.url, error = %e, "per-title translation failed");
                                    stats.failed += 1;
                                }
                            }
                        }
                        let borrowed: Vec<(&str, &str)> = fallback_pairs
                            .iter()
                            .map(|(u, t)| (u.as_str(), t.as_str()))
                            .collect();
                        persist_translations(pool, &borrowed).await?;
                        stats.translated += borrowed.len();
                    }
                }
            }
        }

        info!(?stats, "translation pass complete");
        Ok(stats)
    }

    async fn translate_batch(
        &self,
        source_lang: &str,
        items: &[TranslationCandidate],
    ) -> Result<Vec<String>> {
        let numbered: String = items
            .iter()
            .enumerate()
            .map(|(i, c)| format!("{}. {}", i + 1, c.title))
            .collect::<Vec<_>>()
            .join("\n");

        let system = format!(
            "Translate each numbered headline from {source_lang} to {TARGET_LANG}. \
             Return exactly {} translations, in the same order, as a JSON array under \"translations\". \
             Do not merge, drop, or add entries.",
            items.len()
        );

        let result: TranslationBatch = self.gemini.extract(&system, &numbered).await?;

        if result.translations.len() != items.len() {
            return Err(PipelineError::ContractViolation(format!(
                "expected {} translations, got {}",
                items.len(),
                result.translations.len()
            )));
        }

        Ok(result.translations)
    }

    async fn translate_single(&self, source_lang: &str, title: &str) -> Result<String> {
        let system =
            format!("Translate this headline from {source_lang} to {TARGET_LANG}. Reply with only the translation.");
        let translated = self.gemini.chat_completion(&system, title).await?;
        Ok(translated.trim().to_string())
    }
}

async fn fetch_candidates(pool: &PgPool) -> Result<Vec<TranslationCandidate>> {
    let cutoff = (Utc::now() - Duration::days(LOOKBACK_DAYS)).date_naive();
    let rows: Vec<(String, String, String)> = sqlx::query_as(
        "SELECT url, title, lang FROM article \
         WHERE title_translated IS NULL AND publish_at >= $1",
    )
    .bind(cutoff)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(url, title, lang)| TranslationCandidate { url, title, lang })
        .collect())
}

/// Persists every (url, translation) pair from one batch in a single
/// transaction, so a batch either fully lands or fully rolls back.
async fn persist_translations(pool: &PgPool, pairs: &[(&str, &str)]) -> Result<()> {
    if pairs.is_empty() {
        return Ok(());
    }
    let mut tx = pool.begin().await?;
    for (url, translated) in pairs {
        sqlx::query("UPDATE article SET title_translated = $2 WHERE url = $1")
            .bind(url)
            .bind(translated)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_language_articles_are_not_batched_for_translation() {
        let candidates = vec![TranslationCandidate {
            url: "https://x/a".into(),
            title: "Headline".into(),
            lang: TARGET_LANG.into(),
        }];
        let mut by_lang: HashMap<String, Vec<TranslationCandidate>> = HashMap::new();
        for c in candidates {
            by_lang.entry(c.lang.clone()).or_default().push(c);
        }
        assert!(by_lang.contains_key(TARGET_LANG));
    }

    #[test]
    fn batch_size_caps_at_fifty() {
        let items: Vec<i32> = (0..130).collect();
        let chunks: Vec<_> = items.chunks(BATCH_SIZE).collect();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), 50);
        assert_eq!(chunks[2].len(), 30);
    }
}
