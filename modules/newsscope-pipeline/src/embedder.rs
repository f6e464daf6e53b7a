//! Embedder (component E): fills in `title_embedding` for recently
//! translated articles, in fixed-size chunks, committing after each chunk.

use ai_client::Gemini;
use chrono::{Duration, Utc};
use newsscope_core::error::Result;
use pgvector::Vector;
use sqlx::PgPool;
use tracing::{info, warn};

pub const CHUNK_SIZE: usize = 100;
pub const EMBEDDING_DIM: usize = 768;
const LOOKBACK_DAYS: i64 = 2;

#[derive(Debug, Default, Clone)]
pub struct EmbeddingStats {
    pub embedded: usize,
    pub chunks_skipped: usize,
}

pub struct Embedder<'a> {
    gemini: &'a Gemini,
}

impl<'a> Embedder<'a> {
    pub fn new(gemini: &'a Gemini) -> Self {
        Self { gemini }
    }

    pub async fn run(&self, pool: &PgPool) -> Result<EmbeddingStats> {
        let candidates = fetch_candidates(pool).await?;
        let mut stats = EmbeddingStats::default();

        for chunk in candidates.chunks(CHUNK_SIZE) {
            let urls: Vec<&str> = chunk.iter().map(|(u, _)| u.as_str()).collect();
            let titles: Vec<String> = chunk.iter().map(|(_, t)| t.clone()).collect();

            let embeddings = match self.gemini.embed_batch(titles).await {
                Ok(e) => e,
                Err(e) => {
                    warn!(chunk_len = chunk.len(), error = %e, "embedding chunk failed, skipping");
                    stats.chunks_skipped += 1;
                    continue;
                }
            };

            if embeddings.len() != urls.len() {
                warn!(
                    expected = urls.len(),
                    got = embeddings.len(),
                    "embedding batch returned mismatched count, skipping chunk"
                );
                stats.chunks_skipped += 1;
                continue;
            }

            persist_embeddings(pool, &urls, &embeddings).await?;
            stats.embedded += urls.len();
        }

        info!(?stats, "embedding pass complete");
        Ok(stats)
    }
}

async fn fetch_candidates(pool: &PgPool) -> Result<Vec<(String, String)>> {
    let cutoff = (Utc::now() - Duration::days(LOOKBACK_DAYS)).date_naive();
    let rows: Vec<(String, String)> = sqlx::query_as(
        "SELECT url, title_translated FROM article \
         WHERE title_translated IS NOT NULL AND title_embedding IS NULL AND publish_at >= $1",
    )
    .bind(cutoff)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

async fn persist_embeddings(pool: &PgPool, urls: &[&str], embeddings: &[Vec<f32>]) -> Result<()> {
    let mut tx = pool.begin().await?;
    for (url, embedding) in urls.iter().zip(embeddings.iter()) {
        sqlx::query("UPDATE article SET title_embedding = $2 WHERE url = $1")
            .bind(url)
            .bind(Vector::from(embedding.clone()))
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
    fn chunk_size_is_one_hundred() {
        let items: Vec<i32> = (0..250).collect();
        let chunks: Vec<_> = items.chunks(CHUNK_SIZE).collect();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), 100);
        assert_eq!(chunks[2].len(), 50);
    }

    #[test]
    fn embedding_dim_matches_stored_vector_dimension() {
        assert_eq!(EMBEDDING_DIM, 768);
    }
}
