//! Topic Miner (component F): density-based clustering over title
//! embeddings plus a single batched LLM call for labels.
//!
//! No off-the-shelf density-clustering crate fits this dependency set, so
//! clustering is implemented directly as similarity-threshold connected
//! components (a single-linkage approximation of density clustering) over
//! `newsscope_core::db::cosine_similarity`. Outliers below the minimum
//! cluster size are discarded, surviving clusters are capped and sorted by
//! size, and labels for every surviving cluster come from one batched LLM
//! call rather than one call per cluster.

use ai_client::Gemini;
use chrono::Utc;
use newsscope_core::db::cosine_similarity;
use newsscope_core::error::Result;
use newsscope_core::types::DailyTopic;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

pub const MIN_CLUSTER_SIZE: usize = 5;
pub const MAX_CLUSTERS_KEPT: usize = 10;
pub const MIN_CLUSTERS_PREFERRED: usize = 7;
pub const REPRESENTATIVE_DOCS_PER_CLUSTER: usize = 5;
/// Two titles connect if their embeddings are at least this similar.
/// Chosen in the upper-middle of the 0..1 cosine range so that only
/// genuinely close headlines merge, matching the tightness BERTopic's
/// default UMAP+HDBSCAN settings produce for short headline embeddings.
const SIMILARITY_LINK_THRESHOLD: f32 = 0.72;

#[derive(Debug, Clone)]
struct TitledEmbedding {
    title: String,
    embedding: Vec<f32>,
}

struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, x: usize) -> usize {
        if self.parent[x] != x {
            self.parent[x] = self.find(self.parent[x]);
        }
        self.parent[x]
    }

    fn union(&mut self, a: usize, b: usize) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra != rb {
            self.parent[ra] = rb;
        }
    }
}

/// Connected-components clustering over the similarity graph, grouping
/// index positions; singletons and components below `MIN_CLUSTER_SIZE`
/// are the outlier set.
fn cluster_by_similarity(items: &[TitledEmbedding]) -> Vec<Vec<usize>> {
    let mut uf = UnionFind::new(items.len());

    for i in 0..items.len() {
        for j in (i + 1)..items.len() {
            if cosine_similarity(&items[i].embedding, &items[j].embedding) >= SIMILARITY_LINK_THRESHOLD {
                uf.union(i, j);
            }
        }
    }

    let mut groups: std::collections::HashMap<usize, Vec<usize>> = std::collections::HashMap::new();
    for i in 0..items.len() {
        let root = uf.find(i);
        groups.entry(root).or_default().push(i);
    }

    let mut clusters: Vec<Vec<usize>> = groups
        .into_values()
        .filter(|members| members.len() >= MIN_CLUSTER_SIZE)
        .collect();

    clusters.sort_by_key(|m| std::cmp::Reverse(m.len()));
    clusters.truncate(MAX_CLUSTERS_KEPT);
    clusters
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
struct TopicLabels {
    labels: Vec<String>,
}

pub struct TopicMiner<'a> {
    gemini: &'a Gemini,
}

impl<'a> TopicMiner<'a> {
    pub fn new(gemini: &'a Gemini) -> Self {
        Self { gemini }
    }

    pub async fn run(&self, pool: &PgPool) -> Result<Vec<DailyTopic>> {
        let items = fetch_embedded_titles(pool).await?;
        let clusters = cluster_by_similarity(&items);

        info!(
            candidate_count = items.len(),
            cluster_count = clusters.len(),
            preferred_min = MIN_CLUSTERS_PREFERRED,
            "topic clustering complete"
        );

        if clusters.is_empty() {
            return Ok(Vec::new());
        }

        let grouped_prompt = clusters
            .iter()
            .enumerate()
            .map(|(i, members)| {
                let reps: Vec<&str> = members
                    .iter()
                    .take(REPRESENTATIVE_DOCS_PER_CLUSTER)
                    .map(|&idx| items[idx].title.as_str())
                    .collect();
                format!("Cluster {}:\n{}", i + 1, reps.join("\n"))
            })
            .collect::<Vec<_>>()
            .join("\n\n");

        let system = "You are given clusters of same-day news headlines. \
            Identify 2 to 6 distinct, newsworthy topics across all clusters. \
            Ignore sports scores, entertainment gossip, and generic daily-count stories. \
            Prefer proper nouns and specific events over generic categories. \
            Each label should be 2 to 5 words.";

        let result: TopicLabels = self.gemini.extract(system, &grouped_prompt).await?;

        let batch_timestamp = Utc::now();
        let mut topics = Vec::with_capacity(result.labels.len());
        for label in result.labels {
            topics.push(DailyTopic {
                id: Uuid::new_v4(),
                topic_label: label,
                created_at: batch_timestamp,
            });
        }

        persist_topics(pool, &topics).await?;
        Ok(topics)
    }
}

async fn fetch_embedded_titles(pool: &PgPool) -> Result<Vec<TitledEmbedding>> {
    use chrono::Duration;
    let cutoff = (Utc::now() - Duration::days(2)).date_naive();

    let rows: Vec<(String, pgvector::Vector)> = sqlx::query_as(
        "SELECT title_translated, title_embedding FROM article \
         WHERE title_translated IS NOT NULL AND title_embedding IS NOT NULL AND publish_at >= $1",
    )
    .bind(cutoff)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(title, embedding)| TitledEmbedding {
            title,
            embedding: embedding.to_vec(),
        })
        .collect())
}

async fn persist_topics(pool: &PgPool, topics: &[DailyTopic]) -> Result<()> {
    let mut tx = pool.begin().await?;
    for topic in topics {
        sqlx::query("INSERT INTO daily_topics (id, topic_label, created_at) VALUES ($1, $2, $3)")
            .bind(topic.id)
            .bind(&topic.topic_label)
            .bind(topic.created_at)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn embedding(seed: f32) -> Vec<f32> {
        let mut v = vec![0.0f32; 8];
        v[0] = seed;
        v[1] = 1.0 - seed;
        v
    }

    #[test]
    fn tight_group_forms_one_cluster_and_loose_points_are_outliers() {
        let mut items = Vec::new();
        for _ in 0..6 {
            items.push(TitledEmbedding {
                title: "clustered headline".into(),
                embedding: embedding(0.9),
            });
        }
        items.push(TitledEmbedding {
            title: "lone headline".into(),
            embedding: embedding(0.1),
        });

        let clusters = cluster_by_similarity(&items);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].len(), 6);
    }

    #[test]
    fn clusters_below_minimum_size_are_discarded() {
        let items: Vec<TitledEmbedding> = (0..3)
            .map(|_| TitledEmbedding {
                title: "small group".into(),
                embedding: embedding(0.5),
            })
            .collect();
        let clusters = cluster_by_similarity(&items);
        assert!(clusters.is_empty());
    }

    #[test]
    fn cluster_count_is_capped_at_ten() {
        let mut items = Vec::new();
        for seed in 0..20 {
            let base = seed as f32 * 5.0;
            for _ in 0..5 {
                items.push(TitledEmbedding {
                    title: "headline".into(),
                    embedding: embedding(base),
                });
            }
        }
        let clusters = cluster_by_similarity(&items);
        assert!(clusters.len() <= MAX_CLUSTERS_KEPT);
    }
}
