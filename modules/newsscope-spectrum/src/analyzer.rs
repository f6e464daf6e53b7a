//! Spectrum Analyzer (component G): the three-phase choreography that
//! turns a topic's article set into a political spectrum and per-country
//! classification.
//!
//! Phase 1 random-samples up to 50 articles to define the spectrum. Phase
//! 2 partitions the full set into concurrent batches of at least 10,
//! preserving absolute 1-based article ids, and classifies them onto the
//! spectrum concurrently via `buffer_unordered`. Phase 3 is a single call
//! producing per-country summaries from the aggregated mappings.

use ai_client::Gemini;
use futures::stream::{self, StreamExt};
use newsscope_core::error::Result;
use newsscope_core::types::{CountryArticle, CountryEntry, SpectrumPoint, SpectrumRecord};
use rand::seq::SliceRandom;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{info, warn};

const PHASE1_SAMPLE_SIZE: usize = 50;
const MIN_BATCH_SIZE: usize = 10;
const MAX_BATCH_ARTICLES: usize = 30;
const MIN_ARTICLES_PER_COUNTRY: usize = 3;
const MAX_REPRESENTATIVE_TITLES: usize = 8;

/// One article as seen by the analyzer: an absolute 1-based id stable
/// across phases, plus enough context to build prompts and the final
/// per-country assembly.
#[derive(Debug, Clone)]
pub struct SpectrumArticle {
    pub article_id: i64,
    pub url: String,
    pub title: String,
    pub country_iso: String,
    pub country_name: String,
    pub lang: String,
    pub publish_at: chrono::NaiveDate,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
struct SpectrumDefinition {
    spectrum_name: String,
    spectrum_description: String,
    spectrum_points: Vec<SpectrumPoint>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
struct ArticleSpectrumMapping {
    article_id: i64,
    point_id: i32,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
struct BatchMappings {
    mappings: Vec<ArticleSpectrumMapping>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
struct CountrySummary {
    country: String,
    summary: String,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
struct CountrySummaries {
    summaries: Vec<CountrySummary>,
}

pub struct SpectrumAnalyzer<'a> {
    gemini: &'a Gemini,
}

impl<'a> SpectrumAnalyzer<'a> {
    pub fn new(gemini: &'a Gemini) -> Self {
        Self { gemini }
    }

    pub async fn analyze(
        &self,
        topic_label: &str,
        topic_date: chrono::NaiveDate,
        articles: &[SpectrumArticle],
    ) -> Result<SpectrumRecord> {
        if articles.is_empty() {
            return Ok(SpectrumRecord::empty(topic_label, topic_date));
        }

        let definition = self.define_spectrum(articles).await?;
        let mappings = self.classify_articles(articles, &definition.spectrum_points).await;
        let record = self
            .summarize_countries(topic_label, topic_date, articles, definition, mappings)
            .await?;

        Ok(record)
    }

    /// Phase 1: sample up to 50 articles and ask the LLM to define the
    /// spectrum's name, description, and 2-4 ordered points.
    async fn define_spectrum(&self, articles: &[SpectrumArticle]) -> Result<SpectrumDefinition> {
        let mut rng = rand::rng();
        let sample: Vec<&SpectrumArticle> = articles
            .choose_multiple(&mut rng, PHASE1_SAMPLE_SIZE.min(articles.len()))
            .collect();

        let headlines = sample
            .iter()
            .map(|a| format!("[{}] {}", a.country_name, a.title))
            .collect::<Vec<_>>()
            .join("\n");

        let system = "These are headlines about the same news topic from different countries. \
            Define a political spectrum that captures the main axis of disagreement or framing \
            across these countries' coverage. Produce a spectrum_name, a one-sentence \
            spectrum_description, and 2 to 4 spectrum_points with sequential point_id starting at 1, \
            ordered from one extreme to the other. Each point needs a 2-8 word label and a 1-2 \
            sentence description. The points must span genuinely opposing viewpoints, not shades \
            of the same position.";

        self.gemini.extract(system, &headlines).await
    }

    /// Phase 2: partition into `num_workers = max(1, ceil(n/30))` batches
    /// of at least 10, run classification concurrently, and merge
    /// surviving mappings. A failed batch contributes nothing.
    async fn classify_articles(
        &self,
        articles: &[SpectrumArticle],
        points: &[SpectrumPoint],
    ) -> HashMap<i64, i32> {
        let num_workers = ((articles.len() as f64) / (MAX_BATCH_ARTICLES as f64)).ceil().max(1.0) as usize;
        let batch_size = (articles.len() / num_workers.max(1)).max(MIN_BATCH_SIZE);
        let batches = partition_into_batches(articles, batch_size);

        info!(
            article_count = articles.len(),
            num_workers,
            batch_size,
            batch_count = batches.len(),
            "spectrum phase 2 partitioned"
        );

        let results: Vec<Option<Vec<ArticleSpectrumMapping>>> = stream::iter(batches.into_iter().map(|batch| {
            let points = points.to_vec();
            async move {
                match self.classify_batch(batch, &points).await {
                    Ok(mappings) => Some(mappings),
                    Err(e) => {
                        warn!(error = %e, batch_len = batch.len(), "spectrum classification batch failed");
                        None
                    }
                }
            }
        }))
        .buffer_unordered(num_workers.max(1))
        .collect()
        .await;

        let mut merged = HashMap::new();
        for mapping_list in results.into_iter().flatten() {
            for m in mapping_list {
                merged.insert(m.article_id, m.point_id);
            }
        }
        merged
    }

    async fn classify_batch(
        &self,
        batch: &[SpectrumArticle],
        points: &[SpectrumPoint],
    ) -> Result<Vec<ArticleSpectrumMapping>> {
        let points_desc = points
            .iter()
            .map(|p| format!("{}: {} — {}", p.point_id, p.label, p.description))
            .collect::<Vec<_>>()
            .join("\n");

        let listing = batch
            .iter()
            .map(|a| format!("{}. [{}] {}", a.article_id, a.country_name, a.title))
            .collect::<Vec<_>>()
            .join("\n");

        let system = format!(
            "Spectrum points:\n{points_desc}\n\n\
             Classify each numbered headline below onto the closest spectrum point_id. \
             Return one mapping per headline, using the exact article_id given."
        );

        let result: BatchMappings = self.gemini.extract(&system, &listing).await?;

        let valid_points: std::collections::HashSet<i32> = points.iter().map(|p| p.point_id).collect();
        let (valid, invalid): (Vec<_>, Vec<_>) = result
            .mappings
            .into_iter()
            .partition(|m| valid_points.contains(&m.point_id));
        if !invalid.is_empty() {
            warn!(
                dropped = invalid.len(),
                "dropped mappings whose point_id is outside the declared spectrum"
            );
        }

        Ok(valid)
    }

    /// Phase 3: one call that builds per-country summaries from the
    /// aggregated mappings, then final assembly grouped by ISO.
    async fn summarize_countries(
        &self,
        topic_label: &str,
        topic_date: chrono::NaiveDate,
        articles: &[SpectrumArticle],
        definition: SpectrumDefinition,
        mappings: HashMap<i64, i32>,
    ) -> Result<SpectrumRecord> {
        let mut by_country: HashMap<String, Vec<&SpectrumArticle>> = HashMap::new();
        for article in articles {
            by_country.entry(article.country_iso.clone()).or_default().push(article);
        }

        let mut eligible: Vec<(String, Vec<&SpectrumArticle>, f64)> = Vec::new();
        for (iso, country_articles) in &by_country {
            let mapped_points: Vec<i32> = country_articles
                .iter()
                .filter_map(|a| mappings.get(&a.article_id).copied())
                .collect();
            if country_articles.len() < MIN_ARTICLES_PER_COUNTRY || mapped_points.is_empty() {
                continue;
            }
            let mean = mapped_points.iter().map(|&p| p as f64).sum::<f64>() / mapped_points.len() as f64;
            eligible.push((iso.clone(), country_articles.clone(), mean));
        }

        if eligible.is_empty() {
            let mut record = SpectrumRecord::empty(topic_label, topic_date);
            record.spectrum_name = Some(definition.spectrum_name);
            record.spectrum_description = Some(definition.spectrum_description);
            record.spectrum_points = definition.spectrum_points;
            return Ok(record);
        }

        let overall_mean =
            eligible.iter().map(|(_, _, mean)| mean).sum::<f64>() / eligible.len() as f64;

        let prompt = build_country_summary_prompt(&definition, overall_mean, &eligible);
        let summaries: CountrySummaries = self.gemini.extract(
            "Write a neutral, ~40-word summary of how each country's coverage compares to the \
             overall spectrum position. One summary per listed country.",
            &prompt,
        ).await.unwrap_or(CountrySummaries { summaries: Vec::new() });

        let summary_by_country: HashMap<String, String> = summaries
            .summaries
            .into_iter()
            .map(|s| (s.country, s.summary))
            .collect();

        let mut articles_by_country = std::collections::BTreeMap::new();
        for (iso, country_articles, _mean) in &eligible {
            let country_name = country_articles[0].country_name.clone();
            let country_article_entries: Vec<CountryArticle> = country_articles
                .iter()
                .map(|a| CountryArticle {
                    url: a.url.clone(),
                    title: a.title.clone(),
                    publish_at: a.publish_at,
                    lang: a.lang.clone(),
                    point_id: mappings.get(&a.article_id).copied(),
                })
                .collect();

            articles_by_country.insert(
                iso.clone(),
                CountryEntry {
                    country_name: country_name.clone(),
                    summary: summary_by_country.get(&country_name).cloned(),
                    articles: country_article_entries,
                },
            );
        }

        let mut spectrum_points = definition.spectrum_points;
        spectrum_points.sort_by_key(|p| p.point_id);

        Ok(SpectrumRecord {
            topic_label: topic_label.to_string(),
            topic_date,
            spectrum_name: Some(definition.spectrum_name),
            spectrum_description: Some(definition.spectrum_description),
            spectrum_points,
            articles_by_country,
        })
    }
}

/// Splits `items` into chunks of `batch_size`, folding any remainder into
/// the last chunk so no batch falls below `batch_size` (plain `chunks`
/// would instead emit a short trailing batch).
fn partition_into_batches<T>(items: &[T], batch_size: usize) -> Vec<&[T]> {
    let mut batches: Vec<&[T]> = items.chunks_exact(batch_size).collect();
    let remainder = &items[batches.len() * batch_size..];
    if !remainder.is_empty() {
        if let Some(last) = batches.pop() {
            let merged_start = items.len() - last.len() - remainder.len();
            batches.push(&items[merged_start..]);
        } else {
            batches.push(remainder);
        }
    }
    batches
}

fn build_country_summary_prompt(
    definition: &SpectrumDefinition,
    overall_mean: f64,
    eligible: &[(String, Vec<&SpectrumArticle>, f64)],
) -> String {
    let mut lines = vec![
        format!("Spectrum: {} — {}", definition.spectrum_name, definition.spectrum_description),
        format!("Overall mean position: {overall_mean:.2}"),
    ];

    for (_, country_articles, mean) in eligible {
        let country_name = &country_articles[0].country_name;
        let delta = if *mean < overall_mean - 0.25 {
            "lower"
        } else if *mean > overall_mean + 0.25 {
            "higher"
        } else {
            "similar"
        };
        let titles = country_articles
            .iter()
            .take(MAX_REPRESENTATIVE_TITLES)
            .map(|a| a.title.as_str())
            .collect::<Vec<_>>()
            .join("; ");
        lines.push(format!(
            "Country: {country_name}\nMean position: {mean:.2} ({delta} than overall)\nTitles: {titles}"
        ));
    }

    lines.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(id: i64, iso: &str) -> SpectrumArticle {
        SpectrumArticle {
            article_id: id,
            url: format!("https://x/{id}"),
            title: format!("Headline {id}"),
            country_iso: iso.to_string(),
            country_name: iso.to_string(),
            lang: "en".to_string(),
            publish_at: chrono::Utc::now().date_naive(),
        }
    }

    #[test]
    fn num_workers_scales_with_article_count() {
        let n: usize = 90;
        let num_workers = ((n as f64) / (MAX_BATCH_ARTICLES as f64)).ceil().max(1.0) as usize;
        assert_eq!(num_workers, 3);
    }

    #[test]
    fn num_workers_is_at_least_one() {
        let n: usize = 5;
        let num_workers = ((n as f64) / (MAX_BATCH_ARTICLES as f64)).ceil().max(1.0) as usize;
        assert_eq!(num_workers, 1);
    }

    #[test]
    fn country_with_too_few_articles_is_excluded() {
        let articles = vec![article(1, "USA"), article(2, "USA")];
        let mut by_country: HashMap<String, Vec<&SpectrumArticle>> = HashMap::new();
        for a in &articles {
            by_country.entry(a.country_iso.clone()).or_default().push(a);
        }
        assert!(by_country.get("USA").unwrap().len() < MIN_ARTICLES_PER_COUNTRY);
    }

    #[test]
    fn partitioning_remainder_is_folded_into_last_batch_not_left_short() {
        let articles: Vec<SpectrumArticle> = (1..=35).map(|id| article(id, "USA")).collect();
        let num_workers = ((35f64) / (MAX_BATCH_ARTICLES as f64)).ceil().max(1.0) as usize;
        let batch_size = (35 / num_workers.max(1)).max(MIN_BATCH_SIZE);
        let batches = partition_into_batches(&articles, batch_size);

        assert_eq!(batches.iter().map(|b| b.len()).sum::<usize>(), 35);
        for batch in &batches {
            assert!(batch.len() >= MIN_BATCH_SIZE, "batch of {} is under MIN_BATCH_SIZE", batch.len());
        }
    }

    #[test]
    fn partitioning_exact_multiple_needs_no_merge() {
        let articles: Vec<SpectrumArticle> = (1..=20).map(|id| article(id, "USA")).collect();
        let batches = partition_into_batches(&articles, 10);
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].len(), 10);
        assert_eq!(batches[1].len(), 10);
    }

    #[test]
    fn mappings_outside_declared_point_set_are_dropped() {
        let points = vec![
            SpectrumPoint { point_id: 1, label: "a".into(), description: "".into() },
            SpectrumPoint { point_id: 2, label: "b".into(), description: "".into() },
        ];
        let valid_points: std::collections::HashSet<i32> = points.iter().map(|p| p.point_id).collect();
        let mappings = vec![
            ArticleSpectrumMapping { article_id: 1, point_id: 1 },
            ArticleSpectrumMapping { article_id: 2, point_id: 99 },
        ];
        let (valid, invalid): (Vec<_>, Vec<_>) =
            mappings.into_iter().partition(|m| valid_points.contains(&m.point_id));
        assert_eq!(valid.len(), 1);
        assert_eq!(invalid.len(), 1);
    }
}
