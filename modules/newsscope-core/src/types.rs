//! Domain types shared by the crawl, pipeline, spectrum, and API crates.
//!
//! Identity and invariants follow the data model: a Paper's id is derived
//! from its URL, an Article's identity is its canonicalized URL, and a
//! SpectrumRecord is keyed by (topic_label, topic_date).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A newspaper source. `id` is the md5 hash of the declared URL's UTF-8
/// bytes — stable under everything except a change to the URL itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paper {
    pub id: String,
    pub url: String,
    pub country: String,
    pub iso: String,
    pub lang: String,
    pub category_urls: Vec<String>,
    pub whitelist: Vec<String>,
}

impl Paper {
    /// Stable identity: md5(utf8(url)), hex-encoded.
    pub fn stable_id(url: &str) -> String {
        format!("{:x}", md5::compute(url.as_bytes()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryUrl {
    pub paper_id: String,
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "crawl_status", rename_all = "UPPERCASE")]
pub enum CrawlStatus {
    Started,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlStats {
    pub downloaded: i32,
    pub failed: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Crawl {
    pub id: Uuid,
    pub paper_id: String,
    pub created_at: NaiveDate,
    pub status: CrawlStatus,
    pub max_articles: Option<i32>,
    pub stats: CrawlStats,
}

impl Crawl {
    pub fn started(paper_id: impl Into<String>, max_articles: Option<i32>) -> Self {
        Self {
            id: Uuid::new_v4(),
            paper_id: paper_id.into(),
            created_at: Utc::now().date_naive(),
            status: CrawlStatus::Started,
            max_articles,
            stats: CrawlStats {
                downloaded: 0,
                failed: 0,
            },
        }
    }
}

/// An article's identity is its canonical URL (fragment and query
/// stripped). `title_embedding` is only ever present alongside a non-empty
/// `title_translated` — see `extractor::canonicalize` for the URL rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub url: String,
    pub img_url: String,
    pub title: String,
    pub title_translated: Option<String>,
    pub title_embedding: Option<Vec<f32>>,
    pub lang: String,
    pub publish_at: NaiveDate,
    pub paper_id: String,
    pub crawl_id: Uuid,
}

impl Article {
    /// title_embedding must not exist without a non-empty title_translated.
    pub fn embedding_invariant_holds(&self) -> bool {
        match &self.title_embedding {
            None => true,
            Some(_) => matches!(&self.title_translated, Some(t) if !t.is_empty()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyTopic {
    pub id: Uuid,
    pub topic_label: String,
    pub created_at: DateTime<Utc>,
}

impl DailyTopic {
    pub fn topic_date(&self) -> NaiveDate {
        self.created_at.date_naive()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct SpectrumPoint {
    pub point_id: i32,
    pub label: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountryArticle {
    pub url: String,
    pub title: String,
    pub publish_at: NaiveDate,
    pub lang: String,
    pub point_id: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountryEntry {
    #[serde(rename = "country")]
    pub country_name: String,
    pub summary: Option<String>,
    pub articles: Vec<CountryArticle>,
}

/// Keyed by (topic_label, topic_date); upsert semantics in storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpectrumRecord {
    pub topic_label: String,
    pub topic_date: NaiveDate,
    pub spectrum_name: Option<String>,
    pub spectrum_description: Option<String>,
    pub spectrum_points: Vec<SpectrumPoint>,
    #[serde(rename = "articles")]
    pub articles_by_country: std::collections::BTreeMap<String, CountryEntry>,
}

impl SpectrumRecord {
    /// An empty-but-valid record for a query with no matches: all scalars
    /// null, all collections empty.
    pub fn empty(topic_label: impl Into<String>, topic_date: NaiveDate) -> Self {
        Self {
            topic_label: topic_label.into(),
            topic_date,
            spectrum_name: None,
            spectrum_description: None,
            spectrum_points: Vec::new(),
            articles_by_country: std::collections::BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Favorability {
    Negative,
    Neutral,
    Positive,
}

impl Favorability {
    pub fn clamp_from_i32(v: i32) -> Self {
        match v {
            ..=-1 => Favorability::Negative,
            0 => Favorability::Neutral,
            _ => Favorability::Positive,
        }
    }

    pub fn as_i32(self) -> i32 {
        match self {
            Favorability::Negative => -1,
            Favorability::Neutral => 0,
            Favorability::Positive => 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleCountryReference {
    pub article_url: String,
    pub source_country_iso: String,
    pub target_country_iso: Option<String>,
    pub favorability: Favorability,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stable_id_is_deterministic() {
        let a = Paper::stable_id("https://example.com/");
        let b = Paper::stable_id("https://example.com/");
        assert_eq!(a, b);
    }

    #[test]
    fn stable_id_changes_with_url() {
        let a = Paper::stable_id("https://example.com/");
        let b = Paper::stable_id("https://example.com");
        assert_ne!(a, b);
    }

    #[test]
    fn embedding_requires_translated_title() {
        let mut article = Article {
            url: "https://x/a".into(),
            img_url: "".into(),
            title: "t".into(),
            title_translated: None,
            title_embedding: Some(vec![0.1; 768]),
            lang: "en".into(),
            publish_at: Utc::now().date_naive(),
            paper_id: "p".into(),
            crawl_id: Uuid::new_v4(),
        };
        assert!(!article.embedding_invariant_holds());
        article.title_translated = Some("translated".into());
        assert!(article.embedding_invariant_holds());
    }

    #[test]
    fn favorability_clamps_out_of_range_to_neutral_bucket() {
        assert_eq!(Favorability::clamp_from_i32(5), Favorability::Positive);
        assert_eq!(Favorability::clamp_from_i32(-5), Favorability::Negative);
        assert_eq!(Favorability::clamp_from_i32(0), Favorability::Neutral);
    }
}
