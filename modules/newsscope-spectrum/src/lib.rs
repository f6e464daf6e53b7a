pub mod analyzer;
pub mod cache;
pub mod retrieval;

pub use analyzer::{SpectrumAnalyzer, SpectrumArticle};
pub use cache::{cache_spectrum_analysis, get_cached_spectrum_analysis, is_topic_predefined, latest_topic_date};
pub use retrieval::fetch_topic_articles;
