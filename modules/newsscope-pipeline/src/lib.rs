pub mod country_reference;
pub mod embedder;
pub mod topics;
pub mod translator;

pub use country_reference::{CountryReferenceExtractor, CountryReferenceStats};
pub use embedder::{Embedder, EmbeddingStats};
pub use topics::TopicMiner;
pub use translator::{Translator, TranslationStats};
