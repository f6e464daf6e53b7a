//! Typed errors shared across the crawl, pipeline, spectrum, and API crates.

use thiserror::Error;

/// The error kinds a pipeline component can surface. Propagation rules live
/// with each component (crawl category failures are absorbed and logged;
/// Phase 1 spectrum-definition contract violations abort the analyzer;
/// DB commit failures abort the current paper's work, not the whole run).
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A required environment variable or credential is absent.
    #[error("configuration missing: {0}")]
    ConfigMissing(String),

    /// A transient network failure (timeout, connection reset). Retryable.
    #[error("network error: {0}")]
    Network(String),

    /// The LLM, translation, or embedding provider returned an error.
    #[error("upstream service failure ({service}): {message}")]
    UpstreamServiceFailure { service: String, message: String },

    /// HTML, URL, or JSON could not be parsed as expected.
    #[error("parse failure: {0}")]
    ParseFailure(String),

    /// An LLM response violated its declared cardinality or shape.
    #[error("contract violation: {0}")]
    ContractViolation(String),

    /// A referenced entity (paper, crawl, article) was missing.
    #[error("data integrity error: {0}")]
    DataIntegrity(String),

    /// The operation was cancelled before completion.
    #[error("cancelled")]
    Cancelled,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

impl From<ai_client::ClientError> for PipelineError {
    fn from(e: ai_client::ClientError) -> Self {
        match e {
            ai_client::ClientError::MissingApiKey(k) => PipelineError::ConfigMissing(k),
            ai_client::ClientError::ContractViolation(m) => PipelineError::ContractViolation(m),
            ai_client::ClientError::Upstream(m) => PipelineError::UpstreamServiceFailure {
                service: "llm".to_string(),
                message: m,
            },
            ai_client::ClientError::EmptyResponse => PipelineError::UpstreamServiceFailure {
                service: "llm".to_string(),
                message: "empty response".to_string(),
            },
        }
    }
}
