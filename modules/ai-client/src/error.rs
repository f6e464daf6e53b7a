//! Typed errors for LLM and embedding calls.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("missing API key: {0}")]
    MissingApiKey(String),

    #[error("upstream request failed: {0}")]
    Upstream(String),

    #[error("upstream returned no usable content")]
    EmptyResponse,

    #[error("response violated the expected contract: {0}")]
    ContractViolation(String),
}

pub type ClientResult<T> = std::result::Result<T, ClientError>;
