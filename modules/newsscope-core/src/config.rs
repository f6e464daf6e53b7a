use crate::error::{PipelineError, Result};

/// Environment-sourced configuration. Identity (papers), clustering
/// parameters, and prompt text are not here — they are either stored
/// declaratively (newspaper roster) or hardcoded alongside the component
/// that owns them. Only secrets and per-deployment values live in env.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub gemini_api_key: Option<String>,
    pub translation_project_id: Option<String>,
    pub translation_api_key: Option<String>,
    pub bind_addr: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            database_url: std::env::var("DATABASE_URL")
                .map_err(|_| PipelineError::ConfigMissing("DATABASE_URL".to_string()))?,
            gemini_api_key: std::env::var("GEMINI_API_KEY").ok(),
            translation_project_id: std::env::var("TRANSLATION_PROJECT_ID").ok(),
            translation_api_key: std::env::var("TRANSLATION_API_KEY").ok(),
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
        };

        config.log_keys();
        Ok(config)
    }

    /// Require the Gemini key, reporting which subsystem is disabled
    /// without it rather than panicking (spec: absence "disables the
    /// affected subsystem and is reported").
    pub fn require_gemini_key(&self, subsystem: &str) -> Result<&str> {
        self.gemini_api_key.as_deref().ok_or_else(|| {
            PipelineError::ConfigMissing(format!("GEMINI_API_KEY (required by {subsystem})"))
        })
    }

    fn log_keys(&self) {
        fn preview(val: &str) -> String {
            let n = val.len().min(5);
            format!("{}...({} chars)", &val[..n], val.len())
        }
        fn preview_opt(val: &Option<String>) -> String {
            match val {
                Some(v) if !v.is_empty() => preview(v),
                _ => "<not set>".to_string(),
            }
        }

        tracing::info!("Config loaded:");
        tracing::info!("  DATABASE_URL: {}", preview(&self.database_url));
        tracing::info!("  GEMINI_API_KEY: {}", preview_opt(&self.gemini_api_key));
        tracing::info!(
            "  TRANSLATION_PROJECT_ID: {}",
            preview_opt(&self.translation_project_id)
        );
        tracing::info!("  BIND_ADDR: {}", self.bind_addr);
    }
}
