use anyhow::Result;
use newsscope_api::{router, AppState};
use newsscope_core::{db, Config};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("newsscope=info".parse()?))
        .init();

    let config = Config::from_env()?;
    let pool = db::connect(&config.database_url).await?;

    let gemini = match config.require_gemini_key("query path") {
        Ok(key) => Some(ai_client::Gemini::new(key, "gemini-2.5-flash")),
        Err(e) => {
            tracing::warn!(error = %e, "Gemini unavailable; degraded-fallback summaries disabled");
            None
        }
    };

    let state = Arc::new(AppState { pool, gemini });
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "newsscope-api listening");
    axum::serve(listener, app).await?;

    Ok(())
}
