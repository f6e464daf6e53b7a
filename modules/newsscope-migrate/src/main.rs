//! Schema migration runner: applies pending sqlx migrations and exits.

use anyhow::Result;
use newsscope_core::{db, Config};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("newsscope=info".parse()?))
        .init();

    let config = Config::from_env()?;
    let pool = db::connect(&config.database_url).await?;

    tracing::info!("running pending migrations");
    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("migrations up to date");

    Ok(())
}
