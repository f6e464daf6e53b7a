//! `newsscope` — the operational CLI wiring every pipeline component to a
//! subcommand: crawl, registry-sync, translate, embed, topic-generate,
//! extract-relations, serve, migrate.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use newsscope_core::{db, Config};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "newsscope")]
#[command(about = "Cross-border news comparison engine: crawl, translate, embed, and serve")]
#[command(version)]
struct Cli {
    /// Log output format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Pretty,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl every registered paper's category pages and persist new articles.
    Crawl {
        #[arg(long)]
        max_articles: Option<i32>,
        #[arg(long)]
        ignore_cache: bool,
    },
    /// Sync a newspaper declaration file into the paper registry.
    RegistrySync {
        /// Path to a JSON array of paper declarations.
        declarations: std::path::PathBuf,
        #[arg(long)]
        prune_categories: bool,
        #[arg(long)]
        prune_papers: bool,
        #[arg(long)]
        dry_run: bool,
    },
    /// Translate untranslated headlines from the last two days.
    Translate,
    /// Embed translated headlines lacking an embedding.
    Embed,
    /// Cluster same-day coverage into topics and label them.
    TopicGenerate,
    /// Extract country-reference/favorability for translated articles.
    ExtractRelations,
    /// Serve the Query Path over HTTP.
    Serve,
    /// Apply pending schema migrations and exit.
    Migrate,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = init_tracing(cli.log_format) {
        eprintln!("failed to initialize logging: {e:#}");
        return ExitCode::FAILURE;
    }

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("failed to start async runtime: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli.command)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = ?e, "command failed");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(format: LogFormat) -> Result<()> {
    let filter = EnvFilter::from_default_env().add_directive("newsscope=info".parse()?);
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
    }
    Ok(())
}

async fn run(command: Commands) -> Result<()> {
    let config = Config::from_env()?;

    match command {
        Commands::Crawl {
            max_articles,
            ignore_cache,
        } => cmd_crawl(&config, max_articles, ignore_cache).await,
        Commands::RegistrySync {
            declarations,
            prune_categories,
            prune_papers,
            dry_run,
        } => cmd_registry_sync(&config, declarations, prune_categories, prune_papers, dry_run).await,
        Commands::Translate => cmd_translate(&config).await,
        Commands::Embed => cmd_embed(&config).await,
        Commands::TopicGenerate => cmd_topic_generate(&config).await,
        Commands::ExtractRelations => cmd_extract_relations(&config).await,
        Commands::Serve => cmd_serve(config).await,
        Commands::Migrate => cmd_migrate(&config).await,
    }
}

async fn cmd_crawl(config: &Config, max_articles: Option<i32>, ignore_cache: bool) -> Result<()> {
    let pool = db::connect(&config.database_url).await?;
    let papers = newsscope_crawl::registry::get_all(&pool).await?;
    let crawler = newsscope_crawl::Crawler::new();
    let opts = newsscope_crawl::CrawlOptions {
        max_articles,
        ignore_cache,
    };

    let mut failures = 0usize;
    for paper in &papers {
        match crawler.crawl_paper(&pool, paper, opts).await {
            Ok(crawl) => {
                tracing::info!(paper_id = paper.id, downloaded = crawl.stats.downloaded, failed = crawl.stats.failed, "paper crawled");
            }
            Err(e) => {
                failures += 1;
                tracing::warn!(paper_id = paper.id, error = %e, "paper crawl failed");
            }
        }
    }

    if failures == papers.len() && !papers.is_empty() {
        anyhow::bail!("all {} paper crawls failed", papers.len());
    }
    Ok(())
}

async fn cmd_registry_sync(
    config: &Config,
    declarations_path: std::path::PathBuf,
    prune_categories: bool,
    prune_papers: bool,
    dry_run: bool,
) -> Result<()> {
    let pool = db::connect(&config.database_url).await?;
    let raw = std::fs::read_to_string(&declarations_path)
        .with_context(|| format!("reading {}", declarations_path.display()))?;
    let declarations: Vec<newsscope_crawl::registry::PaperDeclaration> =
        serde_json::from_str(&raw).context("parsing paper declarations")?;

    let stats = newsscope_crawl::registry::sync(
        &pool,
        declarations,
        newsscope_crawl::registry::SyncOptions {
            prune_categories,
            prune_papers,
            dry_run,
        },
    )
    .await?;

    tracing::info!(?stats, "registry sync complete");
    Ok(())
}

async fn cmd_translate(config: &Config) -> Result<()> {
    let pool = db::connect(&config.database_url).await?;
    let gemini = ai_client::Gemini::new(
        config.require_gemini_key("translator")?,
        "gemini-2.5-flash",
    );
    let stats = newsscope_pipeline::Translator::new(&gemini).run(&pool).await?;
    tracing::info!(?stats, "translation pass complete");
    Ok(())
}

async fn cmd_embed(config: &Config) -> Result<()> {
    let pool = db::connect(&config.database_url).await?;
    let gemini = ai_client::Gemini::new(config.require_gemini_key("embedder")?, "gemini-2.5-flash");
    let stats = newsscope_pipeline::Embedder::new(&gemini).run(&pool).await?;
    tracing::info!(?stats, "embedding pass complete");
    Ok(())
}

async fn cmd_topic_generate(config: &Config) -> Result<()> {
    let pool = db::connect(&config.database_url).await?;
    let gemini = ai_client::Gemini::new(
        config.require_gemini_key("topic miner")?,
        "gemini-2.5-flash",
    );
    let topics = newsscope_pipeline::TopicMiner::new(&gemini).run(&pool).await?;
    tracing::info!(topic_count = topics.len(), "topic mining pass complete");

    let analyzer = newsscope_spectrum::SpectrumAnalyzer::new(&gemini);
    for topic in &topics {
        let articles = newsscope_spectrum::fetch_topic_articles(&pool, &gemini, &topic.topic_label).await?;
        match analyzer.analyze(&topic.topic_label, topic.topic_date(), &articles).await {
            Ok(record) => {
                newsscope_spectrum::cache_spectrum_analysis(&pool, &record).await?;
                tracing::info!(topic_label = topic.topic_label, article_count = articles.len(), "spectrum analyzed and cached");
            }
            Err(e) => {
                tracing::warn!(topic_label = topic.topic_label, error = %e, "spectrum analysis failed, skipping");
            }
        }
    }

    Ok(())
}

async fn cmd_extract_relations(config: &Config) -> Result<()> {
    let pool = db::connect(&config.database_url).await?;
    let gemini = ai_client::Gemini::new(
        config.require_gemini_key("country-reference extractor")?,
        "gemini-2.5-flash",
    );
    let stats = newsscope_pipeline::CountryReferenceExtractor::new(&gemini)
        .run(&pool)
        .await?;
    tracing::info!(?stats, "country-reference pass complete");
    Ok(())
}

async fn cmd_serve(config: Config) -> Result<()> {
    let pool = db::connect(&config.database_url).await?;
    let gemini = match config.require_gemini_key("query path") {
        Ok(key) => Some(ai_client::Gemini::new(key, "gemini-2.5-flash")),
        Err(e) => {
            tracing::warn!(error = %e, "Gemini unavailable; degraded-fallback summaries disabled");
            None
        }
    };

    let state = std::sync::Arc::new(newsscope_api::AppState { pool, gemini });
    let app = newsscope_api::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!(addr = config.bind_addr, "newsscope-api listening");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn cmd_migrate(config: &Config) -> Result<()> {
    let pool = db::connect(&config.database_url).await?;
    sqlx::migrate!("../newsscope-migrate/migrations").run(&pool).await?;
    tracing::info!("migrations up to date");
    Ok(())
}
