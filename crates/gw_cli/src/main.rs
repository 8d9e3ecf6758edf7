use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use gw_core::{ArticleStore, PipelineStage, Result};
use gw_feeds::{default_sources, HttpFeedClient, IngestStage};
use gw_inference::{create_model, OpenAiConfig};
use gw_pipeline::{scheduler, PipelineRunner, QuotaTracker, SummarizeStage};
use gw_storage::SqliteStore;
use gw_web::shaper::ShaperConfig;
use gw_web::AppState;

#[derive(Parser, Debug)]
#[command(
    name = "grimwire",
    version,
    about = "Feed aggregation and commentary pipeline"
)]
struct Cli {
    /// Sqlite database path
    #[arg(long, env = "GRIMWIRE_DB", default_value = "data/grimwire.db")]
    db: String,

    /// Quota state file path
    #[arg(long, env = "GRIMWIRE_QUOTA_STATE", default_value = "data/quota_state.json")]
    quota_state: String,

    /// Commentary model: openai or dummy
    #[arg(long, env = "GRIMWIRE_MODEL", default_value = "openai")]
    model: String,

    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Chat model name
    #[arg(long, env = "OPENAI_MODEL", default_value = "gpt-4.1-mini")]
    model_name: String,

    /// Chat API base URL
    #[arg(long, env = "OPENAI_BASE_URL", default_value = "https://api.openai.com/v1")]
    base_url: String,

    /// Per-request commentary timeout, seconds
    #[arg(long, env = "OPENAI_TIMEOUT_SECS", default_value_t = 30)]
    model_timeout_secs: u64,

    /// Articles per summarize batch
    #[arg(long, env = "SUMMARY_BATCH_LIMIT", default_value_t = 10)]
    batch_limit: u32,

    /// Commentary units allowed per UTC day
    #[arg(long, env = "SUMMARY_DAILY_CAP", default_value_t = 30)]
    daily_cap: u32,

    /// Pause between commentary attempts, milliseconds
    #[arg(long, env = "SUMMARY_COOLDOWN_MS", default_value_t = 1200)]
    cooldown_ms: u64,

    /// Per-feed fetch timeout, seconds
    #[arg(long, env = "FEED_TIMEOUT_SECS", default_value_t = 15)]
    feed_timeout_secs: u64,

    /// Per-stage timeout, seconds
    #[arg(long, env = "STAGE_TIMEOUT_SECS", default_value_t = 480)]
    stage_timeout_secs: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the read API and run the pipeline on a schedule
    Serve {
        #[arg(long, env = "GRIMWIRE_ADDR", default_value = "0.0.0.0:3000")]
        addr: String,

        /// Seconds between scheduled pipeline runs
        #[arg(long, env = "PIPELINE_INTERVAL_SECS", default_value_t = 1800)]
        interval_secs: u64,

        /// Shared secret for the admin endpoints
        #[arg(long, env = "ADMIN_TOKEN")]
        admin_token: String,

        /// Skip the warm-up run shortly after startup
        #[arg(long, default_value_t = false)]
        no_warmup: bool,
    },
    /// Run ingest then summarize once and exit
    Run,
    /// Fetch configured feeds once and exit
    Ingest,
    /// Summarize one batch and exit
    Summarize,
    /// Print the quota state and exit
    Status,
}

fn ingest_stage(
    store: Arc<dyn ArticleStore>,
    feed_timeout: Duration,
) -> Result<Arc<dyn PipelineStage>> {
    let client = HttpFeedClient::new(feed_timeout)?;
    Ok(Arc::new(IngestStage::new(
        store,
        Arc::new(client),
        default_sources(),
    )))
}

fn summarize_stage(
    store: Arc<dyn ArticleStore>,
    quota: Arc<QuotaTracker>,
    kind: &str,
    config: OpenAiConfig,
    batch_limit: u32,
    daily_cap: u32,
    cooldown: Duration,
) -> Result<Arc<dyn PipelineStage>> {
    let model = create_model(kind, config)?;
    Ok(Arc::new(SummarizeStage::new(
        store,
        model,
        quota,
        batch_limit,
        daily_cap,
        cooldown,
    )))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let store: Arc<dyn ArticleStore> = Arc::new(
        SqliteStore::open(&cli.db)
            .await
            .with_context(|| format!("open database at {}", cli.db))?,
    );
    let quota = Arc::new(QuotaTracker::new(&cli.quota_state));

    let feed_timeout = Duration::from_secs(cli.feed_timeout_secs);
    let stage_timeout = Duration::from_secs(cli.stage_timeout_secs);
    let cooldown = Duration::from_millis(cli.cooldown_ms);
    let model_kind = cli.model.clone();
    let model_config = OpenAiConfig {
        api_key: cli.api_key.clone(),
        model: cli.model_name.clone(),
        base_url: cli.base_url.clone(),
        timeout: Duration::from_secs(cli.model_timeout_secs),
    };
    let batch_limit = cli.batch_limit;
    let daily_cap = cli.daily_cap;

    match cli.command {
        Commands::Serve {
            addr,
            interval_secs,
            admin_token,
            no_warmup,
        } => {
            let ingest = ingest_stage(store.clone(), feed_timeout)?;
            let summarize = summarize_stage(
                store.clone(),
                quota.clone(),
                &model_kind,
                model_config,
                batch_limit,
                daily_cap,
                cooldown,
            )?;
            let runner = PipelineRunner::new(ingest, summarize, stage_timeout);

            let warmup = (!no_warmup).then(|| Duration::from_secs(5));
            scheduler::spawn(runner.clone(), Duration::from_secs(interval_secs), warmup);

            let state = AppState {
                store,
                runner,
                admin_token,
                shaper: ShaperConfig::default(),
            };
            gw_web::serve(state, &addr).await?;
        }
        Commands::Run => {
            let ingest = ingest_stage(store.clone(), feed_timeout)?;
            let summarize = summarize_stage(
                store,
                quota,
                &model_kind,
                model_config,
                batch_limit,
                daily_cap,
                cooldown,
            )?;
            let runner = PipelineRunner::new(ingest, summarize, stage_timeout);

            let report = runner.run_now("cli").await?;
            if !report.ok {
                anyhow::bail!(
                    "pipeline failed at {}",
                    report.failed_step.as_deref().unwrap_or("unknown")
                );
            }
            info!("pipeline complete");
        }
        Commands::Ingest => {
            let ingest = ingest_stage(store, feed_timeout)?;
            let inserted = ingest.run().await?;
            info!(inserted, "ingest complete");
        }
        Commands::Summarize => {
            let summarize = summarize_stage(
                store,
                quota,
                &model_kind,
                model_config,
                batch_limit,
                daily_cap,
                cooldown,
            )?;
            let done = summarize.run().await?;
            info!(done, "summarize complete");
        }
        Commands::Status => {
            let state = quota.state()?;
            println!("{}", serde_json::to_string_pretty(&state)?);
        }
    }

    Ok(())
}
