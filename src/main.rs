use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tapet::batch::{BatchSettings, CycleRunner};
use tapet::bot::{BotState, TelegramPoster};
use tapet::config::Config;
use tapet::downloader::ImageDownloader;
use tapet::providers::build_providers;
use tapet::scheduler::{SchedulerHandle, SourceRotator};
use tapet::storage::{JsonStore, SeenRegistry, StatsTracker};
use tapet::utils::RetryConfig;
use teloxide::Bot;
use tokio::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "tapet",
    version,
    about = "Scheduled mobile-wallpaper posting bot for Telegram",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Load configuration from a TOML file instead of the environment
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json)
    #[arg(long, global = true, default_value = "text")]
    log_format: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the bot with the command dispatcher
    Run {
        /// Start the posting scheduler immediately instead of waiting
        /// for /start
        #[arg(long, default_value = "false")]
        autostart: bool,
    },

    /// Post a single batch and exit
    SendBatch,

    /// Print persisted state and statistics
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_tracing(&cli.log_format, cli.verbose)?;

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Run { autostart } => {
            tracing::info!(autostart, "starting bot");
            run(config, autostart).await?;
        }
        Commands::SendBatch => {
            tracing::info!("sending a single batch");
            send_batch(config).await?;
        }
        Commands::Status => {
            status(config)?;
        }
    }

    Ok(())
}

fn setup_tracing(format: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("tapet=debug,info")
    } else {
        tracing_subscriber::EnvFilter::new("tapet=info,warn")
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }

    Ok(())
}

fn load_config(path: Option<&std::path::Path>) -> Result<Config> {
    match path {
        Some(path) => Config::from_file(path).context("loading config file"),
        None => Config::from_env().context("loading config from environment"),
    }
}

struct Runtime {
    bot: Bot,
    runner: Arc<Mutex<CycleRunner>>,
    stats: Arc<Mutex<StatsTracker>>,
}

fn build_runtime(config: &Config) -> Result<Runtime> {
    let client = reqwest::Client::builder()
        .timeout(config.request_timeout())
        .user_agent(&config.http.user_agent)
        .build()
        .context("building HTTP client")?;

    let providers = build_providers(config, &client);
    let store = JsonStore::new(&config.storage.data_dir)?;

    let registry = match store.load_seen() {
        Ok(records) => SeenRegistry::from_records(records),
        Err(e) => {
            tracing::warn!(error = %e, "could not load seen registry, starting empty");
            SeenRegistry::new()
        }
    };
    tracing::info!(seen = registry.len(), "seen registry loaded");

    let rotator = match store.load_rotation() {
        Ok(state) => SourceRotator::with_state(config.configured_sources(), state)?,
        Err(e) => {
            tracing::warn!(error = %e, "could not load rotation state, starting fresh");
            SourceRotator::new(config.configured_sources())?
        }
    };

    let stats = Arc::new(Mutex::new(StatsTracker::load(store.clone())));
    let downloader = ImageDownloader::new(client, config.http.rate_limit_per_sec);

    let bot = Bot::new(&config.telegram.bot_token);
    let poster = Arc::new(TelegramPoster::new(
        bot.clone(),
        &config.telegram.channel_id,
        config.telegram.admin_user_id,
    )?);

    let runner = CycleRunner::new(
        providers,
        rotator,
        registry,
        downloader,
        poster,
        store,
        stats.clone(),
        RetryConfig::new(config.batch.max_retries),
        BatchSettings::from_config(config),
    );

    Ok(Runtime {
        bot,
        runner: Arc::new(Mutex::new(runner)),
        stats,
    })
}

async fn run(config: Config, autostart: bool) -> Result<()> {
    let runtime = build_runtime(&config)?;

    let scheduler = SchedulerHandle::new(runtime.runner.clone(), config.batch_interval());
    let state = Arc::new(BotState {
        admin_user_id: config.telegram.admin_user_id,
        quota: config.batch.wallpapers_per_batch,
        interval_hours: config.batch.batch_interval_hours,
        channel_id: config.telegram.channel_id.clone(),
        runner: runtime.runner,
        stats: runtime.stats,
        scheduler,
    });

    if autostart {
        state.scheduler.start();
    }

    tapet::bot::run_dispatcher(runtime.bot, state).await;
    Ok(())
}

async fn send_batch(config: Config) -> Result<()> {
    let runtime = build_runtime(&config)?;

    let result = runtime.runner.lock().await.run_cycle().await;
    println!("Batch finished");
    println!("  Source: {}", result.source.display_name());
    println!("  Sent: {}/{}", result.sent, config.batch.wallpapers_per_batch);
    println!("  Candidates considered: {}", result.attempted);
    println!("  Failed sends/downloads: {}", result.failed);
    println!("  Outcome: {:?}", result.outcome);
    Ok(())
}

fn status(config: Config) -> Result<()> {
    let store = JsonStore::new(&config.storage.data_dir)?;
    let stats = store.load_stats()?;
    let rotation = store.load_rotation()?;
    let seen = store.load_seen()?;
    let sources = config.configured_sources();

    println!("Data directory: {}", config.storage.data_dir.display());
    println!(
        "Configured sources: {}",
        sources
            .iter()
            .map(|s| s.display_name())
            .collect::<Vec<_>>()
            .join(", ")
    );
    if !sources.is_empty() {
        let current = sources[rotation.current_index % sources.len()];
        println!("Current source: {}", current.display_name());
    }
    println!("Seen images: {}", seen.len());
    println!("Total sent: {}", stats.total_sent);
    println!(
        "Cycles: {} ok / {} failed",
        stats.successful_cycles, stats.failed_cycles
    );
    match stats.last_cycle_time {
        Some(t) => println!("Last cycle: {}", t.format("%Y-%m-%d %H:%M UTC")),
        None => println!("Last cycle: never"),
    }
    Ok(())
}
