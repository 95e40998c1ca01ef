//! Object storage watcher CLI
//!
//! Local execution entry point: `watch` runs until interrupted, `poll` runs a
//! single cycle per bucket for cron-style deployments.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use objectstore_watcher::{
    error::{AppError, Result},
    models::{Config, StateBackend, WatcherSettings},
    pipeline::{self, Supervisor, WatcherDeps},
    services::{PagedLister, S3ListingBackend, WebhookNotifier, build_client},
    storage::{LocalSnapshotStore, S3SnapshotStore, SnapshotStore},
    utils::http,
};

/// Watches object storage buckets and reports changes to a webhook
#[derive(Parser, Debug)]
#[command(name = "objectstore-watcher", version, about)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, global = true, default_value = "watcher.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(flatten)]
    overrides: Overrides,

    #[command(subcommand)]
    command: Command,
}

/// Values that take precedence over the configuration file.
#[derive(Args, Debug)]
struct Overrides {
    /// Object storage namespace
    #[arg(long, global = true, env = "OBJECTSTORE_NAMESPACE")]
    namespace: Option<String>,

    /// Buckets to watch (comma-separated)
    #[arg(
        long = "buckets",
        global = true,
        env = "OBJECTSTORE_BUCKETS",
        value_delimiter = ','
    )]
    buckets: Vec<String>,

    /// Interval between polls, e.g. `30s` or `2m`
    #[arg(
        long,
        global = true,
        env = "OBJECTSTORE_POLL_INTERVAL",
        value_parser = humantime::parse_duration
    )]
    poll_interval: Option<Duration>,

    /// Webhook receiving change notifications
    #[arg(long, global = true, env = "WEBHOOK_URL")]
    webhook_url: Option<String>,

    /// Directory for the local snapshot backend
    #[arg(long, global = true, env = "WATCHER_STATE_DIR")]
    state_dir: Option<PathBuf>,
}

impl Overrides {
    fn apply(self, config: &mut Config) {
        if let Some(namespace) = self.namespace {
            config.namespace = namespace;
        }
        let buckets: Vec<String> = self
            .buckets
            .into_iter()
            .map(|b| b.trim().to_string())
            .filter(|b| !b.is_empty())
            .collect();
        if !buckets.is_empty() {
            config.buckets = buckets;
        }
        if let Some(interval) = self.poll_interval {
            config.poll_interval = interval;
        }
        if let Some(url) = self.webhook_url {
            config.webhook_url = Some(url);
        }
        if let Some(dir) = self.state_dir {
            config.state.dir = dir;
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Poll every bucket on its interval until SIGINT or SIGTERM
    Watch,

    /// Run one cycle for every bucket, then exit
    Poll,

    /// Show persisted snapshot info per bucket
    Info,

    /// Validate configuration and print effective settings
    Validate,
}

/// Initialize logging based on verbosity and format flags.
fn init_logging(verbose: bool, json: bool) {
    let level = if verbose { "debug" } else { "info" };

    if json {
        use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
            .format_timestamp_secs()
            .init();
    }
}

/// Wire the S3 lister, snapshot store and webhook notifier.
async fn build_deps(config: &Config, settings: &WatcherSettings) -> Result<WatcherDeps> {
    let s3 = build_client(&config.storage, config.http.timeout).await;
    let store = build_store(config, &s3)?;

    let client = http::create_async_client(&config.http)?;
    let notifier = WebhookNotifier::new(client, settings.webhook_url.clone());

    Ok(WatcherDeps {
        lister: Arc::new(PagedLister::new(S3ListingBackend::new(s3))),
        store,
        notifier: Arc::new(notifier),
    })
}

fn build_store(config: &Config, s3: &aws_sdk_s3::Client) -> Result<Arc<dyn SnapshotStore>> {
    match config.state.backend {
        StateBackend::Local => {
            log::info!("Snapshots stored under {}", config.state.dir.display());
            Ok(Arc::new(LocalSnapshotStore::new(&config.state.dir)))
        }
        StateBackend::S3 => {
            let bucket = config
                .state
                .bucket
                .clone()
                .ok_or_else(|| AppError::config("state.bucket is required for the s3 backend"))?;
            log::info!("Snapshots stored in s3://{}/{}", bucket, config.state.prefix);
            Ok(Arc::new(S3SnapshotStore::new(
                s3.clone(),
                bucket,
                config.state.prefix.clone(),
            )))
        }
    }
}

/// Resolve on SIGINT, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                log::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => log::info!("Received SIGINT"),
        _ = terminate => log::info!("Received SIGTERM"),
    }
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.json_logs);

    let mut config = Config::load_optional(&cli.config)?;
    cli.overrides.apply(&mut config);
    let settings = config
        .settings()
        .inspect_err(|e| log::error!("Invalid configuration: {}", e))?;

    match cli.command {
        Command::Watch => {
            log::info!(
                "Watching {} bucket(s) in namespace {}",
                settings.buckets.len(),
                config.namespace
            );
            let deps = build_deps(&config, &settings).await?;
            let supervisor = Supervisor::start(&settings, deps);

            shutdown_signal().await;
            let report = supervisor.shutdown().await;
            if !report.is_clean() {
                log::warn!("Shutdown was not clean: {}", report);
            }
        }

        Command::Poll => {
            let deps = build_deps(&config, &settings).await?;
            let results = pipeline::poll_once(&settings, &deps).await;

            let mut first_error = None;
            for (bucket, result) in results {
                match result {
                    Ok(report) => log::info!("[{}] {}", bucket, report),
                    Err(e) => {
                        log::error!("[{}] poll failed: {}", bucket, e);
                        first_error.get_or_insert(e);
                    }
                }
            }
            if let Some(e) = first_error {
                return Err(e);
            }
        }

        Command::Info => {
            let s3 = build_client(&config.storage, config.http.timeout).await;
            let store = build_store(&config, &s3)?;

            for bucket in &settings.buckets {
                match store.load_stored(&bucket.key()).await {
                    Ok(Some(stored)) => log::info!(
                        "[{}] {} objects, last updated {}",
                        bucket,
                        stored.snapshot.len(),
                        stored.updated_at.to_rfc3339()
                    ),
                    Ok(None) => log::info!("[{}] no snapshot", bucket),
                    Err(e) => log::warn!("[{}] unreadable snapshot: {}", bucket, e),
                }
            }
        }

        Command::Validate => {
            log::info!("Namespace: {}", config.namespace);
            for bucket in &settings.buckets {
                log::info!("Bucket: {}", bucket);
            }
            log::info!(
                "Poll interval: {}",
                humantime::format_duration(settings.poll_interval)
            );
            log::info!("Webhook: {}", settings.webhook_url);
            log::info!("Corrupt snapshot policy: {:?}", settings.on_corrupt_snapshot);
            log::info!("State backend: {:?}", config.state.backend);
            log::info!("✓ Config OK");
        }
    }

    Ok(())
}
