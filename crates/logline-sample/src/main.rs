//! logline sample host.
//!
//! Usage: logline-sample --db <path> --count <n> [--endpoint <url>]
//!
//! Emits `n` click/screen events and lets the pipeline deliver them to
//! stdout (and to the HTTP endpoint, if given) until the store drains or
//! Ctrl-C is pressed. Records still pending at exit stay in the database
//! and are delivered on the next run.

mod events;
mod logging;
mod stdout;

use anyhow::Context;
use clap::Parser;
use logline::{
    JsonSerializer, Observer, Pipeline, PipelineConfig, PipelineSettings, Store, TimestampFilter,
};
use logline_http_sender::{HttpSender, HttpSenderConfig};
use logline_sqlite_store::SqliteStore;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Sample host for the logline event pipeline.
#[derive(Parser, Debug)]
#[command(name = "logline-sample")]
#[command(about = "Emit sample events through a durable logline pipeline")]
struct Args {
    /// Path to the SQLite record store.
    #[arg(long, env = "LOGLINE_DB", default_value = "logline.db")]
    db: PathBuf,

    /// Number of events to emit.
    #[arg(long, default_value = "20")]
    count: usize,

    /// HTTP endpoint receiving click events as well.
    #[arg(long, env = "LOGLINE_ENDPOINT")]
    endpoint: Option<String>,

    /// Bearer token for the HTTP endpoint.
    #[arg(long, env = "LOGLINE_AUTH_TOKEN", hide_env_values = true)]
    auth_token: Option<String>,

    /// Records loaded per delivery cycle (overrides LOGLINE_BATCH_SIZE).
    #[arg(long)]
    batch_size: Option<usize>,

    /// Delay between delivery cycles in milliseconds (overrides LOGLINE_FLUSH_INTERVAL_MS).
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Emit logs as JSON lines.
    #[arg(long)]
    json_logs: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn settings(&self) -> PipelineSettings {
        let mut settings = PipelineSettings::from_env();
        if let Some(batch_size) = self.batch_size {
            settings.batch_size = batch_size;
        }
        if let Some(interval_ms) = self.interval_ms {
            settings.flush_interval = Duration::from_millis(interval_ms);
        }
        settings
    }
}

fn observer() -> Observer {
    Observer::new()
        .on_cycle_ended(|outcomes| {
            for o in outcomes {
                info!(
                    destination = %o.destination,
                    outcome = %o.outcome,
                    records = o.record_count,
                    "Batch reconciled"
                );
            }
        })
        .on_store_error(|e| error!(error = %e, "Record store failure"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    logging::init_logging(&logging::LogConfig {
        default_level: args.log_level.clone(),
        json: args.json_logs,
    });

    info!("logline sample starting...");

    let store = Arc::new(
        SqliteStore::open(&args.db)
            .await
            .with_context(|| format!("opening record store {}", args.db.display()))?,
    );
    let pending = store.count().await?;
    if pending > 0 {
        info!(pending, "Resuming with records left by a previous run");
    }

    let settings = args.settings();
    info!(
        db = %args.db.display(),
        batch_size = settings.batch_size,
        interval_ms = settings.flush_interval.as_millis() as u64,
        endpoint = args.endpoint.as_deref().unwrap_or("-"),
        "Configuration loaded"
    );

    let serializer = JsonSerializer::new().with_filter(TimestampFilter::default());
    let mut builder = PipelineConfig::builder(store.clone(), Arc::new(serializer))
        .destination("stdout", Arc::new(stdout::LineSender::stdout()), ["click", "screen"])
        .settings(&settings)
        .observer(observer());

    if let Some(endpoint) = &args.endpoint {
        let sender = HttpSender::new(HttpSenderConfig {
            endpoint: endpoint.clone(),
            auth_token: args.auth_token.clone(),
            ..Default::default()
        })?;
        builder = builder.destination("http", Arc::new(sender), ["click"]);
    }

    let pipeline = Pipeline::new();
    pipeline.start(builder.build()?)?;

    events::generate(args.count, |event| {
        if let Err(e) = pipeline.send(event) {
            warn!(error = %e, "Dropping event");
        }
    });
    info!(count = args.count, "Events emitted");
    pipeline.flush()?;

    let ctrl_c = tokio::signal::ctrl_c();

    tokio::select! {
        result = wait_for_drain(store.as_ref(), settings.flush_interval) => {
            result?;
            info!("Store drained");
        }
        _ = ctrl_c => {
            info!("Received shutdown signal, exiting...");
        }
    }

    pipeline.stop();

    let left = store.count().await?;
    if left > 0 {
        warn!(left, "Records left for the next run");
    }
    SqliteStore::clone(&store).close().await?;

    Ok(())
}

/// Polls the store once per cycle until it is empty.
async fn wait_for_drain(store: &SqliteStore, interval: Duration) -> anyhow::Result<()> {
    loop {
        tokio::time::sleep(interval).await;
        let count = store.count().await?;
        if count == 0 {
            return Ok(());
        }
        info!(count, "Waiting for delivery");
    }
}
