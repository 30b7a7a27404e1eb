//! `mediaflow` - submit a batch of demo tasks and watch the queue drain.
//!
//! Usage:
//!   mediaflow [--workers N] [--tasks N] [--config mediaflow_config.json]
//!             [--cancel-first] [--fail-every N] [--list]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use mediaflow_core::impls::{ChannelEventSink, CopyProcessor, SimulateProcessor};
use mediaflow_core::{
    MediaflowError, Payload, Priority, ProcessorRegistry, QueueConfig, QueueEvent, TaskId,
    TaskQueue, TaskSpec,
};
use serde_json::json;
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Demo driver for the media task queue.
#[derive(Parser, Debug)]
#[command(name = "mediaflow", about = "Run a batch of simulated media tasks")]
struct Cli {
    /// Worker count (overrides the config file).
    #[arg(short = 'w', long)]
    workers: Option<usize>,

    /// Number of batch tasks to submit. One extra preview task is added.
    #[arg(short = 'n', long, default_value_t = 8)]
    tasks: usize,

    /// JSON config file with a `system` section.
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Cancel the first task right after submitting it.
    #[arg(long)]
    cancel_first: bool,

    /// Make every Nth task fail halfway through.
    #[arg(long)]
    fail_every: Option<usize>,

    /// Steps per simulated task.
    #[arg(long, default_value_t = 20)]
    steps: u64,

    /// Delay per step in milliseconds.
    #[arg(long, default_value_t = 25)]
    step_ms: u64,

    /// Print the registered processors and exit.
    #[arg(long)]
    list: bool,
}

#[tokio::main]
async fn main() -> Result<(), MediaflowError> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let mut config = QueueConfig::load(cli.config.as_deref())?;
    if let Some(workers) = cli.workers {
        config = config.with_max_workers(workers);
    }
    tracing::info!(?config, "starting mediaflow");

    let sink = Arc::new(ChannelEventSink::new(config.event_capacity));
    let mut events = sink.subscribe();

    let registry = ProcessorRegistry::new()
        .with(Arc::new(SimulateProcessor::new(
            cli.steps,
            Duration::from_millis(cli.step_ms),
        )))?
        .with(Arc::new(CopyProcessor))?;
    if cli.list {
        for info in registry.describe() {
            println!("{:<10} {}", info.name, info.description);
        }
        return Ok(());
    }
    let queue = TaskQueue::builder(registry)
        .config(config)
        .event_sink(sink.clone())
        .expect_processors(&["simulate"])
        .build()?;
    let scheduler = queue.start().await?;

    let frames = |range: std::ops::Range<usize>| {
        range.map(|i| {
            (
                format!("input/frame_{i:04}.png"),
                format!("output/frame_{i:04}.png"),
            )
        })
    };
    let failing = match cli.fail_every {
        Some(n) if n > 0 => cli.tasks / n,
        _ => 0,
    };
    let passing = frames(0..cli.tasks - failing);
    let mut ids: Vec<TaskId> = queue
        .submit_batch("simulate", &Payload::new(), passing, Priority::Normal)
        .await?;
    if failing > 0 {
        let mut config = Payload::new();
        config.insert("fail_at".into(), json!(cli.steps / 2));
        let failing = frames(cli.tasks - failing..cli.tasks);
        let failed = queue
            .submit_batch("simulate", &config, failing, Priority::Normal)
            .await?;
        ids.extend(failed);
    }
    if cli.cancel_first
        && let Some(first) = ids.first()
    {
        queue.cancel(*first).await;
    }
    queue
        .submit_preview(TaskSpec::new("simulate", "input/preview.png", "output/preview.png"))
        .await;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::warn!("interrupted");
                break;
            }
            event = events.recv() => match event {
                Ok(QueueEvent::QueueEmpty) => {
                    if queue.counts().await.is_idle() {
                        tracing::info!("queue drained");
                        break;
                    }
                }
                Ok(QueueEvent::TaskProgress { .. }) => {}
                Ok(event) => {
                    let line = serde_json::to_string(&event).unwrap_or_default();
                    tracing::info!(event = %line, "queue event");
                }
                Err(RecvError::Lagged(skipped)) => tracing::warn!(skipped, "event receiver lagged"),
                Err(RecvError::Closed) => break,
            },
        }
    }

    scheduler.shutdown_and_join().await;

    let summary = queue.batch_summary(&ids).await;
    for failure in &summary.failed {
        tracing::warn!(
            input = %failure.input_path.display(),
            status = ?failure.status,
            error = failure.error.as_deref().unwrap_or(""),
            "not processed"
        );
    }
    tracing::info!(
        succeeded = summary.succeeded.len(),
        failed = summary.failed.len(),
        "done"
    );
    println!(
        "{}",
        serde_json::to_string_pretty(&summary).unwrap_or_default()
    );
    Ok(())
}
