// ABOUTME: Usage demo - sequential and concurrent callers sharing one Limiter.
// ABOUTME: Concurrent workers give up on calls that wait past their timeout.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result};
use clap::Parser;
use tokio::time::Instant;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt};

use pacer::prelude::*;

/// Demonstrates pacing calls to a shared resource
#[derive(Parser, Debug)]
#[command(name = "pacer-demo")]
#[command(version)]
#[command(about = "Pace sequential and concurrent callers to an average rate", long_about = None)]
struct Args {
    /// Calls permitted per period
    #[arg(long, default_value_t = 10)]
    count: u32,

    /// Period length in milliseconds
    #[arg(long, default_value_t = 1000)]
    per_ms: u64,

    /// Rate configuration file (JSON), overrides --count and --per-ms
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Concurrent workers in the second phase
    #[arg(long, default_value_t = 10)]
    workers: usize,

    /// Calls issued by each worker
    #[arg(long, default_value_t = 100)]
    calls: usize,

    /// Per-call timeout for workers in milliseconds
    #[arg(long, default_value_t = 200)]
    timeout_ms: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[derive(Debug, Default)]
struct Tally {
    granted: usize,
    cancelled: usize,
    deadline_exceeded: usize,
}

fn load_config(args: &Args) -> Result<RateConfig> {
    let config = match &args.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("failed to parse {}", path.display()))?
        }
        None => RateConfig {
            count: args.count,
            per_ms: args.per_ms,
        },
    };
    config.validate()?;
    Ok(config)
}

async fn sequential(limiter: &Limiter, calls: usize) -> Result<()> {
    let ctx = Context::background();
    let start = Instant::now();

    for i in 0..calls {
        // wait until the operation is permitted
        limiter.wait(&ctx).await?;
        debug!(call = i, elapsed_ms = start.elapsed().as_millis() as u64, "granted");
    }

    info!(
        calls,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "sequential phase done"
    );
    Ok(())
}

async fn worker(limiter: Arc<Limiter>, id: usize, calls: usize, timeout: Duration) -> Tally {
    let mut tally = Tally::default();

    for _ in 0..calls {
        let ctx = Context::background().with_timeout(timeout);
        match limiter.wait(&ctx).await {
            Ok(()) => tally.granted += 1,
            Err(Interrupted::Cancelled) => tally.cancelled += 1,
            Err(Interrupted::DeadlineExceeded) => tally.deadline_exceeded += 1,
        }
    }

    debug!(worker = id, ?tally, "worker finished");
    tally
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    fmt().with_env_filter(filter).init();

    let config = load_config(&args)?;
    let limiter = Arc::new(Limiter::from_config(&config)?);
    info!(
        count = config.count,
        per_ms = config.per_ms,
        interval_ms = limiter.interval().as_millis() as u64,
        "limiter ready"
    );

    sequential(&limiter, config.count as usize).await?;

    let timeout = Duration::from_millis(args.timeout_ms);
    let start = Instant::now();
    let handles: Vec<_> = (0..args.workers)
        .map(|id| tokio::spawn(worker(limiter.clone(), id, args.calls, timeout)))
        .collect();

    let mut total = Tally::default();
    for result in futures::future::join_all(handles).await {
        let tally = result?;
        total.granted += tally.granted;
        total.cancelled += tally.cancelled;
        total.deadline_exceeded += tally.deadline_exceeded;
    }

    let elapsed = start.elapsed();
    info!(
        workers = args.workers,
        granted = total.granted,
        deadline_exceeded = total.deadline_exceeded,
        cancelled = total.cancelled,
        elapsed_ms = elapsed.as_millis() as u64,
        observed_rate = total.granted as f64 / elapsed.as_secs_f64(),
        "concurrent phase done"
    );

    Ok(())
}
