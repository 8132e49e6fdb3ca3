//! Worker pool orchestration.
//!
//! The runner owns the deadline, spawns one task per configured thread and
//! collects their outcomes through a single channel consumer. A separate
//! ticker feeds the optional [`ProgressSink`]; it never blocks the workers.

use crate::config::RunConfig;
use crate::error::Result;
use crate::issuer::Issuer;
use crate::limiter::{RateLimiter, RateScope};
use crate::model::{RunMetadata, RunRecord};
use crate::worker::{worker, WorkerContext};
use chrono::Local;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{info, warn};

pub const PROGRESS_INTERVAL: Duration = Duration::from_millis(100);

const CHANNEL_CAPACITY: usize = 1024;

/// Receives `(elapsed_seconds, total_seconds)` while a run is in progress.
/// Returning `true` stops further updates.
pub trait ProgressSink: Send {
    fn update(&mut self, elapsed: f64, total: f64) -> bool;
}

impl<F> ProgressSink for F
where
    F: FnMut(f64, f64) -> bool + Send,
{
    fn update(&mut self, elapsed: f64, total: f64) -> bool {
        self(elapsed, total)
    }
}

/// Run the configured load until the deadline and return every outcome.
pub async fn run<I>(
    config: &RunConfig,
    issuer: Arc<I>,
    progress: Option<Box<dyn ProgressSink>>,
) -> Result<RunRecord>
where
    I: Issuer + 'static,
{
    let started_at = Local::now();
    let start = Instant::now();
    let total = config.duration();
    let ctx = WorkerContext {
        url: config.url().clone(),
        params: Arc::new(config.params().to_vec()),
        issuer,
        deadline: start + total,
    };

    info!(
        url = %config.url(),
        threads = config.threads(),
        duration_secs = config.duration_secs(),
        rate_limit = config.rate_limit(),
        rate_scope = ?config.rate_scope(),
        "starting run"
    );

    let ticker = progress.map(|sink| tokio::spawn(report_progress(sink, start, total)));

    let (tx, mut rx) = mpsc::channel(CHANNEL_CAPACITY);
    let collector = tokio::spawn(async move {
        let mut outcomes = vec![];
        while let Some(outcome) = rx.recv().await {
            outcomes.push(outcome);
        }
        outcomes
    });

    let shared = RateLimiter::global(config.rate_limit());
    let mut set = JoinSet::new();
    for rank in 0..config.threads() {
        let limiter = match config.rate_scope() {
            RateScope::PerWorker => RateLimiter::per_worker(config.rate_limit()),
            RateScope::Global => shared.clone(),
        };
        set.spawn(worker(rank, ctx.clone(), limiter, tx.clone()));
    }

    drop(tx);

    let mut issued = 0;
    while let Some(res) = set.join_next().await {
        issued += res?;
    }

    let outcomes = collector.await?;
    if let Some(ticker) = ticker {
        if let Err(e) = ticker.await {
            warn!(error = %e, "progress reporting stopped");
        }
    }

    let finished_at = Local::now();
    info!(
        requests = issued,
        elapsed_secs = start.elapsed().as_secs_f64(),
        "run finished"
    );

    Ok(RunRecord {
        metadata: RunMetadata {
            started_at,
            finished_at,
            duration_secs: config.duration_secs(),
            threads: config.threads(),
        },
        outcomes,
    })
}

async fn report_progress(mut sink: Box<dyn ProgressSink>, start: Instant, total: Duration) {
    let total_secs = total.as_secs_f64();
    let mut interval = tokio::time::interval(PROGRESS_INTERVAL);
    loop {
        interval.tick().await;
        let elapsed = start.elapsed().min(total).as_secs_f64();
        if sink.update(elapsed, total_secs) || elapsed >= total_secs {
            break;
        }
    }
}
