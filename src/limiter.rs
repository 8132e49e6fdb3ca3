//! Request pacing.
//!
//! With [`RateScope::PerWorker`] every worker owns a limiter and sleeps one
//! interval before each request, so the aggregate rate is
//! `rate_limit * threads`. With [`RateScope::Global`] all workers share one
//! slot schedule and the aggregate rate is `rate_limit`.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, sleep_until, Instant};

/// What the configured rate limit applies to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RateScope {
    /// Each worker is limited on its own.
    #[default]
    PerWorker,
    /// The whole pool shares the limit.
    Global,
}

#[derive(Debug, Clone)]
enum Gate {
    Unlimited,
    Interval(Duration),
    Shared {
        interval: Duration,
        next_slot: Arc<Mutex<Instant>>,
    },
}

/// Pacing gate for one worker.
///
/// Cloning a global limiter shares its schedule; cloning a per-worker
/// limiter yields an independent one.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    gate: Gate,
}

impl RateLimiter {
    /// Limiter that sleeps `1 / rate` before every request. A rate of 0
    /// disables limiting.
    pub fn per_worker(rate: u32) -> Self {
        let gate = match interval(rate) {
            Some(interval) => Gate::Interval(interval),
            None => Gate::Unlimited,
        };
        Self { gate }
    }

    /// Limiter meant to be cloned into every worker; hands out one slot
    /// every `1 / rate` across all clones.
    pub fn global(rate: u32) -> Self {
        let gate = match interval(rate) {
            Some(interval) => Gate::Shared {
                interval,
                next_slot: Arc::new(Mutex::new(Instant::now())),
            },
            None => Gate::Unlimited,
        };
        Self { gate }
    }

    pub fn new(rate: u32, scope: RateScope) -> Self {
        match scope {
            RateScope::PerWorker => Self::per_worker(rate),
            RateScope::Global => Self::global(rate),
        }
    }

    pub fn unlimited() -> Self {
        Self {
            gate: Gate::Unlimited,
        }
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self.gate, Gate::Unlimited)
    }

    pub fn interval(&self) -> Option<Duration> {
        match &self.gate {
            Gate::Unlimited => None,
            Gate::Interval(interval) => Some(*interval),
            Gate::Shared { interval, .. } => Some(*interval),
        }
    }

    /// Wait until the next request may be issued.
    pub async fn wait(&self) {
        match &self.gate {
            Gate::Unlimited => {}
            Gate::Interval(interval) => sleep(*interval).await,
            Gate::Shared {
                interval,
                next_slot,
            } => {
                let slot = {
                    let mut next = next_slot.lock().await;
                    let slot = (*next).max(Instant::now());
                    *next = slot + *interval;
                    slot
                };
                sleep_until(slot).await;
            }
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::unlimited()
    }
}

fn interval(rate: u32) -> Option<Duration> {
    (rate > 0).then(|| Duration::from_secs_f64(1.0 / f64::from(rate)))
}
