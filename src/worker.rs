use crate::issuer::Issuer;
use crate::limiter::RateLimiter;
use crate::model::{Outcome, ParamSet};
use rand::seq::SliceRandom;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::trace;
use url::Url;

/// What every worker shares. Read-only for the whole run.
pub struct WorkerContext<I> {
    pub url: Url,
    pub params: Arc<Vec<ParamSet>>,
    pub issuer: Arc<I>,
    pub deadline: Instant,
}

impl<I> Clone for WorkerContext<I> {
    fn clone(&self) -> Self {
        Self {
            url: self.url.clone(),
            params: Arc::clone(&self.params),
            issuer: Arc::clone(&self.issuer),
            deadline: self.deadline,
        }
    }
}

/// Issue requests until the deadline passes, sending every outcome to `tx`.
/// The deadline is only checked between requests. Returns the number of
/// requests this worker issued.
pub async fn worker<I: Issuer>(
    rank: usize,
    ctx: WorkerContext<I>,
    limiter: RateLimiter,
    tx: mpsc::Sender<Outcome>,
) -> usize {
    let mut ite = 0;
    while Instant::now() < ctx.deadline {
        limiter.wait().await;
        if Instant::now() >= ctx.deadline {
            break;
        }

        let params = ctx.params.choose(&mut rand::thread_rng()).cloned();
        let outcome = ctx.issuer.issue(&ctx.url, params.as_ref()).await;
        trace!(rank, ite, status = outcome.status, "request done");

        if tx.send(outcome).await.is_err() {
            break;
        }
        ite += 1;
    }
    ite
}
