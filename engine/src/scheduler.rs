//! Deferred refresh scheduling with stale-result discard.

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;

use tokio::sync::mpsc;

use crate::error::AsyncJobError;
use crate::presenter::PresenterId;

/// Opaque job output routed back to the owning presenter, which downcasts
/// it to the concrete type it scheduled.
pub type JobPayload = Box<dyn Any + Send>;

pub(crate) struct CompletedJob {
    pub(crate) owner: PresenterId,
    pub(crate) generation: u64,
    pub(crate) result: Result<JobPayload, AsyncJobError>,
}

/// Tracks at most one deliverable job per presenter via a generation
/// counter: `schedule` bumps the owner's generation, so an earlier job that
/// completes afterwards carries a stale generation and is dropped in
/// [`drain`](RefreshScheduler::drain). Deactivation bumps the generation the
/// same way. In-flight work is never forcibly aborted; only its result is
/// ignored.
pub(crate) struct RefreshScheduler {
    tx: mpsc::UnboundedSender<CompletedJob>,
    rx: mpsc::UnboundedReceiver<CompletedJob>,
    generations: HashMap<PresenterId, u64>,
}

impl RefreshScheduler {
    pub(crate) fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx,
            generations: HashMap::new(),
        }
    }

    /// Spawn `job` on the tokio runtime. Supersedes any outstanding job of
    /// the same owner.
    pub(crate) fn schedule<F>(&mut self, owner: PresenterId, job: F)
    where
        F: Future<Output = anyhow::Result<JobPayload>> + Send + 'static,
    {
        let generation = self.bump(owner);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = job
                .await
                .map_err(|err| AsyncJobError::Failed(err.to_string()));
            // A closed receiver means the stage is gone; nothing to deliver.
            let _ = tx.send(CompletedJob {
                owner,
                generation,
                result,
            });
        });
    }

    /// Invalidate all outstanding work for `owner` (the deactivation path).
    pub(crate) fn invalidate(&mut self, owner: PresenterId) {
        self.bump(owner);
    }

    fn bump(&mut self, owner: PresenterId) -> u64 {
        let generation = self.generations.entry(owner).or_insert(0);
        *generation += 1;
        *generation
    }

    /// Completed jobs whose generation still matches the owner's current
    /// one. Superseded and post-deactivation results are dropped here.
    pub(crate) fn drain(&mut self) -> Vec<CompletedJob> {
        let mut fresh = Vec::new();
        while let Ok(job) = self.rx.try_recv() {
            if self.generations.get(&job.owner) == Some(&job.generation) {
                fresh.push(job);
            } else {
                tracing::debug!(
                    "discarding stale refresh result for presenter {:?}",
                    job.owner
                );
            }
        }
        fresh
    }
}
