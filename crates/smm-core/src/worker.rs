//! Belief worker: runs a [`BeliefChain`] on its own Tokio task.
//!
//! The hand-off is a single slot, not a queue. Publishing a snapshot
//! replaces whatever the worker has not picked up yet, so a slow chain
//! always works on the newest tick and never on a backlog. Reports come
//! back through a second single slot holding the latest chain report.
//!
//! Each tick runs on the blocking pool so a long chain update never stalls
//! the runtime's async threads.
//!
//! Shutdown is cooperative: [`BeliefWorker::shutdown`] publishes the
//! [`Signal::Shutdown`] sentinel and joins the task, which exits on its
//! next read. There is no timeout.

use smm_types::WorldSnapshot;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::chain::{BeliefChain, ChainReport};
use crate::error::SmmError;

/// Errors that can occur while talking to a belief worker.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    /// The worker task has already stopped.
    #[error("belief worker has stopped")]
    Closed,

    /// The worker task panicked or was aborted.
    #[error("belief worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// The chain rejected a snapshot and the worker stopped.
    #[error(transparent)]
    Chain(#[from] SmmError),
}

/// Content of the worker's input slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    /// Nothing published yet.
    Idle,
    /// The newest snapshot to process.
    Snapshot(WorldSnapshot),
    /// Stop after the current tick.
    Shutdown,
}

/// Handle to a chain running on a background task.
#[derive(Debug)]
pub struct BeliefWorker {
    input: watch::Sender<Signal>,
    reports: watch::Receiver<Option<ChainReport>>,
    handle: JoinHandle<Result<BeliefChain, WorkerError>>,
}

impl BeliefWorker {
    /// Move `chain` onto a new task. Must be called inside a Tokio runtime.
    pub fn spawn(chain: BeliefChain) -> Self {
        let (input, input_rx) = watch::channel(Signal::Idle);
        let (reports_tx, reports) = watch::channel(None);
        let handle = tokio::spawn(worker_loop(chain, input_rx, reports_tx));
        info!("belief worker started");
        Self {
            input,
            reports,
            handle,
        }
    }

    /// Replace the pending snapshot with `snapshot`.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError::Closed`] if the worker has stopped.
    pub fn publish(&self, snapshot: WorldSnapshot) -> Result<(), WorkerError> {
        self.input
            .send(Signal::Snapshot(snapshot))
            .ok()
            .ok_or(WorkerError::Closed)
    }

    /// The most recent report, if any tick has been processed.
    pub fn latest(&self) -> Option<ChainReport> {
        self.reports.borrow().clone()
    }

    /// Wait for a report newer than the last one seen through this handle.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError::Closed`] if the worker stops first.
    pub async fn next_report(&mut self) -> Result<ChainReport, WorkerError> {
        loop {
            self.reports
                .changed()
                .await
                .ok()
                .ok_or(WorkerError::Closed)?;
            if let Some(report) = self.reports.borrow_and_update().clone() {
                return Ok(report);
            }
        }
    }

    /// Signal shutdown, join the task, and hand the chain back.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError::Chain`] if the chain stopped the worker with
    /// an error, or [`WorkerError::Join`] if the task failed.
    pub async fn shutdown(self) -> Result<BeliefChain, WorkerError> {
        if self.input.send(Signal::Shutdown).is_err() {
            debug!("belief worker already stopped before shutdown");
        }
        let chain = self.handle.await??;
        info!("belief worker stopped");
        Ok(chain)
    }
}

async fn worker_loop(
    mut chain: BeliefChain,
    mut input: watch::Receiver<Signal>,
    reports: watch::Sender<Option<ChainReport>>,
) -> Result<BeliefChain, WorkerError> {
    while input.changed().await.is_ok() {
        let signal = input.borrow_and_update().clone();
        let snapshot = match signal {
            Signal::Idle => continue,
            Signal::Shutdown => break,
            Signal::Snapshot(snapshot) => snapshot,
        };
        let tick = snapshot.tick;
        let (returned, result) = tokio::task::spawn_blocking(move || {
            let result = chain.run(&snapshot);
            (chain, result)
        })
        .await?;
        chain = returned;
        match result {
            Ok(report) => {
                reports.send_replace(Some(report));
            }
            Err(error) => {
                warn!(tick, %error, "belief chain rejected snapshot, stopping worker");
                return Err(error.into());
            }
        }
    }
    Ok(chain)
}
