// src/exec/pool.rs

//! Bounded worker pool.
//!
//! Every submitted worker gets its own Tokio task, but only `size` of them
//! run at once: each task first waits for a semaphore permit. Excess
//! submissions queue inside the pool, not in the control loop.

use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tracing::debug;

use crate::dag::{NodeId, TaskResult};
use crate::errors::WorkerError;
use crate::exec::worker::Worker;

/// What a pool slot yields once its worker is done.
pub type Completion<T> = std::result::Result<std::result::Result<TaskResult<T>, WorkerError>, JoinError>;

pub struct WorkerPool<T: 'static> {
    permits: Arc<Semaphore>,
    tasks: JoinSet<std::result::Result<TaskResult<T>, WorkerError>>,
    size: usize,
}

impl<T: NodeId> WorkerPool<T> {
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            permits: Arc::new(Semaphore::new(size)),
            tasks: JoinSet::new(),
            size,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Workers submitted and not yet collected (running or queued).
    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_shut_down(&self) -> bool {
        self.permits.is_closed()
    }

    /// Queue a worker. It starts as soon as a slot is free.
    pub fn submit(&mut self, worker: Box<dyn Worker<T>>) {
        let permits = Arc::clone(&self.permits);
        self.tasks.spawn(async move {
            let _permit = permits
                .acquire_owned()
                .await
                .map_err(|_| WorkerError::Internal(anyhow!("worker pool is shut down")))?;
            worker.call().await
        });
    }

    /// Wait up to `timeout` for the next worker to finish.
    ///
    /// Returns `None` on timeout or when nothing is in flight.
    pub async fn next_completion(&mut self, timeout: Duration) -> Option<Completion<T>> {
        tokio::time::timeout(timeout, self.tasks.join_next())
            .await
            .ok()
            .flatten()
    }

    /// Stop starting queued workers and let running ones finish on their own.
    ///
    /// Idempotent.
    pub fn shutdown(&mut self) {
        if self.permits.is_closed() {
            return;
        }
        debug!(in_flight = self.tasks.len(), "shutting down worker pool");
        self.permits.close();
        self.tasks.detach_all();
    }
}

impl<T: 'static> Drop for WorkerPool<T> {
    fn drop(&mut self) {
        // JoinSet aborts whatever it still owns on drop; running workers are
        // left alone instead.
        self.permits.close();
        self.tasks.detach_all();
    }
}
