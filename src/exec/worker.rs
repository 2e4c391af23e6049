// src/exec/worker.rs

//! The two seams a caller plugs into the executor.
//!
//! - [`Worker`] is one unit of dispatchable work.
//! - [`WorkerFactory`] turns a batch of free nodes into workers.

use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::pin::Pin;

use crate::dag::TaskResult;
use crate::errors::WorkerError;

/// Future produced by running a worker.
pub type WorkerFuture<T> =
    Pin<Box<dyn Future<Output = std::result::Result<TaskResult<T>, WorkerError>> + Send + 'static>>;

/// One-shot unit of work.
///
/// Running a worker yields exactly one [`TaskResult`], whose `value` names the
/// node to remove from the graph on success.
pub trait Worker<T>: Send {
    /// Informational priority. The executor logs it; it does not reorder work.
    fn priority(&self) -> i32 {
        0
    }

    fn call(self: Box<Self>) -> WorkerFuture<T>;
}

/// Produces workers for nodes that just became free.
///
/// The number of workers does not have to match the number of nodes: a factory
/// may batch several nodes into one worker, split a node into several, or
/// return nothing. An `Err` is an unrecoverable dispatch error and stops the
/// run.
pub trait WorkerFactory<T>: Send + Sync {
    fn create_workers(&self, nodes: &HashSet<T>) -> anyhow::Result<Vec<Box<dyn Worker<T>>>>;
}

impl<T, F> WorkerFactory<T> for F
where
    F: Fn(&HashSet<T>) -> anyhow::Result<Vec<Box<dyn Worker<T>>>> + Send + Sync,
{
    fn create_workers(&self, nodes: &HashSet<T>) -> anyhow::Result<Vec<Box<dyn Worker<T>>>> {
        self(nodes)
    }
}

/// Worker backed by an arbitrary future.
pub struct FutureWorker<T> {
    priority: i32,
    future: WorkerFuture<T>,
}

impl<T> FutureWorker<T> {
    pub fn new<Fut>(priority: i32, future: Fut) -> Self
    where
        Fut: Future<Output = std::result::Result<TaskResult<T>, WorkerError>> + Send + 'static,
    {
        Self {
            priority,
            future: Box::pin(future),
        }
    }

    /// Box the worker for returning from a factory.
    pub fn boxed(self) -> Box<dyn Worker<T>>
    where
        T: 'static,
    {
        Box::new(self)
    }
}

impl<T> fmt::Debug for FutureWorker<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FutureWorker")
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}

impl<T> Worker<T> for FutureWorker<T> {
    fn priority(&self) -> i32 {
        self.priority
    }

    fn call(self: Box<Self>) -> WorkerFuture<T> {
        self.future
    }
}
