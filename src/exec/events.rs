// src/exec/events.rs

use std::time::Duration;

use crate::dag::TaskResult;

/// Final status of a graph run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Every node was processed successfully.
    Success,
    /// At least one task reported failure.
    Failed,
}

impl RunStatus {
    /// Process exit code: `0` on success, `1` on failure.
    pub fn code(self) -> i32 {
        match self {
            RunStatus::Success => 0,
            RunStatus::Failed => 1,
        }
    }

    pub fn is_success(self) -> bool {
        matches!(self, RunStatus::Success)
    }
}

impl From<RunStatus> for i32 {
    fn from(status: RunStatus) -> Self {
        status.code()
    }
}

/// Progress reported by the executor while a run is in flight.
#[derive(Debug, Clone)]
pub enum ExecutorEvent<T> {
    /// Newly free nodes were handed to the factory.
    Dispatched {
        nodes: Vec<T>,
        /// Number of workers the factory produced for them.
        workers: usize,
    },
    /// A worker finished with a result.
    Completed(TaskResult<T>),
    /// No worker finished within the poll interval.
    Stalled { waited: Duration, in_flight: usize },
    /// The control loop exited with this status.
    Finished(RunStatus),
}
