// src/exec/mod.rs

//! Execution layer.
//!
//! - [`worker`] defines the `Worker` / `WorkerFactory` seams callers implement.
//! - [`pool`] is the bounded pool workers run on.
//! - [`executor`] owns the control loop that drives a graph to completion.
//! - [`events`] holds the run status and the progress events the loop emits.
//! - [`shell`] is a concrete factory that runs tasks as shell commands.

pub mod events;
pub mod executor;
pub mod pool;
pub mod shell;
pub mod worker;

pub use events::{ExecutorEvent, RunStatus};
pub use executor::GraphExecutor;
pub use pool::WorkerPool;
pub use shell::{ShellWorker, ShellWorkerFactory, TaskSpec};
pub use worker::{FutureWorker, Worker, WorkerFactory, WorkerFuture};
