// src/exec/executor.rs

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::config::ExecutorConfig;
use crate::dag::{DependencyGraph, NodeId, TaskResult};
use crate::errors::{ErrorKind, Result, TaskdagError};
use crate::exec::events::{ExecutorEvent, RunStatus};
use crate::exec::pool::{Completion, WorkerPool};
use crate::exec::worker::WorkerFactory;

/// Drives a [`DependencyGraph`] to exhaustion.
///
/// Each iteration hands newly free nodes to the factory, submits the workers
/// to a bounded [`WorkerPool`] and waits for one completion:
///
/// - success removes the node from the graph, which may free its dependents
/// - a task failure stops all further dispatch; work already submitted drains
/// - a [`WorkerError::User`](crate::errors::WorkerError::User) or a factory error ends the run with an error
///
/// The pool is shut down on every exit path.
pub struct GraphExecutor<T: NodeId, F> {
    graph: Arc<DependencyGraph<T>>,
    factory: F,
    config: ExecutorConfig,
    events: Option<mpsc::UnboundedSender<ExecutorEvent<T>>>,
}

impl<T: NodeId, F> fmt::Debug for GraphExecutor<T, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphExecutor")
            .field("graph", &self.graph)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Per-run bookkeeping of the control loop.
struct RunState<T> {
    got_error: bool,
    /// Nodes already handed to the factory (or reported done) in this run.
    nodes_run: HashSet<T>,
}

impl<T: NodeId, F: WorkerFactory<T>> GraphExecutor<T, F> {
    pub fn new(graph: Arc<DependencyGraph<T>>, factory: F) -> Self {
        Self {
            graph,
            factory,
            config: ExecutorConfig::default(),
            events: None,
        }
    }

    pub fn with_config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    /// Report progress on `tx`. Send errors (receiver dropped) are ignored.
    pub fn with_events(mut self, tx: mpsc::UnboundedSender<ExecutorEvent<T>>) -> Self {
        self.events = Some(tx);
        self
    }

    pub fn graph(&self) -> &Arc<DependencyGraph<T>> {
        &self.graph
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Run the graph on a dedicated multi-thread runtime and block until done.
    ///
    /// The runtime has `pool_size` worker threads named after
    /// `config.thread_name`. Panics if called from within a Tokio runtime.
    pub fn run_blocking(&self) -> Result<RunStatus> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(self.config.pool_size.max(1))
            .thread_name(self.config.thread_name.clone())
            .enable_all()
            .build()?;
        runtime.block_on(self.run())
    }

    /// Run the graph until every reachable node has been processed.
    pub async fn run(&self) -> Result<RunStatus> {
        let mut pool = WorkerPool::new(self.config.pool_size);
        let outcome = self.drive(&mut pool).await;
        pool.shutdown();

        if let Ok(status) = outcome {
            self.emit(ExecutorEvent::Finished(status));
        }
        outcome
    }

    async fn drive(&self, pool: &mut WorkerPool<T>) -> Result<RunStatus> {
        self.graph.check_acyclic()?;

        info!(
            nodes = self.graph.len(),
            pool_size = pool.size(),
            "starting graph run"
        );

        let mut state = RunState {
            got_error: false,
            nodes_run: HashSet::new(),
        };

        loop {
            if !state.got_error {
                self.dispatch_free_nodes(pool, &mut state)?;
            }

            if pool.in_flight() == 0 {
                break;
            }

            match pool.next_completion(self.config.poll_interval()).await {
                Some(completion) => self.handle_completion(completion, &mut state)?,
                None => {
                    debug!(
                        in_flight = pool.in_flight(),
                        waited_ms = self.config.poll_interval_ms,
                        "timed out waiting for a task to complete; polling again"
                    );
                    self.emit(ExecutorEvent::Stalled {
                        waited: self.config.poll_interval(),
                        in_flight: pool.in_flight(),
                    });
                }
            }
        }

        Ok(self.final_status(&state))
    }

    /// Hand nodes that became free since the last call to the factory.
    fn dispatch_free_nodes(&self, pool: &mut WorkerPool<T>, state: &mut RunState<T>) -> Result<()> {
        let new_free: HashSet<T> = self
            .graph
            .free_nodes()
            .into_iter()
            .filter(|node| !state.nodes_run.contains(node))
            .collect();

        if new_free.is_empty() {
            return Ok(());
        }

        state.nodes_run.extend(new_free.iter().cloned());

        let workers = self
            .factory
            .create_workers(&new_free)
            .map_err(TaskdagError::Dispatch)?;

        let priorities: Vec<i32> = workers.iter().map(|w| w.priority()).collect();
        info!(
            nodes = ?new_free,
            workers = workers.len(),
            ?priorities,
            "dispatching free nodes"
        );

        self.emit(ExecutorEvent::Dispatched {
            nodes: new_free.into_iter().collect(),
            workers: workers.len(),
        });

        for worker in workers {
            pool.submit(worker);
        }

        Ok(())
    }

    fn handle_completion(&self, completion: Completion<T>, state: &mut RunState<T>) -> Result<()> {
        match completion {
            Ok(Ok(result)) => self.handle_result(result, state),
            Ok(Err(err)) => match err.kind() {
                ErrorKind::User => {
                    error!(error = %err, "worker raised a user error; aborting run");
                    return Err(err.into());
                }
                ErrorKind::Internal => {
                    error!(error = ?err, "unexpected error while running task");
                    state.got_error = true;
                }
            },
            Err(join_err) => {
                error!(error = %join_err, "worker task panicked or was cancelled");
                state.got_error = true;
            }
        }
        Ok(())
    }

    fn handle_result(&self, result: TaskResult<T>, state: &mut RunState<T>) {
        if result.success {
            info!(node = ?result.value, "task succeeded");
            state.nodes_run.insert(result.value.clone());
            self.graph.remove_node(&result.value);
        } else {
            error!(
                node = ?result.value,
                error = result.error_message.as_deref().unwrap_or("(no message)"),
                "task failed; no new work will be dispatched"
            );
            state.got_error = true;
        }
        self.emit(ExecutorEvent::Completed(result));
    }

    fn final_status(&self, state: &RunState<T>) -> RunStatus {
        if state.got_error {
            return RunStatus::Failed;
        }

        // Dispatched-but-unreported nodes stay in the graph as well, so
        // anything left over means the graph was not exhausted.
        let remaining: Vec<T> = self.graph.values();

        if remaining.is_empty() {
            info!("graph run finished successfully");
            return RunStatus::Success;
        }

        let (unreported, never_dispatched): (Vec<T>, Vec<T>) = remaining
            .into_iter()
            .partition(|node| state.nodes_run.contains(node));
        warn!(
            ?unreported,
            ?never_dispatched,
            "run ended with nodes still in the graph"
        );
        RunStatus::Failed
    }

    fn emit(&self, event: ExecutorEvent<T>) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }
}
