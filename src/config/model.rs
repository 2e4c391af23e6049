// src/config/model.rs

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

use crate::dag::DependencyGraph;
use crate::exec::shell::{ShellWorkerFactory, TaskSpec};

/// Task file as deserialized from TOML, before validation.
///
/// ```toml
/// [executor]
/// pool_size = 5
/// poll_interval_ms = 2000
///
/// [task.compile]
/// cmd = "echo compile"
/// after = ["fetch"]
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub executor: ExecutorConfig,

    /// Keys are the task (node) names.
    #[serde(default)]
    pub task: BTreeMap<String, TaskConfig>,
}

/// Validated task file. Build one with `ConfigFile::try_from(raw)`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub executor: ExecutorConfig,
    pub task: BTreeMap<String, TaskConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(executor: ExecutorConfig, task: BTreeMap<String, TaskConfig>) -> Self {
        Self { executor, task }
    }

    /// Dependency graph with one node per task and one edge per `after` entry.
    pub fn to_graph(&self) -> DependencyGraph<String> {
        let graph = DependencyGraph::new();
        for (name, task) in &self.task {
            graph.add_node(name.clone());
            for dep in &task.after {
                graph.add_edge(name.clone(), dep.clone());
            }
        }
        graph
    }

    /// Factory that runs each task's `cmd` through the shell.
    pub fn worker_factory(&self) -> ShellWorkerFactory {
        self.task
            .iter()
            .map(|(name, task)| {
                (
                    name.clone(),
                    TaskSpec {
                        cmd: task.cmd.clone(),
                        priority: task.priority,
                    },
                )
            })
            .collect()
    }
}

/// `[executor]` section; also the executor's runtime configuration.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ExecutorConfig {
    /// Maximum number of workers running at the same time.
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,

    /// How long the control loop waits for a completion before polling again.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Thread name used by [`GraphExecutor::run_blocking`](crate::exec::GraphExecutor::run_blocking).
    #[serde(default = "default_thread_name")]
    pub thread_name: String,
}

fn default_pool_size() -> usize {
    5
}

fn default_poll_interval_ms() -> u64 {
    2000
}

fn default_thread_name() -> String {
    "dynamic-graph-executor".to_string()
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            pool_size: default_pool_size(),
            poll_interval_ms: default_poll_interval_ms(),
            thread_name: default_thread_name(),
        }
    }
}

impl ExecutorConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }
}

/// `[task.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskConfig {
    /// Shell command to execute.
    pub cmd: String,

    /// Tasks that must succeed before this one runs.
    #[serde(default)]
    pub after: Vec<String>,

    /// Passed through to the worker; informational only.
    #[serde(default)]
    pub priority: i32,
}
