#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;

use taskdag::config::{ConfigFile, ExecutorConfig, RawConfigFile, TaskConfig};
use taskdag::dag::DependencyGraph;

/// Builder for `DependencyGraph<String>`.
///
/// `edge("a", "b")` means "a depends on b".
#[derive(Debug, Clone, Default)]
pub struct GraphBuilder {
    nodes: Vec<String>,
    edges: Vec<(String, String)>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(mut self, name: &str) -> Self {
        self.nodes.push(name.to_string());
        self
    }

    pub fn nodes(mut self, names: &[&str]) -> Self {
        self.nodes.extend(names.iter().map(|n| n.to_string()));
        self
    }

    pub fn edge(mut self, from: &str, to: &str) -> Self {
        self.edges.push((from.to_string(), to.to_string()));
        self
    }

    /// Edges as added, for assertions made after the graph has been consumed.
    pub fn edges(&self) -> &[(String, String)] {
        &self.edges
    }

    pub fn build(&self) -> DependencyGraph<String> {
        let graph = DependencyGraph::new();
        for n in &self.nodes {
            graph.add_node(n.clone());
        }
        for (from, to) in &self.edges {
            graph.add_edge(from.clone(), to.clone());
        }
        graph
    }

    pub fn build_shared(&self) -> Arc<DependencyGraph<String>> {
        Arc::new(self.build())
    }
}

/// `a -> b`, `b -> c`, `b -> d`, plus a lone `e`.
pub fn sample_graph() -> GraphBuilder {
    GraphBuilder::new()
        .edge("a", "b")
        .edge("b", "c")
        .edge("b", "d")
        .node("e")
}

/// Executor config with a short poll interval so tests stay fast.
pub fn fast_config(pool_size: usize) -> ExecutorConfig {
    ExecutorConfig::default()
        .with_pool_size(pool_size)
        .with_poll_interval(std::time::Duration::from_millis(20))
}

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                executor: ExecutorConfig::default(),
                task: BTreeMap::new(),
            },
        }
    }

    pub fn with_task(mut self, name: &str, task: TaskConfig) -> Self {
        self.config.task.insert(name.to_string(), task);
        self
    }

    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.config.executor.pool_size = pool_size;
        self
    }

    pub fn build_raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TaskConfig`.
pub struct TaskConfigBuilder {
    task: TaskConfig,
}

impl TaskConfigBuilder {
    pub fn new(cmd: &str) -> Self {
        Self {
            task: TaskConfig {
                cmd: cmd.to_string(),
                after: vec![],
                priority: 0,
            },
        }
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.task.after.push(dep.to_string());
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.task.priority = priority;
        self
    }

    pub fn build(self) -> TaskConfig {
        self.task
    }
}
