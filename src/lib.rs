// src/lib.rs

//! Dynamic dependency-graph task scheduler.
//!
//! Build a [`DependencyGraph`], supply a [`WorkerFactory`] that turns free
//! nodes into [`Worker`]s, and let a [`GraphExecutor`] run everything in
//! dependency order on a bounded pool.

pub mod cli;
pub mod config;
pub mod dag;
pub mod errors;
pub mod exec;
pub mod logging;

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;

pub use crate::dag::{DependencyGraph, NodeId, TaskResult};
pub use crate::errors::{ErrorKind, Result, TaskdagError, WorkerError};
pub use crate::exec::{ExecutorEvent, GraphExecutor, RunStatus, Worker, WorkerFactory};

/// High-level entry point used by `main.rs`.
///
/// Loads the task file, builds the graph and the shell worker factory, and
/// runs them to completion on a dedicated runtime.
pub fn run(args: CliArgs) -> Result<RunStatus> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)?;

    let graph = Arc::new(cfg.to_graph());

    if args.dry_run {
        print_dry_run(&cfg, &graph);
        return Ok(RunStatus::Success);
    }

    let mut executor_config = cfg.executor.clone();
    if let Some(jobs) = args.jobs {
        executor_config.pool_size = usize::from(jobs);
    }

    info!(
        config = %config_path.display(),
        tasks = cfg.task.len(),
        pool_size = executor_config.pool_size,
        "loaded task file"
    );

    GraphExecutor::new(graph, cfg.worker_factory())
        .with_config(executor_config)
        .run_blocking()
}

fn print_dry_run(cfg: &config::ConfigFile, graph: &DependencyGraph<String>) {
    println!("taskdag dry-run");
    println!("  executor.pool_size = {}", cfg.executor.pool_size);
    println!("  executor.poll_interval_ms = {}", cfg.executor.poll_interval_ms);
    println!();

    println!("tasks ({}):", cfg.task.len());
    for (name, task) in cfg.task.iter() {
        println!("  - {name}");
        println!("      cmd: {}", task.cmd);
        if !task.after.is_empty() {
            println!("      after: {:?}", task.after);
        }
        if task.priority != 0 {
            println!("      priority: {}", task.priority);
        }
    }
    println!();
    print!("{}", graph.dump());

    debug!("dry-run complete (no execution)");
}
