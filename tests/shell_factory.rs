// tests/shell_factory.rs
//
// These tests spawn real `sh` processes.
#![cfg(unix)]

use std::collections::HashSet;
use std::error::Error;
use std::sync::Arc;

use taskdag::errors::TaskdagError;
use taskdag::exec::{GraphExecutor, RunStatus, ShellWorkerFactory, TaskSpec, Worker, WorkerFactory};
use taskdag_test_utils::builders::{fast_config, ConfigFileBuilder, TaskConfigBuilder};
use taskdag_test_utils::{init_tracing, with_timeout};
use tempfile::tempdir;

type TestResult = Result<(), Box<dyn Error>>;

fn spec(cmd: impl Into<String>) -> TaskSpec {
    TaskSpec {
        cmd: cmd.into(),
        priority: 0,
    }
}

#[tokio::test]
async fn zero_exit_is_success_and_nonzero_is_failure() -> TestResult {
    init_tracing();

    let mut factory = ShellWorkerFactory::new();
    factory.insert("ok", spec("exit 0"));
    factory.insert("bad", spec("echo oops >&2; exit 3"));

    let nodes: HashSet<String> = ["ok", "bad"].iter().map(|s| s.to_string()).collect();
    let workers = factory.create_workers(&nodes)?;
    assert_eq!(workers.len(), 2);

    for worker in workers {
        let result = with_timeout(worker.call()).await?;
        match result.value.as_str() {
            "ok" => assert!(result.success, "{result}"),
            "bad" => {
                assert!(!result.success);
                let msg = result.error_message.unwrap_or_default();
                assert!(msg.contains("code 3"), "{msg}");
            }
            other => panic!("unexpected node {other}"),
        }
    }
    Ok(())
}

#[test]
fn unknown_task_is_a_factory_error() {
    let factory = ShellWorkerFactory::new();
    let nodes: HashSet<String> = HashSet::from(["ghost".to_string()]);

    let err = match factory.create_workers(&nodes) {
        Err(err) => err,
        Ok(_) => panic!("expected an error for an unconfigured task"),
    };
    assert!(err.to_string().contains("ghost"));
}

#[test]
fn priority_comes_from_the_task_spec() -> TestResult {
    let mut factory = ShellWorkerFactory::new();
    factory.insert(
        "p",
        TaskSpec {
            cmd: "true".to_string(),
            priority: 9,
        },
    );

    let workers = factory.create_workers(&HashSet::from(["p".to_string()]))?;
    assert_eq!(workers[0].priority(), 9);
    Ok(())
}

#[test]
fn config_driven_run_respects_order() -> TestResult {
    init_tracing();

    let dir = tempdir()?;
    let log = dir.path().join("order.log");
    let log = log.display();

    let cfg = ConfigFileBuilder::new()
        .with_task("fetch", TaskConfigBuilder::new(&format!("echo fetch >> {log}")).build())
        .with_task(
            "compile",
            TaskConfigBuilder::new(&format!("echo compile >> {log}"))
                .after("fetch")
                .build(),
        )
        .with_task(
            "package",
            TaskConfigBuilder::new(&format!("echo package >> {log}"))
                .after("compile")
                .build(),
        )
        .build();

    let graph = Arc::new(cfg.to_graph());
    let status = GraphExecutor::new(Arc::clone(&graph), cfg.worker_factory())
        .with_config(fast_config(4))
        .run_blocking()?;

    assert_eq!(status, RunStatus::Success);
    assert!(graph.is_empty());

    let lines: Vec<String> = std::fs::read_to_string(dir.path().join("order.log"))?
        .lines()
        .map(str::to_string)
        .collect();
    assert_eq!(lines, vec!["fetch", "compile", "package"]);
    Ok(())
}

#[test]
fn failing_command_skips_dependents() -> TestResult {
    init_tracing();

    let dir = tempdir()?;
    let marker = dir.path().join("ran");

    let cfg = ConfigFileBuilder::new()
        .with_task("broken", TaskConfigBuilder::new("exit 1").build())
        .with_task(
            "after_broken",
            TaskConfigBuilder::new(&format!("touch {}", marker.display()))
                .after("broken")
                .build(),
        )
        .build();

    let status = GraphExecutor::new(Arc::new(cfg.to_graph()), cfg.worker_factory())
        .with_config(fast_config(2))
        .run_blocking()?;

    assert_eq!(status.code(), 1);
    assert!(!marker.exists());
    Ok(())
}

#[test]
fn graph_node_without_command_is_fatal() {
    let cfg = ConfigFileBuilder::new()
        .with_task("a", TaskConfigBuilder::new("true").build())
        .build();

    let graph = Arc::new(cfg.to_graph());
    graph.add_node("extra".to_string());

    let result = GraphExecutor::new(graph, cfg.worker_factory())
        .with_config(fast_config(2))
        .run_blocking();

    assert!(matches!(result, Err(TaskdagError::Dispatch(_))), "{result:?}");
}

#[tokio::test]
async fn failure_message_carries_last_stderr_line() -> TestResult {
    init_tracing();

    let mut factory = ShellWorkerFactory::new();
    factory.insert(
        "link",
        spec("echo 'linking...'; echo 'warning: old' >&2; sleep 0.05; echo 'undefined symbol: main' >&2; exit 2"),
    );

    let mut workers = factory.create_workers(&HashSet::from(["link".to_string()]))?;
    let result = with_timeout(workers.remove(0).call()).await?;

    assert!(!result.success);
    assert_eq!(
        result.error_message.as_deref(),
        Some("task 'link' exited with code 2: undefined symbol: main")
    );
    Ok(())
}
