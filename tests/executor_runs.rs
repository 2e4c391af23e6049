// tests/executor_runs.rs

use std::collections::HashSet;
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Barrier};

use taskdag::dag::{DependencyGraph, TaskResult};
use taskdag::exec::{ExecutorEvent, FutureWorker, GraphExecutor, RunStatus, Worker};
use taskdag_test_utils::builders::{fast_config, sample_graph, GraphBuilder};
use taskdag_test_utils::scripted_factory::{Behaviour, ScriptedFactory, Step};
use taskdag_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

/// Every edge `(from, to)` must see `to` complete before `from` is dispatched.
fn assert_topological(timeline: &[Step], edges: &[(String, String)]) {
    let position = |step: &Step| timeline.iter().position(|s| s == step);

    for (from, to) in edges {
        let dispatched = position(&Step::Dispatched(from.clone()))
            .unwrap_or_else(|| panic!("{from} was never dispatched"));
        let completed = position(&Step::Completed(to.clone()))
            .unwrap_or_else(|| panic!("{to} never completed"));
        assert!(
            completed < dispatched,
            "{from} was dispatched before its dependency {to} completed: {timeline:?}"
        );
    }
}

#[tokio::test]
async fn independent_nodes_all_succeed() -> TestResult {
    init_tracing();

    let names: Vec<String> = (0..12).map(|i| format!("n{i}")).collect();
    let graph = Arc::new(DependencyGraph::new());
    for n in &names {
        graph.add_node(n.clone());
    }

    let factory = ScriptedFactory::new();
    let recorder = factory.recorder();

    let status = with_timeout(
        GraphExecutor::new(Arc::clone(&graph), factory)
            .with_config(fast_config(5))
            .run(),
    )
    .await?;

    assert_eq!(status, RunStatus::Success);
    assert_eq!(status.code(), 0);
    assert!(graph.is_empty());

    let completed: HashSet<String> = recorder.completed().into_iter().collect();
    assert_eq!(completed, names.into_iter().collect());
    Ok(())
}

#[tokio::test]
async fn dependencies_run_before_dependents() -> TestResult {
    init_tracing();

    let builder = sample_graph();
    let graph = builder.build_shared();
    let factory = ScriptedFactory::new().default_delay(Duration::from_millis(5));
    let recorder = factory.recorder();

    let status = with_timeout(
        GraphExecutor::new(Arc::clone(&graph), factory)
            .with_config(fast_config(5))
            .run(),
    )
    .await?;

    assert_eq!(status, RunStatus::Success);
    assert!(graph.is_empty());
    assert_topological(&recorder.timeline(), builder.edges());
    assert_eq!(recorder.dispatched().len(), 5, "each node dispatched once");
    Ok(())
}

#[tokio::test]
async fn sibling_free_nodes_run_concurrently() -> TestResult {
    init_tracing();

    // Both workers block on the barrier until the other one has started, so the
    // run can only finish if they are in flight at the same time.
    let barrier = Arc::new(Barrier::new(2));
    let builder = GraphBuilder::new().edge("top", "left").edge("top", "right");
    let graph = builder.build_shared();
    let factory = ScriptedFactory::new()
        .with("left", Behaviour::Rendezvous(Arc::clone(&barrier)))
        .with("right", Behaviour::Rendezvous(Arc::clone(&barrier)));
    let recorder = factory.recorder();

    let status = with_timeout(
        GraphExecutor::new(Arc::clone(&graph), factory)
            .with_config(fast_config(2))
            .run(),
    )
    .await?;

    assert_eq!(status, RunStatus::Success);
    assert!(graph.is_empty());
    assert!(recorder.max_running() >= 2);
    assert_topological(&recorder.timeline(), builder.edges());
    Ok(())
}

#[tokio::test]
async fn pool_size_bounds_concurrency() -> TestResult {
    init_tracing();

    let mut builder = GraphBuilder::new();
    for i in 0..10 {
        builder = builder.node(&format!("n{i}"));
    }
    let graph = builder.build_shared();
    let factory = ScriptedFactory::new().default_delay(Duration::from_millis(20));
    let recorder = factory.recorder();

    let status = with_timeout(
        GraphExecutor::new(Arc::clone(&graph), factory)
            .with_config(fast_config(3))
            .run(),
    )
    .await?;

    assert_eq!(status, RunStatus::Success);
    assert!(recorder.max_running() <= 3, "max_running = {}", recorder.max_running());
    assert_eq!(recorder.completed().len(), 10);
    Ok(())
}

#[tokio::test]
async fn empty_graph_succeeds_without_dispatch() -> TestResult {
    let graph: Arc<DependencyGraph<String>> = Arc::new(DependencyGraph::new());
    let factory = ScriptedFactory::new();
    let recorder = factory.recorder();

    let status = GraphExecutor::new(graph, factory).run().await?;

    assert_eq!(status, RunStatus::Success);
    assert!(recorder.dispatched().is_empty());
    Ok(())
}

#[tokio::test]
async fn nodes_added_during_run_are_picked_up() -> TestResult {
    init_tracing();

    let graph: Arc<DependencyGraph<String>> = Arc::new(DependencyGraph::new());
    graph.add_node("root".to_string());

    // The worker for "root" discovers a follow-up task and wires it in.
    let shared = Arc::clone(&graph);
    let factory = move |nodes: &HashSet<String>| -> anyhow::Result<Vec<Box<dyn Worker<String>>>> {
        Ok(nodes
            .iter()
            .map(|node| {
                let graph = Arc::clone(&shared);
                let node = node.clone();
                FutureWorker::new(0, async move {
                    if node == "root" {
                        graph.add_edge("late".to_string(), "root".to_string());
                    }
                    Ok(TaskResult::success(node))
                })
                .boxed()
            })
            .collect())
    };

    let (tx, mut rx) = mpsc::unbounded_channel();
    let status = with_timeout(
        GraphExecutor::new(Arc::clone(&graph), factory)
            .with_config(fast_config(2))
            .with_events(tx)
            .run(),
    )
    .await?;

    assert_eq!(status, RunStatus::Success);
    assert!(graph.is_empty());

    let mut completed = Vec::new();
    let mut finished = None;
    while let Ok(event) = rx.try_recv() {
        match event {
            ExecutorEvent::Completed(result) => completed.push(result.value),
            ExecutorEvent::Finished(status) => finished = Some(status),
            _ => {}
        }
    }
    assert_eq!(completed, vec!["root".to_string(), "late".to_string()]);
    assert_eq!(finished, Some(RunStatus::Success));
    Ok(())
}

#[tokio::test]
async fn dispatched_events_report_worker_counts() -> TestResult {
    let graph = sample_graph().build_shared();
    let (tx, mut rx) = mpsc::unbounded_channel();

    GraphExecutor::new(graph, ScriptedFactory::new())
        .with_config(fast_config(5))
        .with_events(tx)
        .run()
        .await?;

    let mut dispatched_nodes = HashSet::new();
    while let Ok(event) = rx.try_recv() {
        if let ExecutorEvent::Dispatched { nodes, workers } = event {
            assert_eq!(nodes.len(), workers);
            dispatched_nodes.extend(nodes);
        }
    }
    assert_eq!(dispatched_nodes.len(), 5);
    Ok(())
}

#[test]
fn run_blocking_drives_graph_on_its_own_runtime() -> TestResult {
    init_tracing();

    let graph = sample_graph().build_shared();
    let factory = ScriptedFactory::new();
    let recorder = factory.recorder();

    let status = GraphExecutor::new(Arc::clone(&graph), factory)
        .with_config(fast_config(2).with_thread_name("graph-test-worker"))
        .run_blocking()?;

    assert_eq!(i32::from(status), 0);
    assert!(graph.is_empty());
    assert_eq!(recorder.completed().len(), 5);
    Ok(())
}
