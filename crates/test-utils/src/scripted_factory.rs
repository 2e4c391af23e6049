use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Barrier;
use taskdag::dag::TaskResult;
use taskdag::errors::WorkerError;
use taskdag::exec::{FutureWorker, Worker, WorkerFactory};

/// What the worker for a given node does.
#[derive(Clone)]
pub enum Behaviour {
    Succeed,
    Fail(String),
    /// Never completes.
    Hang,
    /// Succeeds after sleeping.
    Delay(Duration),
    /// Waits on the barrier, then succeeds.
    Rendezvous(Arc<Barrier>),
    UserError(String),
    InternalError(String),
    Panic,
}

/// One entry of the [`Recorder`] timeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Dispatched(String),
    Completed(String),
}

/// Shared record of what the fake factory and its workers did.
#[derive(Clone, Default)]
pub struct Recorder {
    timeline: Arc<Mutex<Vec<Step>>>,
    dispatched: Arc<Mutex<Vec<String>>>,
    completed: Arc<Mutex<Vec<String>>>,
    running: Arc<AtomicUsize>,
    max_running: Arc<AtomicUsize>,
}

impl Recorder {
    /// Nodes handed to the factory, in dispatch order.
    pub fn dispatched(&self) -> Vec<String> {
        self.dispatched.lock().unwrap().clone()
    }

    /// Nodes whose worker finished successfully, in completion order.
    pub fn completed(&self) -> Vec<String> {
        self.completed.lock().unwrap().clone()
    }

    /// Dispatches and successful completions, interleaved in the order they
    /// happened.
    pub fn timeline(&self) -> Vec<Step> {
        self.timeline.lock().unwrap().clone()
    }

    /// Highest number of workers observed running at the same time.
    pub fn max_running(&self) -> usize {
        self.max_running.load(Ordering::SeqCst)
    }

    fn started(&self) {
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_running.fetch_max(now, Ordering::SeqCst);
    }

    fn finished(&self, node: &str, success: bool) {
        self.running.fetch_sub(1, Ordering::SeqCst);
        if success {
            // Lock order: timeline before completed, same as `dispatch`.
            let mut timeline = self.timeline.lock().unwrap();
            timeline.push(Step::Completed(node.to_string()));
            self.completed.lock().unwrap().push(node.to_string());
        }
    }

    fn dispatch(&self, node: &str) {
        let mut timeline = self.timeline.lock().unwrap();
        timeline.push(Step::Dispatched(node.to_string()));
        self.dispatched.lock().unwrap().push(node.to_string());
    }
}

/// A fake factory that:
/// - records which nodes were dispatched
/// - creates one worker per node, behaving as scripted (default: succeed)
#[derive(Clone, Default)]
pub struct ScriptedFactory {
    behaviours: HashMap<String, Behaviour>,
    default_delay: Option<Duration>,
    recorder: Recorder,
}

impl ScriptedFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, node: &str, behaviour: Behaviour) -> Self {
        self.behaviours.insert(node.to_string(), behaviour);
        self
    }

    pub fn fail(self, node: &str) -> Self {
        self.with(node, Behaviour::Fail(format!("{node} failed")))
    }

    pub fn hang(self, node: &str) -> Self {
        self.with(node, Behaviour::Hang)
    }

    pub fn delay(self, node: &str, delay: Duration) -> Self {
        self.with(node, Behaviour::Delay(delay))
    }

    /// Sleep this long in every worker without a scripted behaviour.
    pub fn default_delay(mut self, delay: Duration) -> Self {
        self.default_delay = Some(delay);
        self
    }

    pub fn recorder(&self) -> Recorder {
        self.recorder.clone()
    }

    fn behaviour_for(&self, node: &str) -> Behaviour {
        match self.behaviours.get(node) {
            Some(b) => b.clone(),
            None => match self.default_delay {
                Some(d) => Behaviour::Delay(d),
                None => Behaviour::Succeed,
            },
        }
    }
}

impl WorkerFactory<String> for ScriptedFactory {
    fn create_workers(&self, nodes: &HashSet<String>) -> anyhow::Result<Vec<Box<dyn Worker<String>>>> {
        let mut workers = Vec::new();
        for node in nodes {
            self.recorder.dispatch(node);
            let behaviour = self.behaviour_for(node);
            let recorder = self.recorder.clone();
            let node = node.clone();

            let worker = FutureWorker::new(0, async move {
                recorder.started();
                let outcome = run_behaviour(&node, behaviour).await;
                let success = matches!(&outcome, Ok(r) if r.success);
                recorder.finished(&node, success);
                outcome
            });
            workers.push(worker.boxed());
        }
        Ok(workers)
    }
}

async fn run_behaviour(node: &str, behaviour: Behaviour) -> Result<TaskResult<String>, WorkerError> {
    match behaviour {
        Behaviour::Succeed => Ok(TaskResult::success(node.to_string())),
        Behaviour::Fail(msg) => Ok(TaskResult::failure(node.to_string(), msg)),
        Behaviour::Hang => {
            std::future::pending::<()>().await;
            unreachable!("pending future never resolves")
        }
        Behaviour::Delay(d) => {
            tokio::time::sleep(d).await;
            Ok(TaskResult::success(node.to_string()))
        }
        Behaviour::Rendezvous(barrier) => {
            barrier.wait().await;
            Ok(TaskResult::success(node.to_string()))
        }
        Behaviour::UserError(msg) => Err(WorkerError::user(msg)),
        Behaviour::InternalError(msg) => Err(WorkerError::Internal(anyhow::anyhow!(msg))),
        Behaviour::Panic => panic!("worker for {node} panicked"),
    }
}
