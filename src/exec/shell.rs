// src/exec/shell.rs

//! Worker factory that runs each node as a shell command.
//!
//! Used by the `taskdag` binary. Node identities are task names; each free
//! task becomes one [`ShellWorker`].

use std::collections::{HashMap, HashSet};
use std::process::Stdio;

use anyhow::{Context, anyhow};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info};

use crate::dag::TaskResult;
use crate::errors::WorkerError;
use crate::exec::worker::{Worker, WorkerFactory, WorkerFuture};

/// What to run for one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSpec {
    pub cmd: String,
    pub priority: i32,
}

#[derive(Debug, Clone, Default)]
pub struct ShellWorkerFactory {
    tasks: HashMap<String, TaskSpec>,
}

impl ShellWorkerFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, spec: TaskSpec) {
        self.tasks.insert(name.into(), spec);
    }

    pub fn get(&self, name: &str) -> Option<&TaskSpec> {
        self.tasks.get(name)
    }
}

impl FromIterator<(String, TaskSpec)> for ShellWorkerFactory {
    fn from_iter<I: IntoIterator<Item = (String, TaskSpec)>>(iter: I) -> Self {
        Self {
            tasks: iter.into_iter().collect(),
        }
    }
}

impl WorkerFactory<String> for ShellWorkerFactory {
    fn create_workers(&self, nodes: &HashSet<String>) -> anyhow::Result<Vec<Box<dyn Worker<String>>>> {
        nodes
            .iter()
            .map(|name| {
                let spec = self
                    .tasks
                    .get(name)
                    .ok_or_else(|| anyhow!("no command configured for task '{name}'"))?;
                Ok(Box::new(ShellWorker {
                    name: name.clone(),
                    spec: spec.clone(),
                }) as Box<dyn Worker<String>>)
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct ShellWorker {
    name: String,
    spec: TaskSpec,
}

impl Worker<String> for ShellWorker {
    fn priority(&self) -> i32 {
        self.spec.priority
    }

    fn call(self: Box<Self>) -> WorkerFuture<String> {
        Box::pin(async move { self.run().await.map_err(WorkerError::Internal) })
    }
}

impl ShellWorker {
    async fn run(self) -> anyhow::Result<TaskResult<String>> {
        info!(task = %self.name, cmd = %self.spec.cmd, "starting task process");

        let mut cmd = if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(&self.spec.cmd);
            c
        } else {
            let mut c = Command::new("sh");
            c.arg("-c").arg(&self.spec.cmd);
            c
        };

        cmd.stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .with_context(|| format!("spawning process for task '{}'", self.name))?;

        let stdout_reader = child.stdout.take().map(|stdout| {
            let task_name = self.name.clone();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stdout).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    info!(task = %task_name, "stdout: {}", line);
                }
            })
        });

        // Always consume stderr so buffers don't fill. The last line ends up
        // in the failure message.
        let stderr_reader = child.stderr.take().map(|stderr| {
            let task_name = self.name.clone();
            tokio::spawn(async move {
                let mut last = None;
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!(task = %task_name, "stderr: {}", line);
                    if !line.trim().is_empty() {
                        last = Some(line);
                    }
                }
                last
            })
        });

        let status = child
            .wait()
            .await
            .with_context(|| format!("waiting for process of task '{}'", self.name))?;

        // Readers hit EOF once the process is gone; join them so no output
        // is lost when the runtime shuts down right after the last task.
        if let Some(reader) = stdout_reader {
            reader
                .await
                .with_context(|| format!("reading stdout of task '{}'", self.name))?;
        }
        let last_stderr = match stderr_reader {
            Some(reader) => reader
                .await
                .with_context(|| format!("reading stderr of task '{}'", self.name))?,
            None => None,
        };

        let code = status.code().unwrap_or(-1);
        info!(
            task = %self.name,
            exit_code = code,
            success = status.success(),
            "task process exited"
        );

        if status.success() {
            Ok(TaskResult::success(self.name))
        } else {
            let mut message = format!("task '{}' exited with code {code}", self.name);
            if let Some(line) = last_stderr {
                message.push_str(": ");
                message.push_str(&line);
            }
            Ok(TaskResult::failure(self.name, message))
        }
    }
}
