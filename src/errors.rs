// src/errors.rs

//! Crate-wide error types.
//!
//! [`TaskdagError`] is what leaves the crate. [`WorkerError`] is what a single
//! worker reports back to the executor; its variant decides whether the run
//! records a task failure or stops with a fatal error.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TaskdagError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Cycle detected in dependency graph: {0}")]
    DagCycle(String),

    /// Expected error raised by a worker (misconfiguration and the like).
    #[error("{message}")]
    User {
        message: String,
        doc_url: Option<String>,
    },

    /// The worker factory could not turn free nodes into workers.
    #[error("Dispatch error: {0:#}")]
    Dispatch(anyhow::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, TaskdagError>;

/// Kind tag of a [`WorkerError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    User,
    Internal,
}

/// Error returned by a worker instead of a [`TaskResult`](crate::dag::TaskResult).
#[derive(Error, Debug)]
pub enum WorkerError {
    /// Expected error. Stops the whole run and reaches the caller.
    #[error("{message}")]
    User {
        message: String,
        doc_url: Option<String>,
    },

    /// Anything else. Logged and counted as a task failure.
    #[error("internal error: {0:#}")]
    Internal(#[from] anyhow::Error),
}

impl WorkerError {
    pub fn user(message: impl Into<String>) -> Self {
        WorkerError::User {
            message: message.into(),
            doc_url: None,
        }
    }

    pub fn user_with_docs(message: impl Into<String>, doc_url: impl Into<String>) -> Self {
        WorkerError::User {
            message: message.into(),
            doc_url: Some(doc_url.into()),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            WorkerError::User { .. } => ErrorKind::User,
            WorkerError::Internal(_) => ErrorKind::Internal,
        }
    }
}

impl From<WorkerError> for TaskdagError {
    fn from(err: WorkerError) -> Self {
        match err {
            WorkerError::User { message, doc_url } => TaskdagError::User { message, doc_url },
            WorkerError::Internal(inner) => TaskdagError::Other(inner),
        }
    }
}
