// src/dag/result.rs

use std::fmt;

/// Outcome of one worker.
///
/// `value` names the graph node this result belongs to; on success the
/// executor removes that node from the graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskResult<T> {
    pub success: bool,
    /// Only meaningful when `success` is false.
    pub error_message: Option<String>,
    pub value: T,
}

impl<T> TaskResult<T> {
    pub fn success(value: T) -> Self {
        Self {
            success: true,
            error_message: None,
            value,
        }
    }

    pub fn failure(value: T, message: impl Into<String>) -> Self {
        Self {
            success: false,
            error_message: Some(message.into()),
            value,
        }
    }
}

impl<T: fmt::Debug> fmt::Display for TaskResult<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TaskResult{{value={:?}, success={}", self.value, self.success)?;
        if let Some(msg) = &self.error_message {
            write!(f, ", error={msg}")?;
        }
        write!(f, "}}")
    }
}
