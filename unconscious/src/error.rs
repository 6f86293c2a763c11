//! Error types
//!
//! [`TaskError`] covers everything that can go wrong with a single engine process and is
//! always folded into a failed `TaskResult`. [`OrchestratorError`] is reserved for defects
//! in the schedule itself and is the only error a sweep can return.

use thiserror::Error;
use unconscious_sdk::{FailureKind, TaskType};

#[derive(Debug, Error)]
pub enum TaskError {
    /// Executable missing or unusable, including pipe and wait failures
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("timeout")]
    Timeout,

    #[error("{code}: {stderr}")]
    NonZeroExit { code: String, stderr: String },

    /// `detail` is logged but kept out of the user-facing message
    #[error("no parsable JSON")]
    Parse { detail: String },
}

impl TaskError {
    pub fn kind(&self) -> FailureKind {
        match self {
            TaskError::Spawn { .. } => FailureKind::Spawn,
            TaskError::Timeout => FailureKind::Timeout,
            TaskError::NonZeroExit { .. } => FailureKind::NonZeroExit,
            TaskError::Parse { .. } => FailureKind::Parse,
        }
    }

    pub(crate) fn parse(detail: impl Into<String>) -> Self {
        TaskError::Parse {
            detail: detail.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("task id '{0}' appears more than once in one batch")]
    DuplicateTaskId(String),

    #[error("task type {0} is planned more than once")]
    DuplicatePlannedTask(TaskType),

    #[error("{task} in phase {phase} depends on {dependency}, which is not scheduled in an earlier phase")]
    UnresolvableDependency {
        task: TaskType,
        dependency: TaskType,
        phase: usize,
    },
}
