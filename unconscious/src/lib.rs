// Configuration loading
pub mod config;

// Error taxonomy
pub mod error;

// Tracing subscriber setup
pub mod logging;

// Per-task prompt templates
pub mod prompts;

// Engine processes, registry and payload recovery
pub mod worker;

// Phase schedule and the orchestrator
pub mod sweep;

// CLI argument parsing
pub mod cli;

pub use config::Config;
pub use error::{OrchestratorError, TaskError};
pub use sweep::{Orchestrator, SweepPlan};
pub use unconscious_sdk::{
    SweepOptions, SweepResult, TaskDescriptor, TaskPayload, TaskResult, TaskType,
};
