//! CLI argument definitions for the `unconscious` binary.

use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;
use unconscious_sdk::{SweepOptions, TaskType};

/// Background cognition for a conversational companion
///
/// Runs memory retrieval, emotion classification, intent recognition and the optional
/// insight, role and experience subtasks as isolated engine processes.
#[derive(Parser, Debug, Clone)]
#[command(name = "unconscious")]
#[command(about = "Parallel cognitive subtasks over a reasoning engine")]
#[command(version)]
pub struct Args {
    /// Path to a YAML config file
    ///
    /// Defaults to ./unconscious.yaml, then the platform config directory.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the full two-phase sweep for one message
    Sweep {
        #[arg(long, value_name = "ID")]
        user: String,

        #[arg(long, value_name = "ID")]
        session: String,

        #[arg(long)]
        message: String,

        /// Also run insight generation
        #[arg(long)]
        insights: bool,

        /// Skip role detection
        #[arg(long)]
        no_roles: bool,

        /// Skip experience synthesis
        #[arg(long)]
        no_experience: bool,
    },

    /// Run a single subtask outside a sweep
    Task {
        #[arg(value_name = "TYPE", value_parser = parse_task_type)]
        task_type: TaskType,

        #[arg(long, value_name = "ID")]
        user: String,

        #[arg(long)]
        message: String,
    },

    /// Print the rendered prompt for a subtask without running it
    Prompt {
        #[arg(value_name = "TYPE", value_parser = parse_task_type)]
        task_type: TaskType,

        #[arg(long, value_name = "ID")]
        user: String,

        #[arg(long, value_name = "ID", default_value = crate::sweep::ADHOC_SESSION)]
        session: String,

        #[arg(long)]
        message: String,

        /// Context object as JSON
        #[arg(long, value_name = "JSON", value_parser = parse_json)]
        context: Option<Value>,
    },

    /// Show the engine invocation and registry state
    Status,
}

impl Command {
    /// Sweep options selected by the `sweep` flags; defaults for other commands
    pub fn sweep_options(&self) -> SweepOptions {
        match self {
            Command::Sweep {
                insights,
                no_roles,
                no_experience,
                ..
            } => SweepOptions {
                include_insights: *insights,
                include_roles: !*no_roles,
                include_experience: !*no_experience,
            },
            _ => SweepOptions::default(),
        }
    }
}

fn parse_task_type(raw: &str) -> Result<TaskType, String> {
    raw.parse::<TaskType>()
}

fn parse_json(raw: &str) -> Result<Value, String> {
    serde_json::from_str(raw).map_err(|e| format!("invalid JSON: {}", e))
}
