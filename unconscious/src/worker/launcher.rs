//! Engine process construction
//!
//! [`ProcessLauncher`] is the seam between the orchestrator and the outside world: it only
//! builds the command. Stdio wiring, spawning and lifecycle stay in
//! [`crate::worker::agent`], so a substitute launcher in tests still goes through the same
//! process handling as the real engine.

use std::path::{Path, PathBuf};
use tokio::process::Command;
use unconscious_sdk::TaskDescriptor;

use crate::config::EngineConfig;

/// Everything a launcher may use to build one engine run
#[derive(Debug, Clone, Copy)]
pub struct Invocation<'a> {
    pub task: &'a TaskDescriptor,
    pub prompt: &'a str,
}

pub trait ProcessLauncher: Send + Sync {
    /// Build the command for one run; stdio and kill-on-drop are set by the caller
    fn command(&self, invocation: &Invocation<'_>) -> Command;

    /// Program name for diagnostics
    fn program(&self) -> String;
}

/// Launches the configured reasoning engine in non-interactive JSON mode
#[derive(Debug, Clone)]
pub struct EngineLauncher {
    config: EngineConfig,
    program: PathBuf,
}

impl EngineLauncher {
    pub fn new(config: EngineConfig) -> Self {
        let program = resolve_program(&config.program);
        Self { config, program }
    }

    /// Arguments for one run, prompt last
    pub fn args(&self, prompt: &str) -> Vec<String> {
        let mut args = vec![
            "--print".to_string(),
            "--output-format".to_string(),
            self.config.output_format.clone(),
            "--model".to_string(),
            self.config.model.clone(),
        ];
        args.extend(self.config.extra_args.iter().cloned());
        args.push(prompt.to_string());
        args
    }

    /// Environment overrides applied on top of the inherited environment
    pub fn env(&self) -> Vec<(String, String)> {
        vec![
            (
                self.config.home_env.clone(),
                self.config.home.to_string_lossy().into_owned(),
            ),
            (self.config.hooks_guard_env.clone(), "1".to_string()),
        ]
    }

    /// Create the isolated engine home if it does not exist yet
    pub fn ensure_home(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.config.home)
    }
}

impl ProcessLauncher for EngineLauncher {
    fn command(&self, invocation: &Invocation<'_>) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(self.args(invocation.prompt));
        cmd.envs(self.env());
        cmd
    }

    fn program(&self) -> String {
        self.program.display().to_string()
    }
}

/// Resolve a bare program name on PATH; paths and unresolvable names pass through so
/// the spawn itself reports the failure
fn resolve_program(program: &str) -> PathBuf {
    let as_path = Path::new(program);
    if as_path.components().count() > 1 {
        return as_path.to_path_buf();
    }
    which::which(program).unwrap_or_else(|_| as_path.to_path_buf())
}
