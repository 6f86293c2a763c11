//! Configuration loading
//!
//! Settings come from a YAML file (explicit path, `./unconscious.yaml`, or the platform
//! config directory) with `UNCONSCIOUS_*` environment variables layered on top.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use unconscious_sdk::TaskType;

pub const CONFIG_FILE_NAME: &str = "unconscious.yaml";

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub engine: EngineConfig,
    pub orchestrator: OrchestratorConfig,
    pub logging: LoggingConfig,
}

/// How the reasoning engine is invoked
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Program name (looked up on PATH) or path
    pub program: String,
    pub model: String,
    pub output_format: String,
    /// Appended after the model flag, before the prompt
    pub extra_args: Vec<String>,
    /// Isolated config/state directory handed to the engine
    pub home: PathBuf,
    /// Variable the engine reads its config directory from
    pub home_env: String,
    /// Variable that switches off interactive hooks inside the engine
    pub hooks_guard_env: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            program: "claude".to_string(),
            model: "claude-haiku-4-5".to_string(),
            output_format: "json".to_string(),
            extra_args: Vec::new(),
            home: default_engine_home(),
            home_env: "CLAUDE_CONFIG_DIR".to_string(),
            hooks_guard_env: "UNCONSCIOUS_HOOKS_DISABLED".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Default per-task timeout
    pub timeout_ms: u64,
    /// Maximum engine processes alive at once
    pub max_concurrent: usize,
    /// Per-type timeout overrides
    pub timeouts: HashMap<TaskType, u64>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            max_concurrent: 5,
            timeouts: HashMap::new(),
        }
    }
}

impl OrchestratorConfig {
    pub fn timeout_for(&self, task_type: TaskType) -> Duration {
        let ms = self
            .timeouts
            .get(&task_type)
            .copied()
            .unwrap_or(self.timeout_ms);
        Duration::from_millis(ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive, overridden by RUST_LOG
    pub level: String,
    /// pretty, compact or json
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "compact".to_string(),
        }
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "unconscious", "unconscious")
}

/// Default isolated engine home inside the platform data directory
pub fn default_engine_home() -> PathBuf {
    if let Some(proj_dirs) = project_dirs() {
        proj_dirs.data_dir().join("engine-home")
    } else {
        PathBuf::from(".unconscious").join("engine-home")
    }
}

impl Config {
    /// Load configuration and apply environment overrides
    ///
    /// An explicit `path` must exist. Without one, the first of `./unconscious.yaml`
    /// and the platform config file that exists is used, otherwise defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::discover() {
                Some(found) => Self::from_file(&found)?,
                None => Self::default(),
            },
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_yaml_str(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(yaml).context("Failed to parse YAML config")
    }

    fn discover() -> Option<PathBuf> {
        let local = PathBuf::from(CONFIG_FILE_NAME);
        if local.is_file() {
            return Some(local);
        }

        project_dirs()
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
            .filter(|path| path.is_file())
    }

    /// Apply `UNCONSCIOUS_*` overrides read through `lookup`
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(program) = lookup("UNCONSCIOUS_ENGINE") {
            self.engine.program = program;
        }
        if let Some(model) = lookup("UNCONSCIOUS_MODEL") {
            self.engine.model = model;
        }
        if let Some(home) = lookup("UNCONSCIOUS_ENGINE_HOME") {
            self.engine.home = PathBuf::from(home);
        }
        if let Some(timeout) = lookup("UNCONSCIOUS_TIMEOUT_MS") {
            self.orchestrator.timeout_ms = timeout
                .trim()
                .parse()
                .with_context(|| format!("UNCONSCIOUS_TIMEOUT_MS is not a number: {}", timeout))?;
        }
        if let Some(max) = lookup("UNCONSCIOUS_MAX_CONCURRENT") {
            self.orchestrator.max_concurrent = max
                .trim()
                .parse()
                .with_context(|| format!("UNCONSCIOUS_MAX_CONCURRENT is not a number: {}", max))?;
        }
        if let Some(level) = lookup("UNCONSCIOUS_LOG_LEVEL") {
            self.logging.level = level;
        }
        Ok(())
    }
}
