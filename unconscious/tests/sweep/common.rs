//! Common test utilities for orchestrator tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::process::Command;
use unconscious::config::OrchestratorConfig;
use unconscious::worker::{Invocation, ProcessLauncher};
use unconscious::Orchestrator;
use unconscious_sdk::{TaskDescriptor, TaskType};

/// One recorded engine run
#[derive(Debug, Clone)]
pub struct Recorded {
    pub task: TaskDescriptor,
    pub prompt: String,
}

/// Launcher that runs a shell script per task type instead of the engine
#[derive(Clone, Default)]
pub struct ScriptLauncher {
    scripts: HashMap<TaskType, String>,
    fallback: Option<String>,
    calls: Arc<Mutex<Vec<Recorded>>>,
}

impl ScriptLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every task type succeeds with a minimal payload of its own type
    pub fn succeeding() -> Self {
        let mut launcher = Self::new();
        for task_type in TaskType::ALL {
            launcher = launcher.with(task_type, &emit(&payload_json(task_type)));
        }
        launcher
    }

    pub fn with(mut self, task_type: TaskType, script: &str) -> Self {
        self.scripts.insert(task_type, script.to_string());
        self
    }

    pub fn with_fallback(mut self, script: &str) -> Self {
        self.fallback = Some(script.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Recorded> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, task_type: TaskType) -> Vec<Recorded> {
        self.calls()
            .into_iter()
            .filter(|call| call.task.task_type == task_type)
            .collect()
    }
}

impl ProcessLauncher for ScriptLauncher {
    fn command(&self, invocation: &Invocation<'_>) -> Command {
        self.calls.lock().unwrap().push(Recorded {
            task: invocation.task.clone(),
            prompt: invocation.prompt.to_string(),
        });

        let script = self
            .scripts
            .get(&invocation.task.task_type)
            .or(self.fallback.as_ref())
            .cloned()
            .unwrap_or_else(|| "exit 99".to_string());

        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(script);
        cmd
    }

    fn program(&self) -> String {
        "sh".to_string()
    }
}

/// Minimal valid payload for a task type
pub fn payload_json(task_type: TaskType) -> String {
    match task_type {
        TaskType::MemoryRetrieval => {
            r#"{"type":"memory_retrieval","memories":[{"text":"likes tea"}],"summary":"tea"}"#
                .to_string()
        }
        TaskType::EmotionClassification => {
            r#"{"type":"emotion_classification","primary":"joy","intensity":0.7}"#.to_string()
        }
        TaskType::IntentRecognition => {
            r#"{"type":"intent_recognition","intent":"chat","confidence":0.9}"#.to_string()
        }
        TaskType::InsightGeneration => {
            r#"{"type":"insight_generation","insights":["morning person"],"patterns":["tea"]}"#
                .to_string()
        }
        TaskType::RoleDetection => {
            r#"{"type":"role_detection","roles":["friend"],"active_role":"friend"}"#.to_string()
        }
        TaskType::ExperienceSynthesis => {
            r#"{"type":"experience_synthesis","narrative":"a calm morning","themes":["routine"]}"#
                .to_string()
        }
    }
}

/// Script printing `output` verbatim
pub fn emit(output: &str) -> String {
    format!("printf '%s' '{}'", output)
}

/// Script printing `output` after `secs` seconds
pub fn emit_after(secs: f64, output: &str) -> String {
    format!("sleep {}; {}", secs, emit(output))
}

pub fn orchestrator_config(timeout_ms: u64, max_concurrent: usize) -> OrchestratorConfig {
    OrchestratorConfig {
        timeout_ms,
        max_concurrent,
        ..Default::default()
    }
}

/// Orchestrator over `launcher` with a short timeout
pub fn orchestrator(launcher: &ScriptLauncher) -> Orchestrator {
    Orchestrator::with_launcher(orchestrator_config(5_000, 8), Arc::new(launcher.clone()))
}

/// Poll `orchestrator`'s active agent count until `until` resolves, returning the highest
/// count observed
pub async fn max_active_while<F: std::future::Future>(
    orchestrator: &Orchestrator,
    until: F,
) -> (F::Output, usize) {
    let stop = Arc::new(Mutex::new(false));
    let watcher = async {
        let mut max_seen = 0;
        let deadline = Instant::now() + Duration::from_secs(20);
        while !*stop.lock().unwrap() && Instant::now() < deadline {
            max_seen = max_seen.max(orchestrator.snapshot().active_count);
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        max_seen
    };
    let work = async {
        let output = until.await;
        *stop.lock().unwrap() = true;
        output
    };

    let (output, max_seen) = tokio::join!(work, watcher);
    (output, max_seen)
}
