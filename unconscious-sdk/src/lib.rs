//! Shared types for the unconscious orchestrator
//!
//! Everything a caller needs to describe a cognitive subtask, read its typed
//! payload back, and follow a sweep through its structured lifecycle events.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

/// Tracing target that carries [`SweepLog`] events
pub const EVENT_TARGET: &str = "unconscious::events";

/// Placeholder rendered into prompts when a task has no context
pub const NO_CONTEXT: &str = "none";

/// Key in a payload's extra fields holding the raw values of known fields that had the
/// wrong shape
pub const COERCED_KEY: &str = "coerced";

// ============================================================================
// Task model
// ============================================================================

/// Closed set of cognitive subtasks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    MemoryRetrieval,
    EmotionClassification,
    IntentRecognition,
    InsightGeneration,
    RoleDetection,
    ExperienceSynthesis,
}

impl TaskType {
    pub const ALL: [TaskType; 6] = [
        TaskType::MemoryRetrieval,
        TaskType::EmotionClassification,
        TaskType::IntentRecognition,
        TaskType::InsightGeneration,
        TaskType::RoleDetection,
        TaskType::ExperienceSynthesis,
    ];

    /// Wire name, identical to the payload discriminator
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::MemoryRetrieval => "memory_retrieval",
            TaskType::EmotionClassification => "emotion_classification",
            TaskType::IntentRecognition => "intent_recognition",
            TaskType::InsightGeneration => "insight_generation",
            TaskType::RoleDetection => "role_detection",
            TaskType::ExperienceSynthesis => "experience_synthesis",
        }
    }

    /// Key under which this task's payload appears in a dependent task's context
    /// and in [`SweepResult`]
    pub fn context_key(&self) -> &'static str {
        match self {
            TaskType::MemoryRetrieval => "memory",
            TaskType::EmotionClassification => "emotion",
            TaskType::IntentRecognition => "intent",
            TaskType::InsightGeneration => "insights",
            TaskType::RoleDetection => "roles",
            TaskType::ExperienceSynthesis => "experience",
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().replace('-', "_").to_lowercase();
        TaskType::ALL
            .into_iter()
            .find(|t| t.as_str() == wanted || t.context_key() == wanted)
            .ok_or_else(|| {
                let known: Vec<&str> = TaskType::ALL.iter().map(|t| t.as_str()).collect();
                format!("unknown task type '{}' (expected one of: {})", s, known.join(", "))
            })
    }
}

/// One subtask to run against the engine
///
/// Built fresh per task and never mutated once handed to the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDescriptor {
    /// Globally unique, prefixed with the task type
    pub id: String,
    #[serde(rename = "type")]
    pub task_type: TaskType,
    pub user_id: String,
    pub session_id: String,
    pub input: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
}

impl TaskDescriptor {
    pub fn new(
        task_type: TaskType,
        user_id: impl Into<String>,
        session_id: impl Into<String>,
        input: impl Into<String>,
    ) -> Self {
        Self {
            id: format!("{}-{}", task_type.as_str(), Uuid::new_v4()),
            task_type,
            user_id: user_id.into(),
            session_id: session_id.into(),
            input: input.into(),
            context: None,
        }
    }

    pub fn with_context(mut self, context: Value) -> Self {
        self.context = Some(context);
        self
    }

    /// Context as pretty JSON, or [`NO_CONTEXT`] when there is none
    pub fn rendered_context(&self) -> String {
        match &self.context {
            None | Some(Value::Null) => NO_CONTEXT.to_string(),
            Some(value) => {
                serde_json::to_string_pretty(value).unwrap_or_else(|_| NO_CONTEXT.to_string())
            }
        }
    }
}

// ============================================================================
// Payloads
// ============================================================================

/// Known payload fields fall back to their default when the engine sends `null` or a
/// value of the wrong shape
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

/// Memories the engine surfaced for the current turn
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryRecall {
    #[serde(deserialize_with = "lenient")]
    pub memories: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub summary: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmotionReading {
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub primary: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub secondary: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub intensity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub valence: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntentReading {
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub intent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub confidence: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub sub_intents: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InsightSet {
    #[serde(deserialize_with = "lenient")]
    pub insights: Vec<Value>,
    #[serde(deserialize_with = "lenient")]
    pub patterns: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleReading {
    #[serde(deserialize_with = "lenient")]
    pub roles: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub active_role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub confidence: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Output of the dependent synthesis step
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperienceSynthesis {
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub narrative: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub themes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub guidance: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Typed task output; the `type` discriminator always equals the originating [`TaskType`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaskPayload {
    MemoryRetrieval(MemoryRecall),
    EmotionClassification(EmotionReading),
    IntentRecognition(IntentReading),
    InsightGeneration(InsightSet),
    RoleDetection(RoleReading),
    ExperienceSynthesis(ExperienceSynthesis),
}

impl TaskPayload {
    pub fn task_type(&self) -> TaskType {
        match self {
            TaskPayload::MemoryRetrieval(_) => TaskType::MemoryRetrieval,
            TaskPayload::EmotionClassification(_) => TaskType::EmotionClassification,
            TaskPayload::IntentRecognition(_) => TaskType::IntentRecognition,
            TaskPayload::InsightGeneration(_) => TaskType::InsightGeneration,
            TaskPayload::RoleDetection(_) => TaskType::RoleDetection,
            TaskPayload::ExperienceSynthesis(_) => TaskType::ExperienceSynthesis,
        }
    }

    /// Typed payload from an engine object, whatever shape its known fields have
    ///
    /// The discriminator is set to `task_type`. A known field that had to fall back to its
    /// default keeps its raw value under [`COERCED_KEY`] in the extra fields.
    pub fn from_object(
        task_type: TaskType,
        mut object: Map<String, Value>,
    ) -> Result<Self, serde_json::Error> {
        object.insert("type".to_string(), Value::String(task_type.as_str().to_string()));
        let raw = object.clone();
        let mut payload: TaskPayload = serde_json::from_value(Value::Object(object))?;

        let typed = payload.to_value();
        let coerced: Map<String, Value> = raw
            .into_iter()
            .filter(|(key, value)| match (value, typed.get(key)) {
                (Value::Null, _) => false,
                (_, None) => true,
                (Value::Array(items), Some(Value::Array(_))) if items.is_empty() => false,
                (_, Some(Value::Array(kept))) => kept.is_empty(),
                _ => false,
            })
            .collect();

        if !coerced.is_empty() {
            payload
                .extra_mut()
                .insert(COERCED_KEY.to_string(), Value::Object(coerced));
        }
        Ok(payload)
    }

    fn extra_mut(&mut self) -> &mut Map<String, Value> {
        match self {
            TaskPayload::MemoryRetrieval(p) => &mut p.extra,
            TaskPayload::EmotionClassification(p) => &mut p.extra,
            TaskPayload::IntentRecognition(p) => &mut p.extra,
            TaskPayload::InsightGeneration(p) => &mut p.extra,
            TaskPayload::RoleDetection(p) => &mut p.extra,
            TaskPayload::ExperienceSynthesis(p) => &mut p.extra,
        }
    }

    /// Payload as JSON (discriminator included) for embedding into a context
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

// ============================================================================
// Results
// ============================================================================

/// Failure classes absorbed at the single-task boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Spawn,
    Timeout,
    NonZeroExit,
    Parse,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureKind::Spawn => "spawn",
            FailureKind::Timeout => "timeout",
            FailureKind::NonZeroExit => "non_zero_exit",
            FailureKind::Parse => "parse",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TaskOutcome {
    Succeeded { result: TaskPayload },
    Failed { kind: FailureKind, error: String },
}

/// Settled outcome of one task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    pub task_id: String,
    #[serde(rename = "type")]
    pub task_type: TaskType,
    #[serde(flatten)]
    pub outcome: TaskOutcome,
    pub latency_ms: u64,
}

impl TaskResult {
    pub fn succeeded(task: &TaskDescriptor, result: TaskPayload, latency: Duration) -> Self {
        Self {
            task_id: task.id.clone(),
            task_type: task.task_type,
            outcome: TaskOutcome::Succeeded { result },
            latency_ms: latency.as_millis() as u64,
        }
    }

    pub fn failed(
        task: &TaskDescriptor,
        kind: FailureKind,
        error: impl Into<String>,
        latency: Duration,
    ) -> Self {
        Self {
            task_id: task.id.clone(),
            task_type: task.task_type,
            outcome: TaskOutcome::Failed {
                kind,
                error: error.into(),
            },
            latency_ms: latency.as_millis() as u64,
        }
    }

    pub fn success(&self) -> bool {
        matches!(self.outcome, TaskOutcome::Succeeded { .. })
    }

    pub fn payload(&self) -> Option<&TaskPayload> {
        match &self.outcome {
            TaskOutcome::Succeeded { result } => Some(result),
            TaskOutcome::Failed { .. } => None,
        }
    }

    pub fn into_payload(self) -> Option<TaskPayload> {
        match self.outcome {
            TaskOutcome::Succeeded { result } => Some(result),
            TaskOutcome::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            TaskOutcome::Failed { error, .. } => Some(error),
            TaskOutcome::Succeeded { .. } => None,
        }
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match &self.outcome {
            TaskOutcome::Failed { kind, .. } => Some(*kind),
            TaskOutcome::Succeeded { .. } => None,
        }
    }
}

/// Finds the payload of `task_type` among successful results.
///
/// Lookup is by discriminator, so result order and missing tasks don't matter.
pub fn find_payload(results: &[TaskResult], task_type: TaskType) -> Option<&TaskPayload> {
    results
        .iter()
        .filter_map(TaskResult::payload)
        .find(|payload| payload.task_type() == task_type)
}

// ============================================================================
// Sweep
// ============================================================================

/// Which optional subtasks a sweep runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepOptions {
    pub include_insights: bool,
    pub include_roles: bool,
    pub include_experience: bool,
}

impl Default for SweepOptions {
    fn default() -> Self {
        Self {
            include_insights: false,
            include_roles: true,
            include_experience: true,
        }
    }
}

/// Composite output of one sweep; a `None` slot means skipped or failed
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SweepResult {
    pub memory: Option<MemoryRecall>,
    pub emotion: Option<EmotionReading>,
    pub intent: Option<IntentReading>,
    pub insights: Option<InsightSet>,
    pub roles: Option<RoleReading>,
    pub experience: Option<ExperienceSynthesis>,
    pub total_latency_ms: u64,
    /// Every settled task in schedule order
    #[serde(default)]
    pub tasks: Vec<TaskResult>,
}

impl SweepResult {
    pub fn assemble(tasks: Vec<TaskResult>, total_latency: Duration) -> Self {
        let mut sweep = SweepResult {
            total_latency_ms: total_latency.as_millis() as u64,
            ..Default::default()
        };

        for task_type in TaskType::ALL {
            match find_payload(&tasks, task_type).cloned() {
                Some(TaskPayload::MemoryRetrieval(p)) => sweep.memory = Some(p),
                Some(TaskPayload::EmotionClassification(p)) => sweep.emotion = Some(p),
                Some(TaskPayload::IntentRecognition(p)) => sweep.intent = Some(p),
                Some(TaskPayload::InsightGeneration(p)) => sweep.insights = Some(p),
                Some(TaskPayload::RoleDetection(p)) => sweep.roles = Some(p),
                Some(TaskPayload::ExperienceSynthesis(p)) => sweep.experience = Some(p),
                None => {}
            }
        }

        sweep.tasks = tasks;
        sweep
    }

    pub fn failed_tasks(&self) -> impl Iterator<Item = &TaskResult> {
        self.tasks.iter().filter(|t| !t.success())
    }
}

// ============================================================================
// Lifecycle events
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Running,
    Completed,
    Failed,
}

/// Structured lifecycle events emitted while a sweep runs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SweepLog {
    PhaseStarted {
        phase: usize,
        name: String,
        total_phases: usize,
        tasks: usize,
    },
    PhaseCompleted {
        phase: usize,
        name: String,
        succeeded: usize,
        failed: usize,
    },
    TaskStarted {
        task_id: String,
        task_type: TaskType,
    },
    TaskCompleted {
        task_id: String,
        latency_ms: u64,
    },
    TaskFailed {
        task_id: String,
        kind: FailureKind,
        error: String,
    },
    AgentStarted {
        task_id: String,
        agent_id: Uuid,
    },
    AgentFinished {
        agent_id: Uuid,
        status: AgentStatus,
    },
}

impl SweepLog {
    /// Emit this event as JSON on the [`EVENT_TARGET`] tracing target
    pub fn emit(&self) {
        if let Ok(json) = serde_json::to_string(self) {
            tracing::info!(target: EVENT_TARGET, "{}", json);
        }
    }
}

#[macro_export]
macro_rules! log_phase_start {
    ($phase:expr, $name:expr, $total:expr, $tasks:expr) => {
        $crate::SweepLog::PhaseStarted {
            phase: $phase,
            name: $name.to_string(),
            total_phases: $total,
            tasks: $tasks,
        }
        .emit();
    };
}

#[macro_export]
macro_rules! log_phase_complete {
    ($phase:expr, $name:expr, $succeeded:expr, $failed:expr) => {
        $crate::SweepLog::PhaseCompleted {
            phase: $phase,
            name: $name.to_string(),
            succeeded: $succeeded,
            failed: $failed,
        }
        .emit();
    };
}

#[macro_export]
macro_rules! log_task_start {
    ($task_id:expr, $task_type:expr) => {
        $crate::SweepLog::TaskStarted {
            task_id: $task_id.to_string(),
            task_type: $task_type,
        }
        .emit();
    };
}

#[macro_export]
macro_rules! log_task_complete {
    ($task_id:expr, $latency_ms:expr) => {
        $crate::SweepLog::TaskCompleted {
            task_id: $task_id.to_string(),
            latency_ms: $latency_ms,
        }
        .emit();
    };
}

#[macro_export]
macro_rules! log_task_failed {
    ($task_id:expr, $kind:expr, $error:expr) => {
        $crate::SweepLog::TaskFailed {
            task_id: $task_id.to_string(),
            kind: $kind,
            error: $error.to_string(),
        }
        .emit();
    };
}

#[macro_export]
macro_rules! log_agent_start {
    ($task_id:expr, $agent_id:expr) => {
        $crate::SweepLog::AgentStarted {
            task_id: $task_id.to_string(),
            agent_id: $agent_id,
        }
        .emit();
    };
}

#[macro_export]
macro_rules! log_agent_finish {
    ($agent_id:expr, $status:expr) => {
        $crate::SweepLog::AgentFinished {
            agent_id: $agent_id,
            status: $status,
        }
        .emit();
    };
}
