//! Tests for single-task execution: process lifecycle, payload recovery and failure kinds

use super::common::*;
use std::sync::Arc;
use std::time::{Duration, Instant};
use unconscious::config::{Config, EngineConfig};
use unconscious::worker::{AgentRegistry, EngineLauncher, Invocation, ProcessAgent};
use unconscious::{Orchestrator, TaskError};
use unconscious_sdk::{FailureKind, TaskDescriptor, TaskPayload, TaskType};

fn task(task_type: TaskType) -> TaskDescriptor {
    TaskDescriptor::new(task_type, "user-1", "session-1", "I finally finished the marathon")
}

// ============================================================================
// ProcessAgent
// ============================================================================

#[tokio::test]
async fn test_agent_captures_stdout_and_finishes_lease() {
    let launcher = ScriptLauncher::new().with(
        TaskType::IntentRecognition,
        "echo diagnostics >&2; printf '%s' hello",
    );
    let registry = AgentRegistry::new(4);
    let agent = ProcessAgent::new(&launcher, &registry, Duration::from_secs(5));
    let task = task(TaskType::IntentRecognition);

    let output = agent
        .run(Invocation {
            task: &task,
            prompt: "p",
        })
        .await
        .unwrap();

    assert_eq!(output.stdout, "hello");
    assert_eq!(output.stderr.trim(), "diagnostics");
    assert_eq!(registry.snapshot().active_count, 0);
}

#[tokio::test]
async fn test_agent_timeout_kills_and_unregisters() {
    let launcher = ScriptLauncher::new().with(TaskType::MemoryRetrieval, "exec sleep 30");
    let registry = AgentRegistry::new(4);
    let agent = ProcessAgent::new(&launcher, &registry, Duration::from_millis(300));
    let task = task(TaskType::MemoryRetrieval);

    let started = Instant::now();
    let result = agent
        .run(Invocation {
            task: &task,
            prompt: "p",
        })
        .await;

    assert!(matches!(result, Err(TaskError::Timeout)));
    assert!(started.elapsed() < Duration::from_millis(300 + 2_000));
    assert_eq!(registry.snapshot().active_count, 0);
}

#[tokio::test]
async fn test_agent_reports_exit_code_and_stderr() {
    let launcher =
        ScriptLauncher::new().with(TaskType::EmotionClassification, "echo boom >&2; exit 3");
    let registry = AgentRegistry::new(4);
    let agent = ProcessAgent::new(&launcher, &registry, Duration::from_secs(5));
    let task = task(TaskType::EmotionClassification);

    let err = agent
        .run(Invocation {
            task: &task,
            prompt: "p",
        })
        .await
        .unwrap_err();

    assert_eq!(err.kind(), FailureKind::NonZeroExit);
    assert_eq!(err.to_string(), "3: boom");
    assert_eq!(registry.snapshot().active_count, 0);
}

#[tokio::test]
async fn test_agent_reports_signal_death() {
    let launcher = ScriptLauncher::new().with(TaskType::RoleDetection, "kill -9 $$");
    let registry = AgentRegistry::new(4);
    let agent = ProcessAgent::new(&launcher, &registry, Duration::from_secs(5));
    let task = task(TaskType::RoleDetection);

    let err = agent
        .run(Invocation {
            task: &task,
            prompt: "p",
        })
        .await
        .unwrap_err();

    assert!(matches!(err, TaskError::NonZeroExit { ref code, .. } if code == "signal"));
}

// ============================================================================
// Orchestrator::execute_task
// ============================================================================

#[tokio::test]
async fn test_execute_task_recovers_payload_from_noise() {
    let launcher = ScriptLauncher::new().with(
        TaskType::EmotionClassification,
        &emit(r#"noise-before {"type":"emotion_classification","primary":"joy"} noise-after"#),
    );
    let orchestrator = orchestrator(&launcher);
    let task = task(TaskType::EmotionClassification);

    let result = orchestrator.execute_task(&task).await;

    assert!(result.success());
    assert_eq!(result.task_id, task.id);
    match result.payload() {
        Some(TaskPayload::EmotionClassification(reading)) => {
            assert_eq!(reading.primary.as_deref(), Some("joy"))
        }
        other => panic!("unexpected payload: {:?}", other),
    }
}

#[tokio::test]
async fn test_execute_task_injects_missing_discriminator() {
    let launcher = ScriptLauncher::new().with(
        TaskType::IntentRecognition,
        &emit(r#"{"intent":"vent","confidence":0.4}"#),
    );
    let orchestrator = orchestrator(&launcher);

    let result = orchestrator.execute_task(&task(TaskType::IntentRecognition)).await;

    match result.into_payload() {
        Some(TaskPayload::IntentRecognition(reading)) => {
            assert_eq!(reading.intent.as_deref(), Some("vent"))
        }
        other => panic!("unexpected payload: {:?}", other),
    }
}

#[tokio::test]
async fn test_execute_task_without_braces_is_parse_failure() {
    let launcher =
        ScriptLauncher::new().with(TaskType::MemoryRetrieval, &emit("I could not decide"));
    let orchestrator = orchestrator(&launcher);

    let result = orchestrator.execute_task(&task(TaskType::MemoryRetrieval)).await;

    assert!(!result.success());
    assert_eq!(result.failure_kind(), Some(FailureKind::Parse));
    assert_eq!(result.error(), Some("no parsable JSON"));
}

#[tokio::test]
async fn test_execute_task_unwraps_engine_envelope() {
    let envelope = r#"{"type":"result","subtype":"success","is_error":false,"result":"Here you go: {\"type\":\"role_detection\",\"roles\":[\"coach\"]}"}"#;
    let launcher = ScriptLauncher::new().with(TaskType::RoleDetection, &emit(envelope));
    let orchestrator = orchestrator(&launcher);

    let result = orchestrator.execute_task(&task(TaskType::RoleDetection)).await;

    match result.into_payload() {
        Some(TaskPayload::RoleDetection(reading)) => assert_eq!(reading.roles, vec!["coach"]),
        other => panic!("unexpected payload: {:?}", other),
    }
}

#[tokio::test]
async fn test_execute_task_timeout_result() {
    let launcher = ScriptLauncher::new().with(TaskType::MemoryRetrieval, "exec sleep 30");
    let orchestrator = Orchestrator::with_launcher(
        orchestrator_config(250, 4),
        Arc::new(launcher.clone()),
    );

    let started = Instant::now();
    let result = orchestrator.execute_task(&task(TaskType::MemoryRetrieval)).await;

    assert_eq!(result.failure_kind(), Some(FailureKind::Timeout));
    assert_eq!(result.error(), Some("timeout"));
    assert!(started.elapsed() < Duration::from_millis(250 + 2_000));
    assert_eq!(orchestrator.snapshot().active_count, 0);
}

#[tokio::test]
async fn test_per_type_timeout_override() {
    let launcher = ScriptLauncher::new()
        .with(TaskType::MemoryRetrieval, &emit_after(0.4, &payload_json(TaskType::MemoryRetrieval)))
        .with(TaskType::IntentRecognition, &emit_after(0.4, &payload_json(TaskType::IntentRecognition)));
    let mut config = orchestrator_config(100, 4);
    config.timeouts.insert(TaskType::MemoryRetrieval, 5_000);
    let orchestrator = Orchestrator::with_launcher(config, Arc::new(launcher));

    let memory = orchestrator.execute_task(&task(TaskType::MemoryRetrieval)).await;
    let intent = orchestrator.execute_task(&task(TaskType::IntentRecognition)).await;

    assert!(memory.success());
    assert_eq!(intent.failure_kind(), Some(FailureKind::Timeout));
}

#[tokio::test]
async fn test_execute_task_spawn_failure_registers_nothing() {
    let launcher = EngineLauncher::new(EngineConfig {
        program: "/nonexistent/path/to/engine".to_string(),
        ..Default::default()
    });
    let orchestrator = Orchestrator::with_launcher(orchestrator_config(1_000, 2), Arc::new(launcher));

    let result = orchestrator.execute_task(&task(TaskType::IntentRecognition)).await;

    assert_eq!(result.failure_kind(), Some(FailureKind::Spawn));
    assert!(result.error().unwrap().contains("/nonexistent/path/to/engine"));
    assert_eq!(orchestrator.snapshot().active_count, 0);
}

#[tokio::test]
async fn test_prompt_carries_task_fields() {
    let launcher = ScriptLauncher::succeeding();
    let orchestrator = orchestrator(&launcher);

    orchestrator.execute_task(&task(TaskType::IntentRecognition)).await;

    let calls = launcher.calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].prompt.contains("user-1"));
    assert!(calls[0].prompt.contains("session-1"));
    assert!(calls[0].prompt.contains("I finally finished the marathon"));
}

#[test]
fn test_new_creates_engine_home() {
    let dir = tempfile::tempdir().unwrap();
    let home = dir.path().join("state").join("engine-home");
    let mut config = Config::default();
    config.engine.home = home.clone();
    config.orchestrator.max_concurrent = 3;

    let orchestrator = Orchestrator::new(&config).unwrap();

    assert!(home.is_dir());
    assert_eq!(orchestrator.snapshot().max_concurrent_configured, 3);
    assert_eq!(orchestrator.config().max_concurrent, 3);
}

#[test]
fn test_new_fails_when_engine_home_is_blocked() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, "file").unwrap();
    let mut config = Config::default();
    config.engine.home = blocker.join("engine-home");

    assert!(Orchestrator::new(&config).is_err());
}

// ============================================================================
// run_unconscious_task
// ============================================================================

#[tokio::test]
async fn test_run_unconscious_task_returns_payload() {
    let launcher = ScriptLauncher::succeeding();
    let orchestrator = orchestrator(&launcher);

    let payload = orchestrator
        .run_unconscious_task(TaskType::InsightGeneration, "user-9", "same as yesterday")
        .await;

    assert!(matches!(payload, Some(TaskPayload::InsightGeneration(_))));
    let calls = launcher.calls();
    assert_eq!(calls[0].task.session_id, unconscious::sweep::ADHOC_SESSION);
    assert!(calls[0].task.context.is_none());
}

#[tokio::test]
async fn test_run_unconscious_task_returns_none_on_failure() {
    let launcher = ScriptLauncher::new().with(TaskType::RoleDetection, "exit 1");
    let orchestrator = orchestrator(&launcher);

    let payload = orchestrator
        .run_unconscious_task(TaskType::RoleDetection, "user-9", "hm")
        .await;

    assert!(payload.is_none());
}
