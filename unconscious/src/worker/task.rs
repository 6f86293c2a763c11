//! Single-task execution: prompt, process, parse
//!
//! [`execute_task`] is the boundary where every process and parse failure is folded into a
//! failed [`TaskResult`]. Nothing past this point sees a `TaskError`.

use std::time::Instant;
use unconscious_sdk::{log_task_complete, log_task_failed, log_task_start, TaskDescriptor, TaskResult};

use crate::error::TaskError;
use crate::prompts::build_prompt;
use crate::worker::agent::ProcessAgent;
use crate::worker::json::recover_payload;
use crate::worker::launcher::Invocation;

/// Run one task to a settled result; never fails
pub async fn execute_task(agent: &ProcessAgent<'_>, task: &TaskDescriptor) -> TaskResult {
    let started = Instant::now();
    log_task_start!(&task.id, task.task_type);

    let prompt = build_prompt(task);
    let outcome = agent
        .run(Invocation {
            task,
            prompt: &prompt,
        })
        .await
        .and_then(|output| recover_payload(&output.stdout, task.task_type));

    let latency = started.elapsed();

    match outcome {
        Ok(payload) => {
            log_task_complete!(&task.id, latency.as_millis() as u64);
            TaskResult::succeeded(task, payload, latency)
        }
        Err(error) => {
            if let TaskError::Parse { detail } = &error {
                tracing::warn!(task_id = %task.id, task_type = %task.task_type, detail = %detail, "engine output not parsable");
            }
            log_task_failed!(&task.id, error.kind(), &error);
            TaskResult::failed(task, error.kind(), error.to_string(), latency)
        }
    }
}
