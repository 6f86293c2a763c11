//! The orchestrator: one explicitly constructed instance owns the launcher, the agent
//! registry and the concurrency gate, and exposes single-task, parallel and sweep entry
//! points on top of them.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use unconscious_sdk::{
    log_phase_complete, log_phase_start, SweepOptions, SweepResult, TaskDescriptor, TaskPayload,
    TaskResult, TaskType,
};

use crate::config::{Config, OrchestratorConfig};
use crate::error::OrchestratorError;
use crate::sweep::plan::{dependency_context, SweepPlan};
use crate::worker::{self, AgentRegistry, EngineLauncher, ProcessAgent, ProcessLauncher, RegistrySnapshot};

/// Session id used for ad hoc single-task runs
pub const ADHOC_SESSION: &str = "adhoc";

pub struct Orchestrator {
    config: OrchestratorConfig,
    launcher: Arc<dyn ProcessLauncher>,
    registry: AgentRegistry,
    gate: Semaphore,
}

impl Orchestrator {
    /// Orchestrator driving the configured engine
    ///
    /// Creates the isolated engine home if it is missing.
    pub fn new(config: &Config) -> std::io::Result<Self> {
        let launcher = EngineLauncher::new(config.engine.clone());
        launcher.ensure_home()?;
        Ok(Self::with_launcher(config.orchestrator.clone(), Arc::new(launcher)))
    }

    /// Orchestrator with a caller-supplied launcher
    pub fn with_launcher(config: OrchestratorConfig, launcher: Arc<dyn ProcessLauncher>) -> Self {
        let permits = config.max_concurrent.max(1);
        Self {
            registry: AgentRegistry::new(config.max_concurrent),
            gate: Semaphore::new(permits),
            launcher,
            config,
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    pub fn snapshot(&self) -> RegistrySnapshot {
        self.registry.snapshot()
    }

    /// Run one task to a settled result; never fails
    ///
    /// Waits for a concurrency permit before the engine is spawned.
    pub async fn execute_task(&self, task: &TaskDescriptor) -> TaskResult {
        // the gate is never closed, so acquire can't fail
        let _permit = self.gate.acquire().await.ok();
        let agent = ProcessAgent::new(
            self.launcher.as_ref(),
            &self.registry,
            self.config.timeout_for(task.task_type),
        );
        worker::execute_task(&agent, task).await
    }

    /// Run tasks concurrently and return their results in input order
    ///
    /// A failing task never cancels its siblings. Only a malformed batch is an error.
    pub async fn execute_parallel(
        &self,
        tasks: &[TaskDescriptor],
    ) -> Result<Vec<TaskResult>, OrchestratorError> {
        let mut seen = HashSet::new();
        for task in tasks {
            if !seen.insert(task.id.as_str()) {
                return Err(OrchestratorError::DuplicateTaskId(task.id.clone()));
            }
        }

        let results =
            worker::execute_parallel(tasks.iter().collect::<Vec<_>>(), |task| self.execute_task(task))
                .await;
        Ok(results)
    }

    /// Run the phase schedule for one conversational turn
    ///
    /// Each phase starts only after the previous one has fully settled. A failed subtask
    /// leaves its slot empty; the sweep itself only fails on an invalid schedule.
    pub async fn process_sweep(
        &self,
        user_id: &str,
        session_id: &str,
        message: &str,
        options: SweepOptions,
    ) -> Result<SweepResult, OrchestratorError> {
        let plan = SweepPlan::for_options(&options)?;
        self.run_plan(&plan, user_id, session_id, message).await
    }

    /// Run an arbitrary validated plan
    pub async fn run_plan(
        &self,
        plan: &SweepPlan,
        user_id: &str,
        session_id: &str,
        message: &str,
    ) -> Result<SweepResult, OrchestratorError> {
        let started = Instant::now();
        let total_phases = plan.phases().len();
        let mut settled: Vec<TaskResult> = Vec::new();

        tracing::info!(user_id, session_id, phases = total_phases, "sweep started");

        for (idx, phase) in plan.phases().iter().enumerate() {
            if phase.tasks.is_empty() {
                continue;
            }
            let phase_number = idx + 1;

            let tasks: Vec<TaskDescriptor> = phase
                .tasks
                .iter()
                .map(|planned| {
                    let task =
                        TaskDescriptor::new(planned.task_type, user_id, session_id, message);
                    if planned.depends_on.is_empty() {
                        task
                    } else {
                        task.with_context(dependency_context(&planned.depends_on, &settled))
                    }
                })
                .collect();

            log_phase_start!(phase_number, &phase.name, total_phases, tasks.len());

            let results = match tasks.as_slice() {
                [single] => vec![self.execute_task(single).await],
                _ => self.execute_parallel(&tasks).await?,
            };

            let succeeded = results.iter().filter(|r| r.success()).count();
            log_phase_complete!(phase_number, &phase.name, succeeded, results.len() - succeeded);

            settled.extend(results);
        }

        let sweep = SweepResult::assemble(settled, started.elapsed());
        tracing::info!(
            user_id,
            session_id,
            total_latency_ms = sweep.total_latency_ms,
            failed = sweep.failed_tasks().count(),
            "sweep finished"
        );
        Ok(sweep)
    }

    /// Run a single capability outside a sweep; `None` when the task failed
    pub async fn run_unconscious_task(
        &self,
        task_type: TaskType,
        user_id: &str,
        message: &str,
    ) -> Option<TaskPayload> {
        let task = TaskDescriptor::new(task_type, user_id, ADHOC_SESSION, message);
        let result = self.execute_task(&task).await;
        if let Some(error) = result.error() {
            tracing::debug!(task_id = %result.task_id, %task_type, error, "ad hoc task failed");
        }
        result.into_payload()
    }
}
