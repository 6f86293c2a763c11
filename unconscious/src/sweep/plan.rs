//! Phase schedule for a sweep
//!
//! A plan is an ordered list of phases. Tasks inside a phase are independent and run
//! together; a task may depend on task types from earlier phases, whose payloads are
//! handed to it as context. A dependency on a type that is not planned at all resolves to
//! `null`, which is how optional tasks stay optional for their dependents.

use serde_json::{Map, Value};
use std::collections::HashMap;
use unconscious_sdk::{find_payload, SweepOptions, TaskResult, TaskType};

use crate::error::OrchestratorError;

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedTask {
    pub task_type: TaskType,
    pub depends_on: Vec<TaskType>,
}

impl PlannedTask {
    pub fn independent(task_type: TaskType) -> Self {
        Self {
            task_type,
            depends_on: Vec::new(),
        }
    }

    pub fn after(task_type: TaskType, depends_on: &[TaskType]) -> Self {
        Self {
            task_type,
            depends_on: depends_on.to_vec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Phase {
    pub name: String,
    pub tasks: Vec<PlannedTask>,
}

impl Phase {
    pub fn new(name: impl Into<String>, tasks: Vec<PlannedTask>) -> Self {
        Self {
            name: name.into(),
            tasks,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SweepPlan {
    phases: Vec<Phase>,
}

impl SweepPlan {
    /// Validate and build a plan
    ///
    /// Rejects a task type planned twice and a dependency on a type scheduled in the same
    /// or a later phase.
    pub fn new(phases: Vec<Phase>) -> Result<Self, OrchestratorError> {
        let mut scheduled: HashMap<TaskType, usize> = HashMap::new();
        for (idx, phase) in phases.iter().enumerate() {
            for planned in &phase.tasks {
                if scheduled.insert(planned.task_type, idx).is_some() {
                    return Err(OrchestratorError::DuplicatePlannedTask(planned.task_type));
                }
            }
        }

        for (idx, phase) in phases.iter().enumerate() {
            for planned in &phase.tasks {
                for dependency in &planned.depends_on {
                    if matches!(scheduled.get(dependency), Some(&at) if at >= idx) {
                        return Err(OrchestratorError::UnresolvableDependency {
                            task: planned.task_type,
                            dependency: *dependency,
                            phase: idx + 1,
                        });
                    }
                }
            }
        }

        Ok(Self { phases })
    }

    /// The standard two-phase sweep
    ///
    /// Phase 1: memory, emotion and intent, plus insights and roles when enabled.
    /// Phase 2: experience synthesis over roles, emotion and memory.
    pub fn for_options(options: &SweepOptions) -> Result<Self, OrchestratorError> {
        let mut independent = vec![
            PlannedTask::independent(TaskType::MemoryRetrieval),
            PlannedTask::independent(TaskType::EmotionClassification),
            PlannedTask::independent(TaskType::IntentRecognition),
        ];
        if options.include_insights {
            independent.push(PlannedTask::independent(TaskType::InsightGeneration));
        }
        if options.include_roles {
            independent.push(PlannedTask::independent(TaskType::RoleDetection));
        }

        let mut phases = vec![Phase::new("perception", independent)];
        if options.include_experience {
            phases.push(Phase::new(
                "synthesis",
                vec![PlannedTask::after(
                    TaskType::ExperienceSynthesis,
                    &[
                        TaskType::RoleDetection,
                        TaskType::EmotionClassification,
                        TaskType::MemoryRetrieval,
                    ],
                )],
            ));
        }

        Self::new(phases)
    }

    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }

    pub fn task_types(&self) -> impl Iterator<Item = TaskType> + '_ {
        self.phases
            .iter()
            .flat_map(|phase| phase.tasks.iter().map(|t| t.task_type))
    }
}

/// Context object for a dependent task: one key per dependency, payload or `null`
pub fn dependency_context(depends_on: &[TaskType], settled: &[TaskResult]) -> Value {
    let context: Map<String, Value> = depends_on
        .iter()
        .map(|dependency| {
            let value = find_payload(settled, *dependency)
                .map(|payload| payload.to_value())
                .unwrap_or(Value::Null);
            (dependency.context_key().to_string(), value)
        })
        .collect();
    Value::Object(context)
}
