//! Registry of in-flight engine processes
//!
//! An entry exists only while its process is alive. Every terminal path goes through
//! [`AgentRegistry::finish`], which updates and removes the entry under one lock, so a
//! timeout racing a natural exit can only finish an agent once.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use unconscious_sdk::{log_agent_finish, log_agent_start, AgentStatus};
use uuid::Uuid;

/// Live-process handle for one task
#[derive(Debug, Clone, Serialize)]
pub struct AgentHandle {
    pub id: Uuid,
    pub task_id: String,
    pub started_at: DateTime<Utc>,
    pub status: AgentStatus,
}

/// Point-in-time view for observability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RegistrySnapshot {
    pub active_count: usize,
    pub max_concurrent_configured: usize,
}

/// Shared map of running agents; clones share state
#[derive(Clone)]
pub struct AgentRegistry {
    agents: Arc<Mutex<HashMap<Uuid, AgentHandle>>>,
    max_concurrent: usize,
}

impl AgentRegistry {
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            agents: Arc::new(Mutex::new(HashMap::new())),
            max_concurrent,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, AgentHandle>> {
        // entries are plain data, a panic elsewhere can't leave one half-written
        self.agents.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a freshly spawned process as `running`
    ///
    /// The returned lease finishes the agent as failed if it is dropped unfinished.
    pub fn register(&self, task_id: &str) -> AgentLease {
        let handle = AgentHandle {
            id: Uuid::new_v4(),
            task_id: task_id.to_string(),
            started_at: Utc::now(),
            status: AgentStatus::Running,
        };
        let id = handle.id;

        self.lock().insert(id, handle);
        log_agent_start!(task_id, id);
        tracing::debug!(agent_id = %id, task_id, "agent registered");

        AgentLease {
            registry: self.clone(),
            id,
            finished: false,
        }
    }

    /// Move an agent to a terminal status and drop it from the map
    ///
    /// Returns `false` if the agent was already finished.
    pub fn finish(&self, id: Uuid, status: AgentStatus) -> bool {
        let removed = {
            let mut agents = self.lock();
            match agents.get_mut(&id) {
                Some(handle) => {
                    handle.status = status;
                    agents.remove(&id)
                }
                None => None,
            }
        };

        match removed {
            Some(handle) => {
                let elapsed_ms = (Utc::now() - handle.started_at).num_milliseconds();
                log_agent_finish!(id, status);
                tracing::debug!(agent_id = %id, task_id = %handle.task_id, ?status, elapsed_ms, "agent finished");
                true
            }
            None => false,
        }
    }

    pub fn is_active(&self, id: Uuid) -> bool {
        self.lock().contains_key(&id)
    }

    pub fn active(&self) -> Vec<AgentHandle> {
        self.lock().values().cloned().collect()
    }

    pub fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            active_count: self.lock().len(),
            max_concurrent_configured: self.max_concurrent,
        }
    }
}

/// Cleanup obligation for one registered agent
#[must_use = "dropping a lease immediately marks the agent failed"]
pub struct AgentLease {
    registry: AgentRegistry,
    id: Uuid,
    finished: bool,
}

impl AgentLease {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Finish the agent; later calls and the drop hook are no-ops
    pub fn finish(&mut self, status: AgentStatus) -> bool {
        if self.finished {
            return false;
        }
        self.finished = true;
        self.registry.finish(self.id, status)
    }
}

impl Drop for AgentLease {
    fn drop(&mut self) {
        if !self.finished {
            self.finish(AgentStatus::Failed);
        }
    }
}
