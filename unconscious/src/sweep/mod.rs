//! Sweep scheduling
//!
//! A sweep runs the perception tasks for one conversational turn in parallel, then the
//! experience synthesis task seeded with their payloads.

pub mod orchestrator;
pub mod plan;

pub use orchestrator::{Orchestrator, ADHOC_SESSION};
pub use plan::{dependency_context, Phase, PlannedTask, SweepPlan};
