//! Engine worker layer
//!
//! - **launcher**: builds the engine command (the test seam)
//! - **agent**: one process lifecycle with timeout and cleanup
//! - **registry**: in-flight agent bookkeeping
//! - **json**: payload recovery from engine stdout
//! - **task**: single-task execution that never fails
//! - **batch**: order-preserving all-settle fan-out

pub mod agent;
pub mod batch;
pub mod json;
pub mod launcher;
pub mod registry;
pub mod task;

pub use agent::{ProcessAgent, ProcessOutput};
pub use batch::execute_parallel;
pub use json::{extract_json_object, recover_payload};
pub use launcher::{EngineLauncher, Invocation, ProcessLauncher};
pub use registry::{AgentHandle, AgentLease, AgentRegistry, RegistrySnapshot};
pub use task::execute_task;
