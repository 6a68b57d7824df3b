//! Application Layer
//!
//! `ProcessLifecycleManager` owns the runtime tables and the per-unit state
//! machine; `Orchestrator` wires the adapters together and exposes the
//! group-level operations.

pub mod lifecycle_manager;
pub mod orchestrator;

pub use lifecycle_manager::{dependency_port_var, LifecycleSettings, ProcessLifecycleManager};
pub use orchestrator::{Orchestrator, OrchestratorBuilder};
