pub mod dependency_resolution_service;
pub mod restart_backoff;

pub use dependency_resolution_service::DependencyResolutionService;
pub use restart_backoff::{backoff_for, RestartDecision, RestartTracker};
