pub mod commands;
pub mod constants;
pub mod entities;
pub mod error;
pub mod ports;
pub mod queries;
pub mod services;
pub mod value_objects;

pub use commands::{CommandResult, ReloadResult, RestartGroupResult, UnitStartResult, UnitStopResult};
pub use entities::{Group, GroupDraft, RuntimeStatus, Unit, UnitBuilder};
pub use error::{DomainError, Result};
pub use queries::UnitStatusView;
pub use services::{DependencyResolutionService, RestartDecision, RestartTracker};
pub use value_objects::{
    Ecosystem, HealthCheck, HealthCheckKind, HealthStatus, KillMode, LogEntry, LogRunInfo,
    LogStream, SearchMatch, StopSignal, UnitKey, UnitState, format_log_line,
};
