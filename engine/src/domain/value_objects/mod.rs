pub mod ecosystem;
pub mod health_check;
pub mod kill_mode;
pub mod log_entry;
pub mod unit_key;
pub mod unit_state;

pub use ecosystem::Ecosystem;
pub use health_check::{HealthCheck, HealthCheckKind, HealthCheckSpec, HealthStatus};
pub use kill_mode::{KillMode, StopSignal};
pub use log_entry::{format_log_line, LogEntry, LogRunInfo, LogStream, SearchMatch};
pub use unit_key::UnitKey;
pub use unit_state::UnitState;
