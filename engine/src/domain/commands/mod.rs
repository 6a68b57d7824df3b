//! Command results
//! What the orchestrator returns for state-changing operations

pub mod custom_command;
pub mod start_group;
pub mod stop_group;

pub use custom_command::{CommandResult, ReloadResult};
pub use start_group::UnitStartResult;
pub use stop_group::{RestartGroupResult, UnitStopResult};
