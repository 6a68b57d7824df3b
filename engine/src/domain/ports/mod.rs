pub mod group_repository;
pub mod health_check_executor;
pub mod process_executor;
pub mod type_adapter;

pub use group_repository::GroupRepository;
pub use health_check_executor::HealthCheckExecutor;
pub use process_executor::{CommandOutput, OutputStream, ProcessExecutor, SpawnConfig, SpawnResult};
pub use type_adapter::{join_command, shell_quote, Invocation, TypeAdapter};
