//! stackvisor engine
//!
//! Local supervisor for groups of interdependent development processes
//! ("units"). A group is started in dependency order with health-gated
//! startup, output is captured into rotating per-run logs, ports are handed
//! out and advertised to dependents, and units can be restarted
//! automatically with capped exponential backoff.
//!
//! Layout follows a hexagonal split:
//!
//! - [`domain`]: entities, value objects, ports and pure services
//! - [`infrastructure`]: process, health, storage and tooling adapters
//! - [`application`]: the lifecycle manager and the orchestrator
//!
//! ```rust,no_run
//! use sv_engine::{Orchestrator, ServerConfig};
//!
//! # async fn run() -> Result<(), sv_engine::DomainError> {
//! let config = ServerConfig::from_env();
//! let orchestrator = Orchestrator::from_config(&config)?;
//! for group in orchestrator.list_groups().await? {
//!     orchestrator.start_group(group.id(), None).await?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::{LifecycleSettings, Orchestrator, OrchestratorBuilder, ProcessLifecycleManager};
pub use domain::{
    CommandResult, DomainError, Ecosystem, Group, GroupDraft, HealthCheck, HealthStatus, LogEntry,
    LogRunInfo, LogStream, ReloadResult, RestartGroupResult, SearchMatch, Unit, UnitKey,
    UnitStartResult, UnitState, UnitStatusView, UnitStopResult,
};
pub use infrastructure::{init_tracing, GroupFile, ServerConfig};
