//! Infrastructure Layer
//!
//! Adapters implementing the domain ports, plus the stores and configuration
//! the application layer wires together.
//!
//! ## Adapters
//!
//! - `TokioProcessExecutor`: `sh -c` processes in their own process group
//! - `StandardHealthCheckExecutor`: HTTP / TCP / process checks
//! - `JsonFileGroupRepository`: one JSON document per group, atomic writes
//! - `InMemoryGroupRepository`: volatile store for tests and embedding
//! - `TypeAdapterRegistry`: ecosystem tag → tooling adapter
//!
//! ## Stores
//!
//! - `LogStore`: per-unit captured output with run archival
//! - `PortAllocator`: owner → port table

pub mod config;
pub mod health_check_executor;
pub mod in_memory_repository;
pub mod json_group_repository;
pub mod log_store;
pub mod logging;
pub mod port_allocator;
pub mod tokio_executor;
pub mod type_adapters;

pub use config::{GroupFile, ServerConfig, CONFIG_FILE_ENV};
pub use health_check_executor::StandardHealthCheckExecutor;
pub use in_memory_repository::InMemoryGroupRepository;
pub use json_group_repository::JsonFileGroupRepository;
pub use log_store::LogStore;
pub use logging::init_tracing;
pub use port_allocator::PortAllocator;
pub use tokio_executor::TokioProcessExecutor;
pub use type_adapters::{
    BuildToolAdapter, PackageScriptAdapter, ScriptAdapter, TypeAdapterRegistry,
};
