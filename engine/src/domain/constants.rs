//! Domain Constants
//!
//! Common constants used throughout the domain layer

/// Default startup timeout in seconds
pub const DEFAULT_STARTUP_TIMEOUT_SEC: u64 = 60;

/// Interval between startup liveness/health polls
pub const STARTUP_POLL_INTERVAL_MS: u64 = 1000;

/// Default graceful stop timeout in seconds
pub const DEFAULT_STOP_TIMEOUT_SEC: u64 = 10;

/// Grace period used when stopping everything on shutdown
pub const SHUTDOWN_STOP_TIMEOUT_SEC: u64 = 5;

/// How long to wait for the OS to reap a process after SIGKILL
pub const FORCE_KILL_WAIT_SEC: u64 = 5;

/// Bounded wait for each output capture task on stop
pub const CAPTURE_JOIN_TIMEOUT_MS: u64 = 2000;

/// Build commands are aborted after this many seconds (5 minutes)
pub const BUILD_TIMEOUT_SEC: u64 = 300;

/// Health check defaults
pub const DEFAULT_HEALTH_INTERVAL_SEC: u64 = 5;
pub const DEFAULT_HEALTH_TIMEOUT_SEC: u64 = 3;

/// Restart window and limits
pub const RESTART_WINDOW_SEC: u64 = 3600;
pub const RESTART_LIMIT_PER_WINDOW: usize = 10;
pub const RESTART_BACKOFF_BASE: u64 = 2;
pub const RESTART_MAX_BACKOFF_SEC: u64 = 30;

/// Log store defaults
pub const DEFAULT_LOG_RETENTION_RUNS: usize = 10;
pub const DEFAULT_LOG_MAX_SIZE_MB: u64 = 100;
pub const DEFAULT_LOG_LINES: usize = 100;
pub const DEFAULT_SEARCH_RESULTS: usize = 100;
pub const SEARCH_CONTEXT_LINES: usize = 2;
pub const CURRENT_RUN: &str = "current";
pub const RUN_ID_FORMAT: &str = "%Y-%m-%d-%H-%M-%S";

/// Memory unit constants
pub const BYTES_PER_MB: u64 = 1024 * 1024;
