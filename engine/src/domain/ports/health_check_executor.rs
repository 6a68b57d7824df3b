//! HealthCheckExecutor port

use crate::domain::{HealthCheck, HealthStatus};
use async_trait::async_trait;

/// Port for checking unit health
///
/// Implementations never fail: any check error is reported as
/// [`HealthStatus::Unhealthy`].
#[async_trait]
pub trait HealthCheckExecutor: Send + Sync {
    async fn check(&self, health_check: &HealthCheck) -> HealthStatus;

    /// Units without a descriptor are `Unknown`
    async fn check_optional(&self, health_check: Option<&HealthCheck>) -> HealthStatus {
        match health_check {
            Some(check) => self.check(check).await,
            None => HealthStatus::Unknown,
        }
    }
}
