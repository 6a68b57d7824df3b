//! Health check executor implementation
//! Performs HTTP, TCP, and process-liveness health checks

use crate::domain::ports::HealthCheckExecutor;
use crate::domain::{HealthCheck, HealthCheckKind, HealthStatus};
use async_trait::async_trait;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;
use tracing::{debug, error, warn};

/// Standard health check executor
pub struct StandardHealthCheckExecutor;

impl StandardHealthCheckExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for StandardHealthCheckExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HealthCheckExecutor for StandardHealthCheckExecutor {
    async fn check(&self, config: &HealthCheck) -> HealthStatus {
        let timeout = config.timeout();

        match config.kind() {
            HealthCheckKind::Http => match config.url() {
                Some(url) => perform_http_check(url.to_string(), timeout).await,
                None => {
                    error!("HTTP health check missing url");
                    HealthStatus::Unhealthy
                }
            },
            HealthCheckKind::Tcp => match config.port() {
                Some(port) => perform_tcp_check(port, timeout).await,
                None => {
                    error!("TCP health check missing port");
                    HealthStatus::Unhealthy
                }
            },
            // The caller has already confirmed the process exists
            HealthCheckKind::Process => HealthStatus::Healthy,
        }
    }
}

/// HTTP GET; redirects are followed and any final 2xx/3xx counts as healthy
async fn perform_http_check(url: String, timeout: Duration) -> HealthStatus {
    debug!(url = %url, "Performing HTTP health check");

    // ureq is blocking, keep it off the runtime threads
    let result = tokio::task::spawn_blocking(move || {
        let agent = ureq::AgentBuilder::new().timeout(timeout).redirects(5).build();

        match agent.get(&url).call() {
            Ok(resp) => {
                let status = resp.status();
                debug!(status = status, "HTTP health check response");
                if (200..400).contains(&status) {
                    HealthStatus::Healthy
                } else {
                    HealthStatus::Unhealthy
                }
            }
            Err(ureq::Error::Status(code, _)) => {
                debug!(status = code, "HTTP health check failed with status");
                HealthStatus::Unhealthy
            }
            Err(e) => {
                debug!(error = %e, "HTTP health check error");
                HealthStatus::Unhealthy
            }
        }
    })
    .await;

    match result {
        Ok(status) => status,
        Err(e) => {
            warn!(error = %e, "HTTP health check task failed");
            HealthStatus::Unhealthy
        }
    }
}

async fn perform_tcp_check(port: u16, timeout: Duration) -> HealthStatus {
    let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, port));
    debug!(addr = %addr, "Performing TCP health check");

    match tokio::time::timeout(timeout, tokio::net::TcpStream::connect(addr)).await {
        Ok(Ok(_stream)) => HealthStatus::Healthy,
        Ok(Err(e)) => {
            debug!(addr = %addr, error = %e, "TCP health check connection failed");
            HealthStatus::Unhealthy
        }
        Err(_) => {
            debug!(addr = %addr, "TCP health check timed out");
            HealthStatus::Unhealthy
        }
    }
}
