//! stackvisor
//!
//! Loads a group definition, starts it, and supervises it until Ctrl-C.
//!
//! ```text
//! stackvisor <group.yaml>
//! ```
//!
//! Configuration comes from `SV_*` environment variables, or from the YAML
//! file named by `SV_CONFIG_FILE`.

use std::collections::HashMap;
use std::time::Duration;
use sv_engine::{init_tracing, GroupFile, Orchestrator, ServerConfig, UnitState};
use tracing::{error, info, warn};

const STATUS_POLL_INTERVAL: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ServerConfig::resolve()?;
    init_tracing(&config.log_level);

    let Some(path) = std::env::args().nth(1) else {
        eprintln!("usage: stackvisor <group.yaml>");
        std::process::exit(2);
    };

    let orchestrator = Orchestrator::from_config(&config)?;
    let (id, draft) = GroupFile::load(&path)?.into_draft();
    let group = match id {
        Some(id) => orchestrator.upsert_group(&id, draft).await?,
        None => orchestrator.create_group(draft).await?,
    };
    info!(group = %group.id(), name = %group.name(), file = %path, "Group loaded");

    for result in orchestrator.start_group(group.id(), None).await? {
        if result.success {
            info!(unit = %result.unit_id, pid = ?result.pid, port = ?result.port, "{}", result.message);
        } else {
            error!(unit = %result.unit_id, "{}", result.message);
        }
    }

    let mut last: HashMap<String, UnitState> = HashMap::new();
    let mut ticker = tokio::time::interval(STATUS_POLL_INTERVAL);
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = ticker.tick() => {
                match orchestrator.get_status(group.id(), None).await {
                    Ok(views) => {
                        for view in views {
                            if last.get(&view.unit_id) != Some(&view.state) {
                                info!(
                                    unit = %view.unit_id,
                                    state = %view.state,
                                    pid = ?view.pid,
                                    health = ?view.health,
                                    error = ?view.error,
                                    "Unit state changed"
                                );
                                last.insert(view.unit_id, view.state);
                            }
                        }
                    }
                    Err(e) => warn!(error = %e, "Status poll failed"),
                }
            }
        }
    }

    info!("Shutdown requested, stopping all units");
    for result in orchestrator.shutdown_all().await {
        if !result.success {
            warn!(unit = %result.unit_id, "{}", result.message);
        }
    }
    Ok(())
}
