//! services/api/src/web/maintenance.rs
//!
//! Background housekeeping: drops idle OTP login cycles, sessions past their
//! lifetime and stale cached tokens. Stops when the shutdown token is cancelled.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::web::state::AppState;

pub const SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);
pub const LOGIN_FLOW_MAX_IDLE: Duration = Duration::from_secs(15 * 60);

pub fn spawn_maintenance(app_state: Arc<AppState>, shutdown: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Maintenance task stopped.");
                    return;
                }
                _ = ticker.tick() => sweep(&app_state).await,
            }
        }
    })
}

pub async fn sweep(app_state: &AppState) {
    let flows = app_state.login_flows.prune_idle(LOGIN_FLOW_MAX_IDLE);
    match app_state.sessions.purge_expired().await {
        Ok(sessions) => debug!(
            flows,
            sessions,
            open_flows = app_state.login_flows.len(),
            "Maintenance sweep done."
        ),
        Err(e) => error!("Failed to purge expired sessions: {}", e),
    }
}
