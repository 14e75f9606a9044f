//! services/api/src/web/state.rs
//!
//! Defines the application's shared state and the registry of in-progress
//! OTP login cycles.

use crate::config::Config;
use crate::web::cookie::SessionSigner;
use billing_portal_core::{
    domain::MenuItem,
    otp::{OtpLoginFlow, OtpPolicy},
    ports::{BackendService, IpLookupService, MapTokenService, OtpGateway},
    session::SessionManager,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Mutex as AsyncMutex;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub sessions: Arc<SessionManager>,
    pub signer: Arc<SessionSigner>,
    pub otp_gateway: Arc<dyn OtpGateway>,
    pub ip_lookup: Arc<dyn IpLookupService>,
    /// `None` when the map-provider credentials are not configured.
    pub map_token: Option<Arc<dyn MapTokenService>>,
    pub backend: Arc<dyn BackendService>,
    pub login_flows: Arc<LoginFlows>,
    pub menu: Arc<Vec<MenuItem>>,
}

//=========================================================================================
// LoginFlows (One OTP Login Cycle per Mobile Number)
//=========================================================================================

pub type SharedFlow = Arc<AsyncMutex<OtpLoginFlow>>;

/// Login cycles keyed by mobile number. The map lock is only held to look up
/// or insert; each flow has its own async lock for the duration of a relay call.
pub struct LoginFlows {
    policy: OtpPolicy,
    flows: Mutex<HashMap<String, SharedFlow>>,
}

impl LoginFlows {
    pub fn new(policy: OtpPolicy) -> Self {
        Self {
            policy,
            flows: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the flow for `mobile_number`, creating a fresh one if needed.
    pub fn get_or_create(&self, mobile_number: &str) -> SharedFlow {
        let mut flows = self.flows.lock().unwrap_or_else(|e| e.into_inner());
        flows
            .entry(mobile_number.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(OtpLoginFlow::new(self.policy))))
            .clone()
    }

    pub fn get(&self, mobile_number: &str) -> Option<SharedFlow> {
        let flows = self.flows.lock().unwrap_or_else(|e| e.into_inner());
        flows.get(mobile_number).cloned()
    }

    pub fn remove(&self, mobile_number: &str) {
        let mut flows = self.flows.lock().unwrap_or_else(|e| e.into_inner());
        flows.remove(mobile_number);
    }

    /// Drops cycles idle for longer than `max_idle`. Flows busy with a relay
    /// call are skipped.
    pub fn prune_idle(&self, max_idle: Duration) -> usize {
        let mut flows = self.flows.lock().unwrap_or_else(|e| e.into_inner());
        let before = flows.len();
        flows.retain(|_, flow| match flow.try_lock() {
            Ok(flow) => flow.idle_for() <= max_idle,
            Err(_) => true,
        });
        before - flows.len()
    }

    pub fn len(&self) -> usize {
        self.flows.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
