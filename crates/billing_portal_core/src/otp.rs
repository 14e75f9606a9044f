//! crates/billing_portal_core/src/otp.rs
//!
//! The two-step OTP login cycle: request a code for a mobile number, then
//! submit the 6-digit code. Resends are throttled by a cooldown and capped
//! per cycle; both limits are enforced before any upstream call is made.

use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use serde_json::Value;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::domain::{Session, SOURCE_TYPE};
use crate::ports::{OtpCredentials, OtpGateway, PortError, RelayReply};

pub const OTP_LENGTH: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OtpPolicy {
    pub resend_cooldown: Duration,
    pub max_resends: u32,
}

impl Default for OtpPolicy {
    fn default() -> Self {
        Self {
            resend_cooldown: Duration::from_secs(120),
            max_resends: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginState {
    EnteringMobileNumber,
    OtpRequested,
    Validating,
    Authenticated,
    /// The last code was rejected; another code may be entered.
    Failed { message: String },
}

#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    #[error("Enter a valid 10-digit mobile number")]
    InvalidMobileNumber,
    #[error("OTP must be 6 digits")]
    InvalidCode,
    #[error("Please wait {remaining_secs} seconds before requesting a new OTP")]
    ResendCooldown { remaining_secs: u64 },
    #[error("Maximum OTP resend attempts reached, restart the login")]
    ResendLimitReached,
    #[error("Cannot {action} while {state:?}")]
    WrongState {
        action: &'static str,
        state: LoginState,
    },
    #[error(transparent)]
    Upstream(#[from] PortError),
}

/// Whether a partially typed code is ready to submit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeEntry {
    Incomplete,
    Complete,
}

fn mobile_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[6-9][0-9]{9}$").expect("mobile number pattern is valid"))
}

/// Returns the trimmed number when it is a valid 10-digit mobile number.
pub fn validate_mobile_number(input: &str) -> Result<String, FlowError> {
    let number = input.trim();
    if mobile_pattern().is_match(number) {
        Ok(number.to_string())
    } else {
        Err(FlowError::InvalidMobileNumber)
    }
}

pub fn classify_code(code: &str) -> Result<CodeEntry, FlowError> {
    if !code.chars().all(|c| c.is_ascii_digit()) || code.len() > OTP_LENGTH {
        return Err(FlowError::InvalidCode);
    }
    if code.len() == OTP_LENGTH {
        Ok(CodeEntry::Complete)
    } else {
        Ok(CodeEntry::Incomplete)
    }
}

#[derive(Debug)]
pub struct OtpLoginFlow {
    policy: OtpPolicy,
    state: LoginState,
    mobile_number: Option<String>,
    resends_used: u32,
    cooldown_until: Option<Instant>,
    last_activity: Instant,
}

impl OtpLoginFlow {
    pub fn new(policy: OtpPolicy) -> Self {
        Self {
            policy,
            state: LoginState::EnteringMobileNumber,
            mobile_number: None,
            resends_used: 0,
            cooldown_until: None,
            last_activity: Instant::now(),
        }
    }

    pub fn state(&self) -> &LoginState {
        &self.state
    }

    pub fn mobile_number(&self) -> Option<&str> {
        self.mobile_number.as_deref()
    }

    pub fn resends_remaining(&self) -> u32 {
        self.policy.max_resends.saturating_sub(self.resends_used)
    }

    /// Time left before another OTP may be requested.
    pub fn cooldown_remaining(&self) -> Duration {
        self.cooldown_until
            .map(|until| until.saturating_duration_since(Instant::now()))
            .unwrap_or(Duration::ZERO)
    }

    /// Whole seconds left on the resend countdown, rounded up.
    pub fn countdown_secs(&self) -> u64 {
        let remaining = self.cooldown_remaining();
        remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0)
    }

    pub fn idle_for(&self) -> Duration {
        self.last_activity.elapsed()
    }

    /// Starts the cycle over, forgetting the number and the resend budget.
    pub fn restart(&mut self) {
        *self = Self::new(self.policy);
    }

    pub async fn request_otp(
        &mut self,
        gateway: &dyn OtpGateway,
        mobile_number: &str,
    ) -> Result<RelayReply<Value>, FlowError> {
        if self.state != LoginState::EnteringMobileNumber {
            return Err(self.wrong_state("request an OTP"));
        }
        let number = validate_mobile_number(mobile_number)?;
        self.touch();

        let reply = gateway.send_otp(&number).await.inspect_err(|e| {
            warn!("OTP request failed: {}", e);
        })?;

        self.mobile_number = Some(number);
        self.state = LoginState::OtpRequested;
        self.start_cooldown();
        info!("OTP requested.");
        Ok(reply)
    }

    /// Sends a new OTP to the number already on file. Every attempt counts
    /// against the resend budget, successful or not.
    pub async fn resend_otp(
        &mut self,
        gateway: &dyn OtpGateway,
    ) -> Result<RelayReply<Value>, FlowError> {
        if !matches!(self.state, LoginState::OtpRequested | LoginState::Failed { .. }) {
            return Err(self.wrong_state("resend an OTP"));
        }
        if self.resends_used >= self.policy.max_resends {
            return Err(FlowError::ResendLimitReached);
        }
        let remaining_secs = self.countdown_secs();
        if remaining_secs > 0 {
            return Err(FlowError::ResendCooldown { remaining_secs });
        }
        let Some(number) = self.mobile_number.clone() else {
            return Err(self.wrong_state("resend an OTP"));
        };

        self.resends_used += 1;
        self.touch();
        let reply = gateway.send_otp(&number).await?;
        self.state = LoginState::OtpRequested;
        self.start_cooldown();
        info!(resends_remaining = self.resends_remaining(), "OTP resent.");
        Ok(reply)
    }

    /// Feeds the code as typed so far. Submits exactly when it reaches
    /// `OTP_LENGTH` digits; shorter input returns `Ok(None)` untouched.
    pub async fn enter_code(
        &mut self,
        gateway: &dyn OtpGateway,
        code: &str,
        ip_address: &str,
    ) -> Result<Option<RelayReply<Session>>, FlowError> {
        match classify_code(code)? {
            CodeEntry::Incomplete => Ok(None),
            CodeEntry::Complete => self.submit_otp(gateway, code, ip_address).await.map(Some),
        }
    }

    pub async fn submit_otp(
        &mut self,
        gateway: &dyn OtpGateway,
        code: &str,
        ip_address: &str,
    ) -> Result<RelayReply<Session>, FlowError> {
        if !matches!(self.state, LoginState::OtpRequested | LoginState::Failed { .. }) {
            return Err(self.wrong_state("submit an OTP"));
        }
        if classify_code(code)? != CodeEntry::Complete {
            return Err(FlowError::InvalidCode);
        }
        let Some(number) = self.mobile_number.clone() else {
            return Err(self.wrong_state("submit an OTP"));
        };

        self.touch();
        let credentials = OtpCredentials {
            mobile_number: number,
            otp: code.to_string(),
            ip_address: ip_address.to_string(),
            source_type: SOURCE_TYPE,
        };

        let validating = ValidationGuard::enter(&mut self.state);
        match gateway.authenticate(&credentials).await {
            Ok(reply) => {
                validating.settle(LoginState::Authenticated);
                self.cooldown_until = None;
                Ok(reply)
            }
            Err(e) => {
                warn!("OTP validation failed: {}", e);
                validating.settle(LoginState::Failed {
                    message: upstream_message(&e),
                });
                Err(e.into())
            }
        }
    }

    fn start_cooldown(&mut self) {
        self.cooldown_until = Some(Instant::now() + self.policy.resend_cooldown);
    }

    fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    fn wrong_state(&self, action: &'static str) -> FlowError {
        FlowError::WrongState {
            action,
            state: self.state.clone(),
        }
    }
}

/// Holds the flow in `Validating` while the auth backend is consulted. If the
/// call is dropped before it settles, the flow falls back to `Failed` with the
/// number and resend budget intact.
struct ValidationGuard<'a> {
    state: &'a mut LoginState,
    settled: bool,
}

impl<'a> ValidationGuard<'a> {
    fn enter(state: &'a mut LoginState) -> Self {
        *state = LoginState::Validating;
        Self {
            state,
            settled: false,
        }
    }

    fn settle(mut self, next: LoginState) {
        *self.state = next;
        self.settled = true;
    }
}

impl Drop for ValidationGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            warn!("OTP validation abandoned before the auth backend answered.");
            *self.state = LoginState::Failed {
                message: "OTP validation was interrupted".to_string(),
            };
        }
    }
}

fn upstream_message(error: &PortError) -> String {
    match error {
        PortError::Upstream { message, .. } => message.clone(),
        other => other.to_string(),
    }
}
