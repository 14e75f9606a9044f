//! crates/billing_portal_core/src/domain.rs
//!
//! Defines the pure, core data structures for the portal: the authenticated
//! session, the token cache entry, the typed page/action identifiers and the
//! static navigation tree.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fixed source-channel tag forwarded with every OTP relay call.
pub const SOURCE_TYPE: &str = "PORTAL";

/// Route the browser is sent to after a successful login.
pub const DASHBOARD_PATH: &str = "/dashboard";

//=========================================================================================
// Session
//=========================================================================================

/// The authenticated user as returned by the auth backend after OTP validation.
///
/// Field names follow the backend's camelCase payload so the same shape can be
/// deserialized from the relay and handed back to the browser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub user_name: String,
    /// Numeric user id used by the backend REST API.
    pub user_id: i64,
    pub access_token: String,
    pub refresh_token: String,
    /// Tenant (distribution company) the user belongs to.
    pub discom_id: i64,
    pub role_id: i64,
    #[serde(default)]
    pub last_login_at: Option<String>,
    /// Ordered as delivered; only membership matters for access checks.
    #[serde(default, rename = "userScopes")]
    pub scopes: Vec<String>,
    /// Unix timestamp in milliseconds.
    #[serde(default)]
    pub token_expiry: Option<i64>,
}

impl Session {
    pub fn token_entry(&self) -> TokenCacheEntry {
        TokenCacheEntry {
            access_token: self.access_token.clone(),
            expiry: self.token_expiry,
        }
    }
}

/// A session as it is kept by a `SessionRepository`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedSession {
    pub session_id: String,
    pub session: Session,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl PersistedSession {
    pub fn is_past_lifetime(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

//=========================================================================================
// Token Cache Entry
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenCacheEntry {
    pub access_token: String,
    /// Unix timestamp in milliseconds. `None` is treated as already expired.
    pub expiry: Option<i64>,
}

impl TokenCacheEntry {
    pub fn is_expired(&self, now_millis: i64) -> bool {
        match self.expiry {
            Some(expiry) => now_millis >= expiry,
            None => true,
        }
    }
}

/// Current wall-clock time as Unix milliseconds.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

//=========================================================================================
// Page and Action Identifiers
//=========================================================================================

/// Every page of the portal, keyed by its route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Page {
    Dashboard,
    CollectorType,
    ColorCoding,
    Users,
    ModeOfPayment,
    NonEnergyType,
    OfficeStructure,
    Agencies,
    Agents,
    AgentWallet,
    CollectionReport,
    BillUploadHistory,
    AgencyWiseCollection,
    AgentWiseCollection,
    SupervisorCollection,
}

impl Page {
    pub const ALL: [Page; 15] = [
        Page::Dashboard,
        Page::CollectorType,
        Page::ColorCoding,
        Page::Users,
        Page::ModeOfPayment,
        Page::NonEnergyType,
        Page::OfficeStructure,
        Page::Agencies,
        Page::Agents,
        Page::AgentWallet,
        Page::CollectionReport,
        Page::BillUploadHistory,
        Page::AgencyWiseCollection,
        Page::AgentWiseCollection,
        Page::SupervisorCollection,
    ];

    pub fn path(self) -> &'static str {
        match self {
            Page::Dashboard => DASHBOARD_PATH,
            Page::CollectorType => "/admin/collector-type",
            Page::ColorCoding => "/admin/color-coding",
            Page::Users => "/admin/users",
            Page::ModeOfPayment => "/admin/mode-of-payment",
            Page::NonEnergyType => "/admin/non-energy-type",
            Page::OfficeStructure => "/admin/office-structure",
            Page::Agencies => "/agency/agencies",
            Page::Agents => "/agency/agents",
            Page::AgentWallet => "/agency/agent-wallet",
            Page::CollectionReport => "/reports/collection",
            Page::BillUploadHistory => "/reports/bill-upload-history",
            Page::AgencyWiseCollection => "/reports/agency-wise-collection",
            Page::AgentWiseCollection => "/reports/agent-wise-collection",
            Page::SupervisorCollection => "/reports/supervisor-collection",
        }
    }

    pub fn from_path(path: &str) -> Option<Page> {
        Page::ALL.into_iter().find(|page| page.path() == path)
    }
}

impl AsRef<str> for Page {
    fn as_ref(&self) -> &str {
        self.path()
    }
}

/// Actions gated by their own scope rather than by a page path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    DashboardBillUploadHistory,
    AgencyCreate,
    AgencyRecharge,
    AgentCreate,
    ColorCodingEdit,
}

impl Action {
    pub fn scope(self) -> &'static str {
        match self {
            Action::DashboardBillUploadHistory => "dashboardBillUploadHistory",
            Action::AgencyCreate => "agencyCreate",
            Action::AgencyRecharge => "agencyRecharge",
            Action::AgentCreate => "agentCreate",
            Action::ColorCodingEdit => "colorCodingEdit",
        }
    }
}

impl AsRef<str> for Action {
    fn as_ref(&self) -> &str {
        self.scope()
    }
}

//=========================================================================================
// Menu Items
//=========================================================================================

/// A node of the static navigation tree. Leaves carry a `url`; groups carry
/// children and may carry a landing `url` of their own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuItem {
    pub title: String,
    pub url: Option<String>,
    pub icon: Option<String>,
    pub children: Vec<MenuItem>,
    /// Never rendered, whatever the scopes say.
    pub force_hidden: bool,
}

impl MenuItem {
    pub fn link(title: &str, page: Page) -> Self {
        Self {
            title: title.to_string(),
            url: Some(page.path().to_string()),
            icon: None,
            children: Vec::new(),
            force_hidden: false,
        }
    }

    pub fn group(title: &str, icon: &str, children: Vec<MenuItem>) -> Self {
        Self {
            title: title.to_string(),
            url: None,
            icon: Some(icon.to_string()),
            children,
            force_hidden: false,
        }
    }

    pub fn with_icon(mut self, icon: &str) -> Self {
        self.icon = Some(icon.to_string());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.force_hidden = true;
        self
    }

    /// URLs of every descendant, depth first.
    pub fn descendant_urls(&self) -> Vec<&str> {
        let mut urls = Vec::new();
        for child in &self.children {
            if let Some(url) = child.url.as_deref() {
                urls.push(url);
            }
            urls.extend(child.descendant_urls());
        }
        urls
    }
}

/// The portal's navigation tree.
pub fn portal_menu() -> Vec<MenuItem> {
    vec![
        MenuItem::link("Dashboard", Page::Dashboard).with_icon("dashboard"),
        MenuItem::group(
            "Admin",
            "settings",
            vec![
                MenuItem::link("Collector Type", Page::CollectorType),
                MenuItem::link("Color Coding", Page::ColorCoding),
                MenuItem::link("Users", Page::Users),
                MenuItem::link("Mode of Payment", Page::ModeOfPayment),
                MenuItem::link("Non Energy Type", Page::NonEnergyType),
                MenuItem::link("Office Structure", Page::OfficeStructure),
            ],
        ),
        MenuItem::group(
            "Agency Management",
            "groups",
            vec![
                MenuItem::link("Agencies", Page::Agencies),
                MenuItem::link("Agents", Page::Agents),
                MenuItem::link("Agent Wallet", Page::AgentWallet).hidden(),
            ],
        ),
        MenuItem::group(
            "Reports",
            "assessment",
            vec![
                MenuItem::link("Collection", Page::CollectionReport),
                MenuItem::link("Bill Upload History", Page::BillUploadHistory),
                MenuItem::group(
                    "Collection Breakdown",
                    "table",
                    vec![
                        MenuItem::link("Agency Wise", Page::AgencyWiseCollection),
                        MenuItem::link("Agent Wise", Page::AgentWiseCollection),
                        MenuItem::link("Supervisor Wise", Page::SupervisorCollection),
                    ],
                ),
            ],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_expiry_is_expired() {
        let entry = TokenCacheEntry {
            access_token: "t".to_string(),
            expiry: None,
        };
        assert!(entry.is_expired(0));
    }

    #[test]
    fn expiry_is_exclusive_upper_bound() {
        let entry = TokenCacheEntry {
            access_token: "t".to_string(),
            expiry: Some(1_000),
        };
        assert!(!entry.is_expired(999));
        assert!(entry.is_expired(1_000));
    }

    #[test]
    fn session_reads_backend_payload() {
        let json = r#"{
            "id": "u-17",
            "userName": "Field Admin",
            "userId": 17,
            "accessToken": "acc",
            "refreshToken": "ref",
            "discomId": 3,
            "roleId": 2,
            "userScopes": ["/admin/users", "dashboardBillUploadHistory"],
            "tokenExpiry": 1893456000000
        }"#;
        let session: Session = serde_json::from_str(json).unwrap();
        assert_eq!(session.user_id, 17);
        assert_eq!(session.scopes.len(), 2);
        assert_eq!(session.last_login_at, None);
        assert_eq!(session.token_entry().expiry, Some(1_893_456_000_000));
    }

    #[test]
    fn page_paths_round_trip() {
        for page in Page::ALL {
            assert_eq!(Page::from_path(page.path()), Some(page));
        }
        assert_eq!(Page::from_path("/nowhere"), None);
    }

    #[test]
    fn descendant_urls_walk_nested_groups() {
        let menu = portal_menu();
        let reports = menu.iter().find(|m| m.title == "Reports").unwrap();
        let urls = reports.descendant_urls();
        assert!(urls.contains(&"/reports/collection"));
        assert!(urls.contains(&"/reports/supervisor-collection"));
    }
}
