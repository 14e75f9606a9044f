pub mod access;
pub mod domain;
pub mod menu;
pub mod otp;
pub mod ports;
pub mod session;
pub mod token_store;

pub use access::{
    has_action_access, has_page_access, hide_menu_accordion_item, ScopeSet, PUBLIC_PAGES,
};
pub use domain::{
    portal_menu, Action, MenuItem, Page, PersistedSession, Session, TokenCacheEntry,
    DASHBOARD_PATH, SOURCE_TYPE,
};
pub use menu::{build_menu, RenderedMenuItem};
pub use otp::{FlowError, LoginState, OtpLoginFlow, OtpPolicy};
pub use ports::{
    BackendMethod, BackendRequest, BackendResponse, BackendService, IpLookupService,
    MapTokenService, OtpCredentials, OtpGateway, PortError, PortResult, RelayReply,
    SessionRepository,
};
pub use session::{session_scopes, SessionManager};
pub use token_store::TokenStore;
