pub mod access;
pub mod backend;
pub mod cookie;
pub mod maintenance;
pub mod map_token;
pub mod middleware;
pub mod otp;
pub mod response;
pub mod rest;
pub mod router;
pub mod session;
pub mod state;

// Re-export the router builder to make it easily accessible
// to the binary that starts the web server.
pub use middleware::require_auth;
pub use router::build_router;
