pub mod auth_gateway;
pub mod backend;
pub mod db;
pub mod http;
pub mod ip_lookup;
pub mod map_token;
pub mod memory;

pub use auth_gateway::HttpOtpGateway;
pub use backend::HttpBackend;
pub use db::DbAdapter;
pub use ip_lookup::HttpIpLookup;
pub use map_token::HttpMapToken;
pub use memory::MemorySessionRepository;
