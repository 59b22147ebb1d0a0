/// CKBFS Gateway
///
/// HTTP gateway that resolves CKBFS identifiers to files stored on the
/// Nervos CKB chain and serves them as JSON envelopes or raw bytes.
pub mod api;
pub mod config;
pub mod content;
pub mod context;
pub mod error;
pub mod identifier;
pub mod metrics;
pub mod rate_limit;
pub mod resolver;
pub mod retrieval;
pub mod server;

pub use config::ServerConfig;
pub use context::AppContext;
pub use error::{ErrorCode, GatewayError, GatewayResult};
