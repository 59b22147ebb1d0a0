/// Configuration management for the CKBFS gateway
use crate::{
    error::{GatewayError, GatewayResult},
    resolver::{GatewayResolverConfig, Network},
    retrieval::RetryPolicy,
};
use serde::{Deserialize, Serialize};
use std::{env, str::FromStr, time::Duration};

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub networks: NetworkConfig,
    pub retrieval: RetrievalConfig,
    pub rate_limit: RateLimitConfig,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    pub version: String,
    /// Allowed CORS origin, `*` for any
    pub cors_origin: String,
}

/// Chain and resolver endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Network used when a request does not name one
    pub default_network: Network,
    pub mainnet_rpc_url: String,
    pub testnet_rpc_url: String,
    /// Base URL of the external CKBFS resolver
    pub resolver_url: String,
}

/// Timeout and retry knobs around resolver calls
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    pub timeout_ms: u64,
    pub max_attempts: u32,
    pub retry_delay_ms: u64,
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub requests_per_minute: u32,
    pub burst: u32,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            service: ServiceConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
                version: env!("CARGO_PKG_VERSION").to_string(),
                cors_origin: "*".to_string(),
            },
            networks: NetworkConfig {
                default_network: Network::Testnet,
                mainnet_rpc_url: "https://mainnet.ckb.dev/rpc".to_string(),
                testnet_rpc_url: "https://testnet.ckb.dev/rpc".to_string(),
                resolver_url: "http://127.0.0.1:8114".to_string(),
            },
            retrieval: RetrievalConfig {
                timeout_ms: 30_000,
                max_attempts: 3,
                retry_delay_ms: 1_000,
            },
            rate_limit: RateLimitConfig {
                enabled: true,
                requests_per_minute: 100,
                burst: 20,
            },
            logging: LoggingConfig {
                level: "ckbfs_gateway=debug,tower_http=debug".to_string(),
            },
        }
    }
}

/// Read an env var and parse it, falling back to `default` when unset or malformed
fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> GatewayResult<Self> {
        dotenv::dotenv().ok();
        let defaults = Self::default();

        let host = env::var("CKBFS_HOST").unwrap_or(defaults.service.host);
        let port = match env::var("CKBFS_PORT") {
            Ok(value) => value.trim().parse().map_err(|_| {
                GatewayError::internal(format!("Invalid port number: {}", value))
            })?,
            Err(_) => defaults.service.port,
        };
        let cors_origin = env::var("CKBFS_CORS_ORIGIN").unwrap_or(defaults.service.cors_origin);

        let default_network = match env::var("CKBFS_DEFAULT_NETWORK") {
            Ok(value) => value.trim().parse::<Network>()?,
            Err(_) => defaults.networks.default_network,
        };
        let mainnet_rpc_url =
            env::var("CKBFS_MAINNET_RPC_URL").unwrap_or(defaults.networks.mainnet_rpc_url);
        let testnet_rpc_url =
            env::var("CKBFS_TESTNET_RPC_URL").unwrap_or(defaults.networks.testnet_rpc_url);
        let resolver_url = env::var("CKBFS_RESOLVER_URL").unwrap_or(defaults.networks.resolver_url);

        let timeout_ms = env_or("CKBFS_TIMEOUT_MS", defaults.retrieval.timeout_ms);
        let max_attempts = env_or("CKBFS_MAX_ATTEMPTS", defaults.retrieval.max_attempts);
        let retry_delay_ms = env_or("CKBFS_RETRY_DELAY_MS", defaults.retrieval.retry_delay_ms);

        let rate_limit_enabled = env_or("CKBFS_RATE_LIMIT_ENABLED", defaults.rate_limit.enabled);
        let requests_per_minute = env_or(
            "CKBFS_RATE_LIMIT_PER_MINUTE",
            defaults.rate_limit.requests_per_minute,
        );
        let burst = env_or("CKBFS_RATE_LIMIT_BURST", defaults.rate_limit.burst);

        let log_level = env::var("RUST_LOG").unwrap_or(defaults.logging.level);

        Ok(ServerConfig {
            service: ServiceConfig {
                host,
                port,
                version: defaults.service.version,
                cors_origin,
            },
            networks: NetworkConfig {
                default_network,
                mainnet_rpc_url,
                testnet_rpc_url,
                resolver_url,
            },
            retrieval: RetrievalConfig {
                timeout_ms,
                max_attempts,
                retry_delay_ms,
            },
            rate_limit: RateLimitConfig {
                enabled: rate_limit_enabled,
                requests_per_minute,
                burst,
            },
            logging: LoggingConfig { level: log_level },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> GatewayResult<()> {
        if self.service.host.is_empty() {
            return Err(GatewayError::internal("Host cannot be empty"));
        }

        if self.networks.resolver_url.trim().is_empty() {
            return Err(GatewayError::internal("Resolver URL cannot be empty"));
        }

        if self.retrieval.timeout_ms == 0 {
            return Err(GatewayError::internal("Timeout must be greater than zero"));
        }

        if self.retrieval.max_attempts == 0 {
            return Err(GatewayError::internal(
                "Max attempts must be at least 1",
            ));
        }

        if self.rate_limit.enabled && self.rate_limit.requests_per_minute == 0 {
            return Err(GatewayError::internal(
                "Rate limit must allow at least one request per minute",
            ));
        }

        Ok(())
    }

    /// Retry policy for the file fetcher
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            timeout: Duration::from_millis(self.retrieval.timeout_ms),
            max_attempts: self.retrieval.max_attempts,
            retry_delay: Duration::from_millis(self.retrieval.retry_delay_ms),
        }
    }

    /// Settings for the upstream resolver client
    pub fn resolver_config(&self) -> GatewayResolverConfig {
        GatewayResolverConfig {
            resolver_url: self.networks.resolver_url.clone(),
            mainnet_rpc_url: self.networks.mainnet_rpc_url.clone(),
            testnet_rpc_url: self.networks.testnet_rpc_url.clone(),
            ..GatewayResolverConfig::default()
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.service.host, self.service.port)
    }
}
