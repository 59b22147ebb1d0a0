/// Application context and dependency injection
use crate::{
    config::ServerConfig,
    error::{GatewayError, GatewayResult},
    rate_limit::RateLimiter,
    resolver::{FileResolver, GatewayResolver, Network},
    retrieval::FileFetcher,
};
use std::{sync::Arc, time::Instant};

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub fetcher: FileFetcher,
    pub rate_limiter: Arc<RateLimiter>,
    pub started_at: Instant,
}

impl AppContext {
    /// Create a new application context backed by the upstream resolver
    pub fn new(config: ServerConfig) -> GatewayResult<Self> {
        config.validate()?;

        let resolver = GatewayResolver::new(config.resolver_config())
            .map_err(|e| GatewayError::internal(format!("Failed to build resolver: {}", e)))?;

        tracing::info!(
            resolver_url = %config.networks.resolver_url,
            default_network = %config.networks.default_network,
            "resolver_configured"
        );

        Ok(Self::with_resolver(config, Arc::new(resolver)))
    }

    /// Create a context around any resolver implementation
    pub fn with_resolver(config: ServerConfig, resolver: Arc<dyn FileResolver>) -> Self {
        let fetcher = FileFetcher::new(resolver, config.retry_policy());
        let rate_limiter = Arc::new(RateLimiter::new(&config.rate_limit));

        Self {
            config: Arc::new(config),
            fetcher,
            rate_limiter,
            started_at: Instant::now(),
        }
    }

    pub fn default_network(&self) -> Network {
        self.config.networks.default_network
    }

    pub fn uptime_seconds(&self) -> f64 {
        self.started_at.elapsed().as_secs_f64()
    }
}
