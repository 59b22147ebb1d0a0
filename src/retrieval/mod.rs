/// File retrieval with timeout-bounded, linearly backed-off retries
///
/// Wraps the resolver seam: every attempt races a timeout, failed attempts are
/// retried after `retry_delay * attempt`, and the last failure is returned
/// unchanged once attempts run out.
pub mod response;

use crate::{
    error::{ErrorCode, GatewayError, GatewayResult},
    identifier::Identifier,
    metrics,
    resolver::{FileResolver, Network, NetworkProbe, ResolveError, RetrievedFile},
};
use futures::future::join_all;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tracing::{debug, error, warn};

/// Retry and timeout knobs for resolver calls
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Limit for a single resolver attempt
    pub timeout: Duration,
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Base delay; attempt `n` waits `retry_delay * n` before the next one
    pub retry_delay: Duration,
}

/// Outcome of one item in a batch, in request order
#[derive(Debug)]
pub struct BatchEntry {
    pub uri: String,
    pub result: GatewayResult<(Identifier, RetrievedFile)>,
}

/// Facade over the resolver used by every file endpoint
#[derive(Clone)]
pub struct FileFetcher {
    resolver: Arc<dyn FileResolver>,
    policy: RetryPolicy,
}

impl FileFetcher {
    pub fn new(resolver: Arc<dyn FileResolver>, policy: RetryPolicy) -> Self {
        Self { resolver, policy }
    }

    /// Fetch a file, retrying failures and timeouts
    pub async fn fetch(
        &self,
        identifier: &Identifier,
        network: Network,
    ) -> GatewayResult<RetrievedFile> {
        let max_attempts = self.policy.max_attempts.max(1);
        let timeout_ms = self.policy.timeout.as_millis() as u64;
        let mut last_error = None;

        for attempt in 1..=max_attempts {
            let start = Instant::now();
            let outcome = match tokio::time::timeout(
                self.policy.timeout,
                self.resolver.resolve(identifier, network),
            )
            .await
            {
                Ok(Ok(file)) => Ok(file),
                Ok(Err(err)) => Err(GatewayError::from(err)),
                Err(_) => Err(GatewayError::timeout(timeout_ms)),
            };
            let elapsed = start.elapsed().as_secs_f64();

            match outcome {
                Ok(file) => {
                    metrics::record_resolve_attempt(network.as_str(), "success", elapsed);
                    debug!(
                        identifier = %identifier,
                        network = %network,
                        attempt,
                        size = file.size,
                        "ckbfs_file_resolved"
                    );

                    if file.content.is_empty() {
                        return Err(GatewayError::file_not_found(&identifier.raw)
                            .with_details("Resolver returned no content"));
                    }
                    return Ok(file);
                }
                Err(err) => {
                    metrics::record_resolve_attempt(network.as_str(), err.code.as_str(), elapsed);
                    warn!(
                        identifier = %identifier,
                        network = %network,
                        attempt,
                        max_attempts,
                        code = %err.code,
                        error = %err.message,
                        "ckbfs_fetch_attempt_failed"
                    );

                    last_error = Some(err);
                    if attempt < max_attempts {
                        tokio::time::sleep(self.policy.retry_delay * attempt).await;
                    }
                }
            }
        }

        let err = last_error
            .unwrap_or_else(|| GatewayError::internal("Fetch finished without an outcome"));
        error!(
            identifier = %identifier,
            network = %network,
            attempts = max_attempts,
            code = %err.code,
            "ckbfs_fetch_exhausted"
        );
        Err(err)
    }

    /// Fetch every URI concurrently; results keep the input order and a
    /// failing item never aborts the others
    pub async fn fetch_batch(&self, uris: &[String], network: Network) -> Vec<BatchEntry> {
        let tasks = uris.iter().map(|uri| async move {
            let result = match Identifier::parse(uri) {
                Ok(identifier) => self
                    .fetch(&identifier, network)
                    .await
                    .map(|file| (identifier, file)),
                Err(err) => Err(err),
            };
            BatchEntry {
                uri: uri.clone(),
                result,
            }
        });

        join_all(tasks).await
    }

    /// Probe chain connectivity, bounded by the per-attempt timeout
    pub async fn probe(&self, network: Network) -> Result<NetworkProbe, ResolveError> {
        match tokio::time::timeout(self.policy.timeout, self.resolver.probe(network)).await {
            Ok(result) => result,
            Err(_) => Err(ResolveError::Timeout(format!(
                "{} probe exceeded {}ms",
                network,
                self.policy.timeout.as_millis()
            ))),
        }
    }
}

/// Whether an error came from the resolver rather than from request validation
pub fn is_upstream_error(err: &GatewayError) -> bool {
    !matches!(
        err.code,
        ErrorCode::InvalidUri
            | ErrorCode::InvalidNetwork
            | ErrorCode::InvalidFormat
            | ErrorCode::MissingRequiredField
    )
}
