/// In-memory resolver for tests and local demos
///
/// Files are keyed by the identifier's normalized form, so every surface form
/// of the same identifier finds the same file.
use super::{FileResolver, Network, NetworkProbe, ResolveError, RetrievedFile};
use crate::identifier::Identifier;
use async_trait::async_trait;
use std::{
    collections::{HashMap, HashSet},
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};
use tokio::sync::Mutex;

#[derive(Default)]
pub struct MemoryResolver {
    files: HashMap<String, RetrievedFile>,
    failures: HashMap<String, ResolveError>,
    /// Remaining transient failures per identifier
    transient: Mutex<HashMap<String, (u32, ResolveError)>>,
    latency: Option<Duration>,
    networks_down: HashSet<Network>,
    tip_block_number: u64,
    calls: AtomicUsize,
}

impl MemoryResolver {
    pub fn new() -> Self {
        Self {
            tip_block_number: 1,
            ..Default::default()
        }
    }

    fn key(uri: &str) -> String {
        Identifier::parse(uri)
            .map(|id| id.normalized())
            .unwrap_or_else(|_| uri.to_string())
    }

    /// Serve `file` for `uri`
    pub fn with_file(mut self, uri: &str, file: RetrievedFile) -> Self {
        self.files.insert(Self::key(uri), file);
        self
    }

    /// Always fail `uri` with `error`
    pub fn with_failure(mut self, uri: &str, error: ResolveError) -> Self {
        self.failures.insert(Self::key(uri), error);
        self
    }

    /// Fail the first `times` lookups of `uri`, then behave normally
    pub fn with_transient_failure(mut self, uri: &str, times: u32, error: ResolveError) -> Self {
        self.transient
            .get_mut()
            .insert(Self::key(uri), (times, error));
        self
    }

    /// Delay every resolve call
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Make probes of `network` fail
    pub fn with_network_down(mut self, network: Network) -> Self {
        self.networks_down.insert(network);
        self
    }

    pub fn with_tip_block_number(mut self, tip: u64) -> Self {
        self.tip_block_number = tip;
        self
    }

    /// Number of `resolve` invocations so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FileResolver for MemoryResolver {
    async fn resolve(
        &self,
        identifier: &Identifier,
        _network: Network,
    ) -> Result<RetrievedFile, ResolveError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let key = identifier.normalized();

        {
            let mut transient = self.transient.lock().await;
            if let Some((remaining, error)) = transient.get_mut(&key) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(error.clone());
                }
            }
        }

        if let Some(error) = self.failures.get(&key) {
            return Err(error.clone());
        }

        self.files
            .get(&key)
            .cloned()
            .ok_or_else(|| ResolveError::NotFound(format!("No file stored for {}", identifier)))
    }

    async fn probe(&self, network: Network) -> Result<NetworkProbe, ResolveError> {
        if self.networks_down.contains(&network) {
            return Err(ResolveError::Network(format!("{} is unreachable", network)));
        }
        Ok(NetworkProbe {
            tip_block_number: self.tip_block_number,
        })
    }
}
