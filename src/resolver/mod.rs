/// Resolver seam - the only place chain data enters the gateway
///
/// Locating a CKBFS file on chain, walking its back-links and verifying its
/// checksum all happen behind `FileResolver`. The gateway only sees the
/// finished `RetrievedFile` or a categorized `ResolveError`.
pub mod gateway;
pub mod memory;

use crate::{
    error::{GatewayError, GatewayResult},
    identifier::Identifier,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error;

pub use gateway::{GatewayResolver, GatewayResolverConfig};
pub use memory::MemoryResolver;

/// CKB network a request targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Testnet,
}

impl Network {
    pub const ALL: [Network; 2] = [Network::Mainnet, Network::Testnet];

    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Testnet => "testnet",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = GatewayError;

    fn from_str(s: &str) -> GatewayResult<Self> {
        match s {
            "mainnet" => Ok(Network::Mainnet),
            "testnet" => Ok(Network::Testnet),
            other => Err(GatewayError::invalid_network(other)),
        }
    }
}

/// Reference from one file chunk to the chunk before it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackLink {
    pub tx_hash: String,
    pub index: u32,
}

/// A file as returned by the resolver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievedFile {
    pub filename: String,
    pub content_type: String,
    pub size: u64,
    pub content: Vec<u8>,
    pub checksum: Option<u32>,
    pub back_links: Vec<BackLink>,
}

impl RetrievedFile {
    pub fn new(
        filename: impl Into<String>,
        content_type: impl Into<String>,
        content: Vec<u8>,
    ) -> Self {
        Self {
            filename: filename.into(),
            content_type: content_type.into(),
            size: content.len() as u64,
            content,
            checksum: None,
            back_links: Vec::new(),
        }
    }

    pub fn with_checksum(mut self, checksum: u32) -> Self {
        self.checksum = Some(checksum);
        self
    }

    pub fn with_back_links(mut self, back_links: Vec<BackLink>) -> Self {
        self.back_links = back_links;
        self
    }
}

/// Chain connectivity snapshot returned by a probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkProbe {
    pub tip_block_number: u64,
}

/// Categorized resolver failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// Nothing is stored under the identifier
    #[error("not found: {0}")]
    NotFound(String),

    /// On-chain data exists but could not be decoded
    #[error("decode error: {0}")]
    Decode(String),

    /// Chain node or upstream unreachable
    #[error("network error: {0}")]
    Network(String),

    /// Upstream did not answer in time
    #[error("timeout: {0}")]
    Timeout(String),

    /// Anything else; classified by message at the boundary
    #[error("{0}")]
    Other(String),
}

/// External collaborator that turns identifiers into files
#[async_trait]
pub trait FileResolver: Send + Sync {
    /// Resolve an identifier on the given network
    async fn resolve(
        &self,
        identifier: &Identifier,
        network: Network,
    ) -> Result<RetrievedFile, ResolveError>;

    /// Check connectivity to the given network
    async fn probe(&self, network: Network) -> Result<NetworkProbe, ResolveError>;
}
