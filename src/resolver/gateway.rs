/// Upstream resolver - fetches decoded CKBFS files over HTTP
///
/// File decoding is done by an external CKBFS resolver service; connectivity
/// probes talk JSON-RPC directly to a CKB node for each network.
use super::{BackLink, FileResolver, Network, NetworkProbe, ResolveError, RetrievedFile};
use crate::identifier::{Identifier, IdentifierKind};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

/// Upstream resolver configuration
#[derive(Debug, Clone)]
pub struct GatewayResolverConfig {
    /// Base URL of the CKBFS resolver service
    pub resolver_url: String,
    /// CKB node JSON-RPC endpoint for mainnet
    pub mainnet_rpc_url: String,
    /// CKB node JSON-RPC endpoint for testnet
    pub testnet_rpc_url: String,
    /// User-Agent header for HTTP requests
    pub user_agent: String,
    /// Transport-level timeout; the fetcher applies its own per-attempt limit on top
    pub request_timeout: Duration,
}

impl Default for GatewayResolverConfig {
    fn default() -> Self {
        Self {
            resolver_url: "http://127.0.0.1:8114".to_string(),
            mainnet_rpc_url: "https://mainnet.ckb.dev/rpc".to_string(),
            testnet_rpc_url: "https://testnet.ckb.dev/rpc".to_string(),
            user_agent: format!("ckbfs-gateway/{}", env!("CARGO_PKG_VERSION")),
            request_timeout: Duration::from_secs(60),
        }
    }
}

/// File payload as served by the resolver service
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpstreamFile {
    filename: String,
    content_type: String,
    /// base64-encoded file bytes
    content: String,
    size: Option<u64>,
    checksum: Option<u32>,
    #[serde(default)]
    back_links: Vec<BackLink>,
}

impl UpstreamFile {
    fn into_file(self) -> Result<RetrievedFile, ResolveError> {
        let content = BASE64
            .decode(self.content.as_bytes())
            .map_err(|e| ResolveError::Decode(format!("Invalid base64 content: {}", e)))?;

        if let Some(size) = self.size {
            if size != content.len() as u64 {
                return Err(ResolveError::Decode(format!(
                    "Declared size {} does not match content length {}",
                    size,
                    content.len()
                )));
            }
        }

        let mut file = RetrievedFile::new(self.filename, self.content_type, content)
            .with_back_links(self.back_links);
        file.checksum = self.checksum;
        Ok(file)
    }
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<String>,
    error: Option<serde_json::Value>,
}

/// Production resolver backed by HTTP services
#[derive(Clone)]
pub struct GatewayResolver {
    http_client: reqwest::Client,
    config: GatewayResolverConfig,
}

impl GatewayResolver {
    pub fn new(config: GatewayResolverConfig) -> Result<Self, ResolveError> {
        let http_client = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ResolveError::Other(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            config,
        })
    }

    /// Resolver service URL for an identifier
    fn file_url(&self, identifier: &Identifier, network: Network) -> String {
        let base = self.config.resolver_url.trim_end_matches('/');
        match &identifier.kind {
            IdentifierKind::OutPoint { tx_hash, index } => {
                format!("{}/{}/outpoint/{}/{}", base, network, tx_hash, index)
            }
            IdentifierKind::TypeId { type_id } => {
                format!("{}/{}/typeid/{}", base, network, type_id)
            }
        }
    }

    fn rpc_url(&self, network: Network) -> &str {
        match network {
            Network::Mainnet => &self.config.mainnet_rpc_url,
            Network::Testnet => &self.config.testnet_rpc_url,
        }
    }
}

fn map_transport_error(err: reqwest::Error) -> ResolveError {
    if err.is_timeout() {
        ResolveError::Timeout(err.to_string())
    } else if err.is_connect() || err.is_request() {
        ResolveError::Network(err.to_string())
    } else if err.is_decode() {
        ResolveError::Decode(err.to_string())
    } else {
        ResolveError::Other(err.to_string())
    }
}

/// Parse a `0x`-prefixed hex quantity as returned by CKB RPC
fn parse_block_number(value: &str) -> Result<u64, ResolveError> {
    let digits = value.strip_prefix("0x").unwrap_or(value);
    u64::from_str_radix(digits, 16)
        .map_err(|e| ResolveError::Decode(format!("Invalid block number {}: {}", value, e)))
}

#[async_trait]
impl FileResolver for GatewayResolver {
    async fn resolve(
        &self,
        identifier: &Identifier,
        network: Network,
    ) -> Result<RetrievedFile, ResolveError> {
        let url = self.file_url(identifier, network);
        debug!(url = %url, "resolving_ckbfs_file");

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(map_transport_error)?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::NOT_FOUND => {
                return Err(ResolveError::NotFound(format!(
                    "No CKBFS data for {}",
                    identifier
                )))
            }
            StatusCode::UNPROCESSABLE_ENTITY => {
                let body = response.text().await.unwrap_or_default();
                return Err(ResolveError::Decode(body));
            }
            StatusCode::GATEWAY_TIMEOUT | StatusCode::REQUEST_TIMEOUT => {
                return Err(ResolveError::Timeout(format!(
                    "Resolver returned {}",
                    response.status()
                )))
            }
            StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE => {
                return Err(ResolveError::Network(format!(
                    "Resolver returned {}",
                    response.status()
                )))
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                return Err(ResolveError::Other(format!(
                    "Resolver returned {}: {}",
                    status, body
                )));
            }
        }

        let upstream: UpstreamFile = response
            .json()
            .await
            .map_err(|e| ResolveError::Decode(format!("Invalid resolver response: {}", e)))?;

        upstream.into_file()
    }

    async fn probe(&self, network: Network) -> Result<NetworkProbe, ResolveError> {
        let body = json!({
            "id": 1,
            "jsonrpc": "2.0",
            "method": "get_tip_block_number",
            "params": []
        });

        let response = self
            .http_client
            .post(self.rpc_url(network))
            .json(&body)
            .send()
            .await
            .map_err(map_transport_error)?;

        if !response.status().is_success() {
            return Err(ResolveError::Network(format!(
                "{} RPC returned {}",
                network,
                response.status()
            )));
        }

        let rpc: RpcResponse = response
            .json()
            .await
            .map_err(|e| ResolveError::Decode(format!("Invalid RPC response: {}", e)))?;

        if let Some(error) = rpc.error {
            return Err(ResolveError::Other(format!("RPC error: {}", error)));
        }

        let tip = rpc
            .result
            .ok_or_else(|| ResolveError::Decode("RPC response has no result".to_string()))?;

        Ok(NetworkProbe {
            tip_block_number: parse_block_number(&tip)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> GatewayResolver {
        GatewayResolver::new(GatewayResolverConfig {
            resolver_url: "http://resolver.local/".to_string(),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_file_url_for_out_point() {
        let hash = "a".repeat(64);
        let id = Identifier::parse(&format!("ckbfs://{}i5", hash)).unwrap();
        assert_eq!(
            resolver().file_url(&id, Network::Testnet),
            format!("http://resolver.local/testnet/outpoint/0x{}/5", hash)
        );
    }

    #[test]
    fn test_file_url_for_type_id() {
        let hash = "b".repeat(64);
        let id = Identifier::parse(&hash).unwrap();
        assert_eq!(
            resolver().file_url(&id, Network::Mainnet),
            format!("http://resolver.local/mainnet/typeid/0x{}", hash)
        );
    }

    #[test]
    fn test_rpc_url_per_network() {
        let r = resolver();
        assert_eq!(r.rpc_url(Network::Mainnet), "https://mainnet.ckb.dev/rpc");
        assert_eq!(r.rpc_url(Network::Testnet), "https://testnet.ckb.dev/rpc");
    }

    #[test]
    fn test_parse_block_number() {
        assert_eq!(parse_block_number("0x10").unwrap(), 16);
        assert_eq!(parse_block_number("0xe4c0f1").unwrap(), 0xe4c0f1);
        assert!(matches!(
            parse_block_number("0xzz"),
            Err(ResolveError::Decode(_))
        ));
    }

    #[test]
    fn test_upstream_file_decoding() {
        let upstream: UpstreamFile = serde_json::from_value(json!({
            "filename": "hello.txt",
            "contentType": "text/plain",
            "content": "SGVsbG8=",
            "size": 5,
            "checksum": 123,
            "backLinks": [{"txHash": "0x01", "index": 0}]
        }))
        .unwrap();

        let file = upstream.into_file().unwrap();
        assert_eq!(file.content, b"Hello");
        assert_eq!(file.size, 5);
        assert_eq!(file.checksum, Some(123));
        assert_eq!(file.back_links[0].tx_hash, "0x01");
    }

    #[test]
    fn test_upstream_file_size_mismatch() {
        let upstream: UpstreamFile = serde_json::from_value(json!({
            "filename": "hello.txt",
            "contentType": "text/plain",
            "content": "SGVsbG8=",
            "size": 6
        }))
        .unwrap();

        assert!(matches!(upstream.into_file(), Err(ResolveError::Decode(_))));
    }

    #[test]
    fn test_upstream_file_bad_base64() {
        let upstream: UpstreamFile = serde_json::from_value(json!({
            "filename": "x.bin",
            "contentType": "application/octet-stream",
            "content": "!!!"
        }))
        .unwrap();

        assert!(matches!(upstream.into_file(), Err(ResolveError::Decode(_))));
    }
}
