/// CKBFS identifier parsing
///
/// Accepted surface forms (only the hex digits are case-insensitive):
/// - `ckbfs://<64 hex tx hash>i<index>`  → out-point
/// - `ckbfs://<64 hex type id>`          → type id
/// - `0x<64 hex type id>`                → type id
/// - `<64 hex type id>`                  → type id
use crate::error::{GatewayError, GatewayResult};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const URI_SCHEME: &str = "ckbfs://";

lazy_static! {
    static ref OUTPOINT_URI: Regex = Regex::new(r"^ckbfs://([0-9a-fA-F]{64})i([0-9]+)$").unwrap();
    static ref TYPE_ID_URI: Regex = Regex::new(r"^ckbfs://([0-9a-fA-F]{64})$").unwrap();
    static ref PREFIXED_HEX: Regex = Regex::new(r"^0x([0-9a-fA-F]{64})$").unwrap();
    static ref BARE_HEX: Regex = Regex::new(r"^([0-9a-fA-F]{64})$").unwrap();
}

/// What a parsed identifier points at
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum IdentifierKind {
    /// A specific transaction output
    #[serde(rename_all = "camelCase")]
    OutPoint { tx_hash: String, index: u32 },
    /// A stable type-id handle
    #[serde(rename_all = "camelCase")]
    TypeId { type_id: String },
}

/// Parsed reference to a stored file; `raw` keeps the caller's input verbatim
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier {
    pub raw: String,
    pub kind: IdentifierKind,
}

impl Identifier {
    /// Parse a URI in any of the accepted forms
    pub fn parse(uri: &str) -> GatewayResult<Self> {
        let kind = if let Some(caps) = OUTPOINT_URI.captures(uri) {
            let index = caps[2]
                .parse::<u32>()
                .map_err(|_| GatewayError::invalid_uri(uri))?;
            IdentifierKind::OutPoint {
                tx_hash: prefixed(&caps[1]),
                index,
            }
        } else if let Some(caps) = TYPE_ID_URI
            .captures(uri)
            .or_else(|| PREFIXED_HEX.captures(uri))
            .or_else(|| BARE_HEX.captures(uri))
        {
            IdentifierKind::TypeId {
                type_id: prefixed(&caps[1]),
            }
        } else {
            return Err(GatewayError::invalid_uri(uri));
        };

        Ok(Self {
            raw: uri.to_string(),
            kind,
        })
    }

    /// Canonical `ckbfs://` form of this identifier
    pub fn normalized(&self) -> String {
        match &self.kind {
            IdentifierKind::OutPoint { tx_hash, index } => {
                format!("{}{}i{}", URI_SCHEME, strip_prefix(tx_hash), index)
            }
            IdentifierKind::TypeId { type_id } => {
                format!("{}{}", URI_SCHEME, strip_prefix(type_id))
            }
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn prefixed(hex: &str) -> String {
    format!("0x{}", hex.to_lowercase())
}

fn strip_prefix(hash: &str) -> &str {
    hash.strip_prefix("0x").unwrap_or(hash)
}
