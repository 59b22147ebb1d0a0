/// Unified error types for the CKBFS gateway
use crate::resolver::ResolveError;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Machine-readable error codes exposed to API consumers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InvalidUri,
    InvalidNetwork,
    InvalidFormat,
    MissingRequiredField,
    FileNotFound,
    CkbfsDecodeError,
    NetworkError,
    TimeoutError,
    BlockchainError,
    ServiceUnavailable,
    InternalServerError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidUri => "INVALID_URI",
            ErrorCode::InvalidNetwork => "INVALID_NETWORK",
            ErrorCode::InvalidFormat => "INVALID_FORMAT",
            ErrorCode::MissingRequiredField => "MISSING_REQUIRED_FIELD",
            ErrorCode::FileNotFound => "FILE_NOT_FOUND",
            ErrorCode::CkbfsDecodeError => "CKBFS_DECODE_ERROR",
            ErrorCode::NetworkError => "NETWORK_ERROR",
            ErrorCode::TimeoutError => "TIMEOUT_ERROR",
            ErrorCode::BlockchainError => "BLOCKCHAIN_ERROR",
            ErrorCode::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            ErrorCode::InternalServerError => "INTERNAL_SERVER_ERROR",
        }
    }

    /// HTTP status paired with this code
    pub fn status(&self) -> StatusCode {
        match self {
            ErrorCode::InvalidUri
            | ErrorCode::InvalidNetwork
            | ErrorCode::InvalidFormat
            | ErrorCode::MissingRequiredField => StatusCode::BAD_REQUEST,
            ErrorCode::FileNotFound => StatusCode::NOT_FOUND,
            ErrorCode::CkbfsDecodeError | ErrorCode::NetworkError => StatusCode::BAD_GATEWAY,
            ErrorCode::TimeoutError => StatusCode::GATEWAY_TIMEOUT,
            ErrorCode::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::BlockchainError | ErrorCode::InternalServerError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Last-resort classification of a free-text failure message.
    ///
    /// Only used for resolver failures that arrive without a typed category.
    /// Checked in order: timeout, network, decode, not found.
    pub fn from_message(message: &str) -> Self {
        let lower = message.to_lowercase();

        if lower.contains("timeout") || lower.contains("timed out") {
            ErrorCode::TimeoutError
        } else if lower.contains("network") || lower.contains("connect") || lower.contains("fetch")
        {
            ErrorCode::NetworkError
        } else if lower.contains("decode") || lower.contains("checksum") || lower.contains("parse")
        {
            ErrorCode::CkbfsDecodeError
        } else if lower.contains("not found") {
            ErrorCode::FileNotFound
        } else {
            ErrorCode::BlockchainError
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Main error type for the gateway
///
/// Every failure is carried as a code from the fixed taxonomy plus a human
/// message; it travels unchanged from the point of failure to the HTTP boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{code}: {message}")]
pub struct GatewayError {
    pub code: ErrorCode,
    pub message: String,
    pub details: Option<String>,
}

impl GatewayError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn invalid_uri(uri: &str) -> Self {
        Self::new(ErrorCode::InvalidUri, format!("Invalid CKBFS URI: {}", uri)).with_details(
            "Expected ckbfs://<64 hex tx hash>i<index>, ckbfs://<64 hex type id>, 0x<64 hex type id> or <64 hex type id>",
        )
    }

    pub fn invalid_network(network: &str) -> Self {
        Self::new(
            ErrorCode::InvalidNetwork,
            format!("Invalid network: {}", network),
        )
        .with_details("Expected one of: mainnet, testnet")
    }

    pub fn invalid_format(format: &str) -> Self {
        Self::new(ErrorCode::InvalidFormat, format!("Invalid format: {}", format))
            .with_details("Expected one of: json, raw")
    }

    pub fn missing_field(field: &str) -> Self {
        Self::new(
            ErrorCode::MissingRequiredField,
            format!("Missing required field: {}", field),
        )
    }

    pub fn file_not_found(uri: &str) -> Self {
        Self::new(ErrorCode::FileNotFound, format!("File not found: {}", uri))
    }

    pub fn timeout(timeout_ms: u64) -> Self {
        Self::new(
            ErrorCode::TimeoutError,
            format!("Request timed out after {}ms", timeout_ms),
        )
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ServiceUnavailable, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalServerError, message)
    }

    /// HTTP status for this error
    pub fn status(&self) -> StatusCode {
        self.code.status()
    }

    /// Serializable error object used inside envelopes and batch items
    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            code: self.code,
            message: self.message.clone(),
            details: self.details.clone(),
        }
    }
}

/// Error object as it appears in JSON responses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl From<ResolveError> for GatewayError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::NotFound(msg) => GatewayError::new(ErrorCode::FileNotFound, msg),
            ResolveError::Decode(msg) => GatewayError::new(
                ErrorCode::CkbfsDecodeError,
                "Failed to decode CKBFS data",
            )
            .with_details(msg),
            ResolveError::Network(msg) => {
                GatewayError::new(ErrorCode::NetworkError, "Blockchain network error")
                    .with_details(msg)
            }
            ResolveError::Timeout(msg) => {
                GatewayError::new(ErrorCode::TimeoutError, "Request timed out").with_details(msg)
            }
            ResolveError::Other(msg) => {
                let code = ErrorCode::from_message(&msg);
                GatewayError::new(code, "Failed to retrieve CKBFS file").with_details(msg)
            }
        }
    }
}

/// Result type alias for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;
