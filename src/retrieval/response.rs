/// Response shapes derived from a retrieved file
use crate::{
    content::{self, ContentEncoding},
    error::{GatewayError, GatewayResult},
    identifier::{Identifier, IdentifierKind},
    resolver::{BackLink, Network, RetrievedFile},
};
use axum::{
    body::Body,
    http::{header, HeaderValue, StatusCode},
    response::Response,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const HEADER_URI: &str = "x-ckbfs-uri";
pub const HEADER_NETWORK: &str = "x-ckbfs-network";
pub const HEADER_FILENAME: &str = "x-ckbfs-filename";
pub const HEADER_SIZE: &str = "x-ckbfs-size";

/// What a JSON file response should carry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseOptions {
    pub include_content: bool,
    pub include_metadata: bool,
}

impl Default for ResponseOptions {
    fn default() -> Self {
        Self {
            include_content: true,
            include_metadata: true,
        }
    }
}

/// On-chain bookkeeping passed through from the resolver
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checksum: Option<u32>,
    pub back_links: Vec<BackLink>,
    pub retrieved_at: DateTime<Utc>,
}

/// Metadata+content JSON shape
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileResponse {
    pub uri: String,
    pub identifier: IdentifierKind,
    pub network: Network,
    pub filename: String,
    pub content_type: String,
    pub size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoding: Option<ContentEncoding>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_text: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<FileMetadata>,
}

impl FileResponse {
    pub fn build(
        identifier: &Identifier,
        network: Network,
        file: &RetrievedFile,
        options: ResponseOptions,
    ) -> Self {
        let encoded = options
            .include_content
            .then(|| content::encode(&file.content, &file.content_type, Some(&file.filename)));

        let metadata = options.include_metadata.then(|| FileMetadata {
            checksum: file.checksum,
            back_links: file.back_links.clone(),
            retrieved_at: Utc::now(),
        });

        let (content, encoding, is_text) = match encoded {
            Some(e) => (Some(e.text), Some(e.encoding), Some(e.is_text)),
            None => (None, None, None),
        };

        Self {
            uri: identifier.raw.clone(),
            identifier: identifier.kind.clone(),
            network,
            filename: file.filename.clone(),
            content_type: file.content_type.clone(),
            size: file.size,
            content,
            encoding,
            is_text,
            metadata,
        }
    }
}

/// Legacy flat shape; content is always hex, never classified
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompatibleResponse {
    pub content_type: String,
    pub content: String,
    pub filename: String,
}

impl CompatibleResponse {
    pub fn build(file: &RetrievedFile) -> Self {
        Self {
            content_type: file.content_type.clone(),
            content: hex::encode(&file.content),
            filename: file.filename.clone(),
        }
    }
}

/// Filename safe to place inside a quoted `Content-Disposition` parameter
fn disposition_filename(filename: &str) -> String {
    let cleaned: String = filename
        .chars()
        .map(|c| {
            if c.is_ascii_graphic() || c == ' ' {
                if c == '"' || c == '\\' {
                    '_'
                } else {
                    c
                }
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.trim().is_empty() {
        "file".to_string()
    } else {
        cleaned
    }
}

fn header_value(value: &str) -> GatewayResult<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| GatewayError::internal(format!("Invalid header value: {}", e)))
}

/// Raw shape: literal bytes plus descriptive headers
pub fn raw_response(
    identifier: &Identifier,
    network: Network,
    file: RetrievedFile,
) -> GatewayResult<Response> {
    let content_type = if file.content_type.trim().is_empty() {
        "application/octet-stream".to_string()
    } else {
        file.content_type.clone()
    };
    let encoded_name = urlencoding::encode(&file.filename).into_owned();
    let disposition = format!(
        "inline; filename=\"{}\"; filename*=UTF-8''{}",
        disposition_filename(&file.filename),
        encoded_name
    );
    let size = file.content.len().to_string();

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, header_value(&content_type)?)
        .header(header::CONTENT_LENGTH, header_value(&size)?)
        .header(header::CONTENT_DISPOSITION, header_value(&disposition)?)
        .header(HEADER_URI, header_value(&identifier.raw)?)
        .header(HEADER_NETWORK, header_value(network.as_str())?)
        .header(HEADER_FILENAME, header_value(&encoded_name)?)
        .header(HEADER_SIZE, header_value(&size)?)
        .body(Body::from(file.content))
        .map_err(|e| GatewayError::internal(format!("Failed to build raw response: {}", e)))
}
