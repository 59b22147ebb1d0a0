/// CKBFS file endpoints
///
/// GET  /ckbfs             - file with metadata and content (json) or raw bytes
/// GET  /ckbfs/metadata    - file description without content
/// GET  /ckbfs/compatible  - legacy flat hex response
/// GET  /ckbfs/validate    - whether a URI parses and resolves
/// GET  /ckbfs/parse       - parse only, no chain access
/// POST /ckbfs/batch       - up to ten files in one request
use crate::{
    api::{
        envelope::{respond, ApiResponse, RequestId},
        health,
    },
    context::AppContext,
    error::{ErrorBody, ErrorCode, GatewayError, GatewayResult},
    identifier::{Identifier, IdentifierKind},
    metrics,
    resolver::Network,
    retrieval::response::{raw_response, CompatibleResponse, FileResponse, ResponseOptions},
};
use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Query, State},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Build CKBFS routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/ckbfs", get(get_file))
        .route("/ckbfs/metadata", get(get_metadata))
        .route("/ckbfs/compatible", get(get_compatible))
        .route("/ckbfs/validate", get(validate_uri))
        .route("/ckbfs/parse", get(parse_uri))
        .route("/ckbfs/batch", post(batch_fetch))
        .route("/ckbfs/health", get(health::ckbfs_health))
}

/// Query parameters shared by the GET endpoints
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileQuery {
    pub uri: Option<String>,
    pub network: Option<String>,
    pub format: Option<String>,
    pub include_content: Option<String>,
    pub include_metadata: Option<String>,
}

/// Output format of `/ckbfs`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    Json,
    Raw,
}

impl ResponseFormat {
    fn parse(value: Option<&str>) -> GatewayResult<Self> {
        match value.map(str::trim) {
            None | Some("") | Some("json") => Ok(ResponseFormat::Json),
            Some("raw") => Ok(ResponseFormat::Raw),
            Some(other) => Err(GatewayError::invalid_format(other)),
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            ResponseFormat::Json => "json",
            ResponseFormat::Raw => "raw",
        }
    }
}

fn query_or_error(query: Result<Query<FileQuery>, QueryRejection>) -> GatewayResult<FileQuery> {
    query.map(|Query(q)| q).map_err(|e| {
        GatewayError::new(
            ErrorCode::MissingRequiredField,
            "Invalid query parameters",
        )
        .with_details(e.body_text())
    })
}

fn require_uri(uri: Option<&str>) -> GatewayResult<&str> {
    match uri.map(str::trim) {
        Some(uri) if !uri.is_empty() => Ok(uri),
        _ => Err(GatewayError::missing_field("uri")),
    }
}

fn parse_network(ctx: &AppContext, network: Option<&str>) -> GatewayResult<Network> {
    match network.map(str::trim) {
        None | Some("") => Ok(ctx.default_network()),
        Some(value) => value.parse(),
    }
}

fn parse_flag(name: &str, value: Option<&str>, default: bool) -> GatewayResult<bool> {
    let Some(value) = value.map(str::trim) else {
        return Ok(default);
    };

    match value.to_ascii_lowercase().as_str() {
        "" => Ok(default),
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(GatewayError::new(
            ErrorCode::MissingRequiredField,
            format!("Invalid value for {}: {}", name, value),
        )
        .with_details("Expected true or false")),
    }
}

/// GET /ckbfs
async fn get_file(
    State(ctx): State<AppContext>,
    request_id: RequestId,
    query: Result<Query<FileQuery>, QueryRejection>,
) -> Response {
    let result = file_from_query(&ctx, query, &request_id).await;
    respond(result, &request_id)
}

async fn file_from_query(
    ctx: &AppContext,
    query: Result<Query<FileQuery>, QueryRejection>,
    request_id: &RequestId,
) -> GatewayResult<Response> {
    let query = query_or_error(query)?;
    let format = ResponseFormat::parse(query.format.as_deref())?;
    let options = ResponseOptions {
        include_content: parse_flag("includeContent", query.include_content.as_deref(), true)?,
        include_metadata: parse_flag("includeMetadata", query.include_metadata.as_deref(), true)?,
    };
    serve_file(ctx, &query, format, options, request_id).await
}

/// GET /ckbfs/metadata
async fn get_metadata(
    State(ctx): State<AppContext>,
    request_id: RequestId,
    query: Result<Query<FileQuery>, QueryRejection>,
) -> Response {
    let options = ResponseOptions {
        include_content: false,
        include_metadata: true,
    };
    let result = match query_or_error(query) {
        Ok(query) => serve_file(&ctx, &query, ResponseFormat::Json, options, &request_id).await,
        Err(err) => Err(err),
    };

    respond(result, &request_id)
}

async fn serve_file(
    ctx: &AppContext,
    query: &FileQuery,
    format: ResponseFormat,
    options: ResponseOptions,
    request_id: &RequestId,
) -> GatewayResult<Response> {
    let uri = require_uri(query.uri.as_deref())?;
    let network = parse_network(ctx, query.network.as_deref())?;
    let identifier = Identifier::parse(uri)?;

    tracing::info!(
        uri = %identifier,
        network = %network,
        format = format.as_str(),
        "ckbfs_file_requested"
    );

    let file = ctx.fetcher.fetch(&identifier, network).await?;
    metrics::record_file_served(format.as_str(), file.size);

    match format {
        ResponseFormat::Raw => raw_response(&identifier, network, file),
        ResponseFormat::Json => {
            let body = FileResponse::build(&identifier, network, &file, options);
            Ok(ApiResponse::success(body, request_id).into_response())
        }
    }
}

/// GET /ckbfs/compatible
///
/// Success is the bare `{content_type, content, filename}` object; failures
/// still use the standard error envelope.
async fn get_compatible(
    State(ctx): State<AppContext>,
    request_id: RequestId,
    query: Result<Query<FileQuery>, QueryRejection>,
) -> Response {
    let result = compatible_file(&ctx, query).await;
    respond(result, &request_id)
}

async fn compatible_file(
    ctx: &AppContext,
    query: Result<Query<FileQuery>, QueryRejection>,
) -> GatewayResult<Response> {
    let query = query_or_error(query)?;
    let uri = require_uri(query.uri.as_deref())?;
    let network = parse_network(ctx, query.network.as_deref())?;
    let identifier = Identifier::parse(uri)?;

    let file = ctx.fetcher.fetch(&identifier, network).await?;
    metrics::record_file_served("compatible", file.size);

    Ok(Json(CompatibleResponse::build(&file)).into_response())
}

/// Result of `/ckbfs/validate`
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResponse {
    pub valid: bool,
    pub uri: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network: Option<Network>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<IdentifierKind>,
    pub exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

/// GET /ckbfs/validate
///
/// A URI is valid when it parses and the file resolves. Parse and resolver
/// failures are reported in the payload, not as error responses.
async fn validate_uri(
    State(ctx): State<AppContext>,
    request_id: RequestId,
    query: Result<Query<FileQuery>, QueryRejection>,
) -> Response {
    let result = validation_report(&ctx, query, &request_id).await;
    respond(result, &request_id)
}

async fn validation_report(
    ctx: &AppContext,
    query: Result<Query<FileQuery>, QueryRejection>,
    request_id: &RequestId,
) -> GatewayResult<Response> {
    let query = query_or_error(query)?;
    let uri = require_uri(query.uri.as_deref())?;
    let network = parse_network(ctx, query.network.as_deref())?;

    let identifier = match Identifier::parse(uri) {
        Ok(identifier) => identifier,
        Err(err) => {
            let body = ValidationResponse {
                valid: false,
                uri: uri.to_string(),
                network: None,
                identifier: None,
                exists: false,
                filename: None,
                content_type: None,
                size: None,
                error: Some(err.body()),
            };
            return Ok(ApiResponse::success(body, request_id).into_response());
        }
    };

    let mut body = ValidationResponse {
        valid: false,
        uri: identifier.raw.clone(),
        network: Some(network),
        identifier: Some(identifier.kind.clone()),
        exists: false,
        filename: None,
        content_type: None,
        size: None,
        error: None,
    };

    match ctx.fetcher.fetch(&identifier, network).await {
        Ok(file) => {
            body.valid = true;
            body.exists = true;
            body.filename = Some(file.filename);
            body.content_type = Some(file.content_type);
            body.size = Some(file.size);
        }
        Err(err) => body.error = Some(err.body()),
    }

    Ok(ApiResponse::success(body, request_id).into_response())
}

/// Result of `/ckbfs/parse`
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseResponse {
    pub uri: String,
    pub identifier: IdentifierKind,
    pub normalized: String,
}

/// GET /ckbfs/parse
async fn parse_uri(
    request_id: RequestId,
    query: Result<Query<FileQuery>, QueryRejection>,
) -> Response {
    let result = query_or_error(query)
        .and_then(|query| Identifier::parse(require_uri(query.uri.as_deref())?))
        .map(|identifier| {
            let body = ParseResponse {
                normalized: identifier.normalized(),
                uri: identifier.raw,
                identifier: identifier.kind,
            };
            ApiResponse::success(body, &request_id).into_response()
        });

    respond(result, &request_id)
}

/// POST /ckbfs/batch body
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BatchRequest {
    /// At most ten URIs per request
    #[validate(length(min = 1, max = 10, message = "uris must contain between 1 and 10 entries"))]
    pub uris: Vec<String>,
    pub network: Option<String>,
    pub format: Option<String>,
    pub include_content: Option<bool>,
    pub include_metadata: Option<bool>,
}

/// One slot of a batch result
#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BatchItem {
    Success(Box<FileResponse>),
    Failure { identifier: String, error: ErrorBody },
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BatchResponse {
    pub results: Vec<BatchItem>,
    pub summary: BatchSummary,
}

/// POST /ckbfs/batch
async fn batch_fetch(
    State(ctx): State<AppContext>,
    request_id: RequestId,
    body: Result<Json<BatchRequest>, JsonRejection>,
) -> Response {
    let result = batch_report(&ctx, body, &request_id).await;
    respond(result, &request_id)
}

async fn batch_report(
    ctx: &AppContext,
    body: Result<Json<BatchRequest>, JsonRejection>,
    request_id: &RequestId,
) -> GatewayResult<Response> {
    let Json(request) =
        body.map_err(|e| GatewayError::missing_field("uris").with_details(e.body_text()))?;

    request
        .validate()
        .map_err(|e| GatewayError::missing_field("uris").with_details(e.to_string()))?;

    if ResponseFormat::parse(request.format.as_deref())? == ResponseFormat::Raw {
        return Err(GatewayError::invalid_format("raw")
            .with_details("Batch requests only support the json format"));
    }

    let network = parse_network(ctx, request.network.as_deref())?;
    let options = ResponseOptions {
        include_content: request.include_content.unwrap_or(true),
        include_metadata: request.include_metadata.unwrap_or(true),
    };

    tracing::info!(count = request.uris.len(), network = %network, "ckbfs_batch_requested");

    let entries = ctx.fetcher.fetch_batch(&request.uris, network).await;
    let results: Vec<BatchItem> = entries
        .into_iter()
        .map(|entry| match entry.result {
            Ok((identifier, file)) => {
                metrics::record_file_served("batch", file.size);
                BatchItem::Success(Box::new(FileResponse::build(
                    &identifier,
                    network,
                    &file,
                    options,
                )))
            }
            Err(err) => BatchItem::Failure {
                identifier: entry.uri,
                error: err.body(),
            },
        })
        .collect();

    let succeeded = results
        .iter()
        .filter(|item| matches!(item, BatchItem::Success(_)))
        .count();
    let summary = BatchSummary {
        total: results.len(),
        succeeded,
        failed: results.len() - succeeded,
    };

    Ok(ApiResponse::success(BatchResponse { results, summary }, request_id).into_response())
}
