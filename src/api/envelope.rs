/// Uniform JSON envelope and request correlation id
use crate::{
    error::{ErrorBody, GatewayError},
    metrics,
    retrieval::is_upstream_error,
};
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{convert::Infallible, fmt};
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Per-request correlation id, generated once at the boundary
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(String);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reads the id placed by the request middleware, minting one if it is absent
#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for RequestId {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<RequestId>()
            .cloned()
            .unwrap_or_default())
    }
}

/// `{ success, data|error, timestamp, requestId }`
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
    pub timestamp: DateTime<Utc>,
    pub request_id: String,
    #[serde(skip)]
    status: u16,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T, request_id: &RequestId) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            timestamp: Utc::now(),
            request_id: request_id.to_string(),
            status: StatusCode::OK.as_u16(),
        }
    }
}

impl ApiResponse<()> {
    pub fn failure(error: &GatewayError, request_id: &RequestId) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.body()),
            timestamp: Utc::now(),
            request_id: request_id.to_string(),
            status: error.status().as_u16(),
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if let Some(error) = &self.error {
            metrics::record_error(error.code.as_str());
            tracing::debug!(
                request_id = %self.request_id,
                code = %error.code,
                status = status.as_u16(),
                "error_response"
            );
        }

        let request_id = HeaderValue::from_str(&self.request_id).ok();
        let mut response = (status, Json(self)).into_response();
        if let Some(value) = request_id {
            response.headers_mut().insert(REQUEST_ID_HEADER, value);
        }
        response
    }
}

/// Turn a handler outcome into a response, enveloping any error
pub fn respond(result: Result<Response, GatewayError>, request_id: &RequestId) -> Response {
    match result {
        Ok(response) => response,
        Err(err) => {
            if is_upstream_error(&err) {
                tracing::warn!(
                    request_id = %request_id,
                    code = %err.code,
                    error = %err.message,
                    "upstream_failure"
                );
            }
            ApiResponse::failure(&err, request_id).into_response()
        }
    }
}
