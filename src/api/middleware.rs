/// Request correlation middleware
use crate::{
    api::envelope::{ApiResponse, RequestId, REQUEST_ID_HEADER},
    error::{ErrorCode, GatewayError},
    metrics,
};
use axum::{
    extract::{MatchedPath, Request},
    http::{header, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::time::Instant;
use tracing::Instrument;

/// Assign a request id, open a span carrying it, and record HTTP metrics.
///
/// Every log line emitted while the request is handled carries the id, and
/// the response echoes it in `X-Request-Id`.
pub async fn request_context(mut req: Request, next: Next) -> Response {
    let request_id = RequestId::new();
    req.extensions_mut().insert(request_id.clone());

    let method = req.method().to_string();
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let span = tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %method,
        path = %req.uri().path(),
    );

    let start = Instant::now();
    let mut response = next.run(req).instrument(span).await;
    let duration = start.elapsed().as_secs_f64();

    if response.status() == StatusCode::METHOD_NOT_ALLOWED {
        response = method_not_allowed(&response, &request_id);
    }

    metrics::record_http_request(&method, &path, response.status().as_u16(), duration);

    if !response.headers().contains_key(REQUEST_ID_HEADER) {
        if let Ok(value) = HeaderValue::from_str(request_id.as_str()) {
            response.headers_mut().insert(REQUEST_ID_HEADER, value);
        }
    }

    response
}

/// Router-generated 405s carry no body; wrap them in the error envelope,
/// keeping the status and the `Allow` header.
fn method_not_allowed(original: &Response, request_id: &RequestId) -> Response {
    let err = GatewayError::new(ErrorCode::FileNotFound, "Method not allowed for this endpoint");
    let mut response = ApiResponse::failure(&err, request_id).into_response();
    *response.status_mut() = StatusCode::METHOD_NOT_ALLOWED;

    if let Some(allow) = original.headers().get(header::ALLOW) {
        response.headers_mut().insert(header::ALLOW, allow.clone());
    }
    response
}
