/// HTTP server setup and routing
use crate::{
    api::{
        envelope::{ApiResponse, RequestId},
        middleware::request_context,
    },
    context::AppContext,
    error::{ErrorCode, GatewayError, GatewayResult},
    rate_limit::rate_limit_middleware,
    retrieval::response::HEADER_URI,
};
use axum::{
    http::{header, Extensions, HeaderMap, HeaderValue, Method, StatusCode, Version},
    middleware,
    response::{IntoResponse, Response},
    Router,
};
use tower_http::{
    compression::{
        predicate::{DefaultPredicate, Predicate},
        CompressionLayer,
    },
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

/// Build the main application router
/// Returns Router<()> because state is already provided
pub fn build_router(ctx: AppContext) -> Router {
    let cors = cors_layer(&ctx.config.service.cors_origin);

    Router::new()
        .merge(crate::api::routes())
        .fallback(not_found)
        // Provide state - converts Router<AppContext> to Router<()>
        .with_state(ctx.clone())
        .layer(middleware::from_fn_with_state(ctx, rate_limit_middleware))
        // Outside the limiter so throttled responses are still counted and tagged
        .layer(middleware::from_fn(request_context))
        .layer(cors)
        .layer(CompressionLayer::new().compress_when(DefaultPredicate::new().and(not_raw_file)))
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(origin: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
        .expose_headers([
            header::CONTENT_DISPOSITION,
            header::HeaderName::from_static("x-request-id"),
            header::HeaderName::from_static("x-ckbfs-uri"),
            header::HeaderName::from_static("x-ckbfs-network"),
            header::HeaderName::from_static("x-ckbfs-filename"),
            header::HeaderName::from_static("x-ckbfs-size"),
        ]);

    match origin {
        "*" => layer.allow_origin(Any),
        origin => match HeaderValue::from_str(origin) {
            Ok(value) => layer.allow_origin(value),
            Err(_) => {
                tracing::warn!(origin, "invalid_cors_origin");
                layer.allow_origin(Any)
            }
        },
    }
}

/// Raw file bodies go out byte-for-byte with their declared `Content-Length`
fn not_raw_file(_: StatusCode, _: Version, headers: &HeaderMap, _: &Extensions) -> bool {
    !headers.contains_key(HEADER_URI)
}

/// 404 handler
async fn not_found(request_id: RequestId) -> Response {
    let err = GatewayError::new(ErrorCode::FileNotFound, "Endpoint not found");
    ApiResponse::failure(&err, &request_id).into_response()
}

/// Start the HTTP server
pub async fn serve(ctx: AppContext) -> GatewayResult<()> {
    let addr = ctx.config.bind_address();

    info!("CKBFS gateway listening on {}", addr);
    info!("   Default network: {}", ctx.default_network());
    info!("   Resolver: {}", ctx.config.networks.resolver_url);

    let app = build_router(ctx);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| GatewayError::internal(format!("Failed to bind to {}: {}", addr, e)))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| GatewayError::internal(format!("Server error: {}", e)))?;

    info!("CKBFS gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
