/// Health check endpoints
///
/// - Liveness: the process is up and answering (`/health`, `/health/live`)
/// - Chain connectivity: every configured network is probed (`/ckbfs/health`)
/// - Prometheus scrape endpoint (`/metrics`)
use crate::{
    api::envelope::{respond, ApiResponse, RequestId},
    context::AppContext,
    error::GatewayError,
    metrics,
    resolver::Network,
};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Liveness response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LivenessStatus {
    pub status: String,
    pub version: String,
    pub uptime_seconds: f64,
}

/// Aggregated chain connectivity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    /// Overall status: "healthy", "degraded", or "unhealthy"
    pub status: String,

    pub version: String,

    pub uptime_seconds: f64,

    pub networks: Vec<NetworkHealth>,
}

/// Probe result for one network
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkHealth {
    pub network: Network,

    /// Status: "healthy" or "unhealthy"
    pub status: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tip_block_number: Option<u64>,

    pub response_time_ms: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Build health check routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/health", get(liveness_probe))
        .route("/health/live", get(liveness_probe))
        .route("/metrics", get(metrics_handler))
}

/// Liveness probe
///
/// Never touches the chain; if we can respond, we're alive.
pub async fn liveness_probe(State(ctx): State<AppContext>) -> Json<LivenessStatus> {
    let uptime = ctx.uptime_seconds();
    metrics::set_uptime(uptime);

    Json(LivenessStatus {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: uptime,
    })
}

/// Chain connectivity check across all networks
///
/// Degraded still serves traffic (200); only a full outage is 503.
pub async fn ckbfs_health(State(ctx): State<AppContext>, request_id: RequestId) -> Response {
    let start = Instant::now();

    let checks = join_all(Network::ALL.iter().map(|network| check_network(&ctx, *network))).await;
    let overall_status = determine_overall_status(&checks);
    let uptime = ctx.uptime_seconds();
    metrics::set_uptime(uptime);

    tracing::info!(
        status = %overall_status,
        duration_ms = start.elapsed().as_millis() as u64,
        "health_check_completed"
    );

    let result = if overall_status == "unhealthy" {
        let report = serde_json::to_string(&checks).unwrap_or_default();
        Err(GatewayError::service_unavailable("All networks are unreachable").with_details(report))
    } else {
        let health = HealthStatus {
            status: overall_status.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: uptime,
            networks: checks,
        };
        Ok(ApiResponse::success(health, &request_id).into_response())
    };

    respond(result, &request_id)
}

async fn check_network(ctx: &AppContext, network: Network) -> NetworkHealth {
    let start = Instant::now();

    match ctx.fetcher.probe(network).await {
        Ok(probe) => NetworkHealth {
            network,
            status: "healthy".to_string(),
            tip_block_number: Some(probe.tip_block_number),
            response_time_ms: start.elapsed().as_millis() as u64,
            error: None,
        },
        Err(e) => {
            tracing::warn!(network = %network, error = %e, "network_probe_failed");
            NetworkHealth {
                network,
                status: "unhealthy".to_string(),
                tip_block_number: None,
                response_time_ms: start.elapsed().as_millis() as u64,
                error: Some(e.to_string()),
            }
        }
    }
}

/// Determine overall health status from individual checks
fn determine_overall_status(checks: &[NetworkHealth]) -> &'static str {
    let unhealthy_count = checks.iter().filter(|c| c.status == "unhealthy").count();

    if checks.is_empty() || unhealthy_count == 0 {
        "healthy"
    } else if unhealthy_count < checks.len() {
        "degraded"
    } else {
        "unhealthy"
    }
}

/// Prometheus text exposition
async fn metrics_handler(State(ctx): State<AppContext>) -> impl IntoResponse {
    metrics::set_uptime(ctx.uptime_seconds());

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics::render_metrics(),
    )
}
