/// Router-level tests against an in-memory resolver
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use ckbfs_gateway::{
    config::ServerConfig,
    context::AppContext,
    resolver::{BackLink, MemoryResolver, Network, ResolveError, RetrievedFile},
    server::build_router,
};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

fn out_point_uri(c: char, index: u32) -> String {
    format!("ckbfs://{}i{}", c.to_string().repeat(64), index)
}

fn test_config() -> ServerConfig {
    let mut config = ServerConfig::default();
    config.retrieval.max_attempts = 1;
    config.retrieval.retry_delay_ms = 1;
    config.retrieval.timeout_ms = 1_000;
    config.rate_limit.enabled = false;
    config
}

fn resolver() -> MemoryResolver {
    MemoryResolver::new()
        .with_file(
            &out_point_uri('a', 0),
            RetrievedFile::new("hello.txt", "text/plain", b"Hello".to_vec())
                .with_checksum(42)
                .with_back_links(vec![BackLink {
                    tx_hash: format!("0x{}", "f".repeat(64)),
                    index: 0,
                }]),
        )
        .with_file(
            &out_point_uri('b', 1),
            RetrievedFile::new("logo.png", "image/png", vec![0x89, 0x50, 0x4e, 0x47, 0xff]),
        )
        .with_file(
            &format!("0x{}", "c".repeat(64)),
            RetrievedFile::new("my notes.md", "application/octet-stream", b"# notes".to_vec()),
        )
}

fn app_with(config: ServerConfig, resolver: MemoryResolver) -> Router {
    build_router(AppContext::with_resolver(config, Arc::new(resolver)))
}

fn app() -> Router {
    app_with(test_config(), resolver())
}

async fn get(app: Router, uri: &str) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, headers, body.to_vec())
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, axum::http::HeaderMap, Value) {
    let (status, headers, body) = get(app, uri).await;
    (status, headers, serde_json::from_slice(&body).unwrap())
}

async fn post_json(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn test_get_file_json_envelope() {
    let uri = out_point_uri('a', 0);
    let (status, headers, json) = get_json(app(), &format!("/ckbfs?uri={}", uri)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert!(json.get("error").is_none());
    assert_eq!(headers["x-request-id"], json["requestId"].as_str().unwrap());

    let data = &json["data"];
    assert_eq!(data["uri"], uri);
    assert_eq!(data["network"], "testnet");
    assert_eq!(data["identifier"]["kind"], "outPoint");
    assert_eq!(data["identifier"]["txHash"], format!("0x{}", "a".repeat(64)));
    assert_eq!(data["identifier"]["index"], 0);
    assert_eq!(data["filename"], "hello.txt");
    assert_eq!(data["contentType"], "text/plain");
    assert_eq!(data["size"], 5);
    assert_eq!(data["content"], "Hello");
    assert_eq!(data["encoding"], "utf8");
    assert_eq!(data["isText"], true);
    assert_eq!(data["metadata"]["checksum"], 42);
    assert_eq!(data["metadata"]["backLinks"][0]["index"], 0);
    assert!(data["metadata"]["retrievedAt"].is_string());
}

#[tokio::test]
async fn test_binary_file_is_base64() {
    let uri = out_point_uri('b', 1);
    let (status, _, json) =
        get_json(app(), &format!("/ckbfs?uri={}&network=mainnet", uri)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["network"], "mainnet");
    assert_eq!(json["data"]["encoding"], "base64");
    assert_eq!(json["data"]["isText"], false);
    assert_eq!(json["data"]["content"], "iVBOR/8=");
}

#[tokio::test]
async fn test_generic_mime_falls_back_to_extension() {
    let uri = format!("ckbfs://{}", "c".repeat(64));
    let (status, _, json) = get_json(app(), &format!("/ckbfs?uri={}", uri)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["identifier"]["kind"], "typeId");
    assert_eq!(json["data"]["encoding"], "utf8");
    assert_eq!(json["data"]["content"], "# notes");
}

#[tokio::test]
async fn test_include_flags() {
    let uri = out_point_uri('a', 0);
    let (status, _, json) = get_json(
        app(),
        &format!("/ckbfs?uri={}&includeContent=false&includeMetadata=0", uri),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let data = &json["data"];
    assert_eq!(data["filename"], "hello.txt");
    assert!(data.get("content").is_none());
    assert!(data.get("encoding").is_none());
    assert!(data.get("isText").is_none());
    assert!(data.get("metadata").is_none());
}

#[tokio::test]
async fn test_invalid_flag_value() {
    let uri = out_point_uri('a', 0);
    let (status, _, json) =
        get_json(app(), &format!("/ckbfs?uri={}&includeContent=maybe", uri)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "MISSING_REQUIRED_FIELD");
}

#[tokio::test]
async fn test_metadata_endpoint_omits_content() {
    let uri = out_point_uri('a', 0);
    let (status, _, json) = get_json(app(), &format!("/ckbfs/metadata?uri={}", uri)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["size"], 5);
    assert!(json["data"].get("content").is_none());
    assert_eq!(json["data"]["metadata"]["checksum"], 42);
}

#[tokio::test]
async fn test_raw_format_headers() {
    let uri = format!("0x{}", "c".repeat(64));
    let (status, headers, body) =
        get(app(), &format!("/ckbfs?uri={}&format=raw&network=testnet", uri)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"# notes");
    assert_eq!(headers[header::CONTENT_TYPE], "application/octet-stream");
    assert_eq!(headers["x-ckbfs-uri"], uri.as_str());
    assert_eq!(headers["x-ckbfs-network"], "testnet");
    assert_eq!(headers["x-ckbfs-filename"], "my%20notes.md");
    assert_eq!(headers["x-ckbfs-size"], "7");
    assert!(headers[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .starts_with("inline; filename=\"my notes.md\""));
    assert!(headers.contains_key("x-request-id"));
}

#[tokio::test]
async fn test_raw_format_is_not_compressed() {
    let uri = out_point_uri('f', 0);
    let content = "a".repeat(4096).into_bytes();
    let resolver = resolver().with_file(
        &uri,
        RetrievedFile::new("big.txt", "text/plain", content.clone()),
    );

    let response = app_with(test_config(), resolver)
        .oneshot(
            Request::builder()
                .uri(format!("/ckbfs?uri={}&format=raw", uri))
                .header(header::ACCEPT_ENCODING, "gzip")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers().clone();
    assert!(!headers.contains_key(header::CONTENT_ENCODING));
    assert_eq!(headers[header::CONTENT_LENGTH], "4096");
    assert_eq!(headers["x-ckbfs-size"], "4096");

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(body.to_vec(), content);
}

#[tokio::test]
async fn test_compatible_endpoint_hex() {
    let uri = out_point_uri('a', 0);
    let (status, _, json) = get_json(app(), &format!("/ckbfs/compatible?uri={}", uri)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["content_type"], "text/plain");
    assert_eq!(json["content"], "48656c6c6f");
    assert_eq!(json["filename"], "hello.txt");
    assert!(json.get("success").is_none());
}

#[tokio::test]
async fn test_compatible_endpoint_error_uses_envelope() {
    let (status, _, json) = get_json(app(), "/ckbfs/compatible?uri=nope").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);
    assert_eq!(json["error"]["code"], "INVALID_URI");
}

#[tokio::test]
async fn test_parse_endpoint() {
    let uri = format!("0x{}", "B".repeat(64));
    let (status, _, json) = get_json(app(), &format!("/ckbfs/parse?uri={}", uri)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["uri"], uri);
    assert_eq!(json["data"]["identifier"]["kind"], "typeId");
    assert_eq!(json["data"]["identifier"]["typeId"], format!("0x{}", "b".repeat(64)));
    assert_eq!(json["data"]["normalized"], format!("ckbfs://{}", "b".repeat(64)));
}

#[tokio::test]
async fn test_parse_endpoint_rejects_garbage() {
    let (status, _, json) = get_json(app(), "/ckbfs/parse?uri=invalid://x").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "INVALID_URI");
}

#[tokio::test]
async fn test_validate_existing_file() {
    let uri = out_point_uri('a', 0);
    let (status, _, json) = get_json(app(), &format!("/ckbfs/validate?uri={}", uri)).await;

    assert_eq!(status, StatusCode::OK);
    let data = &json["data"];
    assert_eq!(data["valid"], true);
    assert_eq!(data["exists"], true);
    assert_eq!(data["network"], "testnet");
    assert_eq!(data["filename"], "hello.txt");
    assert_eq!(data["contentType"], "text/plain");
    assert_eq!(data["size"], 5);
    assert!(data.get("error").is_none());
}

#[tokio::test]
async fn test_validate_reports_problems_in_payload() {
    let (status, _, json) = get_json(app(), "/ckbfs/validate?uri=invalid://x").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["data"]["valid"], false);
    assert_eq!(json["data"]["error"]["code"], "INVALID_URI");

    let missing = out_point_uri('d', 3);
    let (status, _, json) = get_json(app(), &format!("/ckbfs/validate?uri={}", missing)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["valid"], false);
    assert_eq!(json["data"]["exists"], false);
    assert_eq!(json["data"]["identifier"]["kind"], "outPoint");
    assert_eq!(json["data"]["error"]["code"], "FILE_NOT_FOUND");
}

#[tokio::test]
async fn test_request_validation_errors() {
    let (status, _, json) = get_json(app(), "/ckbfs").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "MISSING_REQUIRED_FIELD");

    let uri = out_point_uri('a', 0);
    let (status, _, json) =
        get_json(app(), &format!("/ckbfs?uri={}&network=devnet", uri)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "INVALID_NETWORK");

    let (status, _, json) = get_json(app(), &format!("/ckbfs?uri={}&format=xml", uri)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "INVALID_FORMAT");

    let (status, _, json) = get_json(app(), "/ckbfs?uri=not-a-uri").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "INVALID_URI");
}

#[tokio::test]
async fn test_upstream_errors_map_to_status() {
    let not_found = out_point_uri('d', 0);
    let (status, _, json) = get_json(app(), &format!("/ckbfs?uri={}", not_found)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["code"], "FILE_NOT_FOUND");

    let broken = out_point_uri('e', 0);
    let resolver = resolver()
        .with_failure(&broken, ResolveError::Decode("bad checksum".to_string()));
    let (status, _, json) =
        get_json(app_with(test_config(), resolver), &format!("/ckbfs?uri={}", broken)).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(json["error"]["code"], "CKBFS_DECODE_ERROR");
}

#[tokio::test]
async fn test_batch_preserves_order_with_partial_failure() {
    let (status, json) = post_json(
        app(),
        "/ckbfs/batch",
        serde_json::json!({
            "uris": [out_point_uri('a', 0), "bad", out_point_uri('d', 9), out_point_uri('b', 1)],
            "includeContent": false
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let results = json["data"]["results"].as_array().unwrap();
    assert_eq!(results.len(), 4);
    assert_eq!(results[0]["filename"], "hello.txt");
    assert!(results[0].get("content").is_none());
    assert_eq!(results[1]["identifier"], "bad");
    assert_eq!(results[1]["error"]["code"], "INVALID_URI");
    assert_eq!(results[2]["error"]["code"], "FILE_NOT_FOUND");
    assert_eq!(results[3]["filename"], "logo.png");

    let summary = &json["data"]["summary"];
    assert_eq!(summary["total"], 4);
    assert_eq!(summary["succeeded"], 2);
    assert_eq!(summary["failed"], 2);
}

#[tokio::test]
async fn test_batch_rejects_bad_requests() {
    let (status, json) =
        post_json(app(), "/ckbfs/batch", serde_json::json!({ "uris": [] })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "MISSING_REQUIRED_FIELD");

    let too_many: Vec<String> = (0..11).map(|i| out_point_uri('a', i)).collect();
    let (status, json) =
        post_json(app(), "/ckbfs/batch", serde_json::json!({ "uris": too_many })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "MISSING_REQUIRED_FIELD");

    let (status, json) = post_json(
        app(),
        "/ckbfs/batch",
        serde_json::json!({ "uris": [out_point_uri('a', 0)], "format": "raw" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "INVALID_FORMAT");

    let (status, json) = post_json(app(), "/ckbfs/batch", serde_json::json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "MISSING_REQUIRED_FIELD");
}

#[tokio::test]
async fn test_health_endpoints() {
    let (status, _, json) = get_json(app(), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert!(json["uptimeSeconds"].is_number());

    let (status, _, json) = get_json(app(), "/ckbfs/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["status"], "healthy");
    assert_eq!(json["data"]["networks"].as_array().unwrap().len(), 2);

    let degraded = resolver().with_network_down(Network::Mainnet);
    let (status, _, json) = get_json(app_with(test_config(), degraded), "/ckbfs/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["status"], "degraded");

    let down = resolver()
        .with_network_down(Network::Mainnet)
        .with_network_down(Network::Testnet);
    let (status, _, json) = get_json(app_with(test_config(), down), "/ckbfs/health").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["error"]["code"], "SERVICE_UNAVAILABLE");
    assert!(json["error"]["details"].as_str().unwrap().contains("unhealthy"));
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let _ = get(app(), "/ckbfs/parse?uri=invalid").await;
    let (status, headers, body) = get(app(), "/metrics").await;

    assert_eq!(status, StatusCode::OK);
    assert!(headers[header::CONTENT_TYPE].to_str().unwrap().starts_with("text/plain"));
    let text = String::from_utf8(body).unwrap();
    assert!(text.contains("http_requests_total"));
}

#[tokio::test]
async fn test_unknown_route_is_enveloped_404() {
    let (status, headers, json) = get_json(app(), "/nope").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["success"], false);
    assert_eq!(json["error"]["code"], "FILE_NOT_FOUND");
    assert_eq!(json["error"]["message"], "Endpoint not found");
    assert_eq!(headers["x-request-id"], json["requestId"].as_str().unwrap());
}

#[tokio::test]
async fn test_wrong_method_is_enveloped_405() {
    let (status, headers, json) = get_json(app(), "/ckbfs/batch").await;

    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(json["success"], false);
    assert_eq!(json["error"]["code"], "FILE_NOT_FOUND");
    assert_eq!(json["error"]["message"], "Method not allowed for this endpoint");
    assert_eq!(headers["x-request-id"], json["requestId"].as_str().unwrap());
    assert!(headers[header::ALLOW].to_str().unwrap().contains("POST"));
    assert!(headers[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("application/json"));
}

#[tokio::test]
async fn test_rate_limit_exempts_health() {
    let mut config = test_config();
    config.rate_limit.enabled = true;
    config.rate_limit.requests_per_minute = 1;
    config.rate_limit.burst = 1;
    let app = app_with(config, resolver());
    let parse = format!("/ckbfs/parse?uri={}", out_point_uri('a', 0));

    let (status, _, _) = get(app.clone(), &parse).await;
    assert_eq!(status, StatusCode::OK);

    let (status, headers, _) = get(app.clone(), &parse).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(headers[header::RETRY_AFTER], "1");
    assert!(headers.contains_key("x-request-id"));

    let (status, _, _) = get(app, "/health/live").await;
    assert_eq!(status, StatusCode::OK);
}
