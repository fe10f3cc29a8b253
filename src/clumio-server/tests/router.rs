//! End-to-end tests driving the router against mock Clumio and Slack servers.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::{Value, json};
use tower::ServiceExt;
use wiremock::matchers::{body_json, header as header_eq, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use clumio_server::{AppState, ServerConfig, create_router_with_state};

const FORM: &str = "application/x-www-form-urlencoded";

async fn app(clumio: &MockServer, slack: Option<&MockServer>) -> Router {
    let config = ServerConfig {
        clumio_base_url: clumio.uri(),
        clumio_api_token: SecretString::from("test-token".to_string()),
        clumio_timeout_secs: 5,
        slack_bot_token: slack.map(|_| SecretString::from("xoxb-test".to_string())),
        slack_api_base_url: slack.map(|s| s.uri()).unwrap_or_default(),
        max_display: 5,
        ..ServerConfig::default()
    };
    create_router_with_state(Arc::new(AppState::new(config).await.unwrap()))
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, body.to_vec())
}

async fn send_json(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, body) = send(app, request).await;
    (status, serde_json::from_slice(&body).unwrap())
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_form(uri: &str, pairs: &[(&str, &str)]) -> Request<Body> {
    let body = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish();
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, FORM)
        .body(Body::from(body))
        .unwrap()
}

fn slash_command(uri: &str, command: &str, text: &str) -> Request<Body> {
    post_form(
        uri,
        &[
            ("command", command),
            ("text", text),
            ("user_id", "U1"),
            ("team_id", "T1"),
            ("response_url", "https://hooks.slack.com/commands/T1/1"),
        ],
    )
}

async fn mount_s3_assets(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/datasources/protection-groups/s3-assets"))
        .and(query_param(
            "filter",
            r#"{"account_native_id":{"$eq":"761018876565"}}"#,
        ))
        .and(header_eq("Authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_embedded": {"items": [
                {"id": "asset-1", "bucket_id": 101, "bucket_name": "prod-logs", "region": "us-west-2"},
                {"id": "asset-2", "bucket_id": 102, "bucket_name": "prod-data"}
            ]}
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn health_answers_get_and_post() {
    let clumio = MockServer::start().await;

    let (status, body) = send_json(app(&clumio, None).await, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));

    let request = Request::builder()
        .method("POST")
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(app(&clumio, None).await, request).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn s3_inventory_projects_items() {
    let clumio = MockServer::start().await;
    mount_s3_assets(&clumio).await;

    let (status, body) = send_json(
        app(&clumio, None).await,
        get("/inventory?type=s3&account=761018876565"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!([
            {"id": "asset-1", "bucket_id": "101", "bucket_name": "prod-logs"},
            {"id": "asset-2", "bucket_id": "102", "bucket_name": "prod-data"}
        ])
    );
}

#[tokio::test]
async fn ec2_inventory_passes_through() {
    let clumio = MockServer::start().await;
    let raw = json!({
        "_embedded": {"items": [{"instance_id": "i-1", "state": "running"}]},
        "total_count": 1
    });
    Mock::given(method("GET"))
        .and(path("/inventory/protected-items/aws/ec2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(raw.clone()))
        .mount(&clumio)
        .await;

    let (status, body) = send_json(app(&clumio, None).await, get("/inventory?type=ec2")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, raw);
}

#[tokio::test]
async fn s3_inventory_without_account_is_rejected() {
    let clumio = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&clumio)
        .await;

    let (status, body) = send_json(app(&clumio, None).await, get("/inventory?type=s3")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "account");
    assert!(body["error"].as_str().unwrap().contains("account"));
}

#[tokio::test]
async fn invalid_type_is_rejected() {
    let clumio = MockServer::start().await;

    let (status, body) = send_json(app(&clumio, None).await, get("/inventory?type=rds")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "invalid_type");
    assert_eq!(body["value"], "rds");
}

#[tokio::test]
async fn restore_rejects_non_numeric_bucket_id() {
    let clumio = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&clumio)
        .await;

    let (status, body) = send_json(
        app(&clumio, None).await,
        get("/restore?type=s3&bucket-id=abc"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(
        body["error"]
            .as_str()
            .unwrap()
            .contains("bucket-id must be numeric")
    );
}

#[tokio::test]
async fn restore_from_json_body() {
    let clumio = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/restore/aws/s3"))
        .and(body_json(json!({"bucket_name": "prod-logs", "bucket_id": 42})))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({"task_id": "t-9"})))
        .expect(1)
        .mount(&clumio)
        .await;

    let request = Request::builder()
        .method("POST")
        .uri("/restore")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({"type": "s3", "bucket-name": "prod-logs", "bucket-id": "42"}).to_string(),
        ))
        .unwrap();
    let (status, body) = send_json(app(&clumio, None).await, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"task_id": "t-9"}));
}

#[tokio::test]
async fn backend_failure_is_500() {
    let clumio = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&clumio)
        .await;

    let (status, body) = send_json(app(&clumio, None).await, get("/inventory?type=ec2")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "backend_error");
    assert!(body["error"].as_str().unwrap().contains("maintenance"));
}

#[tokio::test]
async fn slash_command_gets_blocks() {
    let clumio = MockServer::start().await;
    mount_s3_assets(&clumio).await;
    let slack = MockServer::start().await;

    let (status, body) = send_json(
        app(&clumio, Some(&slack)).await,
        slash_command("/inventory", "/inventory", "s3 account=761018876565"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let blocks = body["blocks"].as_array().unwrap();
    assert_eq!(blocks[0]["type"], "header");
    assert_eq!(blocks[0]["text"]["text"], "Clumio S3 Inventory (********6565)");
    assert_eq!(blocks[3]["type"], "actions");
    assert_eq!(blocks[3]["elements"][0]["action_id"], "view_backups");
}

#[tokio::test]
async fn slash_command_without_bot_token_has_no_buttons() {
    let clumio = MockServer::start().await;
    mount_s3_assets(&clumio).await;

    let (_, body) = send_json(
        app(&clumio, None).await,
        slash_command("/inventory", "/inventory", "account=761018876565"),
    )
    .await;
    let blocks = body["blocks"].as_array().unwrap();
    assert!(blocks.iter().all(|b| b["type"] != "actions"));
}

#[tokio::test]
async fn slash_command_errors_are_ephemeral_200() {
    let clumio = MockServer::start().await;

    let (status, body) = send_json(
        app(&clumio, None).await,
        slash_command("/restore", "/restore", "type=s3 bucket-id=abc"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["response_type"], "ephemeral");
    assert!(
        body["text"]
            .as_str()
            .unwrap()
            .contains("bucket-id must be numeric")
    );
}

#[tokio::test]
async fn slack_routes_need_bot_token() {
    let clumio = MockServer::start().await;
    let (status, _) = send(
        app(&clumio, None).await,
        post_form("/slack/interactive", &[("payload", "{}")]),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn url_verification_echoes_challenge() {
    let clumio = MockServer::start().await;
    let slack = MockServer::start().await;

    let request = Request::builder()
        .method("POST")
        .uri("/slack/events")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({"type": "url_verification", "challenge": "abc123", "token": "x"}).to_string(),
        ))
        .unwrap();
    let (status, body) = send_json(app(&clumio, Some(&slack)).await, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"challenge": "abc123"}));
}

#[tokio::test]
async fn stale_asset_click_acks_then_reports_error() {
    let clumio = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/backups/protection-groups/s3-assets"))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_string("protection group asset not found")
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&clumio)
        .await;

    let slack = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/actions/T1/1"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&slack)
        .await;

    let value = json!({"id": "asset-gone", "bucket_id": "101", "bucket_name": "old"}).to_string();
    let payload = json!({
        "type": "block_actions",
        "user": {"id": "U1"},
        "response_url": format!("{}/actions/T1/1", slack.uri()),
        "actions": [{"action_id": "view_backups", "block_id": "b", "value": value}]
    })
    .to_string();

    let (status, body) = send(
        app(&clumio, Some(&slack)).await,
        post_form("/slack/interactive", &[("payload", &payload)]),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.is_empty());
    assert!(slack.received_requests().await.unwrap().is_empty());

    let mut delivered = None;
    for _ in 0..100 {
        let requests = slack.received_requests().await.unwrap();
        if let Some(request) = requests.first() {
            delivered = Some(serde_json::from_slice::<Value>(&request.body).unwrap());
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    let delivered = delivered.expect("no follow-up posted to response_url");
    assert_eq!(delivered["replace_original"], true);
    assert!(
        delivered["text"]
            .as_str()
            .unwrap()
            .contains("protection group asset not found")
    );
}

#[tokio::test]
async fn malformed_interaction_is_still_acknowledged() {
    let clumio = MockServer::start().await;
    let slack = MockServer::start().await;

    let (status, body) = send(
        app(&clumio, Some(&slack)).await,
        post_form("/slack/interactive", &[("payload", "{not json")]),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.is_empty());
}

#[tokio::test]
async fn options_list_objects() {
    let clumio = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/datasources/protection-groups/s3-assets/101/objects"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_embedded": {"items": [{"object_key": "a.txt", "size": 1}, {"object_key": "b.txt", "size": 2}]}
        })))
        .mount(&clumio)
        .await;
    let slack = MockServer::start().await;

    let payload = json!({
        "type": "block_suggestion",
        "action_id": "select_object",
        "block_id": "object_select:101",
        "value": ""
    })
    .to_string();
    let (status, body) = send_json(
        app(&clumio, Some(&slack)).await,
        post_form("/slack/options", &[("payload", &payload)]),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["options"].as_array().unwrap().len(), 2);
    assert_eq!(body["options"][1]["value"], "b.txt");
}
