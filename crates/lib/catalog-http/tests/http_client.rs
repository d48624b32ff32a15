use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use catalog_core::client::{CatalogClient, ClientError};
use catalog_core::config::ClientConfig;
use catalog_http::HttpCatalogClient;
use catalog_store::models::SearchRequest;
use serde_json::{Value, json};
use tokio::sync::Mutex;

#[derive(Clone, Default)]
struct MockState {
    calls: Arc<AtomicUsize>,
    fail_first: usize,
    auth: Arc<Mutex<Vec<Option<String>>>>,
    bodies: Arc<Mutex<Vec<Value>>>,
    reply: Value,
}

async fn graphql(
    State(state): State<MockState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let call = state.calls.fetch_add(1, Ordering::SeqCst);
    state.auth.lock().await.push(
        headers
            .get("authorization")
            .and_then(|value| value.to_str().ok())
            .map(str::to_string),
    );
    state.bodies.lock().await.push(body);
    if call < state.fail_first {
        return (StatusCode::SERVICE_UNAVAILABLE, "busy").into_response();
    }
    Json(state.reply.clone()).into_response()
}

async fn spawn_mock(state: MockState) -> SocketAddr {
    let app = Router::new()
        .route("/api/graphql", post(graphql))
        .with_state(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock catalog");
    let addr = listener.local_addr().expect("mock addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("mock catalog serves");
    });
    addr
}

fn config_for(addr: SocketAddr, token: &str) -> ClientConfig {
    ClientConfig::new(format!("http://{addr}"), token)
        .with_timeout(Duration::from_secs(5))
        .with_retry_max(2)
}

fn search_reply() -> Value {
    json!({
        "data": {
            "searchAcrossEntities": {
                "start": 0,
                "count": 2,
                "total": 7,
                "searchResults": [
                    { "entity": {
                        "urn": "urn:li:dataset:(urn:li:dataPlatform:hive,orders,PROD)",
                        "type": "DATASET",
                        "name": "orders",
                        "platform": { "name": "hive" },
                        "properties": { "name": "orders", "description": "All orders" }
                    } },
                    { "entity": {
                        "urn": "urn:li:dashboard:(looker,sales)",
                        "type": "DASHBOARD",
                        "properties": { "name": "Sales" }
                    } }
                ]
            }
        }
    })
}

#[tokio::test]
async fn search_sends_bearer_token_and_decodes_results() {
    let state = MockState {
        reply: search_reply(),
        ..MockState::default()
    };
    let addr = spawn_mock(state.clone()).await;
    let client = HttpCatalogClient::new(&config_for(addr, "secret")).expect("client");

    let result = client
        .search(SearchRequest {
            query: "orders".to_string(),
            limit: 2,
            ..SearchRequest::default()
        })
        .await
        .expect("search succeeds");

    assert_eq!(result.total, 7);
    assert_eq!(result.entities.len(), 2);
    assert_eq!(result.entities[0].name.as_deref(), Some("orders"));
    assert_eq!(result.entities[0].platform.as_deref(), Some("hive"));
    assert_eq!(
        state.auth.lock().await.as_slice(),
        &[Some("Bearer secret".to_string())]
    );
    let bodies = state.bodies.lock().await;
    assert_eq!(bodies[0]["variables"]["input"]["query"], "orders");
    assert_eq!(bodies[0]["variables"]["input"]["count"], 2);
}

#[tokio::test]
async fn empty_token_sends_no_authorization() {
    let state = MockState {
        reply: json!({ "data": { "appConfig": { "appVersion": "v1.2.0" } } }),
        ..MockState::default()
    };
    let addr = spawn_mock(state.clone()).await;
    let client = HttpCatalogClient::new(&config_for(addr, "")).expect("client");

    let report = client.ping().await.expect("ping succeeds");
    assert!(report.ok);
    assert_eq!(report.version.as_deref(), Some("v1.2.0"));
    assert_eq!(state.auth.lock().await.as_slice(), &[None]);
}

#[tokio::test]
async fn server_errors_are_retried_within_budget() {
    let state = MockState {
        fail_first: 2,
        reply: json!({ "data": { "appConfig": { "appVersion": "v1" } } }),
        ..MockState::default()
    };
    let addr = spawn_mock(state.clone()).await;
    let client = HttpCatalogClient::new(&config_for(addr, "t")).expect("client");

    client.ping().await.expect("third attempt succeeds");
    assert_eq!(state.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn retry_budget_exhaustion_surfaces_status() {
    let state = MockState {
        fail_first: usize::MAX,
        ..MockState::default()
    };
    let addr = spawn_mock(state.clone()).await;
    let client = HttpCatalogClient::new(&config_for(addr, "t").with_retry_max(1)).expect("client");

    let err = client.ping().await.expect_err("all attempts fail");
    assert!(matches!(err, ClientError::Status { status: 503, .. }));
    assert_eq!(state.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn graphql_errors_are_not_retried() {
    let state = MockState {
        reply: json!({ "errors": [{ "message": "Unauthorized to perform this action" }] }),
        ..MockState::default()
    };
    let addr = spawn_mock(state.clone()).await;
    let client = HttpCatalogClient::new(&config_for(addr, "t")).expect("client");

    let err = client
        .add_tag("urn:li:dataset:x", "urn:li:tag:pii", None)
        .await
        .expect_err("mutation rejected");
    assert!(matches!(err, ClientError::GraphQl(message) if message.contains("Unauthorized")));
    assert_eq!(state.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn mutations_report_applied_changes() {
    let state = MockState {
        reply: json!({ "data": { "updateDescription": true } }),
        ..MockState::default()
    };
    let addr = spawn_mock(state.clone()).await;
    let client = HttpCatalogClient::new(&config_for(addr, "t")).expect("client");

    let report = client
        .update_description("urn:li:dataset:x", "Orders fact table", Some("order_id"))
        .await
        .expect("mutation applied");
    assert!(report.success);
    assert_eq!(report.operation, "update_description");
    let bodies = state.bodies.lock().await;
    assert_eq!(bodies[0]["variables"]["input"]["subResource"], "order_id");
    assert_eq!(bodies[0]["variables"]["input"]["description"], "Orders fact table");
}
