#![allow(dead_code)]

use civic_triage::config::{fingerprint::FingerprintConfig, jwt::JwtConfig, triage::TriageConfig};
use civic_triage::services::TriageContext;
use civic_triage::store::{IssueStore, MemoryIssueStore};
use civic_triage::websocket::IssueHub;
use reqwest::Client;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Once,
};

static INIT: Once = Once::new();
static FINGERPRINT_COUNTER: AtomicUsize = AtomicUsize::new(0);

pub const FINGERPRINT_SECRET: &str = "integration_test_fingerprint_secret";

fn init_env() {
    INIT.call_once(|| {
        dotenv::dotenv().ok();
        std::env::set_var(
            "JWT_SECRET",
            "integration_test_secret_that_is_at_least_32_characters_long",
        );
        std::env::set_var("RATE_LIMIT_ENABLED", "false");
        let config = JwtConfig::from_env().unwrap();
        let _ = civic_triage::utils::jwt::init_jwt_config(config);
    });
}

pub struct TestApp {
    pub addr: String,
    pub client: Client,
    pub ctx: TriageContext,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.addr, path)
    }
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with_store(Arc::new(MemoryIssueStore::new())).await
}

pub async fn spawn_app_with_store(store: Arc<dyn IssueStore>) -> TestApp {
    init_env();

    let hub = IssueHub::new();
    let ctx = TriageContext::new(store, hub.clone(), TriageConfig::default());
    let fingerprint_config = FingerprintConfig {
        secret: FINGERPRINT_SECRET.as_bytes().to_vec(),
        trust_forwarded_for: false,
        accept_client_header: true,
    };

    let app = axum::Router::new()
        .route("/", axum::routing::get(|| async { "ok" }))
        .merge(civic_triage::routes::create_routes())
        .layer(axum::middleware::from_fn(
            civic_triage::middleware::security::security_headers_middleware,
        ))
        .layer(axum::extract::Extension(ctx.clone()))
        .layer(axum::extract::Extension(hub))
        .layer(axum::extract::Extension(fingerprint_config));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    TestApp {
        addr: format!("http://{}", addr),
        client: Client::new(),
        ctx,
    }
}

/// A fresh submitter identity, so tests never trip the per-fingerprint spam window.
pub fn fresh_fingerprint() -> String {
    let n = FINGERPRINT_COUNTER.fetch_add(1, Ordering::SeqCst);
    format!("test-device-{}", n)
}

pub fn admin_token() -> String {
    civic_triage::utils::encode_admin_token("test-moderator").expect("Failed to mint admin token")
}

pub fn report(title: &str, description: &str, category: &str, lat: f64, lng: f64) -> Value {
    json!({
        "title": title,
        "description": description,
        "category": category,
        "latitude": lat,
        "longitude": lng,
    })
}

/// POST a report as `fingerprint` and return the response body.
pub async fn submit_as(app: &TestApp, fingerprint: &str, body: &Value) -> (u16, Value) {
    let resp = app
        .client
        .post(app.url("/issues"))
        .header("x-client-fingerprint", fingerprint)
        .json(body)
        .send()
        .await
        .expect("Failed to submit report");

    let status = resp.status().as_u16();
    let body: Value = resp.json().await.expect("Failed to parse submit response");
    (status, body)
}

/// Submit a report that must be accepted as a new issue; returns its id.
pub async fn create_issue(
    app: &TestApp,
    title: &str,
    description: &str,
    category: &str,
    lat: f64,
    lng: f64,
) -> i32 {
    let (status, body) = submit_as(
        app,
        &fresh_fingerprint(),
        &report(title, description, category, lat, lng),
    )
    .await;

    if status != 200 || body["data"]["outcome"] != "created" {
        panic!("Expected a created issue: status={}, body={}", status, body);
    }

    body["data"]["issue"]["id"]
        .as_i64()
        .expect("Response missing issue id") as i32
}

pub async fn get_issue(app: &TestApp, id: i32) -> Value {
    let resp = app
        .client
        .get(app.url(&format!("/issues/{}", id)))
        .send()
        .await
        .expect("Failed to get issue");
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.expect("Failed to parse issue response");
    body["data"].clone()
}

/// PUT/POST/DELETE on an admin route with a valid admin token.
pub async fn admin_request(
    app: &TestApp,
    method: reqwest::Method,
    path: &str,
    body: Option<Value>,
) -> (u16, Value) {
    let mut req = app
        .client
        .request(method, app.url(path))
        .bearer_auth(admin_token());
    if let Some(body) = body {
        req = req.json(&body);
    }
    let resp = req.send().await.expect("Failed to send admin request");
    let status = resp.status().as_u16();
    let body: Value = resp.json().await.unwrap_or(Value::Null);
    (status, body)
}

pub async fn set_status(app: &TestApp, id: i32, status: &str) -> (u16, Value) {
    admin_request(
        app,
        reqwest::Method::PUT,
        &format!("/admin/issues/{}/status", id),
        Some(json!({ "status": status })),
    )
    .await
}
