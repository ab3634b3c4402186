use axum::{
    body::{to_bytes, Body},
    http::{HeaderMap, Request, StatusCode},
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use streambags_backend::advisor::{AdvisorClient, GeminiClient, ADVICE_FALLBACK, ANALYSIS_FALLBACK};
use streambags_backend::catalog::{demo_tokens, TokenCatalog};
use streambags_backend::config::GeminiConfig;
use streambags_backend::registry::ProfileRegistry;
use streambags_backend::server::{router, AppState};
use streambags_backend::session::{SessionCache, SESSION_HEADER};
use streambags_backend::simulator::{SwapSimulator, TradeFeed};

async fn spawn(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

/// Stand-in for the model API: always 500.
fn broken_model() -> Router {
    Router::new().fallback(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") })
}

/// Stand-in for the model API: answers every prompt with a fixed candidate.
fn echo_model() -> Router {
    Router::new().route(
        "/models/:model",
        post(|Json(body): Json<Value>| async move {
            let prompt = body["contents"][0]["parts"][0]["text"]
                .as_str()
                .unwrap_or_default()
                .to_string();
            let verdict = if prompt.contains("Symbol: SOL") {
                "SOL looks strong."
            } else {
                "Consider JUP."
            };
            Json(json!({
                "candidates": [{ "content": { "parts": [{ "text": verdict }], "role": "model" } }]
            }))
        }),
    )
}

fn state(model_url: &str, session_name: &str) -> Arc<AppState> {
    let session_dir = std::env::temp_dir().join(format!(
        "streambags-api-{session_name}-{}",
        std::process::id()
    ));
    let _ = std::fs::remove_dir_all(&session_dir);

    Arc::new(AppState {
        registry: ProfileRegistry::in_memory(),
        catalog: TokenCatalog::Demo,
        gemini: GeminiClient::new(
            reqwest::Client::new(),
            GeminiConfig {
                api_key: Some("test-key".into()),
                model: "test-model".into(),
                base_url: model_url.to_string(),
            },
        ),
        trade_feed: TradeFeed::new(Duration::from_millis(50), 1.0),
        swaps: SwapSimulator::new(Duration::from_millis(10)),
        session: SessionCache::new(session_dir),
    })
}

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let (status, _, value) = call_in_session(app, method, uri, body, None).await;
    (status, value)
}

/// Like [`call`], optionally sending a session header; also returns the response headers.
async fn call_in_session(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
    session: Option<&str>,
) -> (StatusCode, HeaderMap, Value) {
    let mut request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(session) = session {
        request = request.header(SESSION_HEADER, session);
    }
    let request = request
        .body(match body {
            Some(v) => Body::from(v.to_string()),
            None => Body::empty(),
        })
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, headers, value)
}

#[tokio::test]
async fn register_and_resolve_terminal() {
    let app = router(state("http://127.0.0.1:1", "register"));

    let (status, headers, created) = call_in_session(
        &app,
        "POST",
        "/api/streamers",
        Some(json!({ "walletAddress": "7xK...AB12", "slug": "ninja", "displayName": "Ninja Hub" })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["slug"], "ninja");
    let session = headers[SESSION_HEADER].to_str().unwrap().to_string();
    assert!(created["partnerKey"].as_str().unwrap().starts_with("pk_bags_"));

    let (status, by_slug) = call(&app, "GET", "/api/streamers/NINJA", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(by_slug, created);

    let (status, by_wallet) = call(&app, "GET", "/api/streamers/by-wallet/7xK...AB12", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(by_wallet, created);

    let (_, all) = call(&app, "GET", "/api/streamers", None).await;
    assert_eq!(all.as_array().unwrap().len(), 1);

    let (status, _, cached) =
        call_in_session(&app, "GET", "/api/session", None, Some(&session)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cached, created);

    let (status, _) = call(&app, "GET", "/api/streamers/ghost", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn saved_profile_is_private_to_its_session() {
    let app = router(state("http://127.0.0.1:1", "private"));

    let (status, headers, _) = call_in_session(
        &app,
        "POST",
        "/api/streamers",
        Some(json!({ "walletAddress": "wallet-a", "slug": "ninja", "displayName": "Ninja Hub" })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let mine = headers[SESSION_HEADER].to_str().unwrap().to_string();

    // a second client with no session, or its own, sees nothing
    let (status, body) = call(&app, "GET", "/api/session", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());

    let (status, _, _) =
        call_in_session(&app, "GET", "/api/session", None, Some("someoneelse0000")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, _) =
        call_in_session(&app, "GET", "/api/session", None, Some("../../etc/passwd")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // a client that already has a session keeps it across registrations
    let (_, headers, _) = call_in_session(
        &app,
        "POST",
        "/api/streamers",
        Some(json!({ "walletAddress": "wallet-b", "slug": "second", "displayName": "Second" })),
        Some(&mine),
    )
    .await;
    assert_eq!(headers[SESSION_HEADER], mine.as_str());
    let (_, _, cached) = call_in_session(&app, "GET", "/api/session", None, Some(&mine)).await;
    assert_eq!(cached["slug"], "second");
}

#[tokio::test]
async fn malformed_bodies_get_json_errors() {
    let app = router(state("http://127.0.0.1:1", "malformed"));

    let (status, body) = call(
        &app,
        "POST",
        "/api/streamers",
        Some(json!({ "walletAddress": "wallet-a", "slug": "ninja" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("displayName"));

    let (status, body) = call(
        &app,
        "POST",
        "/api/swap",
        Some(json!({ "from": "SOL", "to": "JUP", "partnerKey": "pk_bags_abc" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("amount"));

    let (status, body) = call(&app, "POST", "/api/analyze", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn duplicate_slug_is_a_conflict() {
    let app = router(state("http://127.0.0.1:1", "conflict"));
    let first = json!({ "walletAddress": "wallet-a", "slug": "ninja", "displayName": "Ninja Hub" });
    let second = json!({ "walletAddress": "wallet-b", "slug": "Ninja", "displayName": "Other" });

    assert_eq!(call(&app, "POST", "/api/streamers", Some(first)).await.0, StatusCode::CREATED);
    let (status, body) = call(&app, "POST", "/api/streamers", Some(second)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "slug already taken");

    let (_, kept) = call(&app, "GET", "/api/streamers/ninja", None).await;
    assert_eq!(kept["displayName"], "Ninja Hub");
    assert_eq!(kept["walletAddress"], "wallet-a");
}

#[tokio::test]
async fn tokens_fees_and_swap() {
    let app = router(state("http://127.0.0.1:1", "market"));

    let (status, tokens) = call(&app, "GET", "/api/tokens", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tokens.as_array().unwrap().len(), 5);
    assert_eq!(tokens[0]["symbol"], "SOL");

    let (status, fees) = call(&app, "GET", "/api/fees/pk_bags_abc", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(fees["lifetime"].as_f64().unwrap() >= 100.0);

    let (status, receipt) = call(
        &app,
        "POST",
        "/api/swap",
        Some(json!({ "from": "SOL", "to": "JUP", "amount": 2.0, "partnerKey": "pk_bags_abc" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(receipt["partnerKey"], "pk_bags_abc");

    let (status, body) = call(
        &app,
        "POST",
        "/api/swap",
        Some(json!({ "from": "SOL", "to": "JUP", "amount": 0.0, "partnerKey": "pk_bags_abc" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("amount"));
}

#[tokio::test]
async fn analyze_relays_model_text() {
    let model = spawn(echo_model()).await;
    let app = router(state(&model, "analyze"));

    let token = serde_json::to_value(&demo_tokens()[0]).unwrap();
    let (status, body) = call(&app, "POST", "/api/analyze", Some(json!({ "token": token }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["text"], "SOL looks strong.");
}

#[tokio::test]
async fn model_failure_becomes_error_body() {
    let model = spawn(broken_model()).await;
    let app = router(state(&model, "model-down"));

    let token = serde_json::to_value(&demo_tokens()[0]).unwrap();
    let (status, body) = call(&app, "POST", "/api/analyze", Some(json!({ "token": token }))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Failed to analyze token");

    let (status, body) = call(
        &app,
        "POST",
        "/api/advice",
        Some(json!({ "query": "alpha?", "availableTokens": [] })),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Failed to get advice");
}

#[tokio::test]
async fn client_gets_fallback_when_proxy_returns_500() {
    let model = spawn(broken_model()).await;
    let proxy = spawn(router(state(&model, "fallback"))).await;
    let client = AdvisorClient::new(reqwest::Client::new(), format!("{proxy}/api"));

    assert_eq!(client.analyze_token(&demo_tokens()[0]).await, ANALYSIS_FALLBACK);
    assert_eq!(
        client.get_trading_advice("alpha?", &demo_tokens()).await,
        ADVICE_FALLBACK
    );
}

#[tokio::test]
async fn client_round_trip_through_proxy() {
    let model = spawn(echo_model()).await;
    let proxy = spawn(router(state(&model, "roundtrip"))).await;
    let client = AdvisorClient::new(reqwest::Client::new(), format!("{proxy}/api/"));

    let advice = client.get_trading_advice("what should I buy?", &demo_tokens()).await;
    assert_eq!(advice, "Consider JUP.");
}

#[tokio::test]
async fn overlay_stream_delivers_trade_events() {
    let base = spawn(router(state("http://127.0.0.1:1", "overlay"))).await;

    let mut response = reqwest::get(format!("{base}/api/events/pk_bags_abc"))
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);

    let chunk = tokio::time::timeout(Duration::from_secs(5), response.chunk())
        .await
        .expect("no event within 5s")
        .unwrap()
        .unwrap();
    let text = String::from_utf8_lossy(&chunk);
    assert!(text.contains("event: trade"), "{text}");
    assert!(text.contains("tokenSymbol"), "{text}");
}
