//! Route tests against the full router with a scripted backend.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header::CONTENT_TYPE, Request, StatusCode},
    Router,
};
use company_intel::{testing::MockAI, IntelConfig, IntelService, MemoryStore};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use server_core::server::{build_app, AppState};
use tower::ServiceExt;

fn app(ai: &MockAI) -> Router {
    let service = IntelService::new(
        Arc::new(ai.clone()),
        Arc::new(MemoryStore::new()),
        IntelConfig::default(),
    )
    .unwrap();
    build_app(AppState::new(service))
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

async fn post_json(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

fn summarizing_ai() -> MockAI {
    MockAI::new()
        .with_response("The following documents are about", "1. Sites:\nLinz")
        .with_response(
            "partial summaries",
            "1. Information about production sites for Acme:\nLinz\n2. Information about furnaces for Acme:\nNONE",
        )
}

#[tokio::test]
async fn test_health() {
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, body) = send(app(&MockAI::new()), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok"}));
}

#[tokio::test]
async fn test_analyze_returns_every_keyword() {
    let ai = summarizing_ai();
    let (status, body) = post_json(
        app(&ai),
        "/analyze",
        json!({
            "text": "Acme runs a mill in Linz.",
            "company": "Acme",
            "keywords": ["production sites", "furnaces"]
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"production sites": "Linz", "furnaces": ""}));
}

#[tokio::test]
async fn test_analyze_degrades_to_empty_sections() {
    let ai = MockAI::new().with_failure("");
    let (status, body) = post_json(
        app(&ai),
        "/analyze",
        json!({"text": "Acme runs a mill.", "company": "Acme", "keywords": ["sites"]}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"sites": ""}));
}

#[tokio::test]
async fn test_analyze_rejects_blank_company() {
    let ai = MockAI::new();
    let (status, body) = post_json(
        app(&ai),
        "/analyze",
        json!({"text": "Acme runs a mill.", "company": "  ", "keywords": ["sites"]}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");
    assert_eq!(ai.completion_count(), 0);
}

#[tokio::test]
async fn test_malformed_body_is_rejected() {
    let (status, _) = post_json(app(&MockAI::new()), "/analyze", json!({"company": "Acme"})).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_find_email_pattern() {
    let ai = MockAI::new()
        .with_response("Selected addresses", "kamynina_ei@nlmk.com\nkruglov_ds@nlmk.com")
        .with_response(
            "Analyse each address",
            "[last name]_[first name initials (2 initials)]@nlmk.com",
        )
        .with_response(
            "Most common email structure",
            "[last name]_[first name initials (2 initials)]@nlmk.com",
        );

    let (status, body) = post_json(
        app(&ai),
        "/find_email_pattern",
        json!({
            "nlmk.com": ["kamynina_ei@nlmk.com", "info@nlmk.com", "kruglov_ds@nlmk.com"],
            "empty.com": []
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"nlmk.com": "l_f1", "empty.com": null}));
    assert_eq!(ai.completion_count(), 3);
}

#[tokio::test]
async fn test_convert_titles_writes_back_in_place() {
    let ai = MockAI::new().with_response("Translate every line", "Managing Director, Buyer");

    let (status, body) = post_json(
        app(&ai),
        "/convert_titles",
        json!({
            "Acme": [
                {"title": "Geschäftsführer", "name": "Ada"},
                {"name": "Bob"},
                {"title": "Einkäufer", "email": "c@acme.com"}
            ]
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "Acme": [
                {"title": "Managing Director", "name": "Ada"},
                {"name": "Bob"},
                {"title": "Buyer", "email": "c@acme.com"}
            ]
        })
    );
}

#[tokio::test]
async fn test_filter_domains() {
    let ai = MockAI::new()
        .with_response("IBM domain:", "ibm.com")
        .with_response("Globex domain:", "NONE");

    let (status, body) = post_json(
        app(&ai),
        "/filter_domains",
        json!({
            "IBM": ["ibm.com", "gmail.com"],
            "Globex": ["globex.org"],
            "Initech": []
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"IBM": "ibm.com", "Globex": "NONE", "Initech": null}));
}

#[tokio::test]
async fn test_ingest_then_ask() {
    let ai = summarizing_ai()
        .with_response("I was given the keyword phrase", "Where does the company produce?")
        .with_response("Use the following pieces of context", "Acme produces in Linz.");
    let app = app(&ai);
    let keywords = json!(["production sites", "furnaces"]);

    let (status, body) = post_json(
        app.clone(),
        "/ingest",
        json!({"text": "Acme runs a mill in Linz.", "company": "Acme", "keywords": keywords}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["chunks"], 1);
    assert!(body["summary"].as_str().unwrap().contains("Linz"));

    let (status, body) = post_json(
        app,
        "/ask",
        json!({"company": "Acme", "keywords": ["production sites"]}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"production sites": "Acme produces in Linz."}));
}

#[tokio::test]
async fn test_ask_without_ingest_is_null() {
    let ai = MockAI::new().with_response("I was given the keyword phrase", "Where?");
    let (status, body) = post_json(
        app(&ai),
        "/ask",
        json!({"company": "Acme", "keywords": ["production sites"]}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"production sites": null}));
}

#[tokio::test]
async fn test_ingest_backend_failure_is_bad_gateway() {
    let ai = MockAI::new().with_failure("");
    let (status, body) = post_json(
        app(&ai),
        "/ingest",
        json!({"text": "Acme runs a mill.", "company": "Acme", "keywords": ["sites"]}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["status"], "error");
}

#[tokio::test]
async fn test_email_domains() {
    let ai = summarizing_ai().with_response(
        "Use the following pieces of context",
        "The company uses these domains:\n- acme.com\n- @acme.at",
    );
    let app = app(&ai);

    post_json(
        app.clone(),
        "/ingest",
        json!({"text": "Acme runs a mill in Linz.", "company": "Acme", "keywords": ["production sites"]}),
    )
    .await;

    let (status, body) = post_json(app, "/email_domains", json!({"company": "Acme"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"company": "Acme", "domains": ["acme.com", "acme.at"]}));
}
