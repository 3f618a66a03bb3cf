//! Application setup and server configuration.

use std::sync::Arc;

use axum::{
    extract::Extension,
    routing::{get, post},
    Router,
};
use company_intel::IntelService;
use tower_http::trace::TraceLayer;

use crate::server::routes::{
    analyze_handler, ask_handler, convert_titles_handler, email_domains_handler,
    filter_domains_handler, find_email_pattern_handler, health_handler, ingest_handler,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub intel: Arc<IntelService>,
}

impl AppState {
    pub fn new(intel: IntelService) -> Self {
        Self {
            intel: Arc::new(intel),
        }
    }
}

/// Build the Axum application router
pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/analyze", post(analyze_handler))
        .route("/find_email_pattern", post(find_email_pattern_handler))
        .route("/convert_titles", post(convert_titles_handler))
        .route("/filter_domains", post(filter_domains_handler))
        .route("/ingest", post(ingest_handler))
        .route("/ask", post(ask_handler))
        .route("/email_domains", post(email_domains_handler))
        .route("/health", get(health_handler))
        .layer(Extension(state))
        .layer(TraceLayer::new_for_http())
}
