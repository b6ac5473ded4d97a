//! HTTP front end
//!
//! `GET /` (or `/nisab`) with optional `currency` and `standard` query values
//! answers with a nisab entry as JSON. Every response is CORS-open and
//! preflight `OPTIONS` requests are answered by the CORS layer.

use axum::{
    extract::{Query, State},
    http::Method,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde::Deserialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::data::NisabEntry;
use crate::proxy::NisabProxy;

/// Raw query string values, validated later by the proxy
#[derive(Debug, Default, Deserialize)]
pub struct NisabQuery {
    pub currency: Option<String>,
    pub standard: Option<String>,
}

/// Create the proxy router
pub fn create_router(proxy: NisabProxy) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS]);

    Router::new()
        .route("/", get(nisab))
        .route("/nisab", get(nisab))
        .route("/health", get(health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(proxy)
}

/// GET /nisab
///
/// An unparseable query string is treated like an empty one.
pub async fn nisab(
    State(proxy): State<NisabProxy>,
    query: Option<Query<NisabQuery>>,
) -> Json<NisabEntry> {
    let Query(query) = query.unwrap_or_default();
    let entry = proxy
        .handle(query.currency.as_deref(), query.standard.as_deref())
        .await;
    Json(entry)
}

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    "OK"
}
