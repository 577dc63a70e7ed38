use std::sync::Arc;

use axum::{response::Json, routing::get, Router};
use serde_json::{json, Value};

use crate::shared::state::AppState;

async fn root() -> Json<Value> {
    Json(json!({
        "name": "meetserver",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub fn configure_api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .merge(crate::meetings::configure())
        .merge(crate::action_items::configure())
        .merge(crate::decisions::configure())
}
