//! Health API

use axum::{response::Json, routing::get, Router};

async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "UP",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

pub fn health_router() -> Router {
    Router::new().route("/health", get(health_handler))
}
