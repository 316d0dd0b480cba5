use crate::state::AppState;
use axum::{Json, extract::State};
use serde_json::{Value, json};

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "storage": state.config.storage.backend,
        "default_site_id": state.config.default_site_id,
    }))
}
