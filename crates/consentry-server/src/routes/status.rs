//! Service status route.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use crate::state::AppState;
use consentry_core::{Category, RECORD_VERSION};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/consent/status", get(consent_status))
}

/// GET /api/consent/status — configuration and live session count.
async fn consent_status(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let stored = state.storage.count_all().unwrap_or(0);
    let policy = &state.config.policy;

    Json(serde_json::json!({
        "available": true,
        "recordVersion": RECORD_VERSION,
        "storage": {
            "backend": "sqlite",
            "key": policy.storage_key,
            "storedRecords": stored,
        },
        "sync": state.sync_target(),
        "activeSessions": state.sessions.len(),
        "maxAgeYears": policy.max_age_years,
        "bannerDelayMs": policy.banner_delay_ms,
        "categories": Category::all()
            .iter()
            .map(|c| serde_json::json!({ "name": c, "optional": c.is_optional() }))
            .collect::<Vec<_>>(),
    }))
}
