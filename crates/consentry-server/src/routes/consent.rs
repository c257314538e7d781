//! Visitor consent routes — page load, banner actions, decisions.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use tracing::info;

use crate::state::{is_valid_visitor_id, AppState};
use consentry_core::PreferenceFlags;
use consentry_protocol::SaveOutcome;
use consentry_runtime::ConsentSession;

// ---------------------------------------------------------------
// Route builder
// ---------------------------------------------------------------

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/visitors", post(create_visitor))
        .route("/visitors/{id}/page-load", post(page_load))
        .route(
            "/visitors/{id}/consent",
            get(get_consent).delete(withdraw_consent),
        )
        .route("/visitors/{id}/consent/accept-all", post(accept_all))
        .route("/visitors/{id}/consent/decline-all", post(decline_all))
        .route("/visitors/{id}/consent/custom", post(save_custom))
        .route("/visitors/{id}/banner/toggle", post(toggle_details))
}

type ApiError = (StatusCode, Json<serde_json::Value>);

fn error(status: StatusCode, message: &str) -> ApiError {
    (status, Json(serde_json::json!({ "error": message })))
}

fn active_session(state: &AppState, id: &str) -> Result<Arc<ConsentSession>, ApiError> {
    if !is_valid_visitor_id(id) {
        return Err(error(StatusCode::BAD_REQUEST, "Invalid visitor id"));
    }
    state
        .sessions
        .get(id)
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "No active session, load the page first"))
}

fn session_view(id: &str, session: &ConsentSession) -> serde_json::Value {
    serde_json::json!({
        "visitorId": id,
        "preferences": session.effective_preferences(),
        "bannerState": session.banner_state(),
        "bannerVisible": session.is_banner_visible(),
    })
}

fn decision_view(id: &str, session: &ConsentSession, outcome: SaveOutcome) -> serde_json::Value {
    serde_json::json!({
        "visitorId": id,
        "record": outcome.record,
        "persisted": outcome.persisted,
        "preferences": session.effective_preferences(),
        "bannerState": session.banner_state(),
        "bannerVisible": session.is_banner_visible(),
    })
}

// ---------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------

/// POST /api/visitors — allocate a visitor id.
async fn create_visitor() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "visitorId": uuid::Uuid::new_v4().to_string() }))
}

/// POST /api/visitors/:id/page-load — start a page session.
///
/// Returns immediately. Without valid consent the banner becomes visible
/// once the display delay has passed.
async fn page_load(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    if !is_valid_visitor_id(&id) {
        return error(StatusCode::BAD_REQUEST, "Invalid visitor id");
    }

    let session = state.sessions.insert(&id, state.new_session(&id));
    let evaluation = session.begin_load();

    let show_after_ms = if evaluation.has_valid_record {
        None
    } else {
        let pending = Arc::clone(&session);
        tokio::spawn(async move {
            pending.reveal_after_delay().await;
        });
        Some(state.config.policy.banner_delay_ms)
    };

    info!(
        "Page load for {}: valid consent={}",
        id, evaluation.has_valid_record
    );

    let mut body = session_view(&id, &session);
    body["hasValidRecord"] = serde_json::json!(evaluation.has_valid_record);
    body["showBannerAfterMs"] = serde_json::json!(show_after_ms);
    (StatusCode::OK, Json(body))
}

/// GET /api/visitors/:id/consent — effective preferences and banner state.
async fn get_consent(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match active_session(&state, &id) {
        Ok(session) => (StatusCode::OK, Json(session_view(&id, &session))),
        Err(e) => e,
    }
}

/// POST /api/visitors/:id/consent/accept-all
async fn accept_all(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match active_session(&state, &id) {
        Ok(session) => {
            let outcome = session.accept_all();
            (StatusCode::OK, Json(decision_view(&id, &session, outcome)))
        }
        Err(e) => e,
    }
}

/// POST /api/visitors/:id/consent/decline-all
async fn decline_all(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match active_session(&state, &id) {
        Ok(session) => {
            let outcome = session.decline_all();
            (StatusCode::OK, Json(decision_view(&id, &session, outcome)))
        }
        Err(e) => e,
    }
}

/// POST /api/visitors/:id/consent/custom — body: category flags.
async fn save_custom(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(flags): Json<PreferenceFlags>,
) -> impl IntoResponse {
    match active_session(&state, &id) {
        Ok(session) => {
            let outcome = session.save_custom(flags);
            (StatusCode::OK, Json(decision_view(&id, &session, outcome)))
        }
        Err(e) => e,
    }
}

/// POST /api/visitors/:id/banner/toggle — open/close category details.
async fn toggle_details(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match active_session(&state, &id) {
        Ok(session) => {
            session.toggle_details();
            (StatusCode::OK, Json(session_view(&id, &session)))
        }
        Err(e) => e,
    }
}

/// DELETE /api/visitors/:id/consent — withdraw consent.
async fn withdraw_consent(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match active_session(&state, &id) {
        Ok(session) => {
            let cleared = session.withdraw();
            let mut body = session_view(&id, &session);
            body["cleared"] = serde_json::json!(cleared);
            (StatusCode::OK, Json(body))
        }
        Err(e) => e,
    }
}
