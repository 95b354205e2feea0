//! services/api/src/web/user.rs
//!
//! Per-reader state: reading history and display preferences.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use ub_reader_core::User;
use utoipa::ToSchema;

use crate::web::{port_error, state::AppState};

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecordHistoryRequest {
    pub paper_id: String,
    pub title: String,
}

//=========================================================================================
// Reading History
//=========================================================================================

/// Visited papers, most recent first.
#[utoipa::path(
    get,
    path = "/history",
    responses(
        (status = 200, description = "The reading history"),
        (status = 401, description = "No active session")
    )
)]
pub async fn list_history_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let entries = state.history(&user.id).await.entries().await.map_err(port_error)?;
    Ok(Json(entries))
}

/// Record a visit. An earlier visit to the same paper moves to the front.
#[utoipa::path(
    post,
    path = "/history",
    request_body = RecordHistoryRequest,
    responses(
        (status = 200, description = "The updated reading history"),
        (status = 401, description = "No active session")
    )
)]
pub async fn record_history_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Json(req): Json<RecordHistoryRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let entries = state
        .history(&user.id)
        .await
        .record(&req.paper_id, &req.title)
        .await
        .map_err(port_error)?;
    Ok(Json(entries))
}

#[utoipa::path(
    delete,
    path = "/history/{paper_id}",
    responses(
        (status = 204, description = "Entry removed"),
        (status = 404, description = "Paper not in the history")
    ),
    params(
        ("paper_id" = String, Path, description = "The paper id.")
    )
)]
pub async fn remove_history_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(paper_id): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let removed = state
        .history(&user.id)
        .await
        .remove(&paper_id)
        .await
        .map_err(port_error)?;
    if !removed {
        return Err((
            StatusCode::NOT_FOUND,
            format!("Paper '{}' is not in the history", paper_id),
        ));
    }
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    delete,
    path = "/history",
    responses(
        (status = 204, description = "History cleared")
    )
)]
pub async fn clear_history_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    state.history(&user.id).await.clear().await.map_err(port_error)?;
    Ok(StatusCode::NO_CONTENT)
}

//=========================================================================================
// Preferences
//=========================================================================================

#[utoipa::path(
    get,
    path = "/preferences",
    responses(
        (status = 200, description = "The reader's preferences, defaults when never saved")
    )
)]
pub async fn get_preferences_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let preferences = state.preferences(&user.id).await.map_err(port_error)?;
    Ok(Json(preferences.get()))
}

/// Merge a partial preferences object; out-of-range values are clamped.
#[utoipa::path(
    put,
    path = "/preferences",
    request_body(content = Object, description = "Any subset of the preference fields."),
    responses(
        (status = 200, description = "The stored preferences"),
        (status = 400, description = "A field has the wrong type")
    )
)]
pub async fn update_preferences_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Json(changes): Json<Value>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let preferences = state.preferences(&user.id).await.map_err(port_error)?;
    let updated = preferences.merge(changes).await.map_err(port_error)?;
    Ok(Json(updated))
}

#[utoipa::path(
    delete,
    path = "/preferences",
    responses(
        (status = 200, description = "The default preferences, now stored")
    )
)]
pub async fn reset_preferences_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let preferences = state.preferences(&user.id).await.map_err(port_error)?;
    let defaults = preferences.reset().await.map_err(port_error)?;
    Ok(Json(defaults))
}
