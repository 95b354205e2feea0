//! services/api/src/web/highlights.rs
//!
//! Handlers for a reader's stored highlights and the shared highlight stylesheet.

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use serde::Deserialize;
use std::sync::Arc;
use ub_reader_core::highlight::{NewHighlight, STYLE_ID};
use ub_reader_core::{HighlightColor, User};
use utoipa::{IntoParams, ToSchema};

use crate::web::{port_error, state::AppState};

#[derive(Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct HighlightQuery {
    pub paper_id: Option<String>,
    /// Only honoured together with `paperId`.
    pub paragraph_id: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct RecolorRequest {
    #[schema(value_type = String, example = "green")]
    pub color: HighlightColor,
}

/// List the reader's highlights, optionally for one paper or one paragraph.
#[utoipa::path(
    get,
    path = "/highlights",
    params(HighlightQuery),
    responses(
        (status = 200, description = "Stored highlights"),
        (status = 401, description = "No active session")
    )
)]
pub async fn list_highlights_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Query(query): Query<HighlightQuery>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let store = state.highlights(&user.id).await;
    let highlights = match (&query.paper_id, &query.paragraph_id) {
        (Some(paper_id), Some(paragraph_id)) => store.for_paragraph(paper_id, paragraph_id).await,
        (Some(paper_id), None) => store.for_paper(paper_id).await,
        (None, _) => store.list().await,
    }
    .map_err(port_error)?;
    Ok(Json(highlights))
}

/// Store a highlight on an existing paragraph.
#[utoipa::path(
    post,
    path = "/highlights",
    request_body(content = Object, description = "`{text, color, metadata: {paperId, paragraphId, ...}}`"),
    responses(
        (status = 201, description = "Highlight stored"),
        (status = 400, description = "Empty text or the `none` colour"),
        (status = 404, description = "Paragraph not found")
    )
)]
pub async fn create_highlight_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Json(new): Json<NewHighlight>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let highlight = state
        .highlights(&user.id)
        .await
        .create(state.content.documents(), new)
        .await
        .map_err(port_error)?;
    Ok((StatusCode::CREATED, Json(highlight)))
}

#[utoipa::path(
    patch,
    path = "/highlights/{id}",
    request_body = RecolorRequest,
    responses(
        (status = 200, description = "The recoloured highlight"),
        (status = 400, description = "The `none` colour"),
        (status = 404, description = "Highlight not found")
    ),
    params(
        ("id" = String, Path, description = "The highlight id.")
    )
)]
pub async fn recolor_highlight_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(id): Path<String>,
    Json(req): Json<RecolorRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let highlight = state
        .highlights(&user.id)
        .await
        .set_color(&id, req.color)
        .await
        .map_err(port_error)?;
    Ok(Json(highlight))
}

#[utoipa::path(
    delete,
    path = "/highlights/{id}",
    responses(
        (status = 204, description = "Highlight deleted"),
        (status = 404, description = "Highlight not found")
    ),
    params(
        ("id" = String, Path, description = "The highlight id.")
    )
)]
pub async fn delete_highlight_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    state
        .highlights(&user.id)
        .await
        .delete(&id)
        .await
        .map_err(port_error)?;
    Ok(StatusCode::NO_CONTENT)
}

/// The marker stylesheet for every palette colour, in light and dark themes.
#[utoipa::path(
    get,
    path = "/highlights/styles.css",
    responses(
        (status = 200, description = "The highlight stylesheet", content_type = "text/css")
    )
)]
pub async fn stylesheet_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let css = state.styles.get(STYLE_ID).ok_or((
        StatusCode::INTERNAL_SERVER_ERROR,
        "Highlight stylesheet is not registered".to_string(),
    ))?;
    Ok(([(header::CONTENT_TYPE, "text/css; charset=utf-8")], css))
}
