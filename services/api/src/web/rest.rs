//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the content endpoints (publications, documents,
//! sections and paragraphs) and the master definition for the OpenAPI specification.

use crate::web::{auth, highlights, port_error, state::AppState, user};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info};
use ub_reader_core::{Document, DocumentType, Paragraph, Publication, Section};
use utoipa::{IntoParams, OpenApi, ToSchema};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::login_handler,
        auth::logout_handler,
        auth::me_handler,
        list_publications_handler,
        import_publication_handler,
        export_publication_handler,
        latest_version_handler,
        delete_publication_handler,
        list_documents_handler,
        get_document_handler,
        get_paragraph_handler,
        add_section_handler,
        update_section_handler,
        remove_section_handler,
        add_paragraph_handler,
        update_paragraph_handler,
        remove_paragraph_handler,
        highlights::list_highlights_handler,
        highlights::create_highlight_handler,
        highlights::recolor_highlight_handler,
        highlights::delete_highlight_handler,
        highlights::stylesheet_handler,
        user::list_history_handler,
        user::record_history_handler,
        user::remove_history_handler,
        user::clear_history_handler,
        user::get_preferences_handler,
        user::update_preferences_handler,
        user::reset_preferences_handler,
    ),
    components(
        schemas(
            auth::LoginRequest,
            auth::AuthResponse,
            PublicationBundle,
            highlights::RecolorRequest,
            user::RecordHistoryRequest,
        )
    ),
    tags(
        (name = "UB Reader API", description = "API endpoints for reading, highlighting and reader state.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// A publication together with all of its documents, as imported and exported.
#[derive(Serialize, Deserialize, ToSchema)]
pub struct PublicationBundle {
    #[schema(value_type = Object)]
    pub publication: Publication,
    #[schema(value_type = Vec<Object>)]
    #[serde(default)]
    pub documents: Vec<Document>,
}

#[derive(Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct DocumentQuery {
    /// Only documents of this publication.
    pub publication_id: Option<String>,
    /// One of `paper`, `foreword`, `appendix` or `chapter`.
    #[serde(rename = "type")]
    #[param(value_type = Option<String>)]
    pub doc_type: Option<DocumentType>,
}

//=========================================================================================
// Publication Handlers
//=========================================================================================

/// List every stored publication.
#[utoipa::path(
    get,
    path = "/publications",
    responses(
        (status = 200, description = "All publications"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn list_publications_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let publications = state.content.list_publications().await.map_err(port_error)?;
    Ok(Json(publications))
}

/// Import a publication and its documents as one unit.
#[utoipa::path(
    post,
    path = "/publications/import",
    request_body = PublicationBundle,
    responses(
        (status = 201, description = "Publication imported"),
        (status = 400, description = "The documents could not be stored"),
        (status = 409, description = "A publication with this id already exists")
    )
)]
pub async fn import_publication_handler(
    State(state): State<Arc<AppState>>,
    Json(bundle): Json<PublicationBundle>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let publication_id = bundle.publication.id.clone();
    let existing = state
        .content
        .publications()
        .find_by_id(&publication_id)
        .await
        .map_err(port_error)?;
    if existing.is_some() {
        return Err((
            StatusCode::CONFLICT,
            format!("Publication '{}' already exists", publication_id),
        ));
    }

    let count = bundle.documents.len();
    if !state
        .content
        .import_publication(bundle.publication, bundle.documents)
        .await
    {
        return Err((
            StatusCode::BAD_REQUEST,
            format!("Failed to import publication '{}'", publication_id),
        ));
    }
    info!("Imported '{}' over HTTP ({} documents)", publication_id, count);
    Ok(StatusCode::CREATED)
}

/// Export a publication with all of its documents.
#[utoipa::path(
    get,
    path = "/publications/{id}/export",
    responses(
        (status = 200, description = "The publication bundle", body = PublicationBundle),
        (status = 404, description = "Publication not found")
    ),
    params(
        ("id" = String, Path, description = "The publication id.")
    )
)]
pub async fn export_publication_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let (publication, documents) = state
        .content
        .export_publication(&id)
        .await
        .ok_or((StatusCode::NOT_FOUND, format!("Publication '{}' not found", id)))?;
    Ok(Json(PublicationBundle {
        publication,
        documents,
    }))
}

/// The highest version within a publication family.
#[utoipa::path(
    get,
    path = "/publications/{id}/latest",
    responses(
        (status = 200, description = "The latest edition"),
        (status = 404, description = "No publication in this family")
    ),
    params(
        ("id" = String, Path, description = "The publication family id.")
    )
)]
pub async fn latest_version_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let latest = state
        .content
        .publications()
        .get_latest_version(&id)
        .await
        .map_err(port_error)?
        .ok_or((StatusCode::NOT_FOUND, format!("No publication in family '{}'", id)))?;
    Ok(Json(latest))
}

/// Delete a publication together with its documents.
#[utoipa::path(
    delete,
    path = "/publications/{id}",
    responses(
        (status = 204, description = "Publication deleted"),
        (status = 404, description = "Publication not found"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("id" = String, Path, description = "The publication id.")
    )
)]
pub async fn delete_publication_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    state
        .content
        .publications()
        .get(&id)
        .await
        .map_err(port_error)?;
    if !state.content.delete_publication(&id).await {
        error!("Deletion of publication '{}' did not complete", id);
        return Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to delete publication".to_string(),
        ));
    }
    Ok(StatusCode::NO_CONTENT)
}

//=========================================================================================
// Document Handlers
//=========================================================================================

/// List documents, optionally narrowed to one publication and/or one type.
#[utoipa::path(
    get,
    path = "/documents",
    params(DocumentQuery),
    responses(
        (status = 200, description = "Matching documents"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn list_documents_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DocumentQuery>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let documents = state.content.documents();
    let mut found = match (&query.publication_id, query.doc_type) {
        (Some(publication_id), _) => documents.find_by_publication(publication_id).await,
        (None, Some(doc_type)) => documents.find_by_type(doc_type).await,
        (None, None) => documents.get_all().await,
    }
    .map_err(port_error)?;

    if let Some(doc_type) = query.doc_type {
        found.retain(|d| d.doc_type == doc_type);
    }
    found.sort_by_key(|d| d.number);
    Ok(Json(found))
}

#[utoipa::path(
    get,
    path = "/documents/{id}",
    responses(
        (status = 200, description = "The document with its sections and paragraphs"),
        (status = 404, description = "Document not found")
    ),
    params(
        ("id" = String, Path, description = "The document id.")
    )
)]
pub async fn get_document_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let document = state.content.documents().get(&id).await.map_err(port_error)?;
    Ok(Json(document))
}

#[utoipa::path(
    get,
    path = "/documents/{id}/sections/{section_id}/paragraphs/{paragraph_id}",
    responses(
        (status = 200, description = "The paragraph"),
        (status = 404, description = "Document, section or paragraph not found")
    ),
    params(
        ("id" = String, Path, description = "The document id."),
        ("section_id" = String, Path, description = "The section id."),
        ("paragraph_id" = String, Path, description = "The paragraph id.")
    )
)]
pub async fn get_paragraph_handler(
    State(state): State<Arc<AppState>>,
    Path((id, section_id, paragraph_id)): Path<(String, String, String)>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let paragraph = state
        .content
        .documents()
        .get_paragraph(&id, &section_id, &paragraph_id)
        .await
        .map_err(port_error)?;
    Ok(Json(paragraph))
}

//=========================================================================================
// Section and Paragraph Mutations
//=========================================================================================

/// Add a section to a document. Its paragraphs are adopted and ordered.
#[utoipa::path(
    post,
    path = "/documents/{id}/sections",
    request_body(content = Object, description = "The section to add."),
    responses(
        (status = 201, description = "Section added"),
        (status = 404, description = "Document not found"),
        (status = 409, description = "Section id already used")
    ),
    params(
        ("id" = String, Path, description = "The document id.")
    )
)]
pub async fn add_section_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(section): Json<Section>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let section = state
        .content
        .documents()
        .add_section(&id, section)
        .await
        .map_err(port_error)?;
    Ok((StatusCode::CREATED, Json(section)))
}

/// Merge a partial section. Its id, document and paragraphs cannot be changed here.
#[utoipa::path(
    patch,
    path = "/documents/{id}/sections/{section_id}",
    request_body(content = Object, description = "The fields to change."),
    responses(
        (status = 200, description = "The updated section"),
        (status = 400, description = "The merged section is invalid"),
        (status = 404, description = "Document or section not found")
    ),
    params(
        ("id" = String, Path, description = "The document id."),
        ("section_id" = String, Path, description = "The section id.")
    )
)]
pub async fn update_section_handler(
    State(state): State<Arc<AppState>>,
    Path((id, section_id)): Path<(String, String)>,
    Json(changes): Json<Value>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let section = state
        .content
        .documents()
        .update_section(&id, &section_id, changes)
        .await
        .map_err(port_error)?;
    Ok(Json(section))
}

#[utoipa::path(
    delete,
    path = "/documents/{id}/sections/{section_id}",
    responses(
        (status = 204, description = "Section removed"),
        (status = 404, description = "Document or section not found")
    ),
    params(
        ("id" = String, Path, description = "The document id."),
        ("section_id" = String, Path, description = "The section id.")
    )
)]
pub async fn remove_section_handler(
    State(state): State<Arc<AppState>>,
    Path((id, section_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    state
        .content
        .documents()
        .remove_section(&id, &section_id)
        .await
        .map_err(port_error)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Add a paragraph to a section; responds with the updated section.
#[utoipa::path(
    post,
    path = "/documents/{id}/sections/{section_id}/paragraphs",
    request_body(content = Object, description = "The paragraph to add."),
    responses(
        (status = 201, description = "Paragraph added"),
        (status = 404, description = "Document or section not found"),
        (status = 409, description = "Paragraph id already used")
    ),
    params(
        ("id" = String, Path, description = "The document id."),
        ("section_id" = String, Path, description = "The section id.")
    )
)]
pub async fn add_paragraph_handler(
    State(state): State<Arc<AppState>>,
    Path((id, section_id)): Path<(String, String)>,
    Json(paragraph): Json<Paragraph>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let section = state
        .content
        .documents()
        .add_paragraph(&id, &section_id, paragraph)
        .await
        .map_err(port_error)?;
    Ok((StatusCode::CREATED, Json(section)))
}

/// Merge a partial paragraph into the stored one. Ids cannot be changed.
#[utoipa::path(
    patch,
    path = "/documents/{id}/sections/{section_id}/paragraphs/{paragraph_id}",
    request_body(content = Object, description = "The fields to change."),
    responses(
        (status = 200, description = "The updated paragraph"),
        (status = 400, description = "The merged paragraph is invalid"),
        (status = 404, description = "Document, section or paragraph not found")
    ),
    params(
        ("id" = String, Path, description = "The document id."),
        ("section_id" = String, Path, description = "The section id."),
        ("paragraph_id" = String, Path, description = "The paragraph id.")
    )
)]
pub async fn update_paragraph_handler(
    State(state): State<Arc<AppState>>,
    Path((id, section_id, paragraph_id)): Path<(String, String, String)>,
    Json(changes): Json<Value>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let paragraph = state
        .content
        .documents()
        .update_paragraph(&id, &section_id, &paragraph_id, changes)
        .await
        .map_err(port_error)?;
    Ok(Json(paragraph))
}

#[utoipa::path(
    delete,
    path = "/documents/{id}/sections/{section_id}/paragraphs/{paragraph_id}",
    responses(
        (status = 204, description = "Paragraph removed"),
        (status = 404, description = "Document, section or paragraph not found")
    ),
    params(
        ("id" = String, Path, description = "The document id."),
        ("section_id" = String, Path, description = "The section id."),
        ("paragraph_id" = String, Path, description = "The paragraph id.")
    )
)]
pub async fn remove_paragraph_handler(
    State(state): State<Arc<AppState>>,
    Path((id, section_id, paragraph_id)): Path<(String, String, String)>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    state
        .content
        .documents()
        .remove_paragraph(&id, &section_id, &paragraph_id)
        .await
        .map_err(port_error)?;
    Ok(StatusCode::NO_CONTENT)
}
