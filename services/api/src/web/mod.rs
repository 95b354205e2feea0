pub mod auth;
pub mod highlights;
pub mod middleware;
pub mod rest;
pub mod state;
pub mod user;

use axum::{
    http::{
        header::{ACCEPT, CONTENT_TYPE},
        Method, StatusCode,
    },
    middleware as axum_middleware,
    routing::{delete, get, patch, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::error;
use ub_reader_core::ports::PortError;

pub use middleware::require_auth;
use state::AppState;

/// Maps a core port error onto the status code and message returned to the client.
pub fn port_error(e: PortError) -> (StatusCode, String) {
    let status = match &e {
        PortError::NotFound(_) => StatusCode::NOT_FOUND,
        PortError::Conflict(_) => StatusCode::CONFLICT,
        PortError::Invalid(_) => StatusCode::BAD_REQUEST,
        PortError::Unauthorized => StatusCode::UNAUTHORIZED,
        PortError::Storage(_) | PortError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        error!("Request failed: {:?}", e);
        return (status, "Internal server error".to_string());
    }
    (status, e.to_string())
}

/// Builds every API route over the shared state. Swagger UI is merged in by the binary.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(state.config.cors_origin.clone())
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, ACCEPT]);

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/logout", post(auth::logout_handler))
        .route("/publications", get(rest::list_publications_handler))
        .route("/publications/{id}/export", get(rest::export_publication_handler))
        .route("/publications/{id}/latest", get(rest::latest_version_handler))
        .route("/documents", get(rest::list_documents_handler))
        .route("/documents/{id}", get(rest::get_document_handler))
        .route(
            "/documents/{id}/sections/{section_id}/paragraphs/{paragraph_id}",
            get(rest::get_paragraph_handler),
        )
        .route("/highlights/styles.css", get(highlights::stylesheet_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/auth/me", get(auth::me_handler))
        .route("/publications/import", post(rest::import_publication_handler))
        .route("/publications/{id}", delete(rest::delete_publication_handler))
        .route("/documents/{id}/sections", post(rest::add_section_handler))
        .route(
            "/documents/{id}/sections/{section_id}",
            patch(rest::update_section_handler).delete(rest::remove_section_handler),
        )
        .route(
            "/documents/{id}/sections/{section_id}/paragraphs",
            post(rest::add_paragraph_handler),
        )
        .route(
            "/documents/{id}/sections/{section_id}/paragraphs/{paragraph_id}",
            patch(rest::update_paragraph_handler).delete(rest::remove_paragraph_handler),
        )
        .route(
            "/highlights",
            get(highlights::list_highlights_handler).post(highlights::create_highlight_handler),
        )
        .route(
            "/highlights/{id}",
            patch(highlights::recolor_highlight_handler).delete(highlights::delete_highlight_handler),
        )
        .route(
            "/history",
            get(user::list_history_handler)
                .post(user::record_history_handler)
                .delete(user::clear_history_handler),
        )
        .route("/history/{paper_id}", delete(user::remove_history_handler))
        .route(
            "/preferences",
            get(user::get_preferences_handler)
                .put(user::update_preferences_handler)
                .delete(user::reset_preferences_handler),
        )
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            require_auth,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(cors)
        .with_state(state)
}
