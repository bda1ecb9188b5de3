use axum::{middleware, routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::handlers;
use super::middleware::{cors_layer, require_auth};
use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Public routes -- listed in the classifier's public paths by default
    let public_routes = Router::new()
        .route("/", get(handlers::service_info))
        .route("/health", get(handlers::health))
        .route("/api/public-notes", get(handlers::list_public_notes));

    // Caller-scoped routes -- require a verified identity
    let note_routes = Router::new()
        .route("/api/session", get(handlers::current_session))
        .route(
            "/api/notes",
            get(handlers::list_notes).post(handlers::create_note),
        )
        .route(
            "/api/notes/:id",
            get(handlers::get_note)
                .put(handlers::update_note)
                .delete(handlers::delete_note),
        );

    // Applied with `layer` rather than `route_layer` so unmatched paths are
    // classified too and answer 401 instead of 404.
    Router::new()
        .merge(public_routes)
        .merge(note_routes)
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            require_auth,
        ))
        .layer(cors_layer(state.config.access.origins.clone()))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
