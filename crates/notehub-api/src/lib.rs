//! # notehub-api
//!
//! HTTP and WebSocket adapter for notehub. Routes translate requests into
//! service calls; change events reach live viewers over `/ws/notes/:note_id`.

pub mod config;
pub mod error;
pub mod handlers;
pub mod state;

use std::future::Future;
use std::sync::Arc;

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use notehub_core::ConnectionRegistry;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

pub use config::ServerConfig;
pub use error::ApiError;
pub use state::AppState;

use handlers::{notes, users, ws};

/// Build the application router with its middleware stack.
pub fn router(state: AppState, config: &ServerConfig) -> Router {
    let cors = match config.allowed_origins() {
        Some(origins) => CorsLayer::new().allow_origin(origins),
        None => CorsLayer::new().allow_origin(Any),
    }
    .allow_methods(Any)
    .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/notes", post(notes::create_note))
        .route(
            "/notes/:id",
            get(notes::get_note)
                .put(notes::update_title)
                .delete(notes::delete_note),
        )
        .route(
            "/notes/:id/contents",
            get(notes::list_contents).post(notes::create_content),
        )
        .route(
            "/notes/:id/contents/:content_id",
            put(notes::update_content).delete(notes::delete_content),
        )
        .route(
            "/users/:user_id/notes",
            get(users::find_by_keyword),
        )
        .route(
            "/users/:user_id/notes/:note_id/keywords",
            post(users::tag_note),
        )
        .route(
            "/users/:user_id/notes/:note_id/keywords/:keyword",
            delete(users::untag_note),
        )
        .route(
            "/users/:user_id/notes/:note_id/shares",
            post(users::share_note).delete(users::revoke_access),
        )
        .route(
            "/users/:user_id/accessible-notes",
            get(users::accessible_notes),
        )
        .route("/ws/notes/:note_id", get(ws::ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(config.max_body_bytes))
        .with_state(state)
}

/// Shutdown future for `axum::serve(..).with_graceful_shutdown`. Once `signal`
/// resolves, every live subscription is closed so WebSocket viewers get a
/// Close frame and their connections can drain.
pub async fn shutdown_on<F>(signal: F, registry: Arc<ConnectionRegistry>)
where
    F: Future<Output = ()>,
{
    signal.await;
    let closed = registry.close_all();
    tracing::info!(subscriber_count = closed, "Shutdown signal received");
}
