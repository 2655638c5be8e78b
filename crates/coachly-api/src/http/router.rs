//! Axum router configuration with middleware.
//!
//! All routes are under `/api/v1/`. Middleware: CORS, tracing.

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete API router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        // Coach catalogue
        .route(
            "/coaches",
            post(handlers::coach::create_coach).get(handlers::coach::list_public_coaches),
        )
        .route("/coaches/mine", get(handlers::coach::list_my_coaches))
        .route(
            "/coaches/{id}",
            get(handlers::coach::get_coach)
                .put(handlers::coach::update_coach)
                .delete(handlers::coach::delete_coach),
        )
        // Session lifecycle
        .route(
            "/sessions",
            post(handlers::session::begin_session).get(handlers::session::list_sessions),
        )
        .route(
            "/sessions/pending/{id}/resolve",
            post(handlers::session::resolve_recap),
        )
        .route("/sessions/{id}", get(handlers::session::get_session))
        .route("/sessions/{id}/end", post(handlers::session::end_session))
        // Chat
        .route(
            "/sessions/{id}/messages",
            get(handlers::message::list_messages).post(handlers::message::send_message),
        )
        .route("/sessions/{id}/retry", post(handlers::message::retry_reply))
        .route("/sessions/{id}/quota", get(handlers::message::get_quota))
        .route("/sessions/{id}/video", post(handlers::message::join_video))
        .route("/sessions/{id}/ws", get(handlers::ws::session_ws));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/health", get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health - Simple health check endpoint (no caller identity required).
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
