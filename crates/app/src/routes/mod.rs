use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};
use services::AppServices;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

mod auth;
mod puzzles;
mod quiz;
mod students;
mod teacher;

/// Full API surface over the given services.
pub fn router(services: AppServices) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .nest("/api/quiz", quiz::router())
        .nest("/api/students", students::router())
        .nest("/api/puzzles", puzzles::router())
        .nest("/api/auth", auth::router())
        .nest("/api/teacher", teacher::router(services.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(services)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "message": "MathWrks API is running" }))
}

fn success() -> Json<Value> {
    Json(json!({ "success": true }))
}
