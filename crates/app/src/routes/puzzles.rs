use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use mathwrks_core::model::{ConceptId, ModuleId};
use services::AppServices;
use services::views::PuzzleRecord;

use crate::error::ApiError;
use crate::extract::ApiPath;

pub(super) fn router() -> Router<AppServices> {
    Router::new()
        .route("/", get(list_puzzles))
        .route("/concept/{concept_id}", get(random_for_concept))
        .route("/module/{module_id}", get(random_for_module))
}

async fn list_puzzles(
    State(services): State<AppServices>,
) -> Result<Json<Vec<PuzzleRecord>>, ApiError> {
    Ok(Json(services.puzzles().list().await?))
}

async fn random_for_concept(
    State(services): State<AppServices>,
    ApiPath(concept_id): ApiPath<ConceptId>,
) -> Result<Json<PuzzleRecord>, ApiError> {
    Ok(Json(services.puzzles().random_for_concept(concept_id).await?))
}

async fn random_for_module(
    State(services): State<AppServices>,
    ApiPath(module_id): ApiPath<ModuleId>,
) -> Result<Json<PuzzleRecord>, ApiError> {
    Ok(Json(services.puzzles().random_for_module(module_id).await?))
}
