use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use services::AppServices;
use services::views::AuthenticatedTeacher;

use super::students::LoginRequest;
use crate::error::ApiError;
use crate::extract::{ApiJson, BearerToken};

pub(super) fn router() -> Router<AppServices> {
    Router::new()
        .route("/login", post(login))
        .route("/verify", get(verify))
}

async fn login(
    State(services): State<AppServices>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> Result<Json<AuthenticatedTeacher>, ApiError> {
    let (username, password) = body.into_credentials()?;
    Ok(Json(services.teachers().login(&username, &password).await?))
}

/// Always answers with `valid`; failures carry no error message.
async fn verify(
    State(services): State<AppServices>,
    token: Result<BearerToken, ApiError>,
) -> Response {
    let claims = token
        .ok()
        .and_then(|BearerToken(token)| services.teachers().verify(&token).ok());
    match claims {
        Some(claims) => Json(json!({ "valid": true, "teacher": claims })).into_response(),
        None => (StatusCode::UNAUTHORIZED, Json(json!({ "valid": false }))).into_response(),
    }
}
