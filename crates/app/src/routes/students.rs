use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use mathwrks_core::model::StudentId;
use serde::Deserialize;
use services::AppServices;
use services::views::{AuthenticatedStudent, StudentProfile, StudentProgress};

use crate::error::{ApiError, required_text};
use crate::extract::{ApiJson, ApiPath, BearerToken};

pub(super) fn router() -> Router<AppServices> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/me", get(me))
        .route("/{id}", get(get_student))
        .route("/{id}/progress", get(progress))
}

#[derive(Debug, Deserialize)]
struct RegisterRequest {
    username: Option<String>,
    password: Option<String>,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct LoginRequest {
    username: Option<String>,
    password: Option<String>,
}

impl LoginRequest {
    pub(super) fn into_credentials(self) -> Result<(String, String), ApiError> {
        const MISSING: &str = "Username and password are required";
        Ok((
            required_text(self.username, MISSING)?,
            required_text(self.password, MISSING)?,
        ))
    }
}

async fn register(
    State(services): State<AppServices>,
    ApiJson(body): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthenticatedStudent>), ApiError> {
    const MISSING: &str = "Username, password, and name are required";
    let username = required_text(body.username, MISSING)?;
    let password = required_text(body.password, MISSING)?;
    let name = required_text(body.name, MISSING)?;
    let registered = services
        .accounts()
        .register(&username, &password, &name)
        .await?;
    Ok((StatusCode::CREATED, Json(registered)))
}

async fn login(
    State(services): State<AppServices>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> Result<Json<AuthenticatedStudent>, ApiError> {
    let (username, password) = body.into_credentials()?;
    Ok(Json(services.accounts().login(&username, &password).await?))
}

async fn me(
    State(services): State<AppServices>,
    BearerToken(token): BearerToken,
) -> Result<Json<StudentProfile>, ApiError> {
    Ok(Json(services.accounts().current_student(&token).await?))
}

async fn get_student(
    State(services): State<AppServices>,
    ApiPath(id): ApiPath<StudentId>,
) -> Result<Json<StudentProfile>, ApiError> {
    Ok(Json(services.accounts().get_student(id).await?))
}

async fn progress(
    State(services): State<AppServices>,
    ApiPath(id): ApiPath<StudentId>,
) -> Result<Json<StudentProgress>, ApiError> {
    Ok(Json(services.accounts().student_progress(id).await?))
}
