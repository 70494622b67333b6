use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use mathwrks_core::model::{AnswerId, Module, ModuleId, QuestionId, SessionId, StudentId};
use serde::Deserialize;
use serde_json::Value;
use services::AppServices;
use services::views::{AnswerFeedback, NextQuestion, SessionStatus, SessionSummary, StartedSession};

use crate::error::{ApiError, required, required_text};
use crate::extract::{ApiJson, ApiPath};

pub(super) fn router() -> Router<AppServices> {
    Router::new()
        .route("/modules", get(list_modules))
        .route("/start", post(start_session))
        .route("/{session_id}/next", get(next_question))
        .route("/{session_id}/answer", post(submit_answer))
        .route("/{session_id}/acknowledge", post(acknowledge))
        .route("/{session_id}/end", post(end_session))
        .route("/{session_id}/status", get(session_status))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartRequest {
    student_id: Option<StudentId>,
    module_id: Option<ModuleId>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnswerRequest {
    question_id: Option<QuestionId>,
    answer: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AcknowledgeRequest {
    answer_id: Option<AnswerId>,
    acknowledgment_text: Option<String>,
}

async fn list_modules(State(services): State<AppServices>) -> Result<Json<Vec<Module>>, ApiError> {
    Ok(Json(services.quiz().list_modules().await?))
}

async fn start_session(
    State(services): State<AppServices>,
    ApiJson(body): ApiJson<StartRequest>,
) -> Result<Json<StartedSession>, ApiError> {
    const MISSING: &str = "studentId and moduleId are required";
    let student_id = required(body.student_id, MISSING)?;
    let module_id = required(body.module_id, MISSING)?;
    let started = services.quiz().start_session(student_id, module_id).await?;
    Ok(Json(started))
}

async fn next_question(
    State(services): State<AppServices>,
    ApiPath(session_id): ApiPath<SessionId>,
) -> Result<Json<NextQuestion>, ApiError> {
    Ok(Json(services.quiz().next_question(session_id).await?))
}

async fn submit_answer(
    State(services): State<AppServices>,
    ApiPath(session_id): ApiPath<SessionId>,
    ApiJson(body): ApiJson<AnswerRequest>,
) -> Result<Json<AnswerFeedback>, ApiError> {
    const MISSING: &str = "questionId and answer are required";
    let question_id = required(body.question_id, MISSING)?;
    let answer = required_text(body.answer, MISSING)?;
    let feedback = services
        .quiz()
        .submit_answer(session_id, question_id, &answer)
        .await?;
    Ok(Json(feedback))
}

async fn acknowledge(
    State(services): State<AppServices>,
    ApiPath(session_id): ApiPath<SessionId>,
    ApiJson(body): ApiJson<AcknowledgeRequest>,
) -> Result<Json<Value>, ApiError> {
    let answer_id = required(body.answer_id, "answerId is required")?;
    services
        .quiz()
        .acknowledge(session_id, answer_id, body.acknowledgment_text)
        .await?;
    Ok(super::success())
}

async fn end_session(
    State(services): State<AppServices>,
    ApiPath(session_id): ApiPath<SessionId>,
) -> Result<Json<SessionSummary>, ApiError> {
    Ok(Json(services.quiz().end_session(session_id).await?))
}

async fn session_status(
    State(services): State<AppServices>,
    ApiPath(session_id): ApiPath<SessionId>,
) -> Result<Json<SessionStatus>, ApiError> {
    Ok(Json(services.quiz().session_status(session_id).await?))
}
