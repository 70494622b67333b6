//! Teacher dashboard: roster, question bank, and puzzle management.
//!
//! Every route sits behind [`TeacherAuth`]. Bodies use the same snake_case
//! column names the dashboard sends.

use axum::extract::State;
use axum::http::StatusCode;
use axum::middleware::from_extractor_with_state;
use axum::routing::{delete, get, put};
use axum::{Json, Router};
use mathwrks_core::model::{
    AnswerOptions, ConceptId, PuzzleDraft, PuzzleId, QuestionDraft, QuestionId, QuestionPatch,
    StudentId,
};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use services::AppServices;
use services::views::{ConceptRecord, PuzzleRecord, QuestionRecord, StudentDetail, StudentSummary};

use crate::error::{ApiError, required, required_text};
use crate::extract::{ApiJson, ApiPath, TeacherAuth};

pub(super) fn router(services: AppServices) -> Router<AppServices> {
    Router::new()
        .route("/students", get(list_students))
        .route("/students/{id}", get(student_detail))
        .route("/questions", get(list_questions).post(create_question))
        .route("/questions/{id}", put(update_question).delete(delete_question))
        .route("/concepts", get(list_concepts))
        .route("/puzzles", get(list_puzzles).post(create_puzzle))
        .route("/puzzles/{id}", delete(delete_puzzle))
        .route_layer(from_extractor_with_state::<TeacherAuth, _>(services))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct QuestionBody {
    concept_id: Option<ConceptId>,
    difficulty: Option<i64>,
    question_text: Option<String>,
    option_a: Option<String>,
    option_b: Option<String>,
    option_c: Option<String>,
    option_d: Option<String>,
    correct_answer: Option<String>,
    // Absent keeps the stored explanation, `null` clears it.
    #[serde(deserialize_with = "present")]
    explanation: Option<Option<String>>,
}

fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl QuestionBody {
    fn into_draft(self) -> Result<QuestionDraft, ApiError> {
        const MISSING: &str = "All fields are required";
        Ok(QuestionDraft {
            concept_id: required(self.concept_id, MISSING)?,
            difficulty: required(self.difficulty, MISSING)?,
            text: required_text(self.question_text, MISSING)?,
            options: AnswerOptions {
                a: required_text(self.option_a, MISSING)?,
                b: required_text(self.option_b, MISSING)?,
                c: required_text(self.option_c, MISSING)?,
                d: required_text(self.option_d, MISSING)?,
            },
            correct_answer: required_text(self.correct_answer, MISSING)?,
            explanation: non_blank(self.explanation.flatten()),
        })
    }

    fn into_patch(self) -> QuestionPatch {
        QuestionPatch {
            concept_id: self.concept_id,
            difficulty: self.difficulty,
            text: non_blank(self.question_text),
            option_a: non_blank(self.option_a),
            option_b: non_blank(self.option_b),
            option_c: non_blank(self.option_c),
            option_d: non_blank(self.option_d),
            correct_answer: non_blank(self.correct_answer),
            explanation: self.explanation,
        }
    }
}

#[derive(Debug, Deserialize)]
struct PuzzleBody {
    concept_id: Option<ConceptId>,
    title: Option<String>,
    puzzle_text: Option<String>,
    hint: Option<String>,
    solution: Option<String>,
}

impl PuzzleBody {
    fn into_draft(self) -> Result<PuzzleDraft, ApiError> {
        const MISSING: &str = "concept_id, title, and puzzle_text are required";
        Ok(PuzzleDraft {
            concept_id: required(self.concept_id, MISSING)?,
            title: required_text(self.title, MISSING)?,
            text: required_text(self.puzzle_text, MISSING)?,
            hint: non_blank(self.hint),
            solution: non_blank(self.solution),
        })
    }
}

async fn list_students(
    State(services): State<AppServices>,
) -> Result<Json<Vec<StudentSummary>>, ApiError> {
    Ok(Json(services.teachers().list_students().await?))
}

async fn student_detail(
    State(services): State<AppServices>,
    ApiPath(id): ApiPath<StudentId>,
) -> Result<Json<StudentDetail>, ApiError> {
    Ok(Json(services.teachers().student_detail(id).await?))
}

async fn list_questions(
    State(services): State<AppServices>,
) -> Result<Json<Vec<QuestionRecord>>, ApiError> {
    Ok(Json(services.teachers().list_questions().await?))
}

async fn list_concepts(
    State(services): State<AppServices>,
) -> Result<Json<Vec<ConceptRecord>>, ApiError> {
    Ok(Json(services.teachers().list_concepts().await?))
}

async fn create_question(
    State(services): State<AppServices>,
    ApiJson(body): ApiJson<QuestionBody>,
) -> Result<(StatusCode, Json<QuestionRecord>), ApiError> {
    let question = services.teachers().create_question(body.into_draft()?).await?;
    Ok((StatusCode::CREATED, Json(question)))
}

async fn update_question(
    State(services): State<AppServices>,
    ApiPath(id): ApiPath<QuestionId>,
    ApiJson(body): ApiJson<QuestionBody>,
) -> Result<Json<QuestionRecord>, ApiError> {
    let question = services
        .teachers()
        .update_question(id, body.into_patch())
        .await?;
    Ok(Json(question))
}

async fn delete_question(
    State(services): State<AppServices>,
    ApiPath(id): ApiPath<QuestionId>,
) -> Result<Json<Value>, ApiError> {
    services.teachers().delete_question(id).await?;
    Ok(super::success())
}

async fn list_puzzles(
    State(services): State<AppServices>,
) -> Result<Json<Vec<PuzzleRecord>>, ApiError> {
    Ok(Json(services.teachers().list_puzzles().await?))
}

async fn create_puzzle(
    State(services): State<AppServices>,
    ApiJson(body): ApiJson<PuzzleBody>,
) -> Result<(StatusCode, Json<PuzzleRecord>), ApiError> {
    let puzzle = services.teachers().create_puzzle(body.into_draft()?).await?;
    Ok((StatusCode::CREATED, Json(puzzle)))
}

async fn delete_puzzle(
    State(services): State<AppServices>,
    ApiPath(id): ApiPath<PuzzleId>,
) -> Result<Json<Value>, ApiError> {
    services.teachers().delete_puzzle(id).await?;
    Ok(super::success())
}
