use chrono::{DateTime, Utc};
use mathwrks_core::AdaptiveState;
use mathwrks_core::adaptive::Difficulty;
use mathwrks_core::model::{
    Answer, AnswerChoice, AnswerId, AnswerOptions, Concept, ConceptId, Module, ModuleId, Puzzle,
    PuzzleId, Question, QuestionId, QuizSession, SessionId, Student, StudentId, Teacher, TeacherId,
};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::{PuzzleListing, QuestionListing, StorageError};

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

/// Maps driver errors, turning constraint violations into domain errors.
pub(crate) fn db_err(e: sqlx::Error) -> StorageError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return StorageError::Conflict("unique constraint violated");
        }
        if db.is_foreign_key_violation() {
            return StorageError::NotFound;
        }
    }
    StorageError::Connection(e.to_string())
}

fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

fn parse_choice(field: &'static str, raw: &str) -> Result<AnswerChoice, StorageError> {
    raw.parse()
        .map_err(|_| StorageError::Serialization(format!("invalid {field}: {raw}")))
}

pub(crate) fn map_student_row(row: &SqliteRow) -> Result<Student, StorageError> {
    Ok(Student {
        id: StudentId::new(row.try_get("id").map_err(ser)?),
        username: row.try_get("username").map_err(ser)?,
        name: row.try_get("name").map_err(ser)?,
        total_points: row.try_get("total_points").map_err(ser)?,
        created_at: row.try_get("created_at").map_err(ser)?,
    })
}

pub(crate) fn map_teacher_row(row: &SqliteRow) -> Result<Teacher, StorageError> {
    Ok(Teacher {
        id: TeacherId::new(row.try_get("id").map_err(ser)?),
        username: row.try_get("username").map_err(ser)?,
        created_at: row.try_get("created_at").map_err(ser)?,
    })
}

pub(crate) fn map_module_row(row: &SqliteRow) -> Result<Module, StorageError> {
    Ok(Module {
        id: ModuleId::new(row.try_get("id").map_err(ser)?),
        name: row.try_get("name").map_err(ser)?,
        display_name: row.try_get("display_name").map_err(ser)?,
        description: row.try_get("description").map_err(ser)?,
        icon: row.try_get("icon").map_err(ser)?,
    })
}

pub(crate) fn map_concept_row(row: &SqliteRow) -> Result<Concept, StorageError> {
    Ok(Concept {
        id: ConceptId::new(row.try_get("id").map_err(ser)?),
        module_id: ModuleId::new(row.try_get("module_id").map_err(ser)?),
        name: row.try_get("name").map_err(ser)?,
        explanation: row.try_get("explanation").map_err(ser)?,
    })
}

pub(crate) fn map_question_row(row: &SqliteRow) -> Result<Question, StorageError> {
    let level: i64 = row.try_get("difficulty").map_err(ser)?;
    let difficulty = Difficulty::try_from_level(level).map_err(ser)?;
    let correct: String = row.try_get("correct_answer").map_err(ser)?;

    Ok(Question {
        id: QuestionId::new(row.try_get("id").map_err(ser)?),
        concept_id: ConceptId::new(row.try_get("concept_id").map_err(ser)?),
        difficulty,
        text: row.try_get("question_text").map_err(ser)?,
        options: AnswerOptions {
            a: row.try_get("option_a").map_err(ser)?,
            b: row.try_get("option_b").map_err(ser)?,
            c: row.try_get("option_c").map_err(ser)?,
            d: row.try_get("option_d").map_err(ser)?,
        },
        correct_answer: parse_choice("correct_answer", &correct)?,
        explanation: row.try_get("explanation").map_err(ser)?,
    })
}

/// Expects the question columns plus `concept_name`, `concept_explanation`,
/// `module_id`, and `module_name`.
pub(crate) fn map_question_listing(row: &SqliteRow) -> Result<QuestionListing, StorageError> {
    Ok(QuestionListing {
        question: map_question_row(row)?,
        concept_name: row.try_get("concept_name").map_err(ser)?,
        concept_explanation: row.try_get("concept_explanation").map_err(ser)?,
        module_id: ModuleId::new(row.try_get("module_id").map_err(ser)?),
        module_name: row.try_get("module_name").map_err(ser)?,
    })
}

pub(crate) fn map_puzzle_row(row: &SqliteRow) -> Result<Puzzle, StorageError> {
    Ok(Puzzle {
        id: PuzzleId::new(row.try_get("id").map_err(ser)?),
        concept_id: ConceptId::new(row.try_get("concept_id").map_err(ser)?),
        title: row.try_get("title").map_err(ser)?,
        text: row.try_get("puzzle_text").map_err(ser)?,
        hint: row.try_get("hint").map_err(ser)?,
        solution: row.try_get("solution").map_err(ser)?,
    })
}

pub(crate) fn map_puzzle_listing(row: &SqliteRow) -> Result<PuzzleListing, StorageError> {
    Ok(PuzzleListing {
        puzzle: map_puzzle_row(row)?,
        concept_name: row.try_get("concept_name").map_err(ser)?,
        module_name: row.try_get("module_name").map_err(ser)?,
    })
}

pub(crate) fn map_progress_row(row: &SqliteRow) -> Result<AdaptiveState, StorageError> {
    let level: i64 = row.try_get("current_difficulty").map_err(ser)?;
    let correct: i64 = row.try_get("correct_streak").map_err(ser)?;
    let wrong: i64 = row.try_get("wrong_streak").map_err(ser)?;
    Ok(AdaptiveState::new(
        Difficulty::try_from_level(level).map_err(ser)?,
        u32_from_i64("correct_streak", correct)?,
        u32_from_i64("wrong_streak", wrong)?,
    ))
}

pub(crate) fn map_session_row(row: &SqliteRow) -> Result<QuizSession, StorageError> {
    let ended_at: Option<DateTime<Utc>> = row.try_get("ended_at").map_err(ser)?;
    let total: i64 = row.try_get("total_questions").map_err(ser)?;
    let correct: i64 = row.try_get("correct_answers").map_err(ser)?;
    let points: i64 = row.try_get("points_earned").map_err(ser)?;

    QuizSession::from_persisted(
        SessionId::new(row.try_get("id").map_err(ser)?),
        StudentId::new(row.try_get("student_id").map_err(ser)?),
        ModuleId::new(row.try_get("module_id").map_err(ser)?),
        row.try_get("started_at").map_err(ser)?,
        ended_at,
        u32_from_i64("total_questions", total)?,
        u32_from_i64("correct_answers", correct)?,
        u32_from_i64("points_earned", points)?,
    )
    .map_err(ser)
}

pub(crate) fn map_answer_row(row: &SqliteRow) -> Result<Answer, StorageError> {
    let choice: String = row.try_get("student_answer").map_err(ser)?;
    let points: i64 = row.try_get("points_earned").map_err(ser)?;

    Ok(Answer {
        id: AnswerId::new(row.try_get("id").map_err(ser)?),
        session_id: SessionId::new(row.try_get("session_id").map_err(ser)?),
        question_id: QuestionId::new(row.try_get("question_id").map_err(ser)?),
        student_answer: parse_choice("student_answer", &choice)?,
        is_correct: row.try_get("is_correct").map_err(ser)?,
        points_earned: u32_from_i64("points_earned", points)?,
        acknowledged: row.try_get("acknowledged").map_err(ser)?,
        acknowledgment_text: row.try_get("acknowledgment_text").map_err(ser)?,
        answered_at: row.try_get("answered_at").map_err(ser)?,
    })
}
