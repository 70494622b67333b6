//! Shared error types for the services crate.

use thiserror::Error;

use mathwrks_core::model::{AccountError, AnswerChoiceError, PuzzleError, QuestionError};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by password hashing and token handling.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AuthError {
    #[error("No authorization header")]
    MissingToken,
    #[error("Invalid token")]
    InvalidToken,
    #[error("password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),
    #[error("token signing failed: {0}")]
    Signing(jsonwebtoken::errors::Error),
    #[error("password worker failed: {0}")]
    Blocking(#[from] tokio::task::JoinError),
}

/// Errors emitted by `QuizService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuizError {
    #[error("Student not found")]
    StudentNotFound,
    #[error("Module not found")]
    ModuleNotFound,
    #[error("Session not found")]
    SessionNotFound,
    #[error("Question not found")]
    QuestionNotFound,
    #[error("Answer not found in this session")]
    AnswerNotFound,
    #[error("Session has ended")]
    SessionEnded,
    #[error("Session already ended")]
    AlreadyEnded,
    #[error("Question already answered")]
    AlreadyAnswered,
    #[error("Answer must be A, B, C, or D")]
    InvalidAnswer(#[from] AnswerChoiceError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by student and teacher account operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AccountServiceError {
    #[error(transparent)]
    Validation(#[from] AccountError),
    #[error("Username already taken")]
    UsernameTaken,
    #[error("{0}")]
    InvalidCredentials(&'static str),
    #[error("Student not found")]
    StudentNotFound,
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while managing questions, concepts, and puzzles.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ContentError {
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Puzzle(#[from] PuzzleError),
    #[error("Concept not found")]
    ConceptNotFound,
    #[error("Question not found")]
    QuestionNotFound,
    #[error("Puzzle not found")]
    PuzzleNotFound,
    #[error("Student not found")]
    StudentNotFound,
    #[error("Cannot delete question that has been answered by students")]
    QuestionInUse,
    #[error("{0}")]
    NoPuzzle(&'static str),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
