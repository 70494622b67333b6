use thiserror::Error;

use crate::adaptive::DifficultyError;
use crate::model::{AccountError, AnswerChoiceError, PuzzleError, QuestionError, QuizSessionError};

/// Any domain validation failure.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Difficulty(#[from] DifficultyError),
    #[error(transparent)]
    AnswerChoice(#[from] AnswerChoiceError),
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Puzzle(#[from] PuzzleError),
    #[error(transparent)]
    Account(#[from] AccountError),
    #[error(transparent)]
    Session(#[from] QuizSessionError),
}
