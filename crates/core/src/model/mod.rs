mod account;
mod catalog;
mod ids;
mod puzzle;
mod question;
mod session;

pub use ids::{
    AnswerId, ConceptId, ModuleId, ParseIdError, PuzzleId, QuestionId, SessionId, StudentId,
    TeacherId,
};

pub use account::{AccountError, MIN_PASSWORD_LEN, MIN_USERNAME_LEN, Registration, Student, Teacher};
pub use catalog::{Concept, Module, NewConcept, NewModule};
pub use puzzle::{Puzzle, PuzzleDraft, PuzzleError};
pub use question::{
    AnswerChoice, AnswerChoiceError, AnswerOptions, Question, QuestionDraft, QuestionError,
    QuestionPatch, ValidQuestion,
};
pub use session::{Answer, QuizSession, QuizSessionError, accuracy_percent};
