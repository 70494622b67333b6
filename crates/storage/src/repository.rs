use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mathwrks_core::AdaptiveState;
use mathwrks_core::adaptive::Difficulty;
use mathwrks_core::model::{
    Answer, AnswerChoice, AnswerId, Concept, ConceptId, Module, ModuleId, NewConcept, NewModule,
    Puzzle, PuzzleDraft, PuzzleId, Question, QuestionId, QuizSession, SessionId, Student,
    StudentId, Teacher, ValidQuestion,
};
use std::sync::Arc;
use thiserror::Error;

pub use crate::memory::InMemoryRepository;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(&'static str),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

//
// ─── RECORDS ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone)]
pub struct NewStudent {
    pub username: String,
    pub password_hash: String,
    pub name: String,
    pub total_points: i64,
    pub created_at: DateTime<Utc>,
}

/// A student together with the stored bcrypt hash, for login only.
#[derive(Debug, Clone)]
pub struct StudentCredentials {
    pub student: Student,
    pub password_hash: String,
}

/// Student row plus aggregate quiz counters for the teacher dashboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentStats {
    pub student: Student,
    pub total_quizzes: u32,
    pub total_correct: i64,
    pub total_answered: i64,
}

#[derive(Debug, Clone)]
pub struct NewTeacher {
    pub username: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct TeacherCredentials {
    pub teacher: Teacher,
    pub password_hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConceptListing {
    pub concept: Concept,
    pub module_name: String,
}

/// A question joined with the concept and module it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionListing {
    pub question: Question,
    pub concept_name: String,
    pub concept_explanation: String,
    pub module_id: ModuleId,
    pub module_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PuzzleListing {
    pub puzzle: Puzzle,
    pub concept_name: String,
    pub module_name: String,
}

/// Adaptive state for one module, defaulted when the student never started it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleProgress {
    pub module_id: ModuleId,
    pub module_name: String,
    pub state: AdaptiveState,
    pub started: bool,
    pub quizzes_taken: u32,
    pub points_earned: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionListing {
    pub session: QuizSession,
    pub module_name: String,
}

#[derive(Debug, Clone)]
pub struct NewAnswer {
    pub session_id: SessionId,
    pub question_id: QuestionId,
    pub student_answer: AnswerChoice,
    pub is_correct: bool,
    pub points_earned: u32,
    pub answered_at: DateTime<Utc>,
}

/// Outcome of recording an answer: the stored row, the updated session
/// totals, and the adaptive state before and after this answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedAnswer {
    pub answer: Answer,
    pub session: QuizSession,
    pub previous: AdaptiveState,
    pub current: AdaptiveState,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerDetail {
    pub answer: Answer,
    pub question_text: String,
    pub correct_answer: AnswerChoice,
    pub concept_name: String,
}

//
// ─── CONTRACTS ─────────────────────────────────────────────────────────────────
//

#[async_trait]
pub trait StudentRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the username is taken.
    async fn insert_student(&self, student: NewStudent) -> Result<Student, StorageError>;

    async fn get_student(&self, id: StudentId) -> Result<Option<Student>, StorageError>;

    /// Lookup by the already-normalized username.
    async fn find_student_by_username(
        &self,
        username: &str,
    ) -> Result<Option<StudentCredentials>, StorageError>;

    /// All students ordered by name, with quiz counters.
    async fn list_student_stats(&self) -> Result<Vec<StudentStats>, StorageError>;
}

#[async_trait]
pub trait TeacherRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the username is taken.
    async fn insert_teacher(&self, teacher: NewTeacher) -> Result<Teacher, StorageError>;

    async fn find_teacher_by_username(
        &self,
        username: &str,
    ) -> Result<Option<TeacherCredentials>, StorageError>;
}

#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn insert_module(&self, module: NewModule) -> Result<Module, StorageError>;

    async fn list_modules(&self) -> Result<Vec<Module>, StorageError>;

    async fn get_module(&self, id: ModuleId) -> Result<Option<Module>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the module does not exist.
    async fn insert_concept(&self, concept: NewConcept) -> Result<Concept, StorageError>;

    async fn get_concept(&self, id: ConceptId) -> Result<Option<Concept>, StorageError>;

    /// Concepts ordered by module then id.
    async fn list_concepts(&self) -> Result<Vec<ConceptListing>, StorageError>;
}

#[async_trait]
pub trait QuestionRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the concept does not exist.
    async fn insert_question(&self, question: ValidQuestion) -> Result<Question, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the question or its concept is missing.
    async fn update_question(&self, question: &Question) -> Result<(), StorageError>;

    async fn get_question(&self, id: QuestionId) -> Result<Option<QuestionListing>, StorageError>;

    /// Questions ordered by module, concept, then difficulty.
    async fn list_questions(&self) -> Result<Vec<QuestionListing>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, `StorageError::Conflict`
    /// if any student has answered it.
    async fn delete_question(&self, id: QuestionId) -> Result<(), StorageError>;

    /// Picks a random question of the module not yet answered in `session`,
    /// restricted to `difficulty` when given.
    async fn random_unanswered_question(
        &self,
        module_id: ModuleId,
        session_id: SessionId,
        difficulty: Option<Difficulty>,
    ) -> Result<Option<QuestionListing>, StorageError>;
}

#[async_trait]
pub trait PuzzleRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the concept does not exist.
    async fn insert_puzzle(&self, puzzle: PuzzleDraft) -> Result<Puzzle, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the puzzle does not exist.
    async fn delete_puzzle(&self, id: PuzzleId) -> Result<(), StorageError>;

    /// Puzzles ordered by module then concept.
    async fn list_puzzles(&self) -> Result<Vec<PuzzleListing>, StorageError>;

    async fn random_puzzle_for_concept(
        &self,
        concept_id: ConceptId,
    ) -> Result<Option<PuzzleListing>, StorageError>;

    async fn random_puzzle_for_module(
        &self,
        module_id: ModuleId,
    ) -> Result<Option<PuzzleListing>, StorageError>;
}

#[async_trait]
pub trait QuizRepository: Send + Sync {
    /// Returns the stored progress, creating the default `(Easy, 0, 0)` row first if absent.
    async fn get_or_create_progress(
        &self,
        student_id: StudentId,
        module_id: ModuleId,
    ) -> Result<AdaptiveState, StorageError>;

    async fn get_progress(
        &self,
        student_id: StudentId,
        module_id: ModuleId,
    ) -> Result<Option<AdaptiveState>, StorageError>;

    /// One entry per module, in module order.
    async fn list_module_progress(
        &self,
        student_id: StudentId,
    ) -> Result<Vec<ModuleProgress>, StorageError>;

    async fn insert_session(
        &self,
        student_id: StudentId,
        module_id: ModuleId,
        started_at: DateTime<Utc>,
    ) -> Result<QuizSession, StorageError>;

    async fn get_session(&self, id: SessionId) -> Result<Option<QuizSession>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, `StorageError::Conflict`
    /// if the session already ended.
    async fn end_session(
        &self,
        id: SessionId,
        ended_at: DateTime<Utc>,
    ) -> Result<QuizSession, StorageError>;

    async fn answered_question_ids(
        &self,
        session_id: SessionId,
    ) -> Result<Vec<QuestionId>, StorageError>;

    /// Stores a graded answer and advances the adaptive state as one atomic step:
    /// the answer row, session totals, student points, and progress all change together.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the session is missing and
    /// `StorageError::Conflict` if the session ended or the question was already answered.
    async fn record_answer(&self, answer: NewAnswer) -> Result<RecordedAnswer, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the answer is not part of the session.
    async fn acknowledge_answer(
        &self,
        session_id: SessionId,
        answer_id: AnswerId,
        text: Option<String>,
    ) -> Result<(), StorageError>;

    /// Answers in the order they were given.
    async fn list_session_answers(
        &self,
        session_id: SessionId,
    ) -> Result<Vec<AnswerDetail>, StorageError>;

    /// Most recent sessions first.
    async fn recent_sessions(
        &self,
        student_id: StudentId,
        limit: u32,
    ) -> Result<Vec<SessionListing>, StorageError>;
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub students: Arc<dyn StudentRepository>,
    pub teachers: Arc<dyn TeacherRepository>,
    pub catalog: Arc<dyn CatalogRepository>,
    pub questions: Arc<dyn QuestionRepository>,
    pub puzzles: Arc<dyn PuzzleRepository>,
    pub quizzes: Arc<dyn QuizRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_repository(InMemoryRepository::new())
    }

    /// Shares one backend across every repository slot.
    pub fn from_repository<R>(repo: R) -> Self
    where
        R: StudentRepository
            + TeacherRepository
            + CatalogRepository
            + QuestionRepository
            + PuzzleRepository
            + QuizRepository
            + 'static,
    {
        let repo = Arc::new(repo);
        Self {
            students: repo.clone(),
            teachers: repo.clone(),
            catalog: repo.clone(),
            questions: repo.clone(),
            puzzles: repo.clone(),
            quizzes: repo,
        }
    }
}
