use std::sync::Arc;

use mathwrks_core::model::{
    ConceptId, PuzzleDraft, PuzzleId, QuestionDraft, QuestionId, QuestionPatch, StudentId,
};
use storage::repository::{
    CatalogRepository, PuzzleRepository, QuestionRepository, QuizRepository, StorageError,
    StudentRepository, TeacherRepository,
};

use crate::auth::{Claims, PasswordHasher, Role, TokenIssuer};
use crate::error::{AccountServiceError, AuthError, ContentError};
use crate::views::{
    AuthenticatedTeacher, ConceptRecord, PuzzleRecord, QuestionRecord, StudentDetail,
    StudentSummary,
};

const RECENT_SESSION_LIMIT: u32 = 10;
const INVALID_LOGIN: &str = "Invalid credentials";

/// Teacher dashboard: login, student oversight, and content management.
#[derive(Clone)]
pub struct TeacherService {
    hasher: PasswordHasher,
    tokens: Arc<TokenIssuer>,
    teachers: Arc<dyn TeacherRepository>,
    students: Arc<dyn StudentRepository>,
    catalog: Arc<dyn CatalogRepository>,
    questions: Arc<dyn QuestionRepository>,
    puzzles: Arc<dyn PuzzleRepository>,
    quizzes: Arc<dyn QuizRepository>,
}

pub struct TeacherRepos {
    pub teachers: Arc<dyn TeacherRepository>,
    pub students: Arc<dyn StudentRepository>,
    pub catalog: Arc<dyn CatalogRepository>,
    pub questions: Arc<dyn QuestionRepository>,
    pub puzzles: Arc<dyn PuzzleRepository>,
    pub quizzes: Arc<dyn QuizRepository>,
}

impl TeacherService {
    #[must_use]
    pub fn new(hasher: PasswordHasher, tokens: Arc<TokenIssuer>, repos: TeacherRepos) -> Self {
        Self {
            hasher,
            tokens,
            teachers: repos.teachers,
            students: repos.students,
            catalog: repos.catalog,
            questions: repos.questions,
            puzzles: repos.puzzles,
            quizzes: repos.quizzes,
        }
    }

    /// Teacher usernames are matched exactly.
    ///
    /// # Errors
    ///
    /// Returns `AccountServiceError::InvalidCredentials` on any mismatch.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<AuthenticatedTeacher, AccountServiceError> {
        let Some(credentials) = self.teachers.find_teacher_by_username(username).await? else {
            tracing::warn!(%username, "teacher login for unknown username");
            return Err(AccountServiceError::InvalidCredentials(INVALID_LOGIN));
        };
        if !self.hasher.verify(password, &credentials.password_hash).await? {
            tracing::warn!(%username, "teacher login with wrong password");
            return Err(AccountServiceError::InvalidCredentials(INVALID_LOGIN));
        }

        let teacher = credentials.teacher;
        let token = self
            .tokens
            .issue(Role::Teacher, teacher.id.value(), &teacher.username)?;
        Ok(AuthenticatedTeacher {
            token,
            teacher: teacher.into(),
        })
    }

    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` unless `token` is a live teacher token.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        self.tokens.verify(token, Role::Teacher)
    }

    //
    // ─── STUDENTS ──────────────────────────────────────────────────────────────
    //

    /// # Errors
    ///
    /// Returns `ContentError::Storage` if repository access fails.
    pub async fn list_students(&self) -> Result<Vec<StudentSummary>, ContentError> {
        let stats = self.students.list_student_stats().await?;
        Ok(stats.into_iter().map(Into::into).collect())
    }

    /// # Errors
    ///
    /// Returns `ContentError::StudentNotFound` for unknown ids.
    pub async fn student_detail(&self, id: StudentId) -> Result<StudentDetail, ContentError> {
        let student = self
            .students
            .get_student(id)
            .await?
            .ok_or(ContentError::StudentNotFound)?;
        let module_progress = self
            .quizzes
            .list_module_progress(id)
            .await?
            .into_iter()
            .map(Into::into)
            .collect();
        let recent_quizzes = self
            .quizzes
            .recent_sessions(id, RECENT_SESSION_LIMIT)
            .await?
            .into_iter()
            .map(Into::into)
            .collect();
        Ok(StudentDetail {
            student,
            module_progress,
            recent_quizzes,
        })
    }

    //
    // ─── QUESTIONS ─────────────────────────────────────────────────────────────
    //

    /// # Errors
    ///
    /// Returns `ContentError::Storage` if repository access fails.
    pub async fn list_questions(&self) -> Result<Vec<QuestionRecord>, ContentError> {
        let questions = self.questions.list_questions().await?;
        Ok(questions.into_iter().map(Into::into).collect())
    }

    /// # Errors
    ///
    /// Returns `ContentError::Storage` if repository access fails.
    pub async fn list_concepts(&self) -> Result<Vec<ConceptRecord>, ContentError> {
        let concepts = self.catalog.list_concepts().await?;
        Ok(concepts.into_iter().map(Into::into).collect())
    }

    /// # Errors
    ///
    /// Returns `ContentError::Question` when validation fails and
    /// `ContentError::ConceptNotFound` for an unknown concept.
    pub async fn create_question(
        &self,
        draft: QuestionDraft,
    ) -> Result<QuestionRecord, ContentError> {
        let valid = draft.validate()?;
        self.ensure_concept(valid.concept_id).await?;
        let question = self.questions.insert_question(valid).await?;
        tracing::info!(question = question.id.value(), "question created");
        self.question_record(question.id).await
    }

    /// Applies a partial edit; omitted fields keep their stored values.
    ///
    /// # Errors
    ///
    /// Returns `ContentError::QuestionNotFound`, `ContentError::ConceptNotFound`,
    /// or `ContentError::Question` for invalid replacement values.
    pub async fn update_question(
        &self,
        id: QuestionId,
        patch: QuestionPatch,
    ) -> Result<QuestionRecord, ContentError> {
        let existing = self
            .questions
            .get_question(id)
            .await?
            .ok_or(ContentError::QuestionNotFound)?;
        let updated = existing.question.apply_patch(patch)?;
        if updated.concept_id != existing.question.concept_id {
            self.ensure_concept(updated.concept_id).await?;
        }
        match self.questions.update_question(&updated).await {
            Ok(()) => {}
            Err(StorageError::NotFound) => return Err(ContentError::QuestionNotFound),
            Err(e) => return Err(e.into()),
        }
        self.question_record(id).await
    }

    /// # Errors
    ///
    /// Returns `ContentError::QuestionInUse` once any student has answered it.
    pub async fn delete_question(&self, id: QuestionId) -> Result<(), ContentError> {
        match self.questions.delete_question(id).await {
            Ok(()) => {
                tracing::info!(question = id.value(), "question deleted");
                Ok(())
            }
            Err(StorageError::NotFound) => Err(ContentError::QuestionNotFound),
            Err(StorageError::Conflict(_)) => Err(ContentError::QuestionInUse),
            Err(e) => Err(e.into()),
        }
    }

    //
    // ─── PUZZLES ───────────────────────────────────────────────────────────────
    //

    /// # Errors
    ///
    /// Returns `ContentError::Storage` if repository access fails.
    pub async fn list_puzzles(&self) -> Result<Vec<PuzzleRecord>, ContentError> {
        let puzzles = self.puzzles.list_puzzles().await?;
        Ok(puzzles.into_iter().map(Into::into).collect())
    }

    /// # Errors
    ///
    /// Returns `ContentError::Puzzle` for blank fields and
    /// `ContentError::ConceptNotFound` for an unknown concept.
    pub async fn create_puzzle(&self, draft: PuzzleDraft) -> Result<PuzzleRecord, ContentError> {
        let valid = draft.validate()?;
        self.ensure_concept(valid.concept_id).await?;
        let puzzle = self.puzzles.insert_puzzle(valid).await?;
        tracing::info!(puzzle = puzzle.id.value(), "puzzle created");
        self.puzzles
            .list_puzzles()
            .await?
            .into_iter()
            .find(|l| l.puzzle.id == puzzle.id)
            .map(Into::into)
            .ok_or(ContentError::PuzzleNotFound)
    }

    /// # Errors
    ///
    /// Returns `ContentError::PuzzleNotFound` for unknown ids.
    pub async fn delete_puzzle(&self, id: PuzzleId) -> Result<(), ContentError> {
        match self.puzzles.delete_puzzle(id).await {
            Ok(()) => Ok(()),
            Err(StorageError::NotFound) => Err(ContentError::PuzzleNotFound),
            Err(e) => Err(e.into()),
        }
    }

    async fn ensure_concept(&self, id: ConceptId) -> Result<(), ContentError> {
        self.catalog
            .get_concept(id)
            .await?
            .map(|_| ())
            .ok_or(ContentError::ConceptNotFound)
    }

    async fn question_record(&self, id: QuestionId) -> Result<QuestionRecord, ContentError> {
        self.questions
            .get_question(id)
            .await?
            .map(Into::into)
            .ok_or(ContentError::QuestionNotFound)
    }
}
