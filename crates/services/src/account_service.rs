use std::sync::Arc;

use mathwrks_core::Clock;
use mathwrks_core::model::{Registration, StudentId};
use storage::repository::{NewStudent, QuizRepository, StorageError, StudentRepository};

use crate::auth::{PasswordHasher, Role, TokenIssuer};
use crate::error::AccountServiceError;
use crate::views::{AuthenticatedStudent, StudentProfile, StudentProgress};

const RECENT_SESSION_LIMIT: u32 = 10;
const INVALID_LOGIN: &str = "Invalid username or password";

/// Student registration, login, and profile lookups.
#[derive(Clone)]
pub struct AccountService {
    clock: Clock,
    hasher: PasswordHasher,
    tokens: Arc<TokenIssuer>,
    students: Arc<dyn StudentRepository>,
    quizzes: Arc<dyn QuizRepository>,
}

impl AccountService {
    #[must_use]
    pub fn new(
        clock: Clock,
        hasher: PasswordHasher,
        tokens: Arc<TokenIssuer>,
        students: Arc<dyn StudentRepository>,
        quizzes: Arc<dyn QuizRepository>,
    ) -> Self {
        Self {
            clock,
            hasher,
            tokens,
            students,
            quizzes,
        }
    }

    /// # Errors
    ///
    /// Returns `AccountServiceError::Validation` for short usernames or
    /// passwords, `AccountServiceError::UsernameTaken` for duplicates.
    pub async fn register(
        &self,
        username: &str,
        password: &str,
        name: &str,
    ) -> Result<AuthenticatedStudent, AccountServiceError> {
        let registration = Registration::new(username, password, name)?;
        if self
            .students
            .find_student_by_username(&registration.username)
            .await?
            .is_some()
        {
            return Err(AccountServiceError::UsernameTaken);
        }

        let password_hash = self.hasher.hash(&registration.password).await?;
        let student = match self
            .students
            .insert_student(NewStudent {
                username: registration.username,
                password_hash,
                name: registration.name,
                total_points: 0,
                created_at: self.clock.now(),
            })
            .await
        {
            Ok(student) => student,
            Err(StorageError::Conflict(_)) => return Err(AccountServiceError::UsernameTaken),
            Err(e) => return Err(e.into()),
        };

        tracing::info!(student = student.id.value(), username = %student.username, "student registered");
        let token = self
            .tokens
            .issue(Role::Student, student.id.value(), &student.username)?;
        Ok(AuthenticatedStudent {
            token,
            student: student.into(),
        })
    }

    /// Usernames are matched case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns `AccountServiceError::InvalidCredentials` for unknown users or
    /// wrong passwords.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<AuthenticatedStudent, AccountServiceError> {
        let username = username.trim().to_lowercase();
        let Some(credentials) = self.students.find_student_by_username(&username).await? else {
            tracing::warn!(%username, "student login for unknown username");
            return Err(AccountServiceError::InvalidCredentials(INVALID_LOGIN));
        };
        if !self.hasher.verify(password, &credentials.password_hash).await? {
            tracing::warn!(%username, "student login with wrong password");
            return Err(AccountServiceError::InvalidCredentials(INVALID_LOGIN));
        }

        let student = credentials.student;
        let token = self
            .tokens
            .issue(Role::Student, student.id.value(), &student.username)?;
        Ok(AuthenticatedStudent {
            token,
            student: student.into(),
        })
    }

    /// Resolves a student bearer token to the stored profile.
    ///
    /// # Errors
    ///
    /// Returns `AccountServiceError::Auth` for invalid tokens and
    /// `AccountServiceError::StudentNotFound` if the account is gone.
    pub async fn current_student(&self, token: &str) -> Result<StudentProfile, AccountServiceError> {
        let claims = self.tokens.verify(token, Role::Student)?;
        self.get_student(StudentId::new(claims.sub)).await
    }

    /// # Errors
    ///
    /// Returns `AccountServiceError::StudentNotFound` for unknown ids.
    pub async fn get_student(&self, id: StudentId) -> Result<StudentProfile, AccountServiceError> {
        self.students
            .get_student(id)
            .await?
            .map(StudentProfile::from)
            .ok_or(AccountServiceError::StudentNotFound)
    }

    /// Profile plus per-module difficulty and the most recent sessions.
    ///
    /// # Errors
    ///
    /// Returns `AccountServiceError::StudentNotFound` for unknown ids.
    pub async fn student_progress(
        &self,
        id: StudentId,
    ) -> Result<StudentProgress, AccountServiceError> {
        let student = self.get_student(id).await?;
        let module_progress = self
            .quizzes
            .list_module_progress(id)
            .await?
            .into_iter()
            .map(Into::into)
            .collect();
        let quiz_history = self
            .quizzes
            .recent_sessions(id, RECENT_SESSION_LIMIT)
            .await?
            .into_iter()
            .map(Into::into)
            .collect();
        Ok(StudentProgress {
            student,
            module_progress,
            quiz_history,
        })
    }
}
