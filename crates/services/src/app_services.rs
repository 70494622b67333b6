use std::sync::Arc;

use storage::repository::Storage;

use crate::Clock;
use crate::account_service::AccountService;
use crate::auth::{AuthSettings, PasswordHasher, TokenIssuer};
use crate::error::AppServicesError;
use crate::puzzle_service::PuzzleService;
use crate::quiz_service::QuizService;
use crate::teacher_service::{TeacherRepos, TeacherService};

/// Assembles app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    quiz: Arc<QuizService>,
    accounts: Arc<AccountService>,
    teachers: Arc<TeacherService>,
    puzzles: Arc<PuzzleService>,
}

impl AppServices {
    #[must_use]
    pub fn new(storage: &Storage, clock: Clock, auth: &AuthSettings) -> Self {
        let hasher = PasswordHasher::new(auth.bcrypt_cost);
        let tokens = Arc::new(TokenIssuer::new(auth));

        let quiz = Arc::new(QuizService::new(
            clock,
            Arc::clone(&storage.students),
            Arc::clone(&storage.catalog),
            Arc::clone(&storage.questions),
            Arc::clone(&storage.quizzes),
        ));
        let accounts = Arc::new(AccountService::new(
            clock,
            hasher,
            Arc::clone(&tokens),
            Arc::clone(&storage.students),
            Arc::clone(&storage.quizzes),
        ));
        let teachers = Arc::new(TeacherService::new(
            hasher,
            tokens,
            TeacherRepos {
                teachers: Arc::clone(&storage.teachers),
                students: Arc::clone(&storage.students),
                catalog: Arc::clone(&storage.catalog),
                questions: Arc::clone(&storage.questions),
                puzzles: Arc::clone(&storage.puzzles),
                quizzes: Arc::clone(&storage.quizzes),
            },
        ));
        let puzzles = Arc::new(PuzzleService::new(Arc::clone(&storage.puzzles)));

        Self {
            quiz,
            accounts,
            teachers,
            puzzles,
        }
    }

    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        auth: &AuthSettings,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::new(&storage, clock, auth))
    }

    #[must_use]
    pub fn in_memory(clock: Clock, auth: &AuthSettings) -> Self {
        Self::new(&Storage::in_memory(), clock, auth)
    }

    #[must_use]
    pub fn quiz(&self) -> Arc<QuizService> {
        Arc::clone(&self.quiz)
    }

    #[must_use]
    pub fn accounts(&self) -> Arc<AccountService> {
        Arc::clone(&self.accounts)
    }

    #[must_use]
    pub fn teachers(&self) -> Arc<TeacherService> {
        Arc::clone(&self.teachers)
    }

    #[must_use]
    pub fn puzzles(&self) -> Arc<PuzzleService> {
        Arc::clone(&self.puzzles)
    }
}
