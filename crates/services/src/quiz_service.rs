use std::sync::Arc;

use mathwrks_core::model::{
    AnswerChoice, AnswerId, Module, ModuleId, QuestionId, QuizSession, SessionId, StudentId,
};
use mathwrks_core::{AdaptiveState, Clock};
use storage::repository::{
    CatalogRepository, NewAnswer, QuestionRepository, QuizRepository, StorageError,
    StudentRepository,
};

use crate::error::QuizError;
use crate::markdown::render_markdown;
use crate::views::{
    AnswerFeedback, AnswerView, NextQuestion, QuestionView, SessionSnapshot, SessionStatus,
    SessionSummary, StartedSession,
};

/// Runs adaptive quiz sessions: question selection, grading, and summaries.
#[derive(Clone)]
pub struct QuizService {
    clock: Clock,
    students: Arc<dyn StudentRepository>,
    catalog: Arc<dyn CatalogRepository>,
    questions: Arc<dyn QuestionRepository>,
    quizzes: Arc<dyn QuizRepository>,
}

impl QuizService {
    #[must_use]
    pub fn new(
        clock: Clock,
        students: Arc<dyn StudentRepository>,
        catalog: Arc<dyn CatalogRepository>,
        questions: Arc<dyn QuestionRepository>,
        quizzes: Arc<dyn QuizRepository>,
    ) -> Self {
        Self {
            clock,
            students,
            catalog,
            questions,
            quizzes,
        }
    }

    /// # Errors
    ///
    /// Returns `QuizError::Storage` if repository access fails.
    pub async fn list_modules(&self) -> Result<Vec<Module>, QuizError> {
        Ok(self.catalog.list_modules().await?)
    }

    /// Opens a session and makes sure a progress record exists for the module.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::StudentNotFound` or `QuizError::ModuleNotFound`
    /// for unknown ids, `QuizError::Storage` if persistence fails.
    pub async fn start_session(
        &self,
        student_id: StudentId,
        module_id: ModuleId,
    ) -> Result<StartedSession, QuizError> {
        self.students
            .get_student(student_id)
            .await?
            .ok_or(QuizError::StudentNotFound)?;
        let module = self
            .catalog
            .get_module(module_id)
            .await?
            .ok_or(QuizError::ModuleNotFound)?;

        let progress = self
            .quizzes
            .get_or_create_progress(student_id, module_id)
            .await?;
        let session = self
            .quizzes
            .insert_session(student_id, module_id, self.clock.now())
            .await?;

        tracing::info!(
            session = session.id().value(),
            student = student_id.value(),
            module = %module.name,
            difficulty = progress.difficulty.level(),
            "quiz session started"
        );

        Ok(StartedSession {
            session_id: session.id(),
            module_name: module.display_name,
            current_difficulty: progress.difficulty,
            difficulty_label: progress.difficulty.label(),
        })
    }

    /// Picks an unanswered question at the student's current difficulty,
    /// falling back to any unanswered question of the module.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::SessionNotFound` or `QuizError::SessionEnded`,
    /// and `QuizError::Storage` if repository access fails.
    pub async fn next_question(&self, session_id: SessionId) -> Result<NextQuestion, QuizError> {
        let session = self.open_session(session_id).await?;
        let progress = self.current_progress(&session).await?;
        let answered = self.quizzes.answered_question_ids(session_id).await?;

        let mut picked = self
            .questions
            .random_unanswered_question(
                session.module_id(),
                session_id,
                Some(progress.difficulty),
            )
            .await?;
        if picked.is_none() {
            picked = self
                .questions
                .random_unanswered_question(session.module_id(), session_id, None)
                .await?;
        }

        let Some(listing) = picked else {
            return Ok(NextQuestion::completed());
        };
        let question = listing.question;

        Ok(NextQuestion::Question(Box::new(QuestionView {
            question_id: question.id,
            concept_id: question.concept_id,
            concept_name: listing.concept_name,
            difficulty: question.difficulty,
            difficulty_label: question.difficulty.label(),
            question_text: question.text,
            options: question.options,
            potential_points: question.difficulty.points(),
            question_number: u32::try_from(answered.len())
                .unwrap_or(u32::MAX)
                .saturating_add(1),
        })))
    }

    /// Grades an answer and records it together with the adaptive update.
    ///
    /// `answer` is a letter A-D in any case.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::InvalidAnswer` for other letters,
    /// `QuizError::SessionNotFound`/`QuestionNotFound` for unknown ids,
    /// `QuizError::SessionEnded` or `QuizError::AlreadyAnswered` when the
    /// answer cannot be accepted, and `QuizError::Storage` on persistence failure.
    pub async fn submit_answer(
        &self,
        session_id: SessionId,
        question_id: QuestionId,
        answer: &str,
    ) -> Result<AnswerFeedback, QuizError> {
        let choice: AnswerChoice = answer.parse()?;
        let session = self.open_session(session_id).await?;
        let listing = self
            .questions
            .get_question(question_id)
            .await?
            .ok_or(QuizError::QuestionNotFound)?;

        let answered = self.quizzes.answered_question_ids(session_id).await?;
        if answered.contains(&question_id) {
            return Err(QuizError::AlreadyAnswered);
        }

        let question = &listing.question;
        let is_correct = question.is_correct(choice);
        let points_earned = if is_correct {
            question.difficulty.points()
        } else {
            0
        };

        let recorded = match self
            .quizzes
            .record_answer(NewAnswer {
                session_id,
                question_id,
                student_answer: choice,
                is_correct,
                points_earned,
                answered_at: self.clock.now(),
            })
            .await
        {
            Ok(recorded) => recorded,
            Err(StorageError::Conflict(_)) => return Err(self.conflict_reason(session_id).await),
            Err(e) => return Err(e.into()),
        };

        let changed = recorded.previous.difficulty != recorded.current.difficulty;
        if changed {
            tracing::debug!(
                session = session.id().value(),
                student = session.student_id().value(),
                from = recorded.previous.difficulty.level(),
                to = recorded.current.difficulty.level(),
                "difficulty changed"
            );
        }

        Ok(AnswerFeedback {
            is_correct,
            correct_answer: question.correct_answer,
            explanation: question.explanation.clone(),
            concept_explanation_html: render_markdown(&listing.concept_explanation),
            concept_name: listing.concept_name,
            concept_explanation: listing.concept_explanation,
            points_earned,
            new_difficulty: recorded.current.difficulty,
            difficulty_label: recorded.current.difficulty.label(),
            difficulty_changed: changed,
            answer_id: recorded.answer.id,
        })
    }

    /// Marks an answer's feedback as read, optionally with the student's note.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::AnswerNotFound` if the answer is not part of the session.
    pub async fn acknowledge(
        &self,
        session_id: SessionId,
        answer_id: AnswerId,
        text: Option<String>,
    ) -> Result<(), QuizError> {
        let text = text.filter(|t| !t.trim().is_empty());
        match self
            .quizzes
            .acknowledge_answer(session_id, answer_id, text)
            .await
        {
            Ok(()) => Ok(()),
            Err(StorageError::NotFound) => Err(QuizError::AnswerNotFound),
            Err(e) => Err(e.into()),
        }
    }

    /// Closes the session and returns its summary with every answer.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::SessionNotFound` or `QuizError::AlreadyEnded`.
    pub async fn end_session(&self, session_id: SessionId) -> Result<SessionSummary, QuizError> {
        let session = self.find_session(session_id).await?;
        if session.is_ended() {
            return Err(QuizError::AlreadyEnded);
        }
        let session = match self
            .quizzes
            .end_session(session_id, self.clock.now())
            .await
        {
            Ok(session) => session,
            Err(StorageError::Conflict(_)) => return Err(QuizError::AlreadyEnded),
            Err(e) => return Err(e.into()),
        };

        let answers = self
            .quizzes
            .list_session_answers(session_id)
            .await?
            .into_iter()
            .map(AnswerView::from)
            .collect();
        let accuracy = session.accuracy();

        tracing::info!(
            session = session_id.value(),
            total = session.total_questions(),
            correct = session.correct_answers(),
            points = session.points_earned(),
            "quiz session ended"
        );

        Ok(SessionSummary {
            session: self.snapshot(session).await?,
            answers,
            accuracy,
        })
    }

    /// # Errors
    ///
    /// Returns `QuizError::SessionNotFound` for unknown ids.
    pub async fn session_status(&self, session_id: SessionId) -> Result<SessionStatus, QuizError> {
        let session = self.find_session(session_id).await?;
        let progress = self.current_progress(&session).await?;
        Ok(SessionStatus {
            session: self.snapshot(session).await?,
            current_difficulty: progress.difficulty,
            difficulty_label: progress.difficulty.label(),
        })
    }

    async fn find_session(&self, session_id: SessionId) -> Result<QuizSession, QuizError> {
        self.quizzes
            .get_session(session_id)
            .await?
            .ok_or(QuizError::SessionNotFound)
    }

    async fn open_session(&self, session_id: SessionId) -> Result<QuizSession, QuizError> {
        let session = self.find_session(session_id).await?;
        if session.is_ended() {
            return Err(QuizError::SessionEnded);
        }
        Ok(session)
    }

    async fn current_progress(&self, session: &QuizSession) -> Result<AdaptiveState, QuizError> {
        Ok(self
            .quizzes
            .get_progress(session.student_id(), session.module_id())
            .await?
            .unwrap_or_default())
    }

    /// Re-reads the session to explain why storage refused an answer.
    async fn conflict_reason(&self, session_id: SessionId) -> QuizError {
        match self.quizzes.get_session(session_id).await {
            Ok(Some(session)) if session.is_ended() => QuizError::SessionEnded,
            Ok(Some(_)) => QuizError::AlreadyAnswered,
            Ok(None) => QuizError::SessionNotFound,
            Err(e) => e.into(),
        }
    }

    async fn snapshot(&self, session: QuizSession) -> Result<SessionSnapshot, QuizError> {
        let student = self
            .students
            .get_student(session.student_id())
            .await?
            .ok_or(QuizError::SessionNotFound)?;
        let module = self
            .catalog
            .get_module(session.module_id())
            .await?
            .ok_or(QuizError::SessionNotFound)?;
        Ok(SessionSnapshot {
            session,
            student_name: student.name,
            student_total_points: student.total_points,
            module_name: module.display_name,
        })
    }
}
