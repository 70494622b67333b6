use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::model::ids::{AnswerId, ModuleId, QuestionId, SessionId, StudentId};
use crate::model::question::AnswerChoice;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizSessionError {
    #[error("ended_at is before started_at")]
    InvalidTimeRange,

    #[error("correct answers ({correct}) exceed total questions ({total})")]
    CountMismatch { total: u32, correct: u32 },
}

//
// ─── QUIZ SESSION ──────────────────────────────────────────────────────────────
//

/// One sitting of a student working through a module's questions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuizSession {
    id: SessionId,
    student_id: StudentId,
    module_id: ModuleId,
    started_at: DateTime<Utc>,
    ended_at: Option<DateTime<Utc>>,
    total_questions: u32,
    correct_answers: u32,
    points_earned: u32,
}

impl QuizSession {
    #[must_use]
    pub fn start(
        id: SessionId,
        student_id: StudentId,
        module_id: ModuleId,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            student_id,
            module_id,
            started_at,
            ended_at: None,
            total_questions: 0,
            correct_answers: 0,
            points_earned: 0,
        }
    }

    /// Rehydrate a session from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `QuizSessionError` if the timestamps or counters are inconsistent.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        id: SessionId,
        student_id: StudentId,
        module_id: ModuleId,
        started_at: DateTime<Utc>,
        ended_at: Option<DateTime<Utc>>,
        total_questions: u32,
        correct_answers: u32,
        points_earned: u32,
    ) -> Result<Self, QuizSessionError> {
        if ended_at.is_some_and(|ended| ended < started_at) {
            return Err(QuizSessionError::InvalidTimeRange);
        }
        if correct_answers > total_questions {
            return Err(QuizSessionError::CountMismatch {
                total: total_questions,
                correct: correct_answers,
            });
        }
        Ok(Self {
            id,
            student_id,
            module_id,
            started_at,
            ended_at,
            total_questions,
            correct_answers,
            points_earned,
        })
    }

    /// Folds one graded answer into the running totals.
    pub fn record(&mut self, is_correct: bool, points: u32) {
        self.total_questions = self.total_questions.saturating_add(1);
        if is_correct {
            self.correct_answers = self.correct_answers.saturating_add(1);
        }
        self.points_earned = self.points_earned.saturating_add(points);
    }

    pub fn end(&mut self, at: DateTime<Utc>) {
        self.ended_at = Some(at.max(self.started_at));
    }

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    #[must_use]
    pub fn student_id(&self) -> StudentId {
        self.student_id
    }

    #[must_use]
    pub fn module_id(&self) -> ModuleId {
        self.module_id
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    #[must_use]
    pub fn is_ended(&self) -> bool {
        self.ended_at.is_some()
    }

    #[must_use]
    pub fn total_questions(&self) -> u32 {
        self.total_questions
    }

    #[must_use]
    pub fn correct_answers(&self) -> u32 {
        self.correct_answers
    }

    #[must_use]
    pub fn points_earned(&self) -> u32 {
        self.points_earned
    }

    /// Percentage of correct answers, rounded; 0 when nothing was answered.
    #[must_use]
    pub fn accuracy(&self) -> u32 {
        accuracy_percent(self.correct_answers, self.total_questions)
    }
}

/// `round(correct / total * 100)`, or 0 for an empty session.
#[must_use]
pub fn accuracy_percent(correct: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    // Bounded to 0..=100 when correct <= total.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let pct = (f64::from(correct) / f64::from(total) * 100.0).round() as u32;
    pct
}

//
// ─── ANSWERS ───────────────────────────────────────────────────────────────────
//

/// A graded answer as stored for a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Answer {
    pub id: AnswerId,
    pub session_id: SessionId,
    pub question_id: QuestionId,
    pub student_answer: AnswerChoice,
    pub is_correct: bool,
    pub points_earned: u32,
    pub acknowledged: bool,
    pub acknowledgment_text: Option<String>,
    pub answered_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn session() -> QuizSession {
        QuizSession::start(
            SessionId::new(1),
            StudentId::new(1),
            ModuleId::new(1),
            fixed_now(),
        )
    }

    #[test]
    fn totals_accumulate() {
        let mut s = session();
        s.record(true, 10);
        s.record(false, 0);
        s.record(true, 15);
        assert_eq!(s.total_questions(), 3);
        assert_eq!(s.correct_answers(), 2);
        assert_eq!(s.points_earned(), 25);
        assert_eq!(s.accuracy(), 67);
    }

    #[test]
    fn empty_session_has_zero_accuracy() {
        assert_eq!(session().accuracy(), 0);
        assert_eq!(accuracy_percent(1, 2), 50);
        assert_eq!(accuracy_percent(2, 2), 100);
    }

    #[test]
    fn rejects_inconsistent_persisted_counts() {
        let err = QuizSession::from_persisted(
            SessionId::new(1),
            StudentId::new(1),
            ModuleId::new(1),
            fixed_now(),
            None,
            1,
            2,
            20,
        )
        .unwrap_err();
        assert_eq!(err, QuizSessionError::CountMismatch { total: 1, correct: 2 });
    }

    #[test]
    fn end_never_precedes_start() {
        let mut s = session();
        s.end(fixed_now() - chrono::Duration::minutes(5));
        assert_eq!(s.ended_at(), Some(fixed_now()));
        assert!(s.is_ended());
    }
}
