//! Serializable payloads returned by the services.
//!
//! Quiz payloads use camelCase keys; listing rows keep the snake_case column
//! names the web client reads.

use chrono::{DateTime, Utc};
use mathwrks_core::adaptive::Difficulty;
use mathwrks_core::model::{
    Answer, AnswerChoice, AnswerId, AnswerOptions, ConceptId, ModuleId, PuzzleId, QuestionId,
    QuizSession, SessionId, Student, StudentId, Teacher, TeacherId,
};
use serde::Serialize;
use storage::repository::{
    AnswerDetail, ConceptListing, ModuleProgress, PuzzleListing, QuestionListing, SessionListing,
    StudentStats,
};

use crate::markdown::render_markdown;

//
// ─── ACCOUNTS ──────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StudentProfile {
    pub id: StudentId,
    pub username: String,
    pub name: String,
    pub total_points: i64,
}

impl From<Student> for StudentProfile {
    fn from(student: Student) -> Self {
        Self {
            id: student.id,
            username: student.username,
            name: student.name,
            total_points: student.total_points,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthenticatedStudent {
    pub token: String,
    pub student: StudentProfile,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TeacherProfile {
    pub id: TeacherId,
    pub username: String,
}

impl From<Teacher> for TeacherProfile {
    fn from(teacher: Teacher) -> Self {
        Self {
            id: teacher.id,
            username: teacher.username,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthenticatedTeacher {
    pub token: String,
    pub teacher: TeacherProfile,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleProgressView {
    pub module_id: ModuleId,
    pub module_name: String,
    pub current_difficulty: Difficulty,
    pub difficulty_label: &'static str,
    pub correct_streak: u32,
    pub wrong_streak: u32,
}

impl From<ModuleProgress> for ModuleProgressView {
    fn from(p: ModuleProgress) -> Self {
        Self {
            module_id: p.module_id,
            module_name: p.module_name,
            current_difficulty: p.state.difficulty,
            difficulty_label: p.state.difficulty.label(),
            correct_streak: p.state.correct_streak,
            wrong_streak: p.state.wrong_streak,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuizHistoryEntry {
    pub session_id: SessionId,
    pub module_name: String,
    pub total_questions: u32,
    pub correct_answers: u32,
    pub points_earned: u32,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl From<SessionListing> for QuizHistoryEntry {
    fn from(l: SessionListing) -> Self {
        Self {
            session_id: l.session.id(),
            module_name: l.module_name,
            total_questions: l.session.total_questions(),
            correct_answers: l.session.correct_answers(),
            points_earned: l.session.points_earned(),
            started_at: l.session.started_at(),
            ended_at: l.session.ended_at(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StudentProgress {
    #[serde(flatten)]
    pub student: StudentProfile,
    #[serde(rename = "moduleProgress")]
    pub module_progress: Vec<ModuleProgressView>,
    #[serde(rename = "quizHistory")]
    pub quiz_history: Vec<QuizHistoryEntry>,
}

//
// ─── QUIZ ──────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartedSession {
    pub session_id: SessionId,
    pub module_name: String,
    pub current_difficulty: Difficulty,
    pub difficulty_label: &'static str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionView {
    pub question_id: QuestionId,
    pub concept_id: ConceptId,
    pub concept_name: String,
    pub difficulty: Difficulty,
    pub difficulty_label: &'static str,
    pub question_text: String,
    pub options: AnswerOptions,
    pub potential_points: u32,
    pub question_number: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuizCompleted {
    pub completed: bool,
    pub message: &'static str,
}

/// Either the next question or a marker that the module is exhausted.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum NextQuestion {
    Completed(QuizCompleted),
    Question(Box<QuestionView>),
}

impl NextQuestion {
    #[must_use]
    pub fn completed() -> Self {
        Self::Completed(QuizCompleted {
            completed: true,
            message: "No more questions available",
        })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerFeedback {
    pub is_correct: bool,
    pub correct_answer: AnswerChoice,
    pub explanation: Option<String>,
    pub concept_name: String,
    pub concept_explanation: String,
    pub concept_explanation_html: String,
    pub points_earned: u32,
    pub new_difficulty: Difficulty,
    pub difficulty_label: &'static str,
    pub difficulty_changed: bool,
    pub answer_id: AnswerId,
}

/// Session row joined with student and module names.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    #[serde(flatten)]
    pub session: QuizSession,
    pub student_name: String,
    pub student_total_points: i64,
    pub module_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnswerView {
    #[serde(flatten)]
    pub answer: Answer,
    pub question_text: String,
    pub correct_answer: AnswerChoice,
    pub concept_name: String,
}

impl From<AnswerDetail> for AnswerView {
    fn from(d: AnswerDetail) -> Self {
        Self {
            answer: d.answer,
            question_text: d.question_text,
            correct_answer: d.correct_answer,
            concept_name: d.concept_name,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    #[serde(flatten)]
    pub session: SessionSnapshot,
    pub answers: Vec<AnswerView>,
    pub accuracy: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    #[serde(flatten)]
    pub session: SessionSnapshot,
    #[serde(rename = "currentDifficulty")]
    pub current_difficulty: Difficulty,
    #[serde(rename = "difficultyLabel")]
    pub difficulty_label: &'static str,
}

//
// ─── CONTENT ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionRecord {
    pub id: QuestionId,
    pub concept_id: ConceptId,
    pub difficulty: Difficulty,
    pub question_text: String,
    pub option_a: String,
    pub option_b: String,
    pub option_c: String,
    pub option_d: String,
    pub correct_answer: AnswerChoice,
    pub explanation: Option<String>,
    pub concept_name: String,
    pub module_name: String,
}

impl From<QuestionListing> for QuestionRecord {
    fn from(l: QuestionListing) -> Self {
        let q = l.question;
        Self {
            id: q.id,
            concept_id: q.concept_id,
            difficulty: q.difficulty,
            question_text: q.text,
            option_a: q.options.a,
            option_b: q.options.b,
            option_c: q.options.c,
            option_d: q.options.d,
            correct_answer: q.correct_answer,
            explanation: q.explanation,
            concept_name: l.concept_name,
            module_name: l.module_name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConceptRecord {
    pub id: ConceptId,
    pub module_id: ModuleId,
    pub name: String,
    pub explanation: String,
    pub explanation_html: String,
    pub module_name: String,
}

impl From<ConceptListing> for ConceptRecord {
    fn from(l: ConceptListing) -> Self {
        Self {
            id: l.concept.id,
            module_id: l.concept.module_id,
            name: l.concept.name,
            explanation_html: render_markdown(&l.concept.explanation),
            explanation: l.concept.explanation,
            module_name: l.module_name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PuzzleRecord {
    pub id: PuzzleId,
    pub concept_id: ConceptId,
    pub title: String,
    pub puzzle_text: String,
    pub puzzle_html: String,
    pub hint: Option<String>,
    pub solution: Option<String>,
    pub concept_name: String,
    pub module_name: String,
}

impl From<PuzzleListing> for PuzzleRecord {
    fn from(l: PuzzleListing) -> Self {
        let p = l.puzzle;
        Self {
            id: p.id,
            concept_id: p.concept_id,
            title: p.title,
            puzzle_html: render_markdown(&p.text),
            puzzle_text: p.text,
            hint: p.hint,
            solution: p.solution,
            concept_name: l.concept_name,
            module_name: l.module_name,
        }
    }
}

//
// ─── TEACHER DASHBOARD ─────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Serialize)]
pub struct StudentSummary {
    #[serde(flatten)]
    pub student: Student,
    pub total_quizzes: u32,
    pub total_correct: i64,
    pub total_answered: i64,
}

impl From<StudentStats> for StudentSummary {
    fn from(s: StudentStats) -> Self {
        Self {
            student: s.student,
            total_quizzes: s.total_quizzes,
            total_correct: s.total_correct,
            total_answered: s.total_answered,
        }
    }
}

/// Per-module row on the teacher's student page; streak fields are absent
/// for modules the student never started.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleActivity {
    pub module_name: String,
    pub current_difficulty: Option<Difficulty>,
    pub correct_streak: Option<u32>,
    pub wrong_streak: Option<u32>,
    pub quizzes_taken: u32,
    pub points_earned: i64,
}

impl From<ModuleProgress> for ModuleActivity {
    fn from(p: ModuleProgress) -> Self {
        let started = p.started;
        Self {
            module_name: p.module_name,
            current_difficulty: started.then_some(p.state.difficulty),
            correct_streak: started.then_some(p.state.correct_streak),
            wrong_streak: started.then_some(p.state.wrong_streak),
            quizzes_taken: p.quizzes_taken,
            points_earned: p.points_earned,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RecentQuiz {
    #[serde(flatten)]
    pub session: QuizSession,
    pub module_name: String,
}

impl From<SessionListing> for RecentQuiz {
    fn from(l: SessionListing) -> Self {
        Self {
            session: l.session,
            module_name: l.module_name,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StudentDetail {
    #[serde(flatten)]
    pub student: Student,
    #[serde(rename = "moduleProgress")]
    pub module_progress: Vec<ModuleActivity>,
    #[serde(rename = "recentQuizzes")]
    pub recent_quizzes: Vec<RecentQuiz>,
}
