//! Mutex-guarded in-memory backend for tests and prototyping.
//!
//! Every operation takes the single lock, so multi-step writes such as
//! [`QuizRepository::record_answer`] are atomic.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mathwrks_core::AdaptiveState;
use mathwrks_core::adaptive::Difficulty;
use mathwrks_core::model::{
    Answer, AnswerId, Concept, ConceptId, Module, ModuleId, NewConcept, NewModule, Puzzle,
    PuzzleDraft, PuzzleId, Question, QuestionId, QuizSession, SessionId, Student, StudentId,
    Teacher, TeacherId, ValidQuestion,
};
use rand::seq::IndexedRandom;

use crate::repository::{
    AnswerDetail, CatalogRepository, ConceptListing, ModuleProgress, NewAnswer, NewStudent,
    NewTeacher, PuzzleListing, PuzzleRepository, QuestionListing, QuestionRepository,
    QuizRepository, RecordedAnswer, SessionListing, StorageError, StudentCredentials,
    StudentRepository, StudentStats, TeacherCredentials, TeacherRepository,
};

#[derive(Default)]
struct Inner {
    next_id: i64,
    students: BTreeMap<StudentId, StudentCredentials>,
    teachers: BTreeMap<TeacherId, TeacherCredentials>,
    modules: BTreeMap<ModuleId, Module>,
    concepts: BTreeMap<ConceptId, Concept>,
    questions: BTreeMap<QuestionId, Question>,
    puzzles: BTreeMap<PuzzleId, Puzzle>,
    sessions: BTreeMap<SessionId, QuizSession>,
    answers: BTreeMap<AnswerId, Answer>,
    progress: BTreeMap<(StudentId, ModuleId), AdaptiveState>,
}

impl Inner {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn module_name(&self, id: ModuleId) -> String {
        self.modules
            .get(&id)
            .map(|m| m.display_name.clone())
            .unwrap_or_default()
    }

    fn question_listing(&self, question: &Question) -> Option<QuestionListing> {
        let concept = self.concepts.get(&question.concept_id)?;
        Some(QuestionListing {
            question: question.clone(),
            concept_name: concept.name.clone(),
            concept_explanation: concept.explanation.clone(),
            module_id: concept.module_id,
            module_name: self.module_name(concept.module_id),
        })
    }

    fn puzzle_listing(&self, puzzle: &Puzzle) -> Option<PuzzleListing> {
        let concept = self.concepts.get(&puzzle.concept_id)?;
        Some(PuzzleListing {
            puzzle: puzzle.clone(),
            concept_name: concept.name.clone(),
            module_name: self.module_name(concept.module_id),
        })
    }
}

#[derive(Clone, Default)]
pub struct InMemoryRepository {
    inner: Arc<Mutex<Inner>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, StorageError> {
        self.inner
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }
}

fn pick<T: Clone>(items: &[T]) -> Option<T> {
    items.choose(&mut rand::rng()).cloned()
}

#[async_trait]
impl StudentRepository for InMemoryRepository {
    async fn insert_student(&self, student: NewStudent) -> Result<Student, StorageError> {
        let mut guard = self.lock()?;
        if guard
            .students
            .values()
            .any(|s| s.student.username == student.username)
        {
            return Err(StorageError::Conflict("username taken"));
        }
        let id = StudentId::new(guard.next_id());
        let created = Student {
            id,
            username: student.username,
            name: student.name,
            total_points: student.total_points,
            created_at: student.created_at,
        };
        guard.students.insert(
            id,
            StudentCredentials {
                student: created.clone(),
                password_hash: student.password_hash,
            },
        );
        Ok(created)
    }

    async fn get_student(&self, id: StudentId) -> Result<Option<Student>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.students.get(&id).map(|c| c.student.clone()))
    }

    async fn find_student_by_username(
        &self,
        username: &str,
    ) -> Result<Option<StudentCredentials>, StorageError> {
        let guard = self.lock()?;
        Ok(guard
            .students
            .values()
            .find(|c| c.student.username == username)
            .cloned())
    }

    async fn list_student_stats(&self) -> Result<Vec<StudentStats>, StorageError> {
        let guard = self.lock()?;
        let mut out: Vec<StudentStats> = guard
            .students
            .values()
            .map(|c| {
                let sessions: Vec<&QuizSession> = guard
                    .sessions
                    .values()
                    .filter(|s| s.student_id() == c.student.id)
                    .collect();
                StudentStats {
                    student: c.student.clone(),
                    total_quizzes: u32::try_from(sessions.len()).unwrap_or(u32::MAX),
                    total_correct: sessions
                        .iter()
                        .map(|s| i64::from(s.correct_answers()))
                        .sum(),
                    total_answered: sessions
                        .iter()
                        .map(|s| i64::from(s.total_questions()))
                        .sum(),
                }
            })
            .collect();
        out.sort_by(|a, b| a.student.name.cmp(&b.student.name));
        Ok(out)
    }
}

#[async_trait]
impl TeacherRepository for InMemoryRepository {
    async fn insert_teacher(&self, teacher: NewTeacher) -> Result<Teacher, StorageError> {
        let mut guard = self.lock()?;
        if guard
            .teachers
            .values()
            .any(|t| t.teacher.username == teacher.username)
        {
            return Err(StorageError::Conflict("username taken"));
        }
        let id = TeacherId::new(guard.next_id());
        let created = Teacher {
            id,
            username: teacher.username,
            created_at: teacher.created_at,
        };
        guard.teachers.insert(
            id,
            TeacherCredentials {
                teacher: created.clone(),
                password_hash: teacher.password_hash,
            },
        );
        Ok(created)
    }

    async fn find_teacher_by_username(
        &self,
        username: &str,
    ) -> Result<Option<TeacherCredentials>, StorageError> {
        let guard = self.lock()?;
        Ok(guard
            .teachers
            .values()
            .find(|c| c.teacher.username == username)
            .cloned())
    }
}

#[async_trait]
impl CatalogRepository for InMemoryRepository {
    async fn insert_module(&self, module: NewModule) -> Result<Module, StorageError> {
        let mut guard = self.lock()?;
        if guard.modules.values().any(|m| m.name == module.name) {
            return Err(StorageError::Conflict("module name taken"));
        }
        let created = Module {
            id: ModuleId::new(guard.next_id()),
            name: module.name,
            display_name: module.display_name,
            description: module.description,
            icon: module.icon,
        };
        guard.modules.insert(created.id, created.clone());
        Ok(created)
    }

    async fn list_modules(&self) -> Result<Vec<Module>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.modules.values().cloned().collect())
    }

    async fn get_module(&self, id: ModuleId) -> Result<Option<Module>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.modules.get(&id).cloned())
    }

    async fn insert_concept(&self, concept: NewConcept) -> Result<Concept, StorageError> {
        let mut guard = self.lock()?;
        if !guard.modules.contains_key(&concept.module_id) {
            return Err(StorageError::NotFound);
        }
        let created = Concept {
            id: ConceptId::new(guard.next_id()),
            module_id: concept.module_id,
            name: concept.name,
            explanation: concept.explanation,
        };
        guard.concepts.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_concept(&self, id: ConceptId) -> Result<Option<Concept>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.concepts.get(&id).cloned())
    }

    async fn list_concepts(&self) -> Result<Vec<ConceptListing>, StorageError> {
        let guard = self.lock()?;
        let mut out: Vec<ConceptListing> = guard
            .concepts
            .values()
            .map(|c| ConceptListing {
                concept: c.clone(),
                module_name: guard.module_name(c.module_id),
            })
            .collect();
        out.sort_by_key(|l| (l.concept.module_id, l.concept.id));
        Ok(out)
    }
}

#[async_trait]
impl QuestionRepository for InMemoryRepository {
    async fn insert_question(&self, question: ValidQuestion) -> Result<Question, StorageError> {
        let mut guard = self.lock()?;
        if !guard.concepts.contains_key(&question.concept_id) {
            return Err(StorageError::NotFound);
        }
        let created = question.assign_id(QuestionId::new(guard.next_id()));
        guard.questions.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_question(&self, question: &Question) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        if !guard.concepts.contains_key(&question.concept_id) {
            return Err(StorageError::NotFound);
        }
        match guard.questions.get_mut(&question.id) {
            Some(slot) => {
                *slot = question.clone();
                Ok(())
            }
            None => Err(StorageError::NotFound),
        }
    }

    async fn get_question(&self, id: QuestionId) -> Result<Option<QuestionListing>, StorageError> {
        let guard = self.lock()?;
        Ok(guard
            .questions
            .get(&id)
            .and_then(|q| guard.question_listing(q)))
    }

    async fn list_questions(&self) -> Result<Vec<QuestionListing>, StorageError> {
        let guard = self.lock()?;
        let mut out: Vec<QuestionListing> = guard
            .questions
            .values()
            .filter_map(|q| guard.question_listing(q))
            .collect();
        out.sort_by_key(|l| {
            (
                l.module_id,
                l.question.concept_id,
                l.question.difficulty,
                l.question.id,
            )
        });
        Ok(out)
    }

    async fn delete_question(&self, id: QuestionId) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        if !guard.questions.contains_key(&id) {
            return Err(StorageError::NotFound);
        }
        if guard.answers.values().any(|a| a.question_id == id) {
            return Err(StorageError::Conflict("question has answers"));
        }
        guard.questions.remove(&id);
        Ok(())
    }

    async fn random_unanswered_question(
        &self,
        module_id: ModuleId,
        session_id: SessionId,
        difficulty: Option<Difficulty>,
    ) -> Result<Option<QuestionListing>, StorageError> {
        let guard = self.lock()?;
        let candidates: Vec<QuestionListing> = guard
            .questions
            .values()
            .filter(|q| difficulty.is_none_or(|d| q.difficulty == d))
            .filter(|q| {
                !guard
                    .answers
                    .values()
                    .any(|a| a.session_id == session_id && a.question_id == q.id)
            })
            .filter_map(|q| guard.question_listing(q))
            .filter(|l| l.module_id == module_id)
            .collect();
        Ok(pick(&candidates))
    }
}

#[async_trait]
impl PuzzleRepository for InMemoryRepository {
    async fn insert_puzzle(&self, puzzle: PuzzleDraft) -> Result<Puzzle, StorageError> {
        let mut guard = self.lock()?;
        if !guard.concepts.contains_key(&puzzle.concept_id) {
            return Err(StorageError::NotFound);
        }
        let created = puzzle.assign_id(PuzzleId::new(guard.next_id()));
        guard.puzzles.insert(created.id, created.clone());
        Ok(created)
    }

    async fn delete_puzzle(&self, id: PuzzleId) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        guard
            .puzzles
            .remove(&id)
            .map(|_| ())
            .ok_or(StorageError::NotFound)
    }

    async fn list_puzzles(&self) -> Result<Vec<PuzzleListing>, StorageError> {
        let guard = self.lock()?;
        let mut out: Vec<(ModuleId, PuzzleListing)> = guard
            .puzzles
            .values()
            .filter_map(|p| {
                let module_id = guard.concepts.get(&p.concept_id)?.module_id;
                Some((module_id, guard.puzzle_listing(p)?))
            })
            .collect();
        out.sort_by_key(|(module_id, l)| (*module_id, l.puzzle.concept_id, l.puzzle.id));
        Ok(out.into_iter().map(|(_, l)| l).collect())
    }

    async fn random_puzzle_for_concept(
        &self,
        concept_id: ConceptId,
    ) -> Result<Option<PuzzleListing>, StorageError> {
        let guard = self.lock()?;
        let candidates: Vec<PuzzleListing> = guard
            .puzzles
            .values()
            .filter(|p| p.concept_id == concept_id)
            .filter_map(|p| guard.puzzle_listing(p))
            .collect();
        Ok(pick(&candidates))
    }

    async fn random_puzzle_for_module(
        &self,
        module_id: ModuleId,
    ) -> Result<Option<PuzzleListing>, StorageError> {
        let guard = self.lock()?;
        let candidates: Vec<PuzzleListing> = guard
            .puzzles
            .values()
            .filter(|p| {
                guard
                    .concepts
                    .get(&p.concept_id)
                    .is_some_and(|c| c.module_id == module_id)
            })
            .filter_map(|p| guard.puzzle_listing(p))
            .collect();
        Ok(pick(&candidates))
    }
}

#[async_trait]
impl QuizRepository for InMemoryRepository {
    async fn get_or_create_progress(
        &self,
        student_id: StudentId,
        module_id: ModuleId,
    ) -> Result<AdaptiveState, StorageError> {
        let mut guard = self.lock()?;
        Ok(*guard.progress.entry((student_id, module_id)).or_default())
    }

    async fn get_progress(
        &self,
        student_id: StudentId,
        module_id: ModuleId,
    ) -> Result<Option<AdaptiveState>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.progress.get(&(student_id, module_id)).copied())
    }

    async fn list_module_progress(
        &self,
        student_id: StudentId,
    ) -> Result<Vec<ModuleProgress>, StorageError> {
        let guard = self.lock()?;
        Ok(guard
            .modules
            .values()
            .map(|m| {
                let stored = guard.progress.get(&(student_id, m.id)).copied();
                let sessions: Vec<&QuizSession> = guard
                    .sessions
                    .values()
                    .filter(|s| s.student_id() == student_id && s.module_id() == m.id)
                    .collect();
                ModuleProgress {
                    module_id: m.id,
                    module_name: m.display_name.clone(),
                    state: stored.unwrap_or_default(),
                    started: stored.is_some(),
                    quizzes_taken: u32::try_from(sessions.len()).unwrap_or(u32::MAX),
                    points_earned: sessions.iter().map(|s| i64::from(s.points_earned())).sum(),
                }
            })
            .collect())
    }

    async fn insert_session(
        &self,
        student_id: StudentId,
        module_id: ModuleId,
        started_at: DateTime<Utc>,
    ) -> Result<QuizSession, StorageError> {
        let mut guard = self.lock()?;
        if !guard.students.contains_key(&student_id) || !guard.modules.contains_key(&module_id) {
            return Err(StorageError::NotFound);
        }
        let session = QuizSession::start(
            SessionId::new(guard.next_id()),
            student_id,
            module_id,
            started_at,
        );
        guard.sessions.insert(session.id(), session.clone());
        Ok(session)
    }

    async fn get_session(&self, id: SessionId) -> Result<Option<QuizSession>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.sessions.get(&id).cloned())
    }

    async fn end_session(
        &self,
        id: SessionId,
        ended_at: DateTime<Utc>,
    ) -> Result<QuizSession, StorageError> {
        let mut guard = self.lock()?;
        let session = guard.sessions.get_mut(&id).ok_or(StorageError::NotFound)?;
        if session.is_ended() {
            return Err(StorageError::Conflict("session already ended"));
        }
        session.end(ended_at);
        Ok(session.clone())
    }

    async fn answered_question_ids(
        &self,
        session_id: SessionId,
    ) -> Result<Vec<QuestionId>, StorageError> {
        let guard = self.lock()?;
        Ok(guard
            .answers
            .values()
            .filter(|a| a.session_id == session_id)
            .map(|a| a.question_id)
            .collect())
    }

    async fn record_answer(&self, answer: NewAnswer) -> Result<RecordedAnswer, StorageError> {
        let mut guard = self.lock()?;
        let inner = &mut *guard;

        let session = inner
            .sessions
            .get_mut(&answer.session_id)
            .ok_or(StorageError::NotFound)?;
        if session.is_ended() {
            return Err(StorageError::Conflict("session already ended"));
        }
        if inner
            .answers
            .values()
            .any(|a| a.session_id == answer.session_id && a.question_id == answer.question_id)
        {
            return Err(StorageError::Conflict("question already answered"));
        }

        session.record(answer.is_correct, answer.points_earned);
        let session = session.clone();

        if let Some(student) = inner.students.get_mut(&session.student_id()) {
            student.student.total_points += i64::from(answer.points_earned);
        }

        let progress = inner
            .progress
            .entry((session.student_id(), session.module_id()))
            .or_default();
        let previous = *progress;
        let current = previous.record(answer.is_correct);
        *progress = current;

        inner.next_id += 1;
        let stored = Answer {
            id: AnswerId::new(inner.next_id),
            session_id: answer.session_id,
            question_id: answer.question_id,
            student_answer: answer.student_answer,
            is_correct: answer.is_correct,
            points_earned: answer.points_earned,
            acknowledged: false,
            acknowledgment_text: None,
            answered_at: answer.answered_at,
        };
        inner.answers.insert(stored.id, stored.clone());

        Ok(RecordedAnswer {
            answer: stored,
            session,
            previous,
            current,
        })
    }

    async fn acknowledge_answer(
        &self,
        session_id: SessionId,
        answer_id: AnswerId,
        text: Option<String>,
    ) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        match guard.answers.get_mut(&answer_id) {
            Some(answer) if answer.session_id == session_id => {
                answer.acknowledged = true;
                answer.acknowledgment_text = text;
                Ok(())
            }
            _ => Err(StorageError::NotFound),
        }
    }

    async fn list_session_answers(
        &self,
        session_id: SessionId,
    ) -> Result<Vec<AnswerDetail>, StorageError> {
        let guard = self.lock()?;
        let mut out: Vec<AnswerDetail> = guard
            .answers
            .values()
            .filter(|a| a.session_id == session_id)
            .filter_map(|a| {
                let question = guard.questions.get(&a.question_id)?;
                let concept = guard.concepts.get(&question.concept_id)?;
                Some(AnswerDetail {
                    answer: a.clone(),
                    question_text: question.text.clone(),
                    correct_answer: question.correct_answer,
                    concept_name: concept.name.clone(),
                })
            })
            .collect();
        out.sort_by_key(|d| (d.answer.answered_at, d.answer.id));
        Ok(out)
    }

    async fn recent_sessions(
        &self,
        student_id: StudentId,
        limit: u32,
    ) -> Result<Vec<SessionListing>, StorageError> {
        let guard = self.lock()?;
        let mut sessions: Vec<&QuizSession> = guard
            .sessions
            .values()
            .filter(|s| s.student_id() == student_id)
            .collect();
        sessions.sort_by(|a, b| {
            b.started_at()
                .cmp(&a.started_at())
                .then_with(|| b.id().cmp(&a.id()))
        });
        Ok(sessions
            .into_iter()
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .map(|s| SessionListing {
                session: s.clone(),
                module_name: guard.module_name(s.module_id()),
            })
            .collect())
    }
}
