use mathwrks_core::AdaptiveState;
use mathwrks_core::adaptive::Difficulty;
use mathwrks_core::model::{
    AnswerChoice, AnswerOptions, ConceptId, ModuleId, NewConcept, NewModule, PuzzleDraft,
    QuestionDraft, QuestionId, StudentId,
};
use mathwrks_core::time::fixed_now;
use storage::repository::{
    CatalogRepository, NewAnswer, NewStudent, PuzzleRepository, QuestionRepository,
    QuizRepository, StorageError, StudentRepository,
};
use storage::sqlite::SqliteRepository;

async fn connect(name: &str) -> SqliteRepository {
    let repo = SqliteRepository::connect(&format!("sqlite:file:{name}?mode=memory&cache=shared"))
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

/// WAL and busy_timeout only matter across real connections, so the
/// concurrency tests need a file database.
async fn connect_file(dir: &tempfile::TempDir) -> SqliteRepository {
    let path = dir.path().join("mathwrks.sqlite3");
    let repo = SqliteRepository::connect(&format!("sqlite://{}?mode=rwc", path.display()))
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

async fn seed_basics(repo: &SqliteRepository) -> (StudentId, ModuleId, ConceptId) {
    let student = repo
        .insert_student(NewStudent {
            username: "alex".into(),
            password_hash: "hash".into(),
            name: "Alex".into(),
            total_points: 150,
            created_at: fixed_now(),
        })
        .await
        .unwrap();
    let module = repo
        .insert_module(NewModule {
            name: "algebra".into(),
            display_name: "Algebra".into(),
            description: Some("Letters and numbers".into()),
            icon: None,
        })
        .await
        .unwrap();
    let concept = repo
        .insert_concept(NewConcept {
            module_id: module.id,
            name: "Linear Equations".into(),
            explanation: "Solve for **x**.".into(),
        })
        .await
        .unwrap();
    (student.id, module.id, concept.id)
}

async fn add_question(repo: &SqliteRepository, concept: ConceptId, level: i64) -> QuestionId {
    let draft = QuestionDraft {
        concept_id: concept,
        difficulty: level,
        text: format!("Question at level {level}"),
        options: AnswerOptions {
            a: "1".into(),
            b: "2".into(),
            c: "3".into(),
            d: "4".into(),
        },
        correct_answer: "C".into(),
        explanation: Some("Because.".into()),
    };
    repo.insert_question(draft.validate().unwrap())
        .await
        .unwrap()
        .id
}

#[tokio::test]
async fn migrations_are_idempotent() {
    let repo = connect("memdb_migrate_twice").await;
    repo.migrate().await.expect("second migrate");
    assert!(repo.list_modules().await.unwrap().is_empty());
}

#[tokio::test]
async fn duplicate_usernames_conflict() {
    let repo = connect("memdb_dup_username").await;
    seed_basics(&repo).await;
    let err = repo
        .insert_student(NewStudent {
            username: "alex".into(),
            password_hash: "other".into(),
            name: "Other Alex".into(),
            total_points: 0,
            created_at: fixed_now(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Conflict(_)));
}

#[tokio::test]
async fn record_answer_updates_every_aggregate() {
    let repo = connect("memdb_record_answer").await;
    let (student, module, concept) = seed_basics(&repo).await;
    let q1 = add_question(&repo, concept, 1).await;
    let q2 = add_question(&repo, concept, 1).await;

    let session = repo.insert_session(student, module, fixed_now()).await.unwrap();
    let initial = repo.get_or_create_progress(student, module).await.unwrap();
    assert_eq!(initial, AdaptiveState::default());

    let first = repo
        .record_answer(NewAnswer {
            session_id: session.id(),
            question_id: q1,
            student_answer: AnswerChoice::C,
            is_correct: true,
            points_earned: 10,
            answered_at: fixed_now(),
        })
        .await
        .unwrap();
    assert_eq!(first.current, AdaptiveState::new(Difficulty::Easy, 1, 0));

    let second = repo
        .record_answer(NewAnswer {
            session_id: session.id(),
            question_id: q2,
            student_answer: AnswerChoice::A,
            is_correct: false,
            points_earned: 0,
            answered_at: fixed_now(),
        })
        .await
        .unwrap();
    assert_eq!(second.previous, first.current);
    assert_eq!(second.current, AdaptiveState::new(Difficulty::Easy, 0, 1));
    assert_eq!(second.session.total_questions(), 2);
    assert_eq!(second.session.correct_answers(), 1);
    assert_eq!(second.session.points_earned(), 10);

    let stored = repo.get_progress(student, module).await.unwrap();
    assert_eq!(stored, Some(second.current));

    let student = repo.get_student(student).await.unwrap().unwrap();
    assert_eq!(student.total_points, 160);

    let answers = repo.list_session_answers(session.id()).await.unwrap();
    assert_eq!(answers.len(), 2);
    assert_eq!(answers[0].correct_answer, AnswerChoice::C);
    assert_eq!(answers[0].concept_name, "Linear Equations");
}

#[tokio::test]
async fn answers_are_rejected_twice_and_after_end() {
    let repo = connect("memdb_reject_answers").await;
    let (student, module, concept) = seed_basics(&repo).await;
    let q1 = add_question(&repo, concept, 1).await;
    let q2 = add_question(&repo, concept, 2).await;
    let session = repo.insert_session(student, module, fixed_now()).await.unwrap();

    let answer = NewAnswer {
        session_id: session.id(),
        question_id: q1,
        student_answer: AnswerChoice::C,
        is_correct: true,
        points_earned: 10,
        answered_at: fixed_now(),
    };
    repo.record_answer(answer.clone()).await.unwrap();
    let dup = repo.record_answer(answer).await.unwrap_err();
    assert!(matches!(dup, StorageError::Conflict(_)));

    let ended = repo.end_session(session.id(), fixed_now()).await.unwrap();
    assert!(ended.is_ended());
    let again = repo.end_session(session.id(), fixed_now()).await.unwrap_err();
    assert!(matches!(again, StorageError::Conflict(_)));

    let late = repo
        .record_answer(NewAnswer {
            session_id: session.id(),
            question_id: q2,
            student_answer: AnswerChoice::A,
            is_correct: false,
            points_earned: 0,
            answered_at: fixed_now(),
        })
        .await
        .unwrap_err();
    assert!(matches!(late, StorageError::Conflict(_)));

    // Rolled back: the totals only count the first answer.
    let session = repo.get_session(session.id()).await.unwrap().unwrap();
    assert_eq!(session.total_questions(), 1);
}

#[tokio::test]
async fn random_question_prefers_requested_difficulty() {
    let repo = connect("memdb_random_question").await;
    let (student, module, concept) = seed_basics(&repo).await;
    let easy = add_question(&repo, concept, 1).await;
    let medium = add_question(&repo, concept, 2).await;
    let session = repo.insert_session(student, module, fixed_now()).await.unwrap();

    let picked = repo
        .random_unanswered_question(module, session.id(), Some(Difficulty::Medium))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(picked.question.id, medium);
    assert_eq!(picked.module_name, "Algebra");

    let hard = repo
        .random_unanswered_question(module, session.id(), Some(Difficulty::Hard))
        .await
        .unwrap();
    assert!(hard.is_none());

    repo.record_answer(NewAnswer {
        session_id: session.id(),
        question_id: medium,
        student_answer: AnswerChoice::C,
        is_correct: true,
        points_earned: 15,
        answered_at: fixed_now(),
    })
    .await
    .unwrap();

    let any = repo
        .random_unanswered_question(module, session.id(), None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(any.question.id, easy);
}

#[tokio::test]
async fn answered_questions_cannot_be_deleted() {
    let repo = connect("memdb_delete_question").await;
    let (student, module, concept) = seed_basics(&repo).await;
    let used = add_question(&repo, concept, 1).await;
    let unused = add_question(&repo, concept, 1).await;
    let session = repo.insert_session(student, module, fixed_now()).await.unwrap();
    repo.record_answer(NewAnswer {
        session_id: session.id(),
        question_id: used,
        student_answer: AnswerChoice::B,
        is_correct: false,
        points_earned: 0,
        answered_at: fixed_now(),
    })
    .await
    .unwrap();

    assert!(matches!(
        repo.delete_question(used).await,
        Err(StorageError::Conflict(_))
    ));
    repo.delete_question(unused).await.unwrap();
    assert!(repo.get_question(unused).await.unwrap().is_none());
    assert!(matches!(
        repo.delete_question(unused).await,
        Err(StorageError::NotFound)
    ));
}

#[tokio::test]
async fn puzzles_are_listed_and_picked_per_scope() {
    let repo = connect("memdb_puzzles").await;
    let (_, module, concept) = seed_basics(&repo).await;
    let draft = PuzzleDraft {
        concept_id: concept,
        title: "Mystery Number".into(),
        text: "I am thinking of a number...".into(),
        hint: Some("Work backwards".into()),
        solution: None,
    };
    let puzzle = repo.insert_puzzle(draft.validate().unwrap()).await.unwrap();

    let listed = repo.list_puzzles().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].concept_name, "Linear Equations");

    let by_concept = repo.random_puzzle_for_concept(concept).await.unwrap().unwrap();
    assert_eq!(by_concept.puzzle.id, puzzle.id);
    let by_module = repo.random_puzzle_for_module(module).await.unwrap().unwrap();
    assert_eq!(by_module.puzzle.title, "Mystery Number");
    assert!(
        repo.random_puzzle_for_module(ModuleId::new(999))
            .await
            .unwrap()
            .is_none()
    );

    repo.delete_puzzle(puzzle.id).await.unwrap();
    assert!(repo.list_puzzles().await.unwrap().is_empty());
}

#[tokio::test]
async fn module_progress_and_recent_sessions() {
    let repo = connect("memdb_progress").await;
    let (student, module, concept) = seed_basics(&repo).await;
    let q = add_question(&repo, concept, 1).await;

    let before = repo.list_module_progress(student).await.unwrap();
    assert_eq!(before.len(), 1);
    assert!(!before[0].started);

    let session = repo.insert_session(student, module, fixed_now()).await.unwrap();
    repo.record_answer(NewAnswer {
        session_id: session.id(),
        question_id: q,
        student_answer: AnswerChoice::C,
        is_correct: true,
        points_earned: 10,
        answered_at: fixed_now(),
    })
    .await
    .unwrap();

    let after = repo.list_module_progress(student).await.unwrap();
    assert!(after[0].started);
    assert_eq!(after[0].quizzes_taken, 1);
    assert_eq!(after[0].points_earned, 10);
    assert_eq!(after[0].state.correct_streak, 1);

    let recent = repo.recent_sessions(student, 10).await.unwrap();
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].module_name, "Algebra");

    let stats = repo.list_student_stats().await.unwrap();
    assert_eq!(stats[0].total_quizzes, 1);
    assert_eq!(stats[0].total_correct, 1);
    assert_eq!(stats[0].total_answered, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_answers_apply_serially() {
    let dir = tempfile::tempdir().unwrap();
    let repo = connect_file(&dir).await;
    let (student, module, concept) = seed_basics(&repo).await;
    let mut questions = Vec::new();
    for _ in 0..6 {
        questions.push(add_question(&repo, concept, 1).await);
    }
    let session = repo.insert_session(student, module, fixed_now()).await.unwrap();
    let session_id = session.id();

    let tasks: Vec<_> = questions
        .into_iter()
        .map(|question_id| {
            let repo = repo.clone();
            tokio::spawn(async move {
                repo.record_answer(NewAnswer {
                    session_id,
                    question_id,
                    student_answer: AnswerChoice::C,
                    is_correct: true,
                    points_earned: 10,
                    answered_at: fixed_now(),
                })
                .await
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    // Six correct answers from Easy: promoted twice, streak consumed each time.
    let progress = repo.get_progress(student, module).await.unwrap();
    assert_eq!(progress, Some(AdaptiveState::new(Difficulty::Hard, 0, 0)));

    let session = repo.get_session(session.id()).await.unwrap().unwrap();
    assert_eq!(session.total_questions(), 6);
    assert_eq!(session.correct_answers(), 6);
    assert_eq!(session.points_earned(), 60);
    let student = repo.get_student(student).await.unwrap().unwrap();
    assert_eq!(student.total_points, 210);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_duplicate_answers_count_once() {
    let dir = tempfile::tempdir().unwrap();
    let repo = connect_file(&dir).await;
    let (student, module, concept) = seed_basics(&repo).await;
    let question_id = add_question(&repo, concept, 1).await;
    let session = repo.insert_session(student, module, fixed_now()).await.unwrap();
    let session_id = session.id();

    let tasks: Vec<_> = (0..4)
        .map(|_| {
            let repo = repo.clone();
            tokio::spawn(async move {
                repo.record_answer(NewAnswer {
                    session_id,
                    question_id,
                    student_answer: AnswerChoice::C,
                    is_correct: true,
                    points_earned: 10,
                    answered_at: fixed_now(),
                })
                .await
            })
        })
        .collect();
    let mut accepted = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => accepted += 1,
            Err(err) => assert!(matches!(err, StorageError::Conflict(_)), "{err:?}"),
        }
    }
    assert_eq!(accepted, 1);

    let progress = repo.get_progress(student, module).await.unwrap();
    assert_eq!(progress, Some(AdaptiveState::new(Difficulty::Easy, 1, 0)));
    let session = repo.get_session(session.id()).await.unwrap().unwrap();
    assert_eq!(session.total_questions(), 1);
}

#[tokio::test]
async fn progress_rejects_out_of_range_difficulty() {
    let repo = connect("memdb_progress_check").await;
    let (student, module, _) = seed_basics(&repo).await;
    repo.get_or_create_progress(student, module).await.unwrap();

    let res = sqlx::query(
        r"
        UPDATE student_progress SET current_difficulty = 4
        WHERE student_id = ?1 AND module_id = ?2
        ",
    )
    .bind(student.value())
    .bind(module.value())
    .execute(repo.pool())
    .await;
    assert!(res.is_err());

    let stored = repo.get_progress(student, module).await.unwrap();
    assert_eq!(stored, Some(AdaptiveState::default()));
}
