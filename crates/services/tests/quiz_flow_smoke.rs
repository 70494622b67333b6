use std::sync::Arc;

use mathwrks_core::adaptive::Difficulty;
use mathwrks_core::model::{AnswerOptions, NewConcept, NewModule, QuestionDraft};
use mathwrks_core::time::fixed_now;
use services::views::NextQuestion;
use services::{Clock, QuizService};
use storage::repository::{
    CatalogRepository, InMemoryRepository, NewStudent, QuestionRepository, QuizRepository,
    StudentRepository,
};

#[tokio::test]
async fn three_right_answers_promote_and_a_miss_starts_a_wrong_streak() {
    let repo = InMemoryRepository::new();
    let now = fixed_now();

    let student = repo
        .insert_student(NewStudent {
            username: "jordan".into(),
            password_hash: "x".into(),
            name: "Jordan".into(),
            total_points: 200,
            created_at: now,
        })
        .await
        .unwrap();
    let module = repo
        .insert_module(NewModule {
            name: "number_theory".into(),
            display_name: "Number Theory".into(),
            description: None,
            icon: None,
        })
        .await
        .unwrap();
    let concept = repo
        .insert_concept(NewConcept {
            module_id: module.id,
            name: "Primes".into(),
            explanation: "A prime has exactly two divisors.".into(),
        })
        .await
        .unwrap();

    for level in [1, 1, 1, 2, 2] {
        let draft = QuestionDraft {
            concept_id: concept.id,
            difficulty: level,
            text: format!("Prime question at level {level}"),
            options: AnswerOptions {
                a: "2".into(),
                b: "4".into(),
                c: "6".into(),
                d: "8".into(),
            },
            correct_answer: "A".into(),
            explanation: None,
        };
        repo.insert_question(draft.validate().unwrap()).await.unwrap();
    }

    let repo = Arc::new(repo);
    let quiz = QuizService::new(
        Clock::fixed(now),
        repo.clone(),
        repo.clone(),
        repo.clone(),
        repo.clone(),
    );

    let started = quiz.start_session(student.id, module.id).await.unwrap();
    let script = ["A", "a", "A", "B"];
    let mut last = None;
    for (i, letter) in script.into_iter().enumerate() {
        let NextQuestion::Question(view) = quiz.next_question(started.session_id).await.unwrap()
        else {
            panic!("ran out of questions at step {i}");
        };
        let expected = if i < 3 {
            Difficulty::Easy
        } else {
            Difficulty::Medium
        };
        assert_eq!(view.difficulty, expected, "step {i}");
        last = Some(
            quiz.submit_answer(started.session_id, view.question_id, letter)
                .await
                .unwrap(),
        );
        if i == 2 {
            let promoted = last.as_ref().unwrap();
            assert!(promoted.difficulty_changed);
            assert_eq!(promoted.new_difficulty, Difficulty::Medium);
        }
    }

    let last = last.unwrap();
    assert!(!last.is_correct);
    assert!(!last.difficulty_changed);

    let progress = repo
        .get_progress(student.id, module.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(progress.difficulty, Difficulty::Medium);
    assert_eq!(progress.correct_streak, 0);
    assert_eq!(progress.wrong_streak, 1);

    let summary = quiz.end_session(started.session_id).await.unwrap();
    assert_eq!(summary.session.session.total_questions(), 4);
    assert_eq!(summary.session.session.points_earned(), 30);
    assert_eq!(summary.accuracy, 75);
    assert_eq!(summary.answers.len(), 4);
    assert_eq!(summary.session.student_total_points, 230);

    let json = serde_json::to_value(&summary).unwrap();
    assert_eq!(json["accuracy"], 75);
    assert_eq!(json["module_name"], "Number Theory");
    assert_eq!(json["answers"][0]["student_answer"], "A");
}
