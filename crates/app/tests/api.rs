use app::{router, seed};
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use mathwrks_core::time::fixed_clock;
use serde_json::{Value, json};
use services::{AppServices, AuthSettings, PasswordHasher};
use storage::repository::Storage;
use tower::ServiceExt;

async fn seeded_app() -> Router {
    let storage = Storage::in_memory();
    seed::load(
        &storage,
        seed::bundled_catalog().unwrap(),
        &PasswordHasher::new(4),
        fixed_clock(),
    )
    .await
    .unwrap();
    let auth = AuthSettings::new("student-secret", "teacher-secret").with_bcrypt_cost(4);
    router(AppServices::new(&storage, fixed_clock(), &auth))
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, Method::GET, uri, None, None).await
}

async fn post(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(app, Method::POST, uri, None, Some(body)).await
}

async fn register(app: &Router, username: &str) -> Value {
    let (status, body) = post(
        app,
        "/api/students/register",
        json!({ "username": username, "password": "secret1", "name": "Sam" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body
}

async fn algebra_id(app: &Router) -> i64 {
    let (status, modules) = get(app, "/api/quiz/modules").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(modules.as_array().unwrap().len(), 3);
    assert_eq!(modules[0]["name"], "algebra");
    modules[0]["id"].as_i64().unwrap()
}

async fn teacher_token(app: &Router) -> String {
    let (status, body) = post(
        app,
        "/api/auth/login",
        json!({ "username": "teacher", "password": "teacherpass" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["teacher"]["username"], "teacher");
    body["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_reports_ok() {
    let app = seeded_app().await;
    let (status, body) = get(&app, "/api/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn student_accounts_round_trip() {
    let app = seeded_app().await;
    let registered = register(&app, "MathFan").await;
    assert_eq!(registered["student"]["username"], "mathfan");
    assert_eq!(registered["student"]["total_points"], 0);

    let (status, body) = post(
        &app,
        "/api/students/login",
        json!({ "username": "MATHFAN", "password": "secret1" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap();

    let (status, me) = send(&app, Method::GET, "/api/students/me", Some(token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["username"], "mathfan");

    let id = me["id"].as_i64().unwrap();
    let (status, progress) = get(&app, &format!("/api/students/{id}/progress")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(progress["moduleProgress"].as_array().unwrap().len(), 3);
    assert_eq!(progress["moduleProgress"][0]["current_difficulty"], 1);
    assert!(progress["quizHistory"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn account_errors_use_json_bodies() {
    let app = seeded_app().await;
    register(&app, "sam").await;

    let (status, body) = post(
        &app,
        "/api/students/register",
        json!({ "username": "SAM", "password": "secret1", "name": "Other" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Username already taken");

    let (status, body) = post(&app, "/api/students/register", json!({ "username": "sam" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Username, password, and name are required");

    let (status, body) = post(
        &app,
        "/api/students/login",
        json!({ "username": "sam", "password": "wrong-password" }),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid username or password");

    let (status, body) = get(&app, "/api/students/me").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "No authorization header");

    let (status, body) = get(&app, "/api/students/9999").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Student not found");
}

#[tokio::test]
async fn quiz_session_lifecycle() {
    let app = seeded_app().await;
    let module_id = algebra_id(&app).await;
    let student_id = register(&app, "sam").await["student"]["id"].as_i64().unwrap();

    let (status, started) = post(
        &app,
        "/api/quiz/start",
        json!({ "studentId": student_id, "moduleId": module_id }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(started["moduleName"], "Algebra");
    assert_eq!(started["currentDifficulty"], 1);
    assert_eq!(started["difficultyLabel"], "Easy");
    let session = started["sessionId"].as_i64().unwrap();

    let (status, question) = get(&app, &format!("/api/quiz/{session}/next")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(question["questionNumber"], 1);
    assert_eq!(question["potentialPoints"], 10);
    assert_eq!(question["difficulty"], 1);
    let question_id = question["questionId"].as_i64().unwrap();

    let answer_uri = format!("/api/quiz/{session}/answer");
    let (status, body) = post(&app, &answer_uri, json!({ "questionId": question_id, "answer": "E" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Answer must be A, B, C, or D");

    let (status, feedback) =
        post(&app, &answer_uri, json!({ "questionId": question_id, "answer": "a" })).await;
    assert_eq!(status, StatusCode::OK);
    let correct = feedback["isCorrect"].as_bool().unwrap();
    assert_eq!(feedback["pointsEarned"], if correct { 10 } else { 0 });
    assert_eq!(feedback["difficultyChanged"], false);
    let answer_id = feedback["answerId"].as_i64().unwrap();

    let (status, body) =
        post(&app, &answer_uri, json!({ "questionId": question_id, "answer": "B" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Question already answered");

    let ack_uri = format!("/api/quiz/{session}/acknowledge");
    let (status, body) = post(&app, &ack_uri, json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "answerId is required");
    let (status, body) = post(
        &app,
        &ack_uri,
        json!({ "answerId": answer_id, "acknowledgmentText": "got it" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (status, snapshot) = get(&app, &format!("/api/quiz/{session}/status")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(snapshot["total_questions"], 1);
    assert_eq!(snapshot["difficultyLabel"], "Easy");

    let end_uri = format!("/api/quiz/{session}/end");
    let (status, summary) = post(&app, &end_uri, json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["answers"].as_array().unwrap().len(), 1);
    assert_eq!(summary["accuracy"], if correct { 100 } else { 0 });

    let (status, body) = post(&app, &end_uri, json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Session already ended");

    let (status, body) = get(&app, &format!("/api/quiz/{session}/next")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Session has ended");
}

#[tokio::test]
async fn a_module_runs_out_of_questions() {
    let app = seeded_app().await;
    let module_id = algebra_id(&app).await;
    let student_id = register(&app, "sam").await["student"]["id"].as_i64().unwrap();
    let (_, started) = post(
        &app,
        "/api/quiz/start",
        json!({ "studentId": student_id, "moduleId": module_id }),
    )
    .await;
    let session = started["sessionId"].as_i64().unwrap();

    let mut answered = 0;
    loop {
        let (status, next) = get(&app, &format!("/api/quiz/{session}/next")).await;
        assert_eq!(status, StatusCode::OK);
        if next["completed"] == true {
            break;
        }
        assert_eq!(next["questionNumber"], answered + 1);
        let (status, _) = post(
            &app,
            &format!("/api/quiz/{session}/answer"),
            json!({ "questionId": next["questionId"], "answer": "C" }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        answered += 1;
        assert!(answered <= 20, "algebra has twenty questions");
    }
    assert_eq!(answered, 20);
}

#[tokio::test]
async fn quiz_lookups_return_not_found() {
    let app = seeded_app().await;
    let (status, body) = post(&app, "/api/quiz/start", json!({ "studentId": 1 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "studentId and moduleId are required");

    let (status, body) = get(&app, "/api/quiz/424242/status").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Session not found");

    let (status, _) = get(&app, "/api/quiz/not-a-number/next").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn puzzles_are_browsable() {
    let app = seeded_app().await;
    let (status, puzzles) = get(&app, "/api/puzzles").await;
    assert_eq!(status, StatusCode::OK);
    let puzzles = puzzles.as_array().unwrap();
    assert_eq!(puzzles.len(), 12);
    assert!(puzzles[0]["puzzle_html"].as_str().unwrap().starts_with("<p>"));

    let module_id = algebra_id(&app).await;
    let (status, puzzle) = get(&app, &format!("/api/puzzles/module/{module_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(puzzle["module_name"], "Algebra");

    let (status, body) = get(&app, "/api/puzzles/concept/424242").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "No puzzle found for this concept");
}

#[tokio::test]
async fn teacher_routes_require_a_teacher_token() {
    let app = seeded_app().await;

    let (status, body) = get(&app, "/api/teacher/questions").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "No authorization header");

    let student_token = register(&app, "sam").await["token"].as_str().unwrap().to_string();
    let (status, body) = send(
        &app,
        Method::GET,
        "/api/teacher/questions",
        Some(&student_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid token");

    let (status, body) = send(&app, Method::GET, "/api/auth/verify", Some(&student_token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({ "valid": false }));

    let token = teacher_token(&app).await;
    let (status, body) = send(&app, Method::GET, "/api/auth/verify", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid"], true);
    assert_eq!(body["teacher"]["role"], "teacher");

    let (status, body) = post(
        &app,
        "/api/auth/login",
        json!({ "username": "teacher", "password": "nope" }),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid credentials");
}

#[tokio::test]
async fn teacher_manages_questions_and_puzzles() {
    let app = seeded_app().await;
    let token = teacher_token(&app).await;
    let token = Some(token.as_str());

    let (status, questions) = send(&app, Method::GET, "/api/teacher/questions", token, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(questions.as_array().unwrap().len(), 60);

    let (_, concepts) = send(&app, Method::GET, "/api/teacher/concepts", token, None).await;
    assert_eq!(concepts.as_array().unwrap().len(), 12);
    let concept_id = concepts[0]["id"].as_i64().unwrap();

    let (status, created) = send(
        &app,
        Method::POST,
        "/api/teacher/questions",
        token,
        Some(json!({
            "concept_id": concept_id,
            "difficulty": 2,
            "question_text": "If z = 4, what is z + z?",
            "option_a": "6",
            "option_b": "8",
            "option_c": "10",
            "option_d": "16",
            "correct_answer": "b",
            "explanation": "4 + 4 = 8",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["correct_answer"], "B");
    let question_id = created["id"].as_i64().unwrap();

    let (status, updated) = send(
        &app,
        Method::PUT,
        &format!("/api/teacher/questions/{question_id}"),
        token,
        Some(json!({ "difficulty": 3, "explanation": null })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["difficulty"], 3);
    assert_eq!(updated["question_text"], "If z = 4, what is z + z?");
    assert_eq!(updated["explanation"], Value::Null);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/teacher/questions",
        token,
        Some(json!({
            "concept_id": concept_id,
            "difficulty": 5,
            "question_text": "?",
            "option_a": "1",
            "option_b": "2",
            "option_c": "3",
            "option_d": "4",
            "correct_answer": "A",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("difficulty"));

    let (status, body) = send(
        &app,
        Method::DELETE,
        &format!("/api/teacher/questions/{question_id}"),
        token,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (status, puzzle) = send(
        &app,
        Method::POST,
        "/api/teacher/puzzles",
        token,
        Some(json!({ "concept_id": concept_id, "title": "Twins", "puzzle_text": "**Two** numbers add to 10." })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(
        puzzle["puzzle_html"]
            .as_str()
            .unwrap()
            .contains("<strong>Two</strong> numbers add to 10.")
    );

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/teacher/puzzles",
        token,
        Some(json!({ "title": "No concept" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "concept_id, title, and puzzle_text are required");

    let puzzle_id = puzzle["id"].as_i64().unwrap();
    let (status, _) = send(
        &app,
        Method::DELETE,
        &format!("/api/teacher/puzzles/{puzzle_id}"),
        token,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = send(
        &app,
        Method::DELETE,
        &format!("/api/teacher/puzzles/{puzzle_id}"),
        token,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Puzzle not found");
}

#[tokio::test]
async fn answered_questions_cannot_be_deleted() {
    let app = seeded_app().await;
    let module_id = algebra_id(&app).await;
    let student_id = register(&app, "sam").await["student"]["id"].as_i64().unwrap();
    let (_, started) = post(
        &app,
        "/api/quiz/start",
        json!({ "studentId": student_id, "moduleId": module_id }),
    )
    .await;
    let session = started["sessionId"].as_i64().unwrap();
    let (_, question) = get(&app, &format!("/api/quiz/{session}/next")).await;
    let question_id = question["questionId"].as_i64().unwrap();
    post(
        &app,
        &format!("/api/quiz/{session}/answer"),
        json!({ "questionId": question_id, "answer": "A" }),
    )
    .await;

    let token = teacher_token(&app).await;
    let (status, body) = send(
        &app,
        Method::DELETE,
        &format!("/api/teacher/questions/{question_id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        "Cannot delete question that has been answered by students"
    );

    let (status, detail) = send(
        &app,
        Method::GET,
        &format!("/api/teacher/students/{student_id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["recentQuizzes"].as_array().unwrap().len(), 1);
}
