use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

const SCHEMA_V1: &[&str] = &[
    r"
        CREATE TABLE IF NOT EXISTS students (
            id INTEGER PRIMARY KEY,
            username TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            name TEXT NOT NULL,
            total_points INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS teachers (
            id INTEGER PRIMARY KEY,
            username TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            created_at TEXT NOT NULL
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS modules (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            display_name TEXT NOT NULL,
            description TEXT,
            icon TEXT
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS concepts (
            id INTEGER PRIMARY KEY,
            module_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            explanation TEXT NOT NULL,
            FOREIGN KEY (module_id) REFERENCES modules(id)
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS questions (
            id INTEGER PRIMARY KEY,
            concept_id INTEGER NOT NULL,
            difficulty INTEGER NOT NULL CHECK (difficulty BETWEEN 1 AND 3),
            question_text TEXT NOT NULL,
            option_a TEXT NOT NULL,
            option_b TEXT NOT NULL,
            option_c TEXT NOT NULL,
            option_d TEXT NOT NULL,
            correct_answer TEXT NOT NULL CHECK (correct_answer IN ('A', 'B', 'C', 'D')),
            explanation TEXT,
            FOREIGN KEY (concept_id) REFERENCES concepts(id)
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS puzzles (
            id INTEGER PRIMARY KEY,
            concept_id INTEGER NOT NULL,
            title TEXT NOT NULL,
            puzzle_text TEXT NOT NULL,
            hint TEXT,
            solution TEXT,
            FOREIGN KEY (concept_id) REFERENCES concepts(id)
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS student_progress (
            id INTEGER PRIMARY KEY,
            student_id INTEGER NOT NULL,
            module_id INTEGER NOT NULL,
            current_difficulty INTEGER NOT NULL DEFAULT 1 CHECK (current_difficulty BETWEEN 1 AND 3),
            correct_streak INTEGER NOT NULL DEFAULT 0 CHECK (correct_streak >= 0),
            wrong_streak INTEGER NOT NULL DEFAULT 0 CHECK (wrong_streak >= 0),
            UNIQUE (student_id, module_id),
            FOREIGN KEY (student_id) REFERENCES students(id),
            FOREIGN KEY (module_id) REFERENCES modules(id)
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS quiz_sessions (
            id INTEGER PRIMARY KEY,
            student_id INTEGER NOT NULL,
            module_id INTEGER NOT NULL,
            started_at TEXT NOT NULL,
            ended_at TEXT,
            total_questions INTEGER NOT NULL DEFAULT 0 CHECK (total_questions >= 0),
            correct_answers INTEGER NOT NULL DEFAULT 0 CHECK (correct_answers >= 0),
            points_earned INTEGER NOT NULL DEFAULT 0 CHECK (points_earned >= 0),
            FOREIGN KEY (student_id) REFERENCES students(id),
            FOREIGN KEY (module_id) REFERENCES modules(id)
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS answers (
            id INTEGER PRIMARY KEY,
            session_id INTEGER NOT NULL,
            question_id INTEGER NOT NULL,
            student_answer TEXT NOT NULL,
            is_correct INTEGER NOT NULL,
            points_earned INTEGER NOT NULL DEFAULT 0,
            acknowledged INTEGER NOT NULL DEFAULT 0,
            acknowledgment_text TEXT,
            answered_at TEXT NOT NULL,
            UNIQUE (session_id, question_id),
            FOREIGN KEY (session_id) REFERENCES quiz_sessions(id),
            FOREIGN KEY (question_id) REFERENCES questions(id)
        );
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_questions_concept_difficulty
            ON questions (concept_id, difficulty);
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_concepts_module
            ON concepts (module_id);
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_puzzles_concept
            ON puzzles (concept_id);
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_quiz_sessions_student_started
            ON quiz_sessions (student_id, started_at);
    ",
];

/// Applies each schema version not yet recorded in `schema_migrations`.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    let versions: [(i64, &[&str]); 1] = [(1, SCHEMA_V1)];

    for (version, statements) in versions {
        if is_applied(pool, version).await? {
            continue;
        }
        let mut tx = pool.begin().await?;
        for statement in statements {
            sqlx::query(statement).execute(&mut *tx).await?;
        }
        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(version)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        tracing::info!(version, "applied schema migration");
    }

    Ok(())
}
