use chrono::{DateTime, Utc};
use mathwrks_core::AdaptiveState;
use mathwrks_core::model::{AnswerId, ModuleId, QuestionId, QuizSession, SessionId, StudentId};
use sqlx::Row;
use sqlx::sqlite::SqliteConnection;

use super::SqliteRepository;
use super::mapping::{db_err, map_answer_row, map_progress_row, map_session_row, ser};
use crate::repository::{
    AnswerDetail, ModuleProgress, NewAnswer, QuizRepository, RecordedAnswer, SessionListing,
    StorageError,
};

const SESSION_COLUMNS: &str = r"
    qs.id, qs.student_id, qs.module_id, qs.started_at, qs.ended_at,
    qs.total_questions, qs.correct_answers, qs.points_earned
";

fn conn_err(e: sqlx::Error) -> StorageError {
    StorageError::Connection(e.to_string())
}

async fn ensure_progress(
    conn: &mut SqliteConnection,
    student_id: StudentId,
    module_id: ModuleId,
) -> Result<AdaptiveState, StorageError> {
    sqlx::query(
        r"
        INSERT INTO student_progress (student_id, module_id)
        VALUES (?1, ?2)
        ON CONFLICT(student_id, module_id) DO NOTHING
        ",
    )
    .bind(student_id.value())
    .bind(module_id.value())
    .execute(&mut *conn)
    .await
    .map_err(db_err)?;

    let row = sqlx::query(
        r"
        SELECT current_difficulty, correct_streak, wrong_streak
        FROM student_progress
        WHERE student_id = ?1 AND module_id = ?2
        ",
    )
    .bind(student_id.value())
    .bind(module_id.value())
    .fetch_one(&mut *conn)
    .await
    .map_err(conn_err)?;

    map_progress_row(&row)
}

async fn fetch_session(
    conn: &mut SqliteConnection,
    id: SessionId,
) -> Result<Option<QuizSession>, StorageError> {
    let row = sqlx::query(&format!(
        "SELECT {SESSION_COLUMNS} FROM quiz_sessions qs WHERE qs.id = ?1"
    ))
    .bind(id.value())
    .fetch_optional(&mut *conn)
    .await
    .map_err(conn_err)?;

    row.as_ref().map(map_session_row).transpose()
}

#[async_trait::async_trait]
impl QuizRepository for SqliteRepository {
    async fn get_or_create_progress(
        &self,
        student_id: StudentId,
        module_id: ModuleId,
    ) -> Result<AdaptiveState, StorageError> {
        let mut conn = self.pool.acquire().await.map_err(conn_err)?;
        ensure_progress(&mut conn, student_id, module_id).await
    }

    async fn get_progress(
        &self,
        student_id: StudentId,
        module_id: ModuleId,
    ) -> Result<Option<AdaptiveState>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT current_difficulty, correct_streak, wrong_streak
            FROM student_progress
            WHERE student_id = ?1 AND module_id = ?2
            ",
        )
        .bind(student_id.value())
        .bind(module_id.value())
        .fetch_optional(&self.pool)
        .await
        .map_err(conn_err)?;

        row.as_ref().map(map_progress_row).transpose()
    }

    async fn list_module_progress(
        &self,
        student_id: StudentId,
    ) -> Result<Vec<ModuleProgress>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT m.id AS module_id, m.display_name AS module_name,
                   sp.id AS progress_id,
                   COALESCE(sp.current_difficulty, 1) AS current_difficulty,
                   COALESCE(sp.correct_streak, 0) AS correct_streak,
                   COALESCE(sp.wrong_streak, 0) AS wrong_streak,
                   (SELECT COUNT(*) FROM quiz_sessions qs
                     WHERE qs.student_id = ?1 AND qs.module_id = m.id) AS quizzes_taken,
                   (SELECT COALESCE(SUM(qs.points_earned), 0) FROM quiz_sessions qs
                     WHERE qs.student_id = ?1 AND qs.module_id = m.id) AS points_earned
            FROM modules m
            LEFT JOIN student_progress sp
                ON sp.module_id = m.id AND sp.student_id = ?1
            ORDER BY m.id ASC
            ",
        )
        .bind(student_id.value())
        .fetch_all(&self.pool)
        .await
        .map_err(conn_err)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let progress_id: Option<i64> = row.try_get("progress_id").map_err(ser)?;
            let quizzes: i64 = row.try_get("quizzes_taken").map_err(ser)?;
            out.push(ModuleProgress {
                module_id: ModuleId::new(row.try_get("module_id").map_err(ser)?),
                module_name: row.try_get("module_name").map_err(ser)?,
                state: map_progress_row(&row)?,
                started: progress_id.is_some(),
                quizzes_taken: u32::try_from(quizzes).map_err(ser)?,
                points_earned: row.try_get("points_earned").map_err(ser)?,
            });
        }
        Ok(out)
    }

    async fn insert_session(
        &self,
        student_id: StudentId,
        module_id: ModuleId,
        started_at: DateTime<Utc>,
    ) -> Result<QuizSession, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO quiz_sessions (student_id, module_id, started_at)
            VALUES (?1, ?2, ?3)
            ",
        )
        .bind(student_id.value())
        .bind(module_id.value())
        .bind(started_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(QuizSession::start(
            SessionId::new(res.last_insert_rowid()),
            student_id,
            module_id,
            started_at,
        ))
    }

    async fn get_session(&self, id: SessionId) -> Result<Option<QuizSession>, StorageError> {
        let mut conn = self.pool.acquire().await.map_err(conn_err)?;
        fetch_session(&mut conn, id).await
    }

    async fn end_session(
        &self,
        id: SessionId,
        ended_at: DateTime<Utc>,
    ) -> Result<QuizSession, StorageError> {
        let mut session = self.get_session(id).await?.ok_or(StorageError::NotFound)?;
        if session.is_ended() {
            return Err(StorageError::Conflict("session already ended"));
        }
        session.end(ended_at);

        let res = sqlx::query(
            "UPDATE quiz_sessions SET ended_at = ?2 WHERE id = ?1 AND ended_at IS NULL",
        )
        .bind(id.value())
        .bind(session.ended_at())
        .execute(&self.pool)
        .await
        .map_err(conn_err)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::Conflict("session already ended"));
        }
        Ok(session)
    }

    async fn answered_question_ids(
        &self,
        session_id: SessionId,
    ) -> Result<Vec<QuestionId>, StorageError> {
        let rows = sqlx::query("SELECT question_id FROM answers WHERE session_id = ?1")
            .bind(session_id.value())
            .fetch_all(&self.pool)
            .await
            .map_err(conn_err)?;

        rows.iter()
            .map(|row| {
                row.try_get::<i64, _>("question_id")
                    .map(QuestionId::new)
                    .map_err(ser)
            })
            .collect()
    }

    async fn record_answer(&self, answer: NewAnswer) -> Result<RecordedAnswer, StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn_err)?;

        // Write first so the transaction holds the write lock before any read.
        let res = sqlx::query(
            r"
            INSERT INTO answers (
                session_id, question_id, student_answer, is_correct,
                points_earned, acknowledged, answered_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)
            ",
        )
        .bind(answer.session_id.value())
        .bind(answer.question_id.value())
        .bind(answer.student_answer.as_str())
        .bind(answer.is_correct)
        .bind(i64::from(answer.points_earned))
        .bind(answer.answered_at)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;
        let answer_id = AnswerId::new(res.last_insert_rowid());

        let updated = sqlx::query(
            r"
            UPDATE quiz_sessions SET
                total_questions = total_questions + 1,
                correct_answers = correct_answers + ?2,
                points_earned = points_earned + ?3
            WHERE id = ?1 AND ended_at IS NULL
            ",
        )
        .bind(answer.session_id.value())
        .bind(i64::from(answer.is_correct))
        .bind(i64::from(answer.points_earned))
        .execute(&mut *tx)
        .await
        .map_err(conn_err)?;
        if updated.rows_affected() == 0 {
            return Err(StorageError::Conflict("session already ended"));
        }

        let session = fetch_session(&mut tx, answer.session_id)
            .await?
            .ok_or(StorageError::NotFound)?;

        sqlx::query("UPDATE students SET total_points = total_points + ?2 WHERE id = ?1")
            .bind(session.student_id().value())
            .bind(i64::from(answer.points_earned))
            .execute(&mut *tx)
            .await
            .map_err(conn_err)?;

        let previous = ensure_progress(&mut tx, session.student_id(), session.module_id()).await?;
        let current = previous.record(answer.is_correct);

        sqlx::query(
            r"
            UPDATE student_progress SET
                current_difficulty = ?3,
                correct_streak = ?4,
                wrong_streak = ?5
            WHERE student_id = ?1 AND module_id = ?2
            ",
        )
        .bind(session.student_id().value())
        .bind(session.module_id().value())
        .bind(i64::from(current.difficulty))
        .bind(i64::from(current.correct_streak))
        .bind(i64::from(current.wrong_streak))
        .execute(&mut *tx)
        .await
        .map_err(conn_err)?;

        tx.commit().await.map_err(conn_err)?;

        tracing::debug!(
            session = session.id().value(),
            from = previous.difficulty.level(),
            to = current.difficulty.level(),
            "recorded answer"
        );

        Ok(RecordedAnswer {
            answer: mathwrks_core::model::Answer {
                id: answer_id,
                session_id: answer.session_id,
                question_id: answer.question_id,
                student_answer: answer.student_answer,
                is_correct: answer.is_correct,
                points_earned: answer.points_earned,
                acknowledged: false,
                acknowledgment_text: None,
                answered_at: answer.answered_at,
            },
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
        let res = sqlx::query(
            r"
            UPDATE answers SET acknowledged = 1, acknowledgment_text = ?3
            WHERE id = ?1 AND session_id = ?2
            ",
        )
        .bind(answer_id.value())
        .bind(session_id.value())
        .bind(text)
        .execute(&self.pool)
        .await
        .map_err(conn_err)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn list_session_answers(
        &self,
        session_id: SessionId,
    ) -> Result<Vec<AnswerDetail>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT a.id, a.session_id, a.question_id, a.student_answer, a.is_correct,
                   a.points_earned, a.acknowledged, a.acknowledgment_text, a.answered_at,
                   q.question_text, q.correct_answer, c.name AS concept_name
            FROM answers a
            JOIN questions q ON a.question_id = q.id
            JOIN concepts c ON q.concept_id = c.id
            WHERE a.session_id = ?1
            ORDER BY a.answered_at ASC, a.id ASC
            ",
        )
        .bind(session_id.value())
        .fetch_all(&self.pool)
        .await
        .map_err(conn_err)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let correct: String = row.try_get("correct_answer").map_err(ser)?;
            out.push(AnswerDetail {
                answer: map_answer_row(&row)?,
                question_text: row.try_get("question_text").map_err(ser)?,
                correct_answer: correct.parse().map_err(ser)?,
                concept_name: row.try_get("concept_name").map_err(ser)?,
            });
        }
        Ok(out)
    }

    async fn recent_sessions(
        &self,
        student_id: StudentId,
        limit: u32,
    ) -> Result<Vec<SessionListing>, StorageError> {
        let rows = sqlx::query(&format!(
            r"
            SELECT {SESSION_COLUMNS}, m.display_name AS module_name
            FROM quiz_sessions qs
            JOIN modules m ON qs.module_id = m.id
            WHERE qs.student_id = ?1
            ORDER BY qs.started_at DESC, qs.id DESC
            LIMIT ?2
            "
        ))
        .bind(student_id.value())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(conn_err)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(SessionListing {
                session: map_session_row(&row)?,
                module_name: row.try_get("module_name").map_err(ser)?,
            });
        }
        Ok(out)
    }
}
