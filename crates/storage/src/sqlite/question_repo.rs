use mathwrks_core::adaptive::Difficulty;
use mathwrks_core::model::{ModuleId, Question, QuestionId, SessionId, ValidQuestion};

use super::SqliteRepository;
use super::mapping::{db_err, map_question_listing};
use crate::repository::{QuestionListing, QuestionRepository, StorageError};

const LISTING_SELECT: &str = r"
    SELECT q.id, q.concept_id, q.difficulty, q.question_text,
           q.option_a, q.option_b, q.option_c, q.option_d,
           q.correct_answer, q.explanation,
           c.name AS concept_name, c.explanation AS concept_explanation,
           m.id AS module_id, m.display_name AS module_name
    FROM questions q
    JOIN concepts c ON q.concept_id = c.id
    JOIN modules m ON c.module_id = m.id
";

#[async_trait::async_trait]
impl QuestionRepository for SqliteRepository {
    async fn insert_question(&self, question: ValidQuestion) -> Result<Question, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO questions (
                concept_id, difficulty, question_text,
                option_a, option_b, option_c, option_d,
                correct_answer, explanation
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ",
        )
        .bind(question.concept_id.value())
        .bind(i64::from(question.difficulty))
        .bind(&question.text)
        .bind(&question.options.a)
        .bind(&question.options.b)
        .bind(&question.options.c)
        .bind(&question.options.d)
        .bind(question.correct_answer.as_str())
        .bind(&question.explanation)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(question.assign_id(QuestionId::new(res.last_insert_rowid())))
    }

    async fn update_question(&self, question: &Question) -> Result<(), StorageError> {
        let res = sqlx::query(
            r"
            UPDATE questions SET
                concept_id = ?1,
                difficulty = ?2,
                question_text = ?3,
                option_a = ?4,
                option_b = ?5,
                option_c = ?6,
                option_d = ?7,
                correct_answer = ?8,
                explanation = ?9
            WHERE id = ?10
            ",
        )
        .bind(question.concept_id.value())
        .bind(i64::from(question.difficulty))
        .bind(&question.text)
        .bind(&question.options.a)
        .bind(&question.options.b)
        .bind(&question.options.c)
        .bind(&question.options.d)
        .bind(question.correct_answer.as_str())
        .bind(&question.explanation)
        .bind(question.id.value())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn get_question(&self, id: QuestionId) -> Result<Option<QuestionListing>, StorageError> {
        let row = sqlx::query(&format!("{LISTING_SELECT} WHERE q.id = ?1"))
            .bind(id.value())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.as_ref().map(map_question_listing).transpose()
    }

    async fn list_questions(&self) -> Result<Vec<QuestionListing>, StorageError> {
        let rows = sqlx::query(&format!(
            "{LISTING_SELECT} ORDER BY m.id ASC, c.id ASC, q.difficulty ASC, q.id ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        rows.iter().map(map_question_listing).collect()
    }

    async fn delete_question(&self, id: QuestionId) -> Result<(), StorageError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let answered = sqlx::query("SELECT 1 FROM answers WHERE question_id = ?1 LIMIT 1")
            .bind(id.value())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        if answered.is_some() {
            return Err(StorageError::Conflict("question has answers"));
        }

        let res = sqlx::query("DELETE FROM questions WHERE id = ?1")
            .bind(id.value())
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }

        tx.commit()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(())
    }

    async fn random_unanswered_question(
        &self,
        module_id: ModuleId,
        session_id: SessionId,
        difficulty: Option<Difficulty>,
    ) -> Result<Option<QuestionListing>, StorageError> {
        // ?3 NULL disables the difficulty filter.
        let row = sqlx::query(&format!(
            r"{LISTING_SELECT}
            WHERE c.module_id = ?1
              AND (?3 IS NULL OR q.difficulty = ?3)
              AND q.id NOT IN (SELECT question_id FROM answers WHERE session_id = ?2)
            ORDER BY RANDOM()
            LIMIT 1"
        ))
        .bind(module_id.value())
        .bind(session_id.value())
        .bind(difficulty.map(i64::from))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.as_ref().map(map_question_listing).transpose()
    }
}
