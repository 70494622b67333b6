use mathwrks_core::model::{ConceptId, ModuleId, Puzzle, PuzzleDraft, PuzzleId};

use super::SqliteRepository;
use super::mapping::{db_err, map_puzzle_listing};
use crate::repository::{PuzzleListing, PuzzleRepository, StorageError};

const LISTING_SELECT: &str = r"
    SELECT p.id, p.concept_id, p.title, p.puzzle_text, p.hint, p.solution,
           c.name AS concept_name, m.display_name AS module_name
    FROM puzzles p
    JOIN concepts c ON p.concept_id = c.id
    JOIN modules m ON c.module_id = m.id
";

#[async_trait::async_trait]
impl PuzzleRepository for SqliteRepository {
    async fn insert_puzzle(&self, puzzle: PuzzleDraft) -> Result<Puzzle, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO puzzles (concept_id, title, puzzle_text, hint, solution)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ",
        )
        .bind(puzzle.concept_id.value())
        .bind(&puzzle.title)
        .bind(&puzzle.text)
        .bind(&puzzle.hint)
        .bind(&puzzle.solution)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(puzzle.assign_id(PuzzleId::new(res.last_insert_rowid())))
    }

    async fn delete_puzzle(&self, id: PuzzleId) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM puzzles WHERE id = ?1")
            .bind(id.value())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn list_puzzles(&self) -> Result<Vec<PuzzleListing>, StorageError> {
        let rows = sqlx::query(&format!(
            "{LISTING_SELECT} ORDER BY m.id ASC, c.id ASC, p.id ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        rows.iter().map(map_puzzle_listing).collect()
    }

    async fn random_puzzle_for_concept(
        &self,
        concept_id: ConceptId,
    ) -> Result<Option<PuzzleListing>, StorageError> {
        let row = sqlx::query(&format!(
            "{LISTING_SELECT} WHERE p.concept_id = ?1 ORDER BY RANDOM() LIMIT 1"
        ))
        .bind(concept_id.value())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.as_ref().map(map_puzzle_listing).transpose()
    }

    async fn random_puzzle_for_module(
        &self,
        module_id: ModuleId,
    ) -> Result<Option<PuzzleListing>, StorageError> {
        let row = sqlx::query(&format!(
            "{LISTING_SELECT} WHERE c.module_id = ?1 ORDER BY RANDOM() LIMIT 1"
        ))
        .bind(module_id.value())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.as_ref().map(map_puzzle_listing).transpose()
    }
}
