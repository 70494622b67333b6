use std::sync::Arc;

use mathwrks_core::model::{ConceptId, ModuleId};
use storage::repository::PuzzleRepository;

use crate::error::ContentError;
use crate::views::PuzzleRecord;

/// Read-only access to the "bored?" puzzles.
#[derive(Clone)]
pub struct PuzzleService {
    puzzles: Arc<dyn PuzzleRepository>,
}

impl PuzzleService {
    #[must_use]
    pub fn new(puzzles: Arc<dyn PuzzleRepository>) -> Self {
        Self { puzzles }
    }

    /// # Errors
    ///
    /// Returns `ContentError::Storage` if repository access fails.
    pub async fn list(&self) -> Result<Vec<PuzzleRecord>, ContentError> {
        let puzzles = self.puzzles.list_puzzles().await?;
        Ok(puzzles.into_iter().map(Into::into).collect())
    }

    /// # Errors
    ///
    /// Returns `ContentError::NoPuzzle` when the concept has none.
    pub async fn random_for_concept(&self, id: ConceptId) -> Result<PuzzleRecord, ContentError> {
        self.puzzles
            .random_puzzle_for_concept(id)
            .await?
            .map(Into::into)
            .ok_or(ContentError::NoPuzzle("No puzzle found for this concept"))
    }

    /// # Errors
    ///
    /// Returns `ContentError::NoPuzzle` when no concept of the module has one.
    pub async fn random_for_module(&self, id: ModuleId) -> Result<PuzzleRecord, ContentError> {
        self.puzzles
            .random_puzzle_for_module(id)
            .await?
            .map(Into::into)
            .ok_or(ContentError::NoPuzzle("No puzzle found for this module"))
    }
}
