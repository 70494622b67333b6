use serde::Serialize;
use thiserror::Error;

use crate::model::ids::{ConceptId, PuzzleId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PuzzleError {
    #[error("puzzle title cannot be empty")]
    EmptyTitle,

    #[error("puzzle text cannot be empty")]
    EmptyText,
}

/// A "bored?" challenge attached to a concept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Puzzle {
    pub id: PuzzleId,
    pub concept_id: ConceptId,
    pub title: String,
    pub text: String,
    pub hint: Option<String>,
    pub solution: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PuzzleDraft {
    pub concept_id: ConceptId,
    pub title: String,
    pub text: String,
    pub hint: Option<String>,
    pub solution: Option<String>,
}

impl PuzzleDraft {
    /// # Errors
    ///
    /// Returns `PuzzleError` when the title or text is blank.
    pub fn validate(self) -> Result<Self, PuzzleError> {
        if self.title.trim().is_empty() {
            return Err(PuzzleError::EmptyTitle);
        }
        if self.text.trim().is_empty() {
            return Err(PuzzleError::EmptyText);
        }
        Ok(Self {
            hint: self.hint.filter(|h| !h.trim().is_empty()),
            solution: self.solution.filter(|s| !s.trim().is_empty()),
            ..self
        })
    }

    #[must_use]
    pub fn assign_id(self, id: PuzzleId) -> Puzzle {
        Puzzle {
            id,
            concept_id: self.concept_id,
            title: self.title,
            text: self.text,
            hint: self.hint,
            solution: self.solution,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_hint_becomes_none() {
        let draft = PuzzleDraft {
            concept_id: ConceptId::new(1),
            title: "Mystery Number".into(),
            text: "Add 7 and double to get 24.".into(),
            hint: Some("  ".into()),
            solution: Some("5".into()),
        };
        let puzzle = draft.validate().unwrap().assign_id(PuzzleId::new(3));
        assert_eq!(puzzle.hint, None);
        assert_eq!(puzzle.solution.as_deref(), Some("5"));
    }

    #[test]
    fn title_is_required() {
        let draft = PuzzleDraft {
            concept_id: ConceptId::new(1),
            title: String::new(),
            text: "text".into(),
            hint: None,
            solution: None,
        };
        assert_eq!(draft.validate(), Err(PuzzleError::EmptyTitle));
    }
}
