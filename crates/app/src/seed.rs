//! Bundled starter catalog, sample accounts, and the loader for them.

use mathwrks_core::model::{
    AnswerOptions, ConceptId, NewConcept, NewModule, PuzzleDraft, PuzzleError, QuestionDraft,
    QuestionError,
};
use serde::Deserialize;
use services::{AuthError, Clock, PasswordHasher};
use storage::repository::{NewStudent, NewTeacher, Storage, StorageError};
use thiserror::Error;

const CATALOG_JSON: &str = include_str!("../seed/mathwrks.json");

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("bundled catalog is malformed: {0}")]
    Parse(#[from] serde_json::Error),
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Puzzle(#[from] PuzzleError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Debug, Deserialize)]
pub struct Catalog {
    pub modules: Vec<SeedModule>,
    pub teacher: SeedAccount,
    pub students: Vec<SeedStudent>,
}

#[derive(Debug, Deserialize)]
pub struct SeedModule {
    pub name: String,
    pub display_name: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub concepts: Vec<SeedConcept>,
}

#[derive(Debug, Deserialize)]
pub struct SeedConcept {
    pub name: String,
    pub explanation: String,
    pub questions: Vec<SeedQuestion>,
    pub puzzles: Vec<SeedPuzzle>,
}

#[derive(Debug, Deserialize)]
pub struct SeedQuestion {
    pub difficulty: i64,
    pub question_text: String,
    pub option_a: String,
    pub option_b: String,
    pub option_c: String,
    pub option_d: String,
    pub correct_answer: String,
    pub explanation: Option<String>,
}

impl SeedQuestion {
    fn into_draft(self, concept_id: ConceptId) -> QuestionDraft {
        QuestionDraft {
            concept_id,
            difficulty: self.difficulty,
            text: self.question_text,
            options: AnswerOptions {
                a: self.option_a,
                b: self.option_b,
                c: self.option_c,
                d: self.option_d,
            },
            correct_answer: self.correct_answer,
            explanation: self.explanation,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SeedPuzzle {
    pub title: String,
    pub puzzle_text: String,
    pub hint: Option<String>,
    pub solution: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SeedAccount {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct SeedStudent {
    pub username: String,
    pub password: String,
    pub name: String,
    pub total_points: i64,
}

/// Row counts written by [`load`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub modules: usize,
    pub concepts: usize,
    pub questions: usize,
    pub puzzles: usize,
    pub students: usize,
}

/// # Errors
///
/// Returns `SeedError::Parse` if the embedded JSON does not match [`Catalog`].
pub fn bundled_catalog() -> Result<Catalog, SeedError> {
    Ok(serde_json::from_str(CATALOG_JSON)?)
}

/// Writes `catalog` into `storage`. Expects empty tables.
///
/// # Errors
///
/// Returns `SeedError` on the first invalid entry or storage failure.
pub async fn load(
    storage: &Storage,
    catalog: Catalog,
    hasher: &PasswordHasher,
    clock: Clock,
) -> Result<SeedReport, SeedError> {
    let mut report = SeedReport::default();

    for module in catalog.modules {
        let stored = storage
            .catalog
            .insert_module(NewModule {
                name: module.name,
                display_name: module.display_name,
                description: module.description,
                icon: module.icon,
            })
            .await?;
        report.modules += 1;

        for concept in module.concepts {
            let concept_row = storage
                .catalog
                .insert_concept(NewConcept {
                    module_id: stored.id,
                    name: concept.name,
                    explanation: concept.explanation,
                })
                .await?;
            report.concepts += 1;

            for question in concept.questions {
                let valid = question.into_draft(concept_row.id).validate()?;
                storage.questions.insert_question(valid).await?;
                report.questions += 1;
            }
            for puzzle in concept.puzzles {
                let draft = PuzzleDraft {
                    concept_id: concept_row.id,
                    title: puzzle.title,
                    text: puzzle.puzzle_text,
                    hint: puzzle.hint,
                    solution: puzzle.solution,
                }
                .validate()?;
                storage.puzzles.insert_puzzle(draft).await?;
                report.puzzles += 1;
            }
        }
        tracing::debug!(module = %stored.name, "module seeded");
    }

    storage
        .teachers
        .insert_teacher(NewTeacher {
            username: catalog.teacher.username,
            password_hash: hasher.hash(&catalog.teacher.password).await?,
            created_at: clock.now(),
        })
        .await?;

    for student in catalog.students {
        storage
            .students
            .insert_student(NewStudent {
                username: student.username,
                password_hash: hasher.hash(&student.password).await?,
                name: student.name,
                total_points: student.total_points,
                created_at: clock.now(),
            })
            .await?;
        report.students += 1;
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mathwrks_core::time::fixed_clock;

    #[test]
    fn bundled_catalog_matches_expected_shape() {
        let catalog = bundled_catalog().unwrap();
        assert_eq!(catalog.modules.len(), 3);
        let concepts: Vec<_> = catalog.modules.iter().flat_map(|m| &m.concepts).collect();
        assert_eq!(concepts.len(), 12);
        assert!(concepts.iter().all(|c| c.questions.len() == 5));
        assert!(concepts.iter().all(|c| c.puzzles.len() == 1));
        assert_eq!(catalog.teacher.username, "teacher");
    }

    #[tokio::test]
    async fn loads_into_empty_storage() {
        let storage = Storage::in_memory();
        let report = load(
            &storage,
            bundled_catalog().unwrap(),
            &PasswordHasher::new(4),
            fixed_clock(),
        )
        .await
        .unwrap();
        assert_eq!(
            report,
            SeedReport {
                modules: 3,
                concepts: 12,
                questions: 60,
                puzzles: 12,
                students: 2,
            }
        );
        assert_eq!(storage.catalog.list_modules().await.unwrap().len(), 3);
        assert!(
            storage
                .teachers
                .find_teacher_by_username("teacher")
                .await
                .unwrap()
                .is_some()
        );
    }
}
