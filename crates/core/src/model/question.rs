use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::adaptive::{Difficulty, DifficultyError};
use crate::model::ids::{ConceptId, QuestionId};

//
// ─── ANSWER CHOICE ─────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("answer must be A, B, C, or D")]
pub struct AnswerChoiceError;

/// One of the four multiple-choice slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnswerChoice {
    A,
    B,
    C,
    D,
}

impl AnswerChoice {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
        }
    }
}

impl FromStr for AnswerChoice {
    type Err = AnswerChoiceError;

    /// Case-insensitive; surrounding whitespace is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(Self::A),
            "B" => Ok(Self::B),
            "C" => Ok(Self::C),
            "D" => Ok(Self::D),
            _ => Err(AnswerChoiceError),
        }
    }
}

impl fmt::Display for AnswerChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question text cannot be empty")]
    EmptyText,

    #[error("option {0} cannot be empty")]
    EmptyOption(AnswerChoice),

    #[error(transparent)]
    Difficulty(#[from] DifficultyError),

    #[error(transparent)]
    AnswerChoice(#[from] AnswerChoiceError),
}

//
// ─── OPTIONS ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub struct AnswerOptions {
    pub a: String,
    pub b: String,
    pub c: String,
    pub d: String,
}

impl AnswerOptions {
    #[must_use]
    pub fn get(&self, choice: AnswerChoice) -> &str {
        match choice {
            AnswerChoice::A => &self.a,
            AnswerChoice::B => &self.b,
            AnswerChoice::C => &self.c,
            AnswerChoice::D => &self.d,
        }
    }

    fn validate(self) -> Result<Self, QuestionError> {
        for choice in [AnswerChoice::A, AnswerChoice::B, AnswerChoice::C, AnswerChoice::D] {
            if self.get(choice).trim().is_empty() {
                return Err(QuestionError::EmptyOption(choice));
            }
        }
        Ok(self)
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// Unvalidated question content as authored by a teacher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionDraft {
    pub concept_id: ConceptId,
    pub difficulty: i64,
    pub text: String,
    pub options: AnswerOptions,
    pub correct_answer: String,
    pub explanation: Option<String>,
}

impl QuestionDraft {
    /// Checks difficulty range, answer letter, and that no text field is blank.
    ///
    /// # Errors
    ///
    /// Returns the first `QuestionError` encountered.
    pub fn validate(self) -> Result<ValidQuestion, QuestionError> {
        let difficulty = Difficulty::try_from_level(self.difficulty)?;
        let correct_answer: AnswerChoice = self.correct_answer.parse()?;
        if self.text.trim().is_empty() {
            return Err(QuestionError::EmptyText);
        }
        let options = self.options.validate()?;

        Ok(ValidQuestion {
            concept_id: self.concept_id,
            difficulty,
            text: self.text,
            options,
            correct_answer,
            explanation: self.explanation.filter(|e| !e.trim().is_empty()),
        })
    }
}

/// Question content that passed validation but has no row id yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidQuestion {
    pub concept_id: ConceptId,
    pub difficulty: Difficulty,
    pub text: String,
    pub options: AnswerOptions,
    pub correct_answer: AnswerChoice,
    pub explanation: Option<String>,
}

impl ValidQuestion {
    #[must_use]
    pub fn assign_id(self, id: QuestionId) -> Question {
        Question {
            id,
            concept_id: self.concept_id,
            difficulty: self.difficulty,
            text: self.text,
            options: self.options,
            correct_answer: self.correct_answer,
            explanation: self.explanation,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Question {
    pub id: QuestionId,
    pub concept_id: ConceptId,
    pub difficulty: Difficulty,
    pub text: String,
    pub options: AnswerOptions,
    pub correct_answer: AnswerChoice,
    pub explanation: Option<String>,
}

impl Question {
    #[must_use]
    pub fn is_correct(&self, answer: AnswerChoice) -> bool {
        self.correct_answer == answer
    }

    /// Applies a partial edit; absent fields keep their current values.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if a supplied field is invalid.
    pub fn apply_patch(&self, patch: QuestionPatch) -> Result<Question, QuestionError> {
        let options = AnswerOptions {
            a: patch.option_a.unwrap_or_else(|| self.options.a.clone()),
            b: patch.option_b.unwrap_or_else(|| self.options.b.clone()),
            c: patch.option_c.unwrap_or_else(|| self.options.c.clone()),
            d: patch.option_d.unwrap_or_else(|| self.options.d.clone()),
        };
        let draft = QuestionDraft {
            concept_id: patch.concept_id.unwrap_or(self.concept_id),
            difficulty: patch
                .difficulty
                .unwrap_or_else(|| i64::from(self.difficulty)),
            text: patch.text.unwrap_or_else(|| self.text.clone()),
            options,
            correct_answer: patch
                .correct_answer
                .unwrap_or_else(|| self.correct_answer.to_string()),
            // `Some(None)` clears the explanation, `None` keeps it.
            explanation: match patch.explanation {
                Some(explanation) => explanation,
                None => self.explanation.clone(),
            },
        };
        Ok(draft.validate()?.assign_id(self.id))
    }
}

/// Partial update for an existing question.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuestionPatch {
    pub concept_id: Option<ConceptId>,
    pub difficulty: Option<i64>,
    pub text: Option<String>,
    pub option_a: Option<String>,
    pub option_b: Option<String>,
    pub option_c: Option<String>,
    pub option_d: Option<String>,
    pub correct_answer: Option<String>,
    pub explanation: Option<Option<String>>,
}
