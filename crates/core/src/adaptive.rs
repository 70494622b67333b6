use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Points awarded for a correct answer before the difficulty multiplier.
pub const BASE_POINTS: u32 = 10;

/// Consecutive correct answers needed to move up one level.
pub const PROMOTION_STREAK: u32 = 3;

/// Consecutive wrong answers needed to move down one level.
pub const DEMOTION_STREAK: u32 = 2;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DifficultyError {
    #[error("difficulty must be 1, 2, or 3, got {0}")]
    OutOfRange(i64),
}

//
// ─── DIFFICULTY ────────────────────────────────────────────────────────────────
//

/// Three-level difficulty used to pick questions and scale points.
///
/// Raw levels outside `1..=3` are treated as [`Difficulty::Easy`] by the
/// lenient constructors; use [`Difficulty::try_from_level`] where an
/// out-of-range value should be rejected instead.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(into = "u8", try_from = "i64")]
pub enum Difficulty {
    #[default]
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    /// Maps a raw level to a difficulty, defaulting to `Easy`.
    ///
    /// ```
    /// # use mathwrks_core::adaptive::Difficulty;
    /// assert_eq!(Difficulty::from_level(2), Difficulty::Medium);
    /// assert_eq!(Difficulty::from_level(7), Difficulty::Easy);
    /// ```
    #[must_use]
    pub fn from_level(level: i64) -> Self {
        Self::try_from_level(level).unwrap_or_default()
    }

    /// Strict variant of [`Difficulty::from_level`].
    ///
    /// # Errors
    ///
    /// Returns `DifficultyError::OutOfRange` unless `level` is 1, 2, or 3.
    pub fn try_from_level(level: i64) -> Result<Self, DifficultyError> {
        match level {
            1 => Ok(Self::Easy),
            2 => Ok(Self::Medium),
            3 => Ok(Self::Hard),
            other => Err(DifficultyError::OutOfRange(other)),
        }
    }

    #[must_use]
    pub fn level(self) -> u8 {
        match self {
            Self::Easy => 1,
            Self::Medium => 2,
            Self::Hard => 3,
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Easy => "Easy",
            Self::Medium => "Medium",
            Self::Hard => "Hard",
        }
    }

    /// Scaling applied to [`BASE_POINTS`].
    #[must_use]
    pub fn multiplier(self) -> f64 {
        match self {
            Self::Easy => 1.0,
            Self::Medium => 1.5,
            Self::Hard => 2.0,
        }
    }

    /// Points for a correct answer at this difficulty (10, 15, 20).
    #[must_use]
    pub fn points(self) -> u32 {
        // Products are small positive values; rounding half-up matches `f64::round`.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let points = (f64::from(BASE_POINTS) * self.multiplier()).round() as u32;
        points
    }

    #[must_use]
    pub fn harder(self) -> Option<Self> {
        match self {
            Self::Easy => Some(Self::Medium),
            Self::Medium => Some(Self::Hard),
            Self::Hard => None,
        }
    }

    #[must_use]
    pub fn easier(self) -> Option<Self> {
        match self {
            Self::Easy => None,
            Self::Medium => Some(Self::Easy),
            Self::Hard => Some(Self::Medium),
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl From<Difficulty> for u8 {
    fn from(value: Difficulty) -> Self {
        value.level()
    }
}

impl From<Difficulty> for i64 {
    fn from(value: Difficulty) -> Self {
        i64::from(value.level())
    }
}

impl TryFrom<i64> for Difficulty {
    type Error = DifficultyError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::try_from_level(value)
    }
}

//
// ─── ADAPTIVE STATE ────────────────────────────────────────────────────────────
//

/// Difficulty plus the two streak counters kept per (student, module).
///
/// After any [`AdaptiveState::record`] at most one of the streaks is non-zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdaptiveState {
    pub difficulty: Difficulty,
    pub correct_streak: u32,
    pub wrong_streak: u32,
}

impl AdaptiveState {
    #[must_use]
    pub fn new(difficulty: Difficulty, correct_streak: u32, wrong_streak: u32) -> Self {
        Self {
            difficulty,
            correct_streak,
            wrong_streak,
        }
    }

    /// Applies one answer outcome and returns the next state.
    ///
    /// Three correct answers in a row move up a level and consume the streak;
    /// two wrong answers in a row move down a level and consume that streak.
    /// At the top (or bottom) level the streak is left to keep counting.
    ///
    /// ```
    /// # use mathwrks_core::adaptive::{AdaptiveState, Difficulty};
    /// let state = AdaptiveState::default()
    ///     .record(true)
    ///     .record(true)
    ///     .record(true);
    /// assert_eq!(state, AdaptiveState::new(Difficulty::Medium, 0, 0));
    /// ```
    #[must_use]
    pub fn record(self, is_correct: bool) -> Self {
        if is_correct {
            let correct_streak = self.correct_streak.saturating_add(1);
            match self.difficulty.harder() {
                Some(next) if correct_streak >= PROMOTION_STREAK => Self::new(next, 0, 0),
                _ => Self::new(self.difficulty, correct_streak, 0),
            }
        } else {
            let wrong_streak = self.wrong_streak.saturating_add(1);
            match self.difficulty.easier() {
                Some(next) if wrong_streak >= DEMOTION_STREAK => Self::new(next, 0, 0),
                _ => Self::new(self.difficulty, 0, wrong_streak),
            }
        }
    }
}

//
// ─── LEVEL-BASED API ───────────────────────────────────────────────────────────
//

/// Points for a correct answer at the given raw level; unknown levels score as Easy.
#[must_use]
pub fn calculate_points(difficulty: i64) -> u32 {
    Difficulty::from_level(difficulty).points()
}

#[must_use]
pub fn points_multiplier(difficulty: i64) -> f64 {
    Difficulty::from_level(difficulty).multiplier()
}

/// Display label for a raw level; unknown levels read as "Easy".
#[must_use]
pub fn difficulty_label(difficulty: i64) -> &'static str {
    Difficulty::from_level(difficulty).label()
}

/// Runs one transition of the adaptive engine on raw counters.
#[must_use]
pub fn update_difficulty(
    current_difficulty: i64,
    correct_streak: u32,
    wrong_streak: u32,
    is_correct: bool,
) -> AdaptiveState {
    AdaptiveState::new(
        Difficulty::from_level(current_difficulty),
        correct_streak,
        wrong_streak,
    )
    .record(is_correct)
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn run(start: AdaptiveState, outcomes: &[bool]) -> AdaptiveState {
        outcomes.iter().fold(start, |state, &ok| state.record(ok))
    }

    #[test]
    fn points_scale_with_level() {
        assert_eq!(calculate_points(1), 10);
        assert_eq!(calculate_points(2), 15);
        assert_eq!(calculate_points(3), 20);
    }

    #[test]
    fn unknown_levels_default_to_easy() {
        assert_eq!(calculate_points(0), 10);
        assert_eq!(calculate_points(4), 10);
        assert_eq!(points_multiplier(-1), 1.0);
        assert_eq!(difficulty_label(0), "Easy");
        assert_eq!(difficulty_label(99), "Easy");
    }

    #[test]
    fn labels_match_levels() {
        assert_eq!(difficulty_label(1), "Easy");
        assert_eq!(difficulty_label(2), "Medium");
        assert_eq!(difficulty_label(3), "Hard");
    }

    #[test]
    fn strict_level_parsing_rejects_out_of_range() {
        assert_eq!(Difficulty::try_from_level(3), Ok(Difficulty::Hard));
        assert_eq!(
            Difficulty::try_from_level(4),
            Err(DifficultyError::OutOfRange(4))
        );
    }

    #[test]
    fn three_correct_promotes_and_consumes_streak() {
        let state = run(AdaptiveState::default(), &[true, true, true]);
        assert_eq!(state, AdaptiveState::new(Difficulty::Medium, 0, 0));
    }

    #[test]
    fn two_correct_keeps_level() {
        let state = run(AdaptiveState::default(), &[true, true]);
        assert_eq!(state, AdaptiveState::new(Difficulty::Easy, 2, 0));
    }

    #[test]
    fn two_wrong_demotes_and_consumes_streak() {
        let start = AdaptiveState::new(Difficulty::Medium, 0, 0);
        let state = run(start, &[false, false]);
        assert_eq!(state, AdaptiveState::new(Difficulty::Easy, 0, 0));
    }

    #[test]
    fn hard_is_a_ceiling_and_streak_keeps_growing() {
        let start = AdaptiveState::new(Difficulty::Hard, 0, 0);
        let state = run(start, &[true; 7]);
        assert_eq!(state.difficulty, Difficulty::Hard);
        assert_eq!(state.correct_streak, 7);
    }

    #[test]
    fn easy_is_a_floor_and_streak_keeps_growing() {
        let state = run(AdaptiveState::default(), &[false; 5]);
        assert_eq!(state.difficulty, Difficulty::Easy);
        assert_eq!(state.wrong_streak, 5);
    }

    #[test]
    fn outcome_flip_resets_opposite_streak() {
        let start = AdaptiveState::new(Difficulty::Medium, 2, 0);
        let after_wrong = start.record(false);
        assert_eq!(after_wrong, AdaptiveState::new(Difficulty::Medium, 0, 1));

        let after_right = after_wrong.record(true);
        assert_eq!(after_right, AdaptiveState::new(Difficulty::Medium, 1, 0));
    }

    #[test]
    fn streaks_are_never_both_non_zero() {
        let outcomes = [
            true, false, true, true, true, false, false, true, true, true, true, true, true,
            false, false, false, false,
        ];
        let mut state = AdaptiveState::default();
        for ok in outcomes {
            state = state.record(ok);
            assert!(state.correct_streak == 0 || state.wrong_streak == 0);
            assert!((1..=3).contains(&state.difficulty.level()));
        }
    }

    #[test]
    fn promote_then_miss_scenario() {
        let mut state = AdaptiveState::default();
        for _ in 0..3 {
            state = state.record(true);
        }
        assert_eq!(state, AdaptiveState::new(Difficulty::Medium, 0, 0));

        state = state.record(false);
        assert_eq!(state, AdaptiveState::new(Difficulty::Medium, 0, 1));
    }

    #[test]
    fn level_api_matches_typed_api() {
        let next = update_difficulty(1, 2, 0, true);
        assert_eq!(next, AdaptiveState::new(Difficulty::Medium, 0, 0));

        let next = update_difficulty(3, 0, 1, false);
        assert_eq!(next, AdaptiveState::new(Difficulty::Medium, 0, 0));
    }

    #[test]
    fn difficulty_serializes_as_level() {
        let json = serde_json::to_string(&Difficulty::Hard).unwrap();
        assert_eq!(json, "3");
        let parsed: Difficulty = serde_json::from_str("2").unwrap();
        assert_eq!(parsed, Difficulty::Medium);
        assert!(serde_json::from_str::<Difficulty>("5").is_err());
    }
}
