//! Core Score trait definition

use std::cmp::Ordering;
use std::fmt::{Debug, Display};
use std::ops::{Add, Neg, Sub};

use thiserror::Error;

use super::ScoreLevel;

/// Core trait for all score types.
///
/// A score is a fixed number of `i64` levels compared lexicographically,
/// highest priority first. Constraint weights are scores too: a constraint's
/// contribution is its weight scaled by the summed match weight of its
/// matches. Level arithmetic, [`Score::scale`] included, saturates at the
/// `i64` bounds instead of wrapping.
pub trait Score:
    Copy
    + Debug
    + Display
    + Default
    + Send
    + Sync
    + PartialEq
    + Eq
    + PartialOrd
    + Ord
    + Add<Output = Self>
    + Sub<Output = Self>
    + Neg<Output = Self>
    + 'static
{
    /// Returns true if every hard level is non-negative.
    fn is_feasible(&self) -> bool;

    /// Returns the zero score (identity element for addition).
    fn zero() -> Self;

    /// Returns the number of score levels.
    fn levels_count() -> usize;

    /// Returns the level values, highest priority first.
    fn to_level_numbers(&self) -> Vec<i64>;

    /// Creates a score from level numbers, or `None` if the count is wrong.
    fn from_level_numbers(levels: &[i64]) -> Option<Self>;

    /// Multiplies every level by `factor`, saturating at the `i64` bounds.
    fn scale(&self, factor: i64) -> Self;

    /// Returns the absolute value of every level.
    fn abs(&self) -> Self;

    /// Returns the semantic label for the level at `index`, if it exists.
    fn level_label(index: usize) -> Option<ScoreLevel>;

    /// Returns true if any level is non-zero at a hard level.
    fn is_hard(&self) -> bool {
        self.to_level_numbers()
            .iter()
            .enumerate()
            .any(|(i, v)| *v != 0 && Self::level_label(i) == Some(ScoreLevel::Hard))
    }

    fn compare(&self, other: &Self) -> Ordering {
        self.cmp(other)
    }

    fn is_better_than(&self, other: &Self) -> bool {
        self > other
    }

    fn is_worse_than(&self, other: &Self) -> bool {
        self < other
    }
}

/// Scores that have a textual form, such as `"0hard/-100soft"`.
pub trait ParseableScore: Score {
    /// Parses a score from its textual form.
    ///
    /// # Format
    /// - SimpleScore: `"42"`
    /// - HardSoftScore: `"0hard/-100soft"`
    /// - HardMediumSoftScore: `"0hard/0medium/-100soft"`
    fn parse(s: &str) -> Result<Self, ScoreParseError>;

    /// Returns the textual form accepted by [`ParseableScore::parse`].
    fn to_string_repr(&self) -> String;
}

/// Error when parsing a score from string
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("score parse error: {message}")]
pub struct ScoreParseError {
    pub message: String,
}
