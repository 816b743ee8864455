//! HardMediumSoftScore - Three-level score

use std::fmt;

use super::traits::Score;
use super::ScoreLevel;

/// A score with hard, medium and soft levels, compared in that order.
///
/// ```
/// use scoreforge_core::{HardMediumSoftScore, ParseableScore};
///
/// let a = HardMediumSoftScore::of(0, -10, -100);
/// let b = HardMediumSoftScore::of(0, -5, -200);
/// assert!(b > a);
/// assert_eq!(HardMediumSoftScore::parse("0hard/-5medium/-200soft"), Ok(b));
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HardMediumSoftScore {
    hard: i64,
    medium: i64,
    soft: i64,
}

impl HardMediumSoftScore {
    pub const ZERO: HardMediumSoftScore = HardMediumSoftScore {
        hard: 0,
        medium: 0,
        soft: 0,
    };

    pub const ONE_HARD: HardMediumSoftScore = HardMediumSoftScore {
        hard: 1,
        medium: 0,
        soft: 0,
    };

    pub const ONE_MEDIUM: HardMediumSoftScore = HardMediumSoftScore {
        hard: 0,
        medium: 1,
        soft: 0,
    };

    pub const ONE_SOFT: HardMediumSoftScore = HardMediumSoftScore {
        hard: 0,
        medium: 0,
        soft: 1,
    };

    #[inline]
    pub const fn of(hard: i64, medium: i64, soft: i64) -> Self {
        HardMediumSoftScore { hard, medium, soft }
    }

    #[inline]
    pub const fn hard(&self) -> i64 {
        self.hard
    }

    #[inline]
    pub const fn medium(&self) -> i64 {
        self.medium
    }

    #[inline]
    pub const fn soft(&self) -> i64 {
        self.soft
    }
}

impl Score for HardMediumSoftScore {
    #[inline]
    fn is_feasible(&self) -> bool {
        self.hard >= 0
    }

    #[inline]
    fn zero() -> Self {
        HardMediumSoftScore::ZERO
    }

    #[inline]
    fn levels_count() -> usize {
        3
    }

    impl_score_levels!(HardMediumSoftScore { hard, medium, soft } => of);

    fn level_label(index: usize) -> Option<ScoreLevel> {
        match index {
            0 => Some(ScoreLevel::Hard),
            1 => Some(ScoreLevel::Medium),
            2 => Some(ScoreLevel::Soft),
            _ => None,
        }
    }
}

impl_score_ops!(HardMediumSoftScore { hard, medium, soft } => of);

impl fmt::Debug for HardMediumSoftScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "HardMediumSoftScore({}, {}, {})",
            self.hard, self.medium, self.soft
        )
    }
}

impl_score_parse!(HardMediumSoftScore {
    hard => "hard",
    medium => "medium",
    soft => "soft"
} => of);
