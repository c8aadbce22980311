//! Mutation vocabulary and the per-slot mutation record.
//!
//! A fruit slot carries a set of named mutations plus per-stage progress.
//! [`SlotState`] is an immutable value object: observations are merged by
//! producing a new state, never by mutating one in place, which keeps the
//! normalizer pure and the evaluator trivially testable.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// The named mutations a fruit slot can carry.
///
/// The cold chain progresses base → intermediate → final
/// (`Chilled` → `Wet` → `Frozen`). The two color families each have a
/// lesser and a bound (intensified) variant. `Rainbow` and `Gold` are the
/// rarity pair.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    /// Cold-chain base.
    Chilled,
    /// Cold-chain intermediate; a wet fruit still needs snow to freeze.
    Wet,
    /// Cold-chain final.
    Frozen,
    /// Dawn family, lesser variant.
    Dawnlit,
    /// Dawn family, bound variant.
    Dawnbound,
    /// Amber family, lesser variant.
    Amberlit,
    /// Amber family, bound variant.
    Amberbound,
    /// Rarity mutation.
    Rainbow,
    /// Rarity mutation.
    Gold,
}

impl MutationKind {
    /// The single-letter code used in badges and summaries. Lesser color
    /// variants are lowercase, bound variants uppercase.
    #[must_use]
    pub const fn letter(&self) -> char {
        match self {
            Self::Chilled => 'C',
            Self::Wet => 'W',
            Self::Frozen => 'F',
            Self::Dawnlit => 'd',
            Self::Dawnbound => 'D',
            Self::Amberlit => 'a',
            Self::Amberbound => 'A',
            Self::Rainbow => 'R',
            Self::Gold => 'G',
        }
    }

    /// The progress stage this mutation contributes to, if any. The whole
    /// cold chain counts toward the `wet` stage; the rarity pair has no
    /// stage.
    #[must_use]
    pub const fn stage(&self) -> Option<Stage> {
        match self {
            Self::Chilled | Self::Wet | Self::Frozen => Some(Stage::Wet),
            Self::Dawnlit | Self::Dawnbound => Some(Stage::Dawn),
            Self::Amberlit | Self::Amberbound => Some(Stage::Amber),
            Self::Rainbow | Self::Gold => None,
        }
    }
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Chilled => "chilled",
            Self::Wet => "wet",
            Self::Frozen => "frozen",
            Self::Dawnlit => "dawnlit",
            Self::Dawnbound => "dawnbound",
            Self::Amberlit => "amberlit",
            Self::Amberbound => "amberbound",
            Self::Rainbow => "rainbow",
            Self::Gold => "gold",
        };
        write!(f, "{s}")
    }
}

/// The three progress stages a slot tracks.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Cold-chain progress.
    Wet,
    /// Dawn-family progress.
    Dawn,
    /// Amber-family progress.
    Amber,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Wet => "wet",
            Self::Dawn => "dawn",
            Self::Amber => "amber",
        };
        write!(f, "{s}")
    }
}

/// `complete`-of-`total` progress for one stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StageProgress {
    /// Fruits already carrying the stage's mutation.
    pub complete: u32,
    /// Fruits the stage applies to.
    pub total: u32,
}

impl StageProgress {
    /// Creates a progress record.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if `total == 0` or `complete > total`.
    pub fn new(complete: u32, total: u32) -> Result<Self, ValidationError> {
        if total == 0 {
            return Err(ValidationError::ZeroProgressTotal);
        }
        if complete > total {
            return Err(ValidationError::InvalidStageProgress { complete, total });
        }
        Ok(Self { complete, total })
    }

    /// A fully-satisfied stage signal (`n`-of-`n`). `n` must be positive.
    #[must_use]
    pub const fn satisfied(n: u32) -> Self {
        Self {
            complete: n,
            total: n,
        }
    }

    /// Picks the better of two observations: the one with the larger
    /// `total`, ties broken by higher `complete`.
    #[must_use]
    pub fn prefer(self, other: Self) -> Self {
        if other.total > self.total
            || (other.total == self.total && other.complete > self.complete)
        {
            other
        } else {
            self
        }
    }
}

impl fmt::Display for StageProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.complete, self.total)
    }
}

/// The canonical mutation record for one fruit slot.
///
/// Immutable once built; clone when reusing across plant copies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotState {
    kinds: Vec<MutationKind>,
    progress: BTreeMap<Stage, StageProgress>,
}

impl SlotState {
    /// The empty record: no mutations, no progress.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn from_parts(
        kinds: Vec<MutationKind>,
        progress: BTreeMap<Stage, StageProgress>,
    ) -> Self {
        Self { kinds, progress }
    }

    /// The mutation kinds in first-seen order (unique).
    #[must_use]
    pub fn kinds(&self) -> &[MutationKind] {
        &self.kinds
    }

    /// The letter codes in first-seen order.
    #[must_use]
    pub fn letters(&self) -> Vec<char> {
        self.kinds.iter().map(MutationKind::letter).collect()
    }

    /// Per-stage progress observations.
    #[must_use]
    pub const fn progress(&self) -> &BTreeMap<Stage, StageProgress> {
        &self.progress
    }

    /// Progress for one stage, if recorded.
    #[must_use]
    pub fn stage_progress(&self, stage: Stage) -> Option<StageProgress> {
        self.progress.get(&stage).copied()
    }

    /// Returns true if the slot carries the given mutation.
    #[must_use]
    pub fn has(&self, kind: MutationKind) -> bool {
        self.kinds.contains(&kind)
    }

    /// Returns true if the slot carries any mutation or progress signal.
    #[must_use]
    pub fn has_any_signal(&self) -> bool {
        !self.kinds.is_empty() || !self.progress.is_empty()
    }

    /// Cold chain reached intermediate or final.
    #[must_use]
    pub fn is_wet_progressed(&self) -> bool {
        self.has(MutationKind::Wet) || self.has(MutationKind::Frozen)
    }

    /// Cold chain at intermediate only: the fruit still needs snow.
    #[must_use]
    pub fn needs_second_stage(&self) -> bool {
        self.has(MutationKind::Wet) && !self.has(MutationKind::Frozen)
    }

    /// Dawn family acquired (lesser or bound).
    #[must_use]
    pub fn is_dawn_finished(&self) -> bool {
        self.has(MutationKind::Dawnlit) || self.has(MutationKind::Dawnbound)
    }

    /// Amber family acquired (lesser or bound).
    #[must_use]
    pub fn is_amber_finished(&self) -> bool {
        self.has(MutationKind::Amberlit) || self.has(MutationKind::Amberbound)
    }

    /// Returns true if the slot shows both lesser color variants, or both
    /// rarity mutations. Should never happen on a real fruit; the
    /// evaluator logs it and proceeds.
    #[must_use]
    pub fn has_conflicting_flags(&self) -> bool {
        (self.has(MutationKind::Dawnlit) && self.has(MutationKind::Amberlit))
            || (self.has(MutationKind::Rainbow) && self.has(MutationKind::Gold))
    }

    /// Merges two observations into a new state.
    ///
    /// Kinds are unioned (first-seen order, self first); per-stage
    /// progress keeps the max-`total` observation, ties broken by higher
    /// `complete`.
    #[must_use]
    pub fn merge(&self, other: &Self) -> Self {
        let mut kinds = self.kinds.clone();
        for kind in &other.kinds {
            if !kinds.contains(kind) {
                kinds.push(*kind);
            }
        }
        let mut progress = self.progress.clone();
        for (stage, incoming) in &other.progress {
            progress
                .entry(*stage)
                .and_modify(|existing| *existing = existing.prefer(*incoming))
                .or_insert(*incoming);
        }
        Self { kinds, progress }
    }
}
