//! The plant model handed to the evaluator.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::mutation::SlotState;

/// Where a plant's slot detail came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotSource {
    /// Matched against the reconciled inventory (authoritative).
    Inventory,
    /// Read from the garden/world snapshot.
    Garden,
    /// No reconciled match; on-screen badge counts only.
    Fallback,
}

impl SlotSource {
    /// Returns true if slot detail from this source is trusted enough for
    /// the rich evaluation strategy.
    #[must_use]
    pub const fn is_authoritative(&self) -> bool {
        matches!(self, Self::Inventory | Self::Garden)
    }
}

impl fmt::Display for SlotSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Inventory => "inventory",
            Self::Garden => "garden",
            Self::Fallback => "fallback",
        };
        write!(f, "{s}")
    }
}

/// Raw per-letter badge counts scraped from a plant's on-screen element.
///
/// Only the degraded strategy trusts these outright; the rich strategy
/// merges them in as a floor on finished counts after clamping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadgeCounts {
    /// Fruit showing the chilled badge.
    pub chilled: u32,
    /// Fruit showing the wet badge.
    pub wet: u32,
    /// Fruit showing the frozen badge.
    pub frozen: u32,
    /// Fruit showing the lesser dawn badge.
    pub dawn: u32,
    /// Fruit showing the bold (bound) dawn badge.
    pub dawn_bold: u32,
    /// Fruit showing the lesser amber badge.
    pub amber: u32,
    /// Fruit showing the bold (bound) amber badge.
    pub amber_bold: u32,
}

impl BadgeCounts {
    /// All-zero badge counts.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            chilled: 0,
            wet: 0,
            frozen: 0,
            dawn: 0,
            dawn_bold: 0,
            amber: 0,
            amber_bold: 0,
        }
    }

    /// Dawn-family coverage (lesser + bold).
    #[must_use]
    pub const fn dawn_total(&self) -> u32 {
        self.dawn + self.dawn_bold
    }

    /// Amber-family coverage (lesser + bold).
    #[must_use]
    pub const fn amber_total(&self) -> u32 {
        self.amber + self.amber_bold
    }

    /// Returns true if any badge is present.
    #[must_use]
    pub const fn any(&self) -> bool {
        self.chilled + self.wet + self.frozen + self.dawn_total() + self.amber_total() > 0
    }
}

/// One plant as seen by an evaluation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlantEntry {
    /// Display name.
    pub name: String,

    /// Per-slot mutation records; empty when no source carried detail.
    pub slots: Vec<SlotState>,

    /// Declared fruit count; never below the slot count.
    pub fruit_count: u32,

    /// Provenance of the slot detail.
    pub slot_source: SlotSource,

    /// On-screen badge counts for the degraded strategy.
    pub badges: BadgeCounts,
}

impl PlantEntry {
    /// Creates an entry with slot detail. The fruit count is raised to the
    /// slot count if declared lower.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyPlantName`] when the name is empty
    /// or whitespace-only.
    pub fn with_slots(
        name: impl Into<String>,
        slots: Vec<SlotState>,
        declared_fruit_count: u32,
        slot_source: SlotSource,
    ) -> Result<Self, ValidationError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ValidationError::EmptyPlantName);
        }
        let slot_count = u32::try_from(slots.len()).unwrap_or(u32::MAX);
        let fruit_count = declared_fruit_count.max(slot_count);
        Ok(Self {
            name,
            slots,
            fruit_count,
            slot_source,
            badges: BadgeCounts::none(),
        })
    }

    /// Creates a slot-less fallback entry. The fruit count falls back to a
    /// count parsed from the display name (`"Blueberry x12"` → 12) when
    /// the declared count is zero.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyPlantName`] when the name is empty
    /// or whitespace-only.
    pub fn fallback(
        name: impl Into<String>,
        declared_fruit_count: u32,
        badges: BadgeCounts,
    ) -> Result<Self, ValidationError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ValidationError::EmptyPlantName);
        }
        let fruit_count = if declared_fruit_count > 0 {
            declared_fruit_count
        } else {
            count_from_name(&name).unwrap_or(0)
        };
        Ok(Self {
            name,
            slots: Vec::new(),
            fruit_count,
            slot_source: SlotSource::Fallback,
            badges,
        })
    }

    /// Attaches badge counts.
    #[must_use]
    pub const fn with_badges(mut self, badges: BadgeCounts) -> Self {
        self.badges = badges;
        self
    }

    /// Returns true if any slot carries a mutation signal.
    #[must_use]
    pub fn has_slot_signal(&self) -> bool {
        self.slots.iter().any(SlotState::has_any_signal)
    }

    /// Plants with no fruit are discarded before evaluation.
    #[must_use]
    pub const fn is_trackable(&self) -> bool {
        self.fruit_count > 0
    }
}

static NAME_COUNT_RE: OnceLock<Regex> = OnceLock::new();

/// Parses a trailing multiplier out of a display name, e.g.
/// `"Blueberry x12"` or `"Peach X3"`.
#[must_use]
pub fn count_from_name(name: &str) -> Option<u32> {
    let re = NAME_COUNT_RE
        .get_or_init(|| Regex::new(r"[xX]\s*(\d+)\s*$").expect("name count pattern is valid"));
    re.captures(name.trim())?.get(1)?.as_str().parse().ok()
}

/// Normalizes a display name for index lookups: trimmed, lowercased, with
/// any trailing multiplier removed.
#[must_use]
pub fn normalize_name(name: &str) -> String {
    let trimmed = name.trim();
    let without_count = NAME_COUNT_RE
        .get_or_init(|| Regex::new(r"[xX]\s*(\d+)\s*$").expect("name count pattern is valid"))
        .replace(trimmed, "");
    without_count.trim().to_lowercase()
}
