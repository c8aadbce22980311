//! Per-pass inventory reconciliation and visual-item matching.
//!
//! A [`ReconciledInventory`] is built fresh for every scan pass from the
//! resolved raw payload, owns its own lookup indexes and consumption
//! flags, and is discarded when the pass ends. Matching consumes each
//! entry at most once so duplicate-named plants are never double-counted.

use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::mutation::SlotState;
use crate::normalize::normalize_slot;
use crate::plant::normalize_name;
use crate::source::{RawItem, ResolvedInventory};

/// How many ancestor levels a stable identifier may be read from, on top
/// of the element itself.
pub const MAX_ID_ANCESTOR_DEPTH: usize = 5;

/// One reconciled inventory record available for matching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciledEntry {
    /// Position in the accepted source list.
    pub base_index: usize,
    /// Stable identifier, if the raw shape carried one.
    pub id: Option<String>,
    /// Normalized display name, if the raw shape carried one.
    pub name: Option<String>,
    /// Normalized slot records.
    pub slots: Vec<SlotState>,
    /// Declared fruit count, if the raw shape carried one.
    pub fruit_count: Option<u32>,
    /// Set once the entry has been matched this pass.
    pub used: bool,
}

/// One on-screen scanned item, as read by the visual collaborator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisualItem {
    /// Stable positional index read from the element, if present.
    pub position: Option<usize>,
    /// Identifier candidates: the element's own, then each ancestor's,
    /// nearest first. Only the element plus [`MAX_ID_ANCESTOR_DEPTH`]
    /// ancestors are consulted.
    pub id_candidates: Vec<String>,
    /// Display name read from the element, if present.
    pub name: Option<String>,
}

impl VisualItem {
    /// An item known only by name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Sets the positional index.
    #[must_use]
    pub const fn at_position(mut self, position: usize) -> Self {
        self.position = Some(position);
        self
    }

    /// Appends an identifier candidate.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id_candidates.push(id.into());
        self
    }
}

/// The reconciliation-pass object: accepted entries plus lookup indexes
/// and consumption flags. Never shared across passes.
#[derive(Debug)]
pub struct ReconciledInventory {
    source_name: String,
    has_slot_data: bool,
    entries: Vec<ReconciledEntry>,
    by_id: HashMap<String, usize>,
    by_name: HashMap<String, VecDeque<usize>>,
}

impl ReconciledInventory {
    /// Builds the pass object from a resolved priority chain.
    #[must_use]
    pub fn from_resolved(resolved: &ResolvedInventory) -> Self {
        let entries: Vec<ReconciledEntry> = resolved
            .items
            .iter()
            .enumerate()
            .map(|(base_index, item)| entry_from_raw(base_index, item))
            .collect();

        let mut by_id = HashMap::new();
        let mut by_name: HashMap<String, VecDeque<usize>> = HashMap::new();
        for entry in &entries {
            if let Some(id) = &entry.id {
                // First writer wins; duplicate ids resolve in source order.
                by_id.entry(id.clone()).or_insert(entry.base_index);
            }
            if let Some(name) = &entry.name {
                by_name.entry(name.clone()).or_default().push_back(entry.base_index);
            }
        }

        Self {
            source_name: resolved.source_name.clone(),
            has_slot_data: resolved.has_slot_data,
            entries,
            by_id,
            by_name,
        }
    }

    /// Which source the entries came from.
    #[must_use]
    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    /// Whether the accepted payload carried slot detail at all.
    #[must_use]
    pub const fn has_slot_data(&self) -> bool {
        self.has_slot_data
    }

    /// Number of reconciled entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries consumed so far this pass.
    #[must_use]
    pub fn matched_count(&self) -> usize {
        self.entries.iter().filter(|e| e.used).count()
    }

    /// Matches a scanned item against the entries: positional index, then
    /// identifier, then first unconsumed entry under the normalized name.
    /// A successful match consumes the entry for the rest of the pass;
    /// `None` means the caller falls back to badge counts only.
    pub fn claim(&mut self, item: &VisualItem) -> Option<&ReconciledEntry> {
        let index = self.find_unused(item)?;
        self.entries[index].used = true;
        Some(&self.entries[index])
    }

    fn find_unused(&self, item: &VisualItem) -> Option<usize> {
        if let Some(position) = item.position {
            if self.entries.get(position).is_some_and(|e| !e.used) {
                return Some(position);
            }
        }

        for id in item.id_candidates.iter().take(MAX_ID_ANCESTOR_DEPTH + 1) {
            if let Some(&index) = self.by_id.get(id) {
                if !self.entries[index].used {
                    return Some(index);
                }
            }
        }

        if let Some(name) = &item.name {
            if let Some(queue) = self.by_name.get(&normalize_name(name)) {
                // FIFO within a name; entries consumed through other
                // routes are skipped, not removed.
                return queue.iter().copied().find(|&index| !self.entries[index].used);
            }
        }

        None
    }
}

fn entry_from_raw(base_index: usize, item: &RawItem) -> ReconciledEntry {
    let slots = item
        .slot_descriptors()
        .map(|lists| lists.iter().map(|list| normalize_slot(list)).collect())
        .unwrap_or_default();
    ReconciledEntry {
        base_index,
        id: item.id(),
        name: item.name().map(|n| normalize_name(&n)),
        slots,
        fruit_count: item.fruit_count(),
        used: false,
    }
}
