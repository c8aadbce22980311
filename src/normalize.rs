//! Slot-state normalization.
//!
//! Turns the free-form per-slot mutation descriptors that raw sources
//! carry (plain strings, or structured records in several vendor shapes)
//! into one canonical [`SlotState`]. Classification is by substring
//! membership after lowercasing; a `bound` color variant suppresses the
//! lesser classification for that same descriptor only. Malformed pieces
//! are dropped per descriptor and never invalidate the rest of the slot.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::mutation::{MutationKind, SlotState, Stage, StageProgress};

static FRACTION_RE: OnceLock<Regex> = OnceLock::new();

/// The embedded `"<n>/<m>"` progress fraction some descriptors carry.
fn fraction_regex() -> &'static Regex {
    FRACTION_RE.get_or_init(|| {
        Regex::new(r"(\d+)\s*/\s*(\d+)").expect("fraction pattern is valid")
    })
}

/// Normalizes one slot's raw descriptors into a canonical state.
///
/// Descriptors may be JSON strings or structured records; unrecognized
/// shapes and unknown mutation words are skipped.
#[must_use]
pub fn normalize_slot(descriptors: &[Value]) -> SlotState {
    let texts: Vec<String> = descriptors.iter().filter_map(descriptor_text).collect();
    normalize_descriptor_texts(texts.iter().map(String::as_str))
}

/// Normalizes one slot from plain descriptor strings.
pub fn normalize_descriptor_texts<'a, I>(descriptors: I) -> SlotState
where
    I: IntoIterator<Item = &'a str>,
{
    let mut kinds: Vec<MutationKind> = Vec::new();
    let mut occurrences: BTreeMap<Stage, u32> = BTreeMap::new();
    let mut explicit: BTreeMap<Stage, StageProgress> = BTreeMap::new();

    for text in descriptors {
        let lower = text.to_lowercase();
        let Some(kind) = classify(&lower) else {
            if !lower.trim().is_empty() {
                debug!(descriptor = %text, "unrecognized mutation descriptor, skipping");
            }
            continue;
        };

        if !kinds.contains(&kind) {
            kinds.push(kind);
        }

        let Some(stage) = kind.stage() else {
            continue;
        };
        *occurrences.entry(stage).or_insert(0) += 1;

        if let Some(fraction) = parse_fraction(&lower) {
            explicit
                .entry(stage)
                .and_modify(|existing| *existing = existing.prefer(fraction))
                .or_insert(fraction);
        }
    }

    // A counted stage with no explicit fraction is a fully-satisfied signal.
    let mut progress = explicit;
    for (stage, occ) in occurrences {
        progress
            .entry(stage)
            .or_insert_with(|| StageProgress::satisfied(occ));
    }

    SlotState::from_parts(kinds, progress)
}

/// Classifies one lowercased descriptor into a mutation kind.
///
/// A descriptor classifies as at most one kind; the bound color variants
/// win over their lesser counterpart for the same descriptor.
fn classify(lower: &str) -> Option<MutationKind> {
    if lower.contains("frozen") {
        Some(MutationKind::Frozen)
    } else if lower.contains("chill") {
        Some(MutationKind::Chilled)
    } else if lower.contains("wet") {
        Some(MutationKind::Wet)
    } else if lower.contains("dawn") {
        if lower.contains("bound") {
            Some(MutationKind::Dawnbound)
        } else {
            Some(MutationKind::Dawnlit)
        }
    } else if lower.contains("amber") {
        if lower.contains("bound") {
            Some(MutationKind::Amberbound)
        } else {
            Some(MutationKind::Amberlit)
        }
    } else if lower.contains("rainbow") {
        Some(MutationKind::Rainbow)
    } else if lower.contains("gold") {
        Some(MutationKind::Gold)
    } else {
        None
    }
}

/// Extracts an embedded `"<n>/<m>"` fraction. Zero totals and
/// `complete > total` are dropped; the classification still counts.
fn parse_fraction(lower: &str) -> Option<StageProgress> {
    let caps = fraction_regex().captures(lower)?;
    let complete: u32 = caps.get(1)?.as_str().parse().ok()?;
    let total: u32 = caps.get(2)?.as_str().parse().ok()?;
    match StageProgress::new(complete, total) {
        Ok(progress) => Some(progress),
        Err(_) => {
            debug!(fraction = %&caps[0], "unparseable progress fraction, ignoring");
            None
        }
    }
}

/// Reads descriptor text from the vendor shapes we have seen: a bare
/// string, or an object keyed `name` / `label` / `text` / `mutation`.
/// Probes are tried left to right; the first string wins.
fn descriptor_text(value: &Value) -> Option<String> {
    if let Some(s) = value.as_str() {
        return Some(s.to_string());
    }
    for key in ["name", "label", "text", "mutation"] {
        if let Some(s) = value.get(key).and_then(Value::as_str) {
            return Some(s.to_string());
        }
    }
    None
}
