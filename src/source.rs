//! Raw-inventory sources and the priority-chain resolver.
//!
//! Several collaborators can describe the same inventory: an authoritative
//! per-character store, shared external caches, a global cache. None is
//! always present and not all carry fruit-slot detail, so sources are
//! tried strictly in the caller's priority order and the first one whose
//! payload carries slot detail wins; failing that, the first non-empty
//! payload is kept as a best-effort fallback.
//!
//! Payloads are duck-typed JSON: the same concept arrives in several
//! vendor shapes, so [`RawItem`] reads fields through left-to-right probe
//! chains returning `Option` instead of branching on a type tag.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::SourceError;

/// One opaque inventory record as returned by a fetcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawItem(pub Value);

impl RawItem {
    /// Wraps a raw JSON payload.
    #[must_use]
    pub const fn new(value: Value) -> Self {
        Self(value)
    }

    /// The stable identifier, if the shape carries one.
    #[must_use]
    pub fn id(&self) -> Option<String> {
        for key in ["id", "uuid", "guid", "itemId"] {
            match self.0.get(key) {
                Some(Value::String(s)) if !s.is_empty() => return Some(s.clone()),
                Some(Value::Number(n)) => return Some(n.to_string()),
                _ => {}
            }
        }
        None
    }

    /// The display name, if the shape carries one.
    #[must_use]
    pub fn name(&self) -> Option<String> {
        for key in ["name", "displayName", "label", "title"] {
            if let Some(s) = self.0.get(key).and_then(Value::as_str) {
                if !s.is_empty() {
                    return Some(s.to_string());
                }
            }
        }
        None
    }

    /// The declared fruit count, if the shape carries one.
    #[must_use]
    pub fn fruit_count(&self) -> Option<u32> {
        for key in ["fruitCount", "fruit_count", "count", "amount"] {
            if let Some(n) = self.0.get(key).and_then(Value::as_u64) {
                return u32::try_from(n).ok();
            }
        }
        None
    }

    /// The per-slot descriptor lists, if the shape carries slot detail.
    ///
    /// Accepted shapes for the slot container: an array under `slots`,
    /// `fruit` or `fruits`. Each element may be a descriptor array, an
    /// object holding one under `mutations` / `modifiers`, or a bare
    /// descriptor (string/object), which reads as a one-descriptor slot.
    #[must_use]
    pub fn slot_descriptors(&self) -> Option<Vec<Vec<Value>>> {
        let container = ["slots", "fruit", "fruits"]
            .iter()
            .find_map(|key| self.0.get(*key))?
            .as_array()?;

        let slots = container
            .iter()
            .map(|slot| match slot {
                Value::Array(descriptors) => descriptors.clone(),
                Value::Object(_) => slot
                    .get("mutations")
                    .or_else(|| slot.get("modifiers"))
                    .and_then(Value::as_array)
                    .cloned()
                    .unwrap_or_else(|| vec![slot.clone()]),
                other => vec![other.clone()],
            })
            .collect();
        Some(slots)
    }

    /// Returns true if this item carries a slots-shaped field.
    #[must_use]
    pub fn has_slot_data(&self) -> bool {
        self.slot_descriptors().is_some()
    }
}

/// A fetcher for one raw-inventory source.
///
/// Implementations must not let failures escape their own boundary where
/// they can help it (`Ok(None)` for "nothing there"); errors that do
/// surface are logged by the resolver and treated as an empty result.
pub trait InventorySource: Send + Sync {
    /// A short name for diagnostics.
    fn name(&self) -> &str;

    /// Fetches the current payload, or `None` when the source is empty.
    fn fetch(&self) -> Result<Option<Vec<RawItem>>, SourceError>;
}

/// The accepted payload of a resolved priority chain.
#[derive(Debug, Clone)]
pub struct ResolvedInventory {
    /// Which source won.
    pub source_name: String,
    /// The accepted items.
    pub items: Vec<RawItem>,
    /// Whether any accepted item carries slot detail.
    pub has_slot_data: bool,
}

/// Tries sources strictly in priority order and accepts the first
/// non-empty payload where any item carries slot detail; otherwise the
/// first non-empty payload. Returns `None` when every source is empty —
/// callers must treat that as "no reconciliation possible", not as "zero
/// eligible plants".
#[must_use]
pub fn resolve_sources(sources: &[&dyn InventorySource]) -> Option<ResolvedInventory> {
    let mut fallback: Option<ResolvedInventory> = None;

    for source in sources {
        let items = match source.fetch() {
            Ok(Some(items)) => items,
            Ok(None) => {
                debug!(source = source.name(), "inventory source empty");
                continue;
            }
            Err(err) => {
                warn!(source = source.name(), error = %err, "inventory source failed, falling through");
                continue;
            }
        };
        if items.is_empty() {
            continue;
        }

        let has_slot_data = items.iter().any(RawItem::has_slot_data);
        let resolved = ResolvedInventory {
            source_name: source.name().to_string(),
            items,
            has_slot_data,
        };
        if has_slot_data {
            return Some(resolved);
        }
        if fallback.is_none() {
            fallback = Some(resolved);
        }
    }

    fallback
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct FixedSource {
        name: &'static str,
        result: Result<Option<Vec<RawItem>>, SourceError>,
    }

    impl FixedSource {
        fn items(name: &'static str, items: Vec<Value>) -> Self {
            Self {
                name,
                result: Ok(Some(items.into_iter().map(RawItem::new).collect())),
            }
        }

        fn empty(name: &'static str) -> Self {
            Self {
                name,
                result: Ok(None),
            }
        }

        fn failing(name: &'static str) -> Self {
            Self {
                name,
                result: Err(SourceError::Unavailable {
                    source: name.to_string(),
                    reason: "gone".to_string(),
                }),
            }
        }
    }

    impl InventorySource for FixedSource {
        fn name(&self) -> &str {
            self.name
        }

        fn fetch(&self) -> Result<Option<Vec<RawItem>>, SourceError> {
            match &self.result {
                Ok(v) => Ok(v.clone()),
                Err(SourceError::Unavailable { source, reason }) => {
                    Err(SourceError::Unavailable {
                        source: source.clone(),
                        reason: reason.clone(),
                    })
                }
                Err(SourceError::MalformedPayload { source, reason }) => {
                    Err(SourceError::MalformedPayload {
                        source: source.clone(),
                        reason: reason.clone(),
                    })
                }
            }
        }
    }

    #[test]
    fn test_raw_item_id_probe_chain() {
        assert_eq!(RawItem::new(json!({"id": "a-1"})).id().as_deref(), Some("a-1"));
        assert_eq!(RawItem::new(json!({"uuid": "u-2"})).id().as_deref(), Some("u-2"));
        assert_eq!(RawItem::new(json!({"itemId": 42})).id().as_deref(), Some("42"));
        assert_eq!(RawItem::new(json!({"id": ""})).id(), None);
        assert_eq!(RawItem::new(json!({})).id(), None);
    }

    #[test]
    fn test_raw_item_name_probe_chain() {
        assert_eq!(
            RawItem::new(json!({"displayName": "Peach"})).name().as_deref(),
            Some("Peach")
        );
        assert_eq!(RawItem::new(json!({"title": "Mango"})).name().as_deref(), Some("Mango"));
        assert_eq!(RawItem::new(json!({"name": 3})).name(), None);
    }

    #[test]
    fn test_raw_item_slot_shapes() {
        // Array-of-arrays shape.
        let a = RawItem::new(json!({"slots": [["wet"], []]}));
        assert_eq!(a.slot_descriptors().unwrap().len(), 2);
        assert!(a.has_slot_data());

        // Objects holding a mutations array.
        let b = RawItem::new(json!({"fruits": [{"mutations": ["frozen", "gold"]}]}));
        let slots = b.slot_descriptors().unwrap();
        assert_eq!(slots[0].len(), 2);

        // Bare descriptors read as one-descriptor slots.
        let c = RawItem::new(json!({"fruit": ["dawnlit", {"name": "amberlit"}]}));
        let slots = c.slot_descriptors().unwrap();
        assert_eq!(slots.len(), 2);
        assert_eq!(slots[0], vec![json!("dawnlit")]);

        // No slots-shaped field.
        let d = RawItem::new(json!({"name": "Apple", "count": 3}));
        assert!(!d.has_slot_data());
    }

    #[test]
    fn test_resolver_prefers_slot_data_over_priority_fallback() {
        let first = FixedSource::items("cache", vec![json!({"name": "Apple", "count": 2})]);
        let second = FixedSource::items(
            "store",
            vec![json!({"name": "Apple", "slots": [["wet"]]})],
        );
        let resolved = resolve_sources(&[&first, &second]).unwrap();
        assert_eq!(resolved.source_name, "store");
        assert!(resolved.has_slot_data);
    }

    #[test]
    fn test_resolver_first_slot_data_source_short_circuits() {
        let first = FixedSource::items("store", vec![json!({"slots": [[]]})]);
        let second = FixedSource::items("cache", vec![json!({"slots": [["wet"]]})]);
        let resolved = resolve_sources(&[&first, &second]).unwrap();
        assert_eq!(resolved.source_name, "store");
    }

    #[test]
    fn test_resolver_keeps_first_nonempty_as_fallback() {
        let first = FixedSource::empty("store");
        let second = FixedSource::items("cache", vec![json!({"name": "Apple"})]);
        let third = FixedSource::items("global", vec![json!({"name": "Pear"})]);
        let resolved = resolve_sources(&[&first, &second, &third]).unwrap();
        assert_eq!(resolved.source_name, "cache");
        assert!(!resolved.has_slot_data);
    }

    #[test]
    fn test_resolver_failure_falls_through() {
        let first = FixedSource::failing("store");
        let second = FixedSource::items("cache", vec![json!({"slots": [["wet"]]})]);
        let resolved = resolve_sources(&[&first, &second]).unwrap();
        assert_eq!(resolved.source_name, "cache");
    }

    #[test]
    fn test_resolver_all_empty_is_none() {
        let first = FixedSource::empty("store");
        let second = FixedSource::failing("cache");
        let third = FixedSource::items("global", vec![]);
        assert!(resolve_sources(&[&first, &second, &third]).is_none());
    }
}
