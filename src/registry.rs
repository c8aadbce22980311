//! Last-summary-per-source registry with subscriptions.
//!
//! Caches the most recent [`MutationSummary`] per logical source and fans
//! published summaries out to subscribers. Each callback invocation is
//! isolated: a panicking subscriber is logged and the rest still fire.
//! Nothing here returns an error to callers; `get` on an empty registry
//! is simply `None`.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::summary::{MutationSummary, PlantListing};
use crate::weather::WeatherKind;

/// The logical source a summary was computed from.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum SummarySource {
    /// The inventory scan.
    Inventory,
    /// The garden/world scan.
    Garden,
}

/// Priority order for [`SummaryRegistry::get`] with no explicit source.
const SOURCE_PRIORITY: [SummarySource; 2] = [SummarySource::Inventory, SummarySource::Garden];

impl fmt::Display for SummarySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Inventory => "inventory",
            Self::Garden => "garden",
        };
        write!(f, "{s}")
    }
}

/// Unique identifier for a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    /// Create a new random subscription id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubscriptionId {
    fn default() -> Self {
        Self::new()
    }
}

/// The per-source inspection snapshot, independent of the numeric
/// summary. For manual tooling, not for control flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebugSnapshot {
    /// Which source the listing belongs to.
    pub source: SummarySource,
    /// The weather active when the listing was recorded.
    pub active_weather: WeatherKind,
    /// When the listing was recorded.
    pub recorded_at: DateTime<Utc>,
    /// Eligible plant names per weather from the last pass.
    pub listing: PlantListing,
}

type Callback = Box<dyn Fn(SummarySource, &MutationSummary) + Send + Sync>;
type SubscriberMap = Mutex<HashMap<SubscriptionId, Arc<Callback>>>;

/// The registry: last summary per source, subscriptions, debug surface.
#[derive(Default)]
pub struct SummaryRegistry {
    summaries: Mutex<BTreeMap<SummarySource, MutationSummary>>,
    listings: Mutex<BTreeMap<SummarySource, DebugSnapshot>>,
    subscribers: Arc<SubscriberMap>,
}

impl SummaryRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the cached summary for `source` and notifies subscribers.
    ///
    /// Subscriber panics are caught and logged; remaining subscribers are
    /// still invoked.
    pub fn publish(&self, source: SummarySource, summary: MutationSummary) {
        {
            let mut summaries = match self.summaries.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            summaries.insert(source, summary.clone());
        }
        self.notify(source, &summary);
    }

    /// Records the per-weather plant listing for the debug surface.
    pub fn record_listing(
        &self,
        source: SummarySource,
        active_weather: WeatherKind,
        listing: PlantListing,
    ) {
        let mut listings = match self.listings.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        listings.insert(
            source,
            DebugSnapshot {
                source,
                active_weather,
                recorded_at: Utc::now(),
                listing,
            },
        );
    }

    /// The cached summary for `source`, or — with no source — the first
    /// cached one in priority order (inventory before garden). Never
    /// errors; `None` means nothing has been published yet.
    #[must_use]
    pub fn get(&self, source: Option<SummarySource>) -> Option<MutationSummary> {
        let summaries = match self.summaries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        match source {
            Some(source) => summaries.get(&source).cloned(),
            None => SOURCE_PRIORITY
                .iter()
                .find_map(|source| summaries.get(source).cloned()),
        }
    }

    /// The last recorded debug snapshot for `source`.
    #[must_use]
    pub fn debug_snapshot(&self, source: SummarySource) -> Option<DebugSnapshot> {
        let listings = match self.listings.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        listings.get(&source).cloned()
    }

    /// Registers a subscriber. With `fire_immediately`, every cached
    /// summary is delivered to the new subscriber right away, in source
    /// priority order. The subscription ends when the returned handle is
    /// dropped or explicitly unsubscribed.
    pub fn subscribe<F>(&self, callback: F, fire_immediately: bool) -> Subscription
    where
        F: Fn(SummarySource, &MutationSummary) + Send + Sync + 'static,
    {
        let id = SubscriptionId::new();
        let callback: Arc<Callback> = Arc::new(Box::new(callback));

        {
            let mut subscribers = match self.subscribers.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            subscribers.insert(id, Arc::clone(&callback));
        }

        if fire_immediately {
            for source in SOURCE_PRIORITY {
                if let Some(summary) = self.get(Some(source)) {
                    invoke_isolated(id, &callback, source, &summary);
                }
            }
        }

        Subscription {
            id,
            subscribers: Arc::downgrade(&self.subscribers),
            unsubscribed: AtomicBool::new(false),
        }
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        match self.subscribers.lock() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    fn notify(&self, source: SummarySource, summary: &MutationSummary) {
        // Snapshot under the lock, invoke outside it, so a subscriber
        // calling back into the registry cannot deadlock.
        let snapshot: Vec<(SubscriptionId, Arc<Callback>)> = {
            let subscribers = match self.subscribers.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            subscribers
                .iter()
                .map(|(id, cb)| (*id, Arc::clone(cb)))
                .collect()
        };
        for (id, callback) in snapshot {
            invoke_isolated(id, &callback, source, summary);
        }
    }
}

fn invoke_isolated(
    id: SubscriptionId,
    callback: &Arc<Callback>,
    source: SummarySource,
    summary: &MutationSummary,
) {
    let result = catch_unwind(AssertUnwindSafe(|| callback(source, summary)));
    if result.is_err() {
        warn!(subscription = %id.0, %source, "summary subscriber panicked, continuing");
    }
}

/// Handle for one registry subscription. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriptionId,
    subscribers: Weak<SubscriberMap>,
    unsubscribed: AtomicBool,
}

impl Subscription {
    /// The id backing this subscription.
    #[must_use]
    pub const fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Explicit, idempotent unsubscription.
    pub fn unsubscribe(&self) {
        if self.unsubscribed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(subscribers) = self.subscribers.upgrade() {
            let mut guard = match subscribers.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            guard.remove(&self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
