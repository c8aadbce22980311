//! The debounced evaluation-pass scheduler.
//!
//! A dedicated worker thread owns the full pass: resolve the inventory
//! priority chain, match scanned items, evaluate, aggregate, publish.
//! External signals (a periodic tick, inventory or world change
//! notifications) enqueue triggers with a non-blocking `try_send`;
//! triggers landing within the debounce window collapse into one pass,
//! and a pass always runs to completion before the next one starts.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use tracing::{debug, warn};

use crate::error::{BloomResult, SchedulerError, ValidationError};
use crate::mutation::SlotState;
use crate::plant::{BadgeCounts, PlantEntry, SlotSource};
use crate::reconcile::{ReconciledInventory, VisualItem};
use crate::registry::{SummaryRegistry, SummarySource};
use crate::source::{resolve_sources, InventorySource};
use crate::summary::evaluate_with_listing;
use crate::weather::{WeatherSource, WeatherWindow};

/// An external signal requesting an evaluation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassTrigger {
    /// The periodic tick.
    Tick,
    /// The inventory changed upstream.
    InventoryChanged,
    /// The world snapshot changed upstream.
    WorldChanged,
}

/// One on-screen item as delivered by a visual scan collaborator.
#[derive(Debug, Clone, Default)]
pub struct ScannedPlant {
    /// Matching keys read from the element.
    pub visual: VisualItem,
    /// Fruit count read from the element, zero when absent.
    pub declared_fruit_count: u32,
    /// On-screen badge counts.
    pub badges: BadgeCounts,
    /// Slot detail carried by the scan itself (world snapshots sometimes
    /// include it); empty for plain screen elements.
    pub slots: Vec<SlotState>,
}

/// Synchronous provider of the currently visible plants.
pub trait VisualScanSource: Send {
    /// The visible items at this instant. Must not block.
    fn scan(&self) -> Vec<ScannedPlant>;
}

/// One scan wired into the engine, tagged with the registry source its
/// summaries publish under.
pub struct ScanRegistration {
    /// Registry key for this scan's summaries.
    pub source: SummarySource,
    /// The scan collaborator.
    pub scan: Box<dyn VisualScanSource>,
}

/// The collaborators one engine drives.
pub struct EngineParts {
    /// Raw-inventory fetchers in priority order.
    pub inventory_sources: Vec<Box<dyn InventorySource>>,
    /// The weather source.
    pub weather: Box<dyn WeatherSource>,
    /// The visual scans to evaluate each pass.
    pub scans: Vec<ScanRegistration>,
}

/// Scheduler configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Quiet time before a trigger burst runs as one pass.
    pub debounce: Duration,
    /// Max queued triggers before back-pressure drops them.
    pub trigger_queue_capacity: usize,
    /// Window length assumed when the weather source reports no end time.
    pub default_window: chrono::Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(40),
            trigger_queue_capacity: 256,
            default_window: chrono::Duration::minutes(5),
        }
    }
}

/// The evaluation engine: owns the worker thread and the trigger queue.
pub struct MutationEngine {
    trigger_tx: Sender<PassTrigger>,
    dropped_triggers: Arc<AtomicU64>,
    registry: Arc<SummaryRegistry>,
    join: Mutex<Option<JoinHandle<()>>>,
}

impl MutationEngine {
    /// Spawns the worker thread over the given collaborators.
    ///
    /// # Panics
    ///
    /// Panics if the OS refuses to spawn the worker thread.
    #[must_use]
    pub fn new(cfg: EngineConfig, parts: EngineParts, registry: Arc<SummaryRegistry>) -> Self {
        let (trigger_tx, trigger_rx) = bounded::<PassTrigger>(cfg.trigger_queue_capacity.max(1));
        let dropped_triggers = Arc::new(AtomicU64::new(0));

        let worker_registry = Arc::clone(&registry);
        let join = thread::Builder::new()
            .name("bloomwatch-engine".to_string())
            .spawn(move || worker_loop(&cfg, &parts, &worker_registry, &trigger_rx))
            .expect("failed to spawn engine worker thread");

        Self {
            trigger_tx,
            dropped_triggers,
            registry,
            join: Mutex::new(Some(join)),
        }
    }

    /// Non-blocking trigger enqueue. A full queue drops the trigger (it
    /// would have collapsed into the pending pass anyway) and bumps the
    /// drop counter; callers that need to observe the drop use
    /// [`Self::try_notify`].
    pub fn notify(&self, trigger: PassTrigger) {
        if self.try_notify(trigger).is_err() {
            self.dropped_triggers.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Non-blocking trigger enqueue that reports why a trigger was not
    /// accepted instead of counting it.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::QueueFull`] when back-pressure rejected the
    /// trigger, [`SchedulerError::Disconnected`] when the worker thread is
    /// gone.
    pub fn try_notify(&self, trigger: PassTrigger) -> BloomResult<()> {
        match self.trigger_tx.try_send(trigger) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(SchedulerError::QueueFull {
                capacity: self.trigger_tx.capacity().unwrap_or(0),
            }
            .into()),
            Err(TrySendError::Disconnected(_)) => Err(SchedulerError::Disconnected.into()),
        }
    }

    /// Closes the trigger queue, lets the worker run any pending pass, and
    /// joins it.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::Disconnected`] when the worker thread had already
    /// exited abnormally.
    pub fn shutdown(mut self) -> BloomResult<()> {
        self.close().map_err(Into::into)
    }

    fn close(&mut self) -> Result<(), SchedulerError> {
        let (dummy_tx, _dummy_rx) = bounded::<PassTrigger>(1);
        drop(std::mem::replace(&mut self.trigger_tx, dummy_tx));

        let handle = match self.join.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        match handle {
            Some(handle) => handle.join().map_err(|_| SchedulerError::Disconnected),
            None => Ok(()),
        }
    }

    /// Triggers dropped due to back-pressure or shutdown.
    #[must_use]
    pub fn dropped_triggers(&self) -> u64 {
        self.dropped_triggers.load(Ordering::Relaxed)
    }

    /// The registry this engine publishes into.
    #[must_use]
    pub fn registry(&self) -> &Arc<SummaryRegistry> {
        &self.registry
    }
}

impl Drop for MutationEngine {
    fn drop(&mut self) {
        // Close the trigger channel so the worker drains, runs any
        // pending pass, and exits; then join so callers observe a fully
        // settled registry after drop. `close` is idempotent, so a Drop
        // after an explicit `shutdown` is a no-op.
        let _ = self.close();
    }
}

fn worker_loop(
    cfg: &EngineConfig,
    parts: &EngineParts,
    registry: &SummaryRegistry,
    trigger_rx: &Receiver<PassTrigger>,
) {
    loop {
        let Ok(first) = trigger_rx.recv() else {
            break;
        };
        debug!(trigger = ?first, "evaluation pass requested");

        // Collapse the burst: keep draining until the queue stays quiet
        // for one debounce window.
        let mut disconnected = false;
        loop {
            match trigger_rx.recv_timeout(cfg.debounce) {
                Ok(_) => {}
                Err(RecvTimeoutError::Timeout) => break,
                Err(RecvTimeoutError::Disconnected) => {
                    disconnected = true;
                    break;
                }
            }
        }

        run_pass(parts, registry, cfg);

        if disconnected {
            break;
        }
    }
}

/// Runs one full evaluation pass over every registered scan.
///
/// Nothing here returns an error: a failing or empty inventory chain
/// degrades every plant to fallback, and an empty scan publishes an
/// all-zero summary.
pub fn run_pass(parts: &EngineParts, registry: &SummaryRegistry, cfg: &EngineConfig) {
    let observation = parts.weather.current();
    let window = WeatherWindow::from_observation(&observation, cfg.default_window);

    let source_refs: Vec<&dyn InventorySource> = parts
        .inventory_sources
        .iter()
        .map(AsRef::as_ref)
        .collect();
    let resolved = resolve_sources(&source_refs);

    for registration in &parts.scans {
        // Fresh per-pass object; consumption flags never outlive a pass.
        let mut reconciled = resolved.as_ref().map(ReconciledInventory::from_resolved);

        let plants: Vec<PlantEntry> = registration
            .scan
            .scan()
            .into_iter()
            .filter_map(|scanned| match build_plant(&scanned, reconciled.as_mut()) {
                Ok(plant) => Some(plant),
                Err(err) => {
                    warn!(error = %err, "discarding malformed scan item");
                    None
                }
            })
            .filter(PlantEntry::is_trackable)
            .collect();

        let (summary, listing) = evaluate_with_listing(&plants, observation.kind, &window);
        debug!(
            source = %registration.source,
            plants = plants.len(),
            eligible = summary.overall_eligible_plant_count,
            "pass complete"
        );
        registry.record_listing(registration.source, observation.kind, listing);
        registry.publish(registration.source, summary);
    }
}

fn build_plant(
    scanned: &ScannedPlant,
    reconciled: Option<&mut ReconciledInventory>,
) -> Result<PlantEntry, ValidationError> {
    // A missing name is fine (placeholder); a present-but-blank one is a
    // malformed element and fails entry validation below.
    let display_name = scanned
        .visual
        .name
        .clone()
        .unwrap_or_else(|| "unnamed".to_string());

    if let Some(inventory) = reconciled {
        if let Some(entry) = inventory.claim(&scanned.visual) {
            let declared = entry
                .fruit_count
                .unwrap_or(scanned.declared_fruit_count)
                .max(scanned.declared_fruit_count);
            // World-scan slot detail enriches the inventory view rather
            // than replacing it; provenance follows the richer side.
            let (slots, provenance) = if scanned.slots.is_empty() {
                (entry.slots.clone(), SlotSource::Inventory)
            } else {
                (merge_slot_views(&scanned.slots, &entry.slots), SlotSource::Garden)
            };
            return Ok(PlantEntry::with_slots(display_name, slots, declared, provenance)?
                .with_badges(scanned.badges));
        }
    }

    if !scanned.slots.is_empty() {
        return Ok(PlantEntry::with_slots(
            display_name,
            scanned.slots.clone(),
            scanned.declared_fruit_count,
            SlotSource::Garden,
        )?
        .with_badges(scanned.badges));
    }

    PlantEntry::fallback(display_name, scanned.declared_fruit_count, scanned.badges)
}

/// Merges world-scan slots with the matched inventory entry's slots,
/// index by index; the longer side's tail carries over unchanged.
fn merge_slot_views(world: &[SlotState], inventory: &[SlotState]) -> Vec<SlotState> {
    let len = world.len().max(inventory.len());
    (0..len)
        .map(|i| match (world.get(i), inventory.get(i)) {
            (Some(w), Some(inv)) => w.merge(inv),
            (Some(only), None) | (None, Some(only)) => only.clone(),
            (None, None) => SlotState::empty(),
        })
        .collect()
}
