//! # Bloomwatch - Weather-Mutation Eligibility Engine
//!
//! Bloomwatch tracks garden plants against the active weather and decides,
//! per plant and per weather kind, how many fruit could still gain a
//! weather mutation. It reconciles several unreliable inventory feeds into
//! one authoritative snapshot, matches on-screen plants back to that
//! snapshot, and publishes aggregate summaries through a subscription
//! registry.
//!
//! ## Core Concepts
//!
//! - **Slot**: One fruit position on a plant, normalized into the set of
//!   mutations it currently holds plus per-stage progress fractions
//! - **Cold chain**: chilled, then wet, then frozen; a wet fruit still
//!   needs snow to finish
//! - **Rich vs degraded evaluation**: per-slot reasoning when the
//!   reconciled inventory carries slot detail, badge-count arithmetic when
//!   it does not
//! - **Pass**: one debounced run of resolve, match, evaluate, aggregate,
//!   publish
//!
//! ## Usage
//!
//! ```rust,ignore
//! use bloomwatch::{
//!     EngineConfig, EngineParts, MutationEngine, PassTrigger, SummaryRegistry,
//! };
//! use std::sync::Arc;
//!
//! let registry = Arc::new(SummaryRegistry::new());
//! let engine = MutationEngine::new(EngineConfig::default(), parts, Arc::clone(&registry));
//!
//! let _sub = registry.subscribe(|source, summary| {
//!     println!("{source}: {} eligible", summary.overall_eligible_plant_count);
//! }, false);
//!
//! engine.notify(PassTrigger::InventoryChanged);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Core domain types
pub mod error;
pub mod mutation;
pub mod normalize;
pub mod plant;
pub mod weather;

// Inventory acquisition and matching
pub mod reconcile;
pub mod source;

// Evaluation, aggregation, and publication
pub mod engine;
pub mod eval;
pub mod registry;
pub mod summary;

// Re-export primary types at crate root for convenience
pub use engine::{
    run_pass, EngineConfig, EngineParts, MutationEngine, PassTrigger, ScanRegistration,
    ScannedPlant, VisualScanSource,
};
pub use error::{BloomError, BloomResult, SchedulerError, SourceError, ValidationError};
pub use eval::{evaluate_plant, EvalDetail, Evaluation};
pub use mutation::{MutationKind, SlotState, Stage, StageProgress};
pub use normalize::{normalize_descriptor_texts, normalize_slot};
pub use plant::{BadgeCounts, PlantEntry, SlotSource};
pub use reconcile::{ReconciledInventory, VisualItem, MAX_ID_ANCESTOR_DEPTH};
pub use registry::{
    DebugSnapshot, SubscriptionId, SummaryRegistry, SummarySource, Subscription,
};
pub use source::{resolve_sources, InventorySource, RawItem, ResolvedInventory};
pub use summary::{
    evaluate, evaluate_with_listing, LunarStats, MutationSummary, PlantListing, WeatherTotals,
};
pub use weather::{
    WeatherKind, WeatherObservation, WeatherSource, WeatherWindow, ACTIVE_WEATHERS,
};
