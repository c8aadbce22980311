//! Weather-conditional eligibility evaluation.
//!
//! Pure function from one plant and one weather kind to a decision plus
//! pending/total fruit counts. Two interchangeable strategies: the rich
//! one works on per-slot mutation records, the degraded one on clamped
//! on-screen badge counts only. Callers branch on the returned numbers,
//! never on the strategy; the strategy only shows up in the diagnostic
//! detail.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::mutation::Stage;
use crate::plant::{BadgeCounts, PlantEntry};
use crate::weather::WeatherKind;

/// The outcome of evaluating one plant for one weather kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    /// Whether the plant should be flagged for this weather.
    pub decision: bool,
    /// Fruit that can still acquire this weather's mutation.
    pub pending_fruit: u32,
    /// Fruit considered at all.
    pub total_fruit: u32,
    /// Fruit at the cold-chain intermediate stage that still needs snow.
    pub needs_snow: u32,
    /// Strategy-tagged diagnostics; never used for control flow.
    pub detail: EvalDetail,
}

impl Evaluation {
    fn inactive() -> Self {
        Self {
            decision: false,
            pending_fruit: 0,
            total_fruit: 0,
            needs_snow: 0,
            detail: EvalDetail::Inactive,
        }
    }
}

/// Diagnostic detail, tagged by the strategy that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum EvalDetail {
    /// Slot-based evaluation.
    Rich {
        /// Slots at cold-chain intermediate or final.
        wet_progressed: u32,
        /// Slots at intermediate only.
        needs_second_stage: u32,
        /// Slots with a dawn-family mutation.
        dawn_finished: u32,
        /// Slots with an amber-family mutation.
        amber_finished: u32,
        /// Slots carrying conflicting flags (logged, not resolved).
        conflicting_slots: u32,
    },
    /// Badge-count evaluation.
    Degraded {
        /// Clamped cold-chain coverage (wet + frozen badges).
        covered_wet: u32,
        /// Whether the opposite-color veto zeroed this evaluation.
        vetoed: bool,
    },
    /// Weather grants no mutation; nothing was computed.
    Inactive,
}

/// Evaluates one plant for one weather kind.
///
/// `Sunny` and `Unknown` always yield a false decision. The rich strategy
/// runs when the slot provenance is authoritative and at least one slot
/// carries a mutation signal; otherwise evaluation degrades to badge
/// counts.
#[must_use]
pub fn evaluate_plant(plant: &PlantEntry, weather: WeatherKind) -> Evaluation {
    if !weather.is_active() {
        return Evaluation::inactive();
    }

    if plant.slot_source.is_authoritative() && plant.has_slot_signal() {
        evaluate_rich(plant, weather)
    } else {
        if plant.slot_source.is_authoritative() {
            debug!(plant = %plant.name, "no slot signal, degrading to badge counts");
        }
        evaluate_degraded(plant, weather)
    }
}

fn evaluate_rich(plant: &PlantEntry, weather: WeatherKind) -> Evaluation {
    let mut wet_progressed = 0u32;
    let mut needs_second_stage = 0u32;
    let mut dawn_finished = 0u32;
    let mut amber_finished = 0u32;
    let mut color_finished = 0u32;
    let mut signal_slots = 0u32;
    let mut conflicting_slots = 0u32;
    let mut max_stage_total = 0u32;

    for slot in &plant.slots {
        let wet = slot.is_wet_progressed();
        let second = slot.needs_second_stage();
        let dawn = slot.is_dawn_finished();
        let amber = slot.is_amber_finished();

        wet_progressed += u32::from(wet);
        needs_second_stage += u32::from(second);
        dawn_finished += u32::from(dawn);
        amber_finished += u32::from(amber);
        // A fruit takes at most one color mutation, so a slot colored
        // either way is no longer pending for any color weather. The
        // opposite color never vetoes the whole plant here.
        color_finished += u32::from(dawn || amber);
        if wet || dawn || amber {
            signal_slots += 1;
        }

        if slot.has_conflicting_flags() {
            // A fruit should never actually show both; log and proceed
            // with whichever flags are set.
            conflicting_slots += 1;
            warn!(
                plant = %plant.name,
                letters = %slot.letters().iter().collect::<String>(),
                "slot carries conflicting mutation flags"
            );
        }

        for stage in [Stage::Wet, Stage::Dawn, Stage::Amber] {
            if let Some(progress) = slot.stage_progress(stage) {
                max_stage_total = max_stage_total.max(progress.total);
            }
        }
    }

    let total_fruit = plant
        .fruit_count
        .max(signal_slots)
        .max(max_stage_total);

    // Badge counts clamp to the total and merge in as a floor; they never
    // reduce a slot-derived count.
    let badges = clamp_badges(&plant.badges, total_fruit);
    let wet_merged = wet_progressed.max((badges.wet + badges.frozen).min(total_fruit));
    let color_merged = color_finished
        .max((badges.dawn_total() + badges.amber_total()).min(total_fruit));
    let needs_snow = needs_second_stage
        .max(badges.wet.min(total_fruit))
        .min(total_fruit);

    let pending_fruit = match weather {
        WeatherKind::Rain => total_fruit.saturating_sub(wet_merged),
        WeatherKind::Snow => needs_snow,
        WeatherKind::Dawn | WeatherKind::Amber => total_fruit.saturating_sub(color_merged),
        WeatherKind::Sunny | WeatherKind::Unknown => unreachable!("inactive handled by caller"),
    };

    Evaluation {
        decision: total_fruit > 0 && pending_fruit > 0,
        pending_fruit,
        total_fruit,
        needs_snow,
        detail: EvalDetail::Rich {
            wet_progressed,
            needs_second_stage,
            dawn_finished,
            amber_finished,
            conflicting_slots,
        },
    }
}

fn evaluate_degraded(plant: &PlantEntry, weather: WeatherKind) -> Evaluation {
    let total_fruit = plant.fruit_count;
    let badges = clamp_badges(&plant.badges, total_fruit);

    let covered_wet = (badges.wet + badges.frozen).min(total_fruit);
    let needs_chill = badges.wet.saturating_sub(badges.frozen).min(total_fruit);

    let mut vetoed = false;
    let (pending_fruit, needs_snow) = match weather {
        WeatherKind::Rain => {
            if covered_wet < total_fruit {
                (total_fruit - covered_wet, needs_chill)
            } else {
                // Full coverage: rain has nothing pending, the residual
                // wet-not-frozen deficit stays visible for snow.
                (0, needs_chill)
            }
        }
        WeatherKind::Snow => (needs_chill, needs_chill),
        WeatherKind::Dawn => {
            if badges.amber_total() > 0 {
                // Whole-plant veto: any opposite-color fruit zeroes this
                // weather. A known precision loss versus the rich
                // strategy; last resort only.
                vetoed = true;
                (0, needs_chill)
            } else {
                (
                    total_fruit.saturating_sub(badges.dawn_total().min(total_fruit)),
                    needs_chill,
                )
            }
        }
        WeatherKind::Amber => {
            if badges.dawn_total() > 0 {
                vetoed = true;
                (0, needs_chill)
            } else {
                (
                    total_fruit.saturating_sub(badges.amber_total().min(total_fruit)),
                    needs_chill,
                )
            }
        }
        WeatherKind::Sunny | WeatherKind::Unknown => unreachable!("inactive handled by caller"),
    };

    Evaluation {
        decision: total_fruit > 0 && pending_fruit > 0,
        pending_fruit,
        total_fruit,
        needs_snow,
        detail: EvalDetail::Degraded {
            covered_wet,
            vetoed,
        },
    }
}

fn clamp_badges(badges: &BadgeCounts, total: u32) -> BadgeCounts {
    BadgeCounts {
        chilled: badges.chilled.min(total),
        wet: badges.wet.min(total),
        frozen: badges.frozen.min(total),
        dawn: badges.dawn.min(total),
        dawn_bold: badges.dawn_bold.min(total),
        amber: badges.amber.min(total),
        amber_bold: badges.amber_bold.min(total),
    }
}
