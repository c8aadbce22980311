//! Cross-plant aggregation into a stable summary.
//!
//! Every plant is evaluated against all four active weather kinds — not
//! just the current one — so the lunar (dawn + amber) rollup can be built
//! in the same pass. The summary is produced fresh on every call;
//! consumers replace it wholesale and never mutate it.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::eval::evaluate_plant;
use crate::plant::PlantEntry;
use crate::weather::{WeatherKind, WeatherWindow, ACTIVE_WEATHERS};

/// Per-weather totals over all eligible plants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeatherTotals {
    /// Plants flagged for this weather.
    pub plant_count: u32,
    /// Fruit still pending this weather's mutation.
    pub pending_fruit_count: u32,
    /// Fruit that still needs the second cold stage, when any evaluation
    /// reported one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub needs_snow_fruit_count: Option<u32>,
}

/// The dawn + amber rollup, single-attributed per plant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LunarStats {
    /// Plants whose dawn or amber evaluation saw any fruit.
    pub tracked_plant_count: u32,
    /// Tracked plants with pending lunar fruit.
    pub pending_plant_count: u32,
    /// Tracked plants with no pending lunar fruit left.
    pub mutated_plant_count: u32,
    /// Fruit considered across tracked plants.
    pub total_fruit_count: u32,
    /// Fruit still pending a lunar mutation.
    pub pending_fruit_count: u32,
    /// Fruit already carrying a lunar mutation.
    pub mutated_fruit_count: u32,
}

/// The eligible plant names per weather, for the debug surface.
pub type PlantListing = BTreeMap<WeatherKind, Vec<String>>;

/// The aggregate result of one evaluation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationSummary {
    /// The weather active when the pass ran.
    pub active_weather: WeatherKind,
    /// Totals per active weather kind, independent of each other.
    pub totals: BTreeMap<WeatherKind, WeatherTotals>,
    /// Distinct plants eligible for any weather.
    pub overall_eligible_plant_count: u32,
    /// Distinct plants evaluated at all.
    pub overall_tracked_plant_count: u32,
    /// The dawn + amber rollup.
    pub lunar: LunarStats,
    /// When the pass ran.
    pub generated_at: DateTime<Utc>,
    /// The active window, with `remaining_ms` recomputed for this pass.
    pub window: WeatherWindow,
}

impl MutationSummary {
    /// Totals for one weather; zero when no plant was eligible.
    #[must_use]
    pub fn totals_for(&self, weather: WeatherKind) -> WeatherTotals {
        self.totals.get(&weather).copied().unwrap_or_default()
    }
}

/// Evaluates every trackable plant against all four active weathers and
/// folds the results into one summary. Pure and deterministic for fixed
/// inputs, up to the `generated_at` timestamp.
#[must_use]
pub fn evaluate(
    plants: &[PlantEntry],
    weather: WeatherKind,
    window: &WeatherWindow,
) -> MutationSummary {
    evaluate_with_listing(plants, weather, window).0
}

/// Like [`evaluate`], additionally returning the per-weather eligible
/// plant names for the registry's debug surface.
#[must_use]
pub fn evaluate_with_listing(
    plants: &[PlantEntry],
    weather: WeatherKind,
    window: &WeatherWindow,
) -> (MutationSummary, PlantListing) {
    let now = Utc::now();
    let mut totals: BTreeMap<WeatherKind, WeatherTotals> = BTreeMap::new();
    let mut listing: PlantListing = BTreeMap::new();
    let mut lunar = LunarStats::default();
    let mut eligible_plants = 0u32;
    let mut tracked_plants = 0u32;

    for plant in plants.iter().filter(|p| p.is_trackable()) {
        tracked_plants += 1;
        let mut eligible_any = false;
        let mut dawn_eval = None;
        let mut amber_eval = None;

        for kind in ACTIVE_WEATHERS {
            let eval = evaluate_plant(plant, kind);

            if eval.decision {
                eligible_any = true;
                let entry = totals.entry(kind).or_default();
                entry.plant_count += 1;
                entry.pending_fruit_count += eval.pending_fruit;
                if eval.needs_snow > 0 {
                    *entry.needs_snow_fruit_count.get_or_insert(0) += eval.needs_snow;
                }
                listing.entry(kind).or_default().push(plant.name.clone());
            }

            match kind {
                WeatherKind::Dawn => dawn_eval = Some(eval),
                WeatherKind::Amber => amber_eval = Some(eval),
                _ => {}
            }
        }

        if eligible_any {
            eligible_plants += 1;
        }

        // Single-attribution lunar totals: prefer the amber evaluation
        // when both families saw fruit. The per-weather totals table
        // above records both independently.
        let attribution = match (&dawn_eval, &amber_eval) {
            (_, Some(amber)) if amber.total_fruit > 0 => amber_eval.as_ref(),
            (Some(dawn), _) if dawn.total_fruit > 0 => dawn_eval.as_ref(),
            _ => None,
        };
        if let Some(eval) = attribution {
            lunar.tracked_plant_count += 1;
            lunar.total_fruit_count += eval.total_fruit;
            lunar.pending_fruit_count += eval.pending_fruit;
            lunar.mutated_fruit_count += eval.total_fruit - eval.pending_fruit;
            if eval.pending_fruit > 0 {
                lunar.pending_plant_count += 1;
            } else {
                lunar.mutated_plant_count += 1;
            }
        }
    }

    let summary = MutationSummary {
        active_weather: weather,
        totals,
        overall_eligible_plant_count: eligible_plants,
        overall_tracked_plant_count: tracked_plants,
        lunar,
        generated_at: now,
        window: window.recomputed_at(now),
    };
    (summary, listing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize_descriptor_texts;
    use crate::plant::{BadgeCounts, SlotSource};
    use chrono::Duration;

    fn window(weather: WeatherKind) -> WeatherWindow {
        let now = Utc::now();
        WeatherWindow::new(weather, now, now + Duration::minutes(5)).unwrap()
    }

    fn plant(name: &str, slot_descriptors: &[&[&str]]) -> PlantEntry {
        let slots = slot_descriptors
            .iter()
            .map(|d| normalize_descriptor_texts(d.iter().copied()))
            .collect();
        PlantEntry::with_slots(name, slots, 0, SlotSource::Inventory).unwrap()
    }

    #[test]
    fn test_empty_input_zero_summary() {
        let summary = evaluate(&[], WeatherKind::Rain, &window(WeatherKind::Rain));
        assert_eq!(summary.overall_tracked_plant_count, 0);
        assert_eq!(summary.overall_eligible_plant_count, 0);
        assert!(summary.totals.is_empty());
        assert_eq!(summary.lunar, LunarStats::default());
    }

    #[test]
    fn test_fruitless_plants_discarded() {
        let ghost = PlantEntry::fallback("Ghost", 0, BadgeCounts::none()).unwrap();
        let summary = evaluate(&[ghost], WeatherKind::Rain, &window(WeatherKind::Rain));
        assert_eq!(summary.overall_tracked_plant_count, 0);
    }

    #[test]
    fn test_only_decisions_contribute_to_totals() {
        let pending = plant("Peach", &[&["wet"], &["frozen"], &[]]);
        // Fully frozen and colored: nothing pending for any weather.
        let done = plant("Mango", &[&["frozen", "amberbound"]]);
        let summary = evaluate(
            &[pending, done],
            WeatherKind::Rain,
            &window(WeatherKind::Rain),
        );

        let rain = summary.totals_for(WeatherKind::Rain);
        assert_eq!(rain.plant_count, 1);
        assert_eq!(rain.pending_fruit_count, 1);
        assert_eq!(summary.overall_tracked_plant_count, 2);
        assert_eq!(summary.overall_eligible_plant_count, 1);
    }

    #[test]
    fn test_all_four_weathers_evaluated() {
        let p = plant("Peach", &[&["wet"], &[]]);
        let summary = evaluate(&[p], WeatherKind::Sunny, &window(WeatherKind::Sunny));
        // Rain pending (1 untouched), snow pending (1 wet), dawn/amber
        // pending (2 uncolored) regardless of the active weather.
        assert_eq!(summary.totals_for(WeatherKind::Rain).pending_fruit_count, 1);
        assert_eq!(summary.totals_for(WeatherKind::Snow).pending_fruit_count, 1);
        assert_eq!(summary.totals_for(WeatherKind::Dawn).pending_fruit_count, 2);
        assert_eq!(summary.totals_for(WeatherKind::Amber).pending_fruit_count, 2);
        assert_eq!(summary.active_weather, WeatherKind::Sunny);
    }

    #[test]
    fn test_needs_snow_recorded_for_snow() {
        let p = plant("Peach", &[&["wet"], &["frozen"], &[]]);
        let summary = evaluate(&[p], WeatherKind::Snow, &window(WeatherKind::Snow));
        let snow = summary.totals_for(WeatherKind::Snow);
        assert_eq!(snow.needs_snow_fruit_count, Some(1));
        assert_eq!(snow.pending_fruit_count, 1);
    }

    #[test]
    fn test_lunar_attribution_prefers_amber() {
        // Both families see fruit; the single-attribution totals must use
        // the amber evaluation.
        let p = plant("Peach", &[&["dawnlit"], &["amberlit"], &[]]);
        let summary = evaluate(&[p], WeatherKind::Dawn, &window(WeatherKind::Dawn));

        assert_eq!(summary.lunar.tracked_plant_count, 1);
        assert_eq!(summary.lunar.total_fruit_count, 3);
        assert_eq!(summary.lunar.pending_fruit_count, 1);
        assert_eq!(summary.lunar.mutated_fruit_count, 2);
        assert_eq!(summary.lunar.pending_plant_count, 1);

        // Per-weather totals still record both independently.
        assert_eq!(summary.totals_for(WeatherKind::Dawn).plant_count, 1);
        assert_eq!(summary.totals_for(WeatherKind::Amber).plant_count, 1);
    }

    #[test]
    fn test_lunar_mutated_plant() {
        let p = plant("Mango", &[&["amberbound"]]);
        let summary = evaluate(&[p], WeatherKind::Amber, &window(WeatherKind::Amber));
        assert_eq!(summary.lunar.tracked_plant_count, 1);
        assert_eq!(summary.lunar.mutated_plant_count, 1);
        assert_eq!(summary.lunar.pending_plant_count, 0);
        assert_eq!(summary.lunar.mutated_fruit_count, 1);
    }

    #[test]
    fn test_window_remaining_recomputed() {
        let now = Utc::now();
        let stale = WeatherWindow {
            weather: WeatherKind::Rain,
            started_at: now - Duration::minutes(10),
            expected_end_at: now - Duration::minutes(1),
            duration_ms: 540_000,
            remaining_ms: 999_999,
        };
        let summary = evaluate(&[], WeatherKind::Rain, &stale);
        assert_eq!(summary.window.remaining_ms, 0);
    }

    #[test]
    fn test_determinism_modulo_timestamp() {
        let plants = vec![
            plant("Peach", &[&["wet 1/3"], &[]]),
            plant("Mango", &[&["amberlit"], &["dawnbound"], &[]]),
            PlantEntry::fallback(
                "Apple x4",
                0,
                BadgeCounts {
                    wet: 2,
                    dawn: 1,
                    ..BadgeCounts::none()
                },
            )
            .unwrap(),
        ];
        let w = window(WeatherKind::Amber);
        let mut a = evaluate(&plants, WeatherKind::Amber, &w);
        let mut b = evaluate(&plants, WeatherKind::Amber, &w);
        b.generated_at = a.generated_at;
        b.window.remaining_ms = a.window.remaining_ms;
        a.window.remaining_ms = b.window.remaining_ms;
        assert_eq!(a, b);
    }

    #[test]
    fn test_listing_matches_eligible_plants() {
        let plants = vec![
            plant("Peach", &[&["wet"], &[]]),
            plant("Mango", &[&["frozen", "amberbound"]]),
        ];
        let (summary, listing) =
            evaluate_with_listing(&plants, WeatherKind::Rain, &window(WeatherKind::Rain));
        assert_eq!(listing[&WeatherKind::Rain], vec!["Peach".to_string()]);
        assert_eq!(
            listing[&WeatherKind::Rain].len() as u32,
            summary.totals_for(WeatherKind::Rain).plant_count
        );
        let amber_names = listing.get(&WeatherKind::Amber).cloned().unwrap_or_default();
        assert!(!amber_names.contains(&"Mango".to_string()));
    }
}
