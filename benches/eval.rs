use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use serde_json::json;

use bloomwatch::{
    evaluate, normalize_slot, InventorySource, RawItem, ReconciledInventory, SourceError,
    VisualItem, WeatherKind, WeatherObservation, WeatherWindow,
};

struct SeededSource(Vec<serde_json::Value>);

impl InventorySource for SeededSource {
    fn name(&self) -> &str {
        "seeded"
    }

    fn fetch(&self) -> Result<Option<Vec<RawItem>>, SourceError> {
        Ok(Some(self.0.iter().cloned().map(RawItem::new).collect()))
    }
}

// 256 plants cycling through the mutation palette so a pass measures
// realistic normalization and evaluation work.
fn seed_items() -> Vec<serde_json::Value> {
    let palette = [
        json!([["wet"], ["frozen"], []]),
        json!([["chilled"], ["wet"], ["wet"]]),
        json!([["dawnlit"], ["amberbound"], []]),
        json!([[{"text": "Wet (Snow 1/3)"}], ["frozen"]]),
    ];
    (0..256u32)
        .map(|i| {
            json!({
                "id": format!("plant-{i}"),
                "name": format!("Plant {i}"),
                "slots": palette[(i % 4) as usize],
            })
        })
        .collect()
}

fn build_plants() -> Vec<bloomwatch::PlantEntry> {
    let source = SeededSource(seed_items());
    let sources: [&dyn InventorySource; 1] = [&source];
    let resolved = bloomwatch::resolve_sources(&sources).unwrap();
    let mut inventory = ReconciledInventory::from_resolved(&resolved);

    (0..256u32)
        .filter_map(|i| {
            let visual = VisualItem::named(format!("Plant {i}")).with_id(format!("plant-{i}"));
            inventory.claim(&visual).map(|entry| {
                bloomwatch::PlantEntry::with_slots(
                    format!("Plant {i}"),
                    entry.slots.clone(),
                    entry.fruit_count.unwrap_or(0),
                    bloomwatch::SlotSource::Inventory,
                )
                .unwrap()
            })
        })
        .collect()
}

fn bench_normalize_slot(c: &mut Criterion) {
    let descriptors = vec![
        json!({"text": "Wet (Snow 2/3)"}),
        json!("Dawnbound"),
        json!({"name": "Frozen"}),
    ];
    c.bench_function("eval/normalize_slot", |b| {
        b.iter(|| normalize_slot(std::hint::black_box(&descriptors)));
    });
}

fn bench_reconcile_and_claim(c: &mut Criterion) {
    let source = SeededSource(seed_items());
    let sources: [&dyn InventorySource; 1] = [&source];
    let mut group = c.benchmark_group("eval/reconcile");
    group.throughput(Throughput::Elements(256));
    group.bench_function("resolve_and_claim_256", |b| {
        b.iter(|| {
            let resolved = bloomwatch::resolve_sources(&sources).unwrap();
            let mut inventory = ReconciledInventory::from_resolved(&resolved);
            let mut claimed = 0usize;
            for i in 0..256u32 {
                let visual = VisualItem::named(format!("Plant {i}"));
                if inventory.claim(&visual).is_some() {
                    claimed += 1;
                }
            }
            claimed
        });
    });
    group.finish();
}

fn bench_full_evaluation(c: &mut Criterion) {
    let plants = build_plants();
    let window = WeatherWindow::from_observation(
        &WeatherObservation::bare(WeatherKind::Rain),
        chrono::Duration::minutes(5),
    );

    let mut group = c.benchmark_group("eval/summary");
    group.throughput(Throughput::Elements(plants.len() as u64));
    group.bench_function("evaluate_256_plants", |b| {
        b.iter(|| {
            evaluate(
                std::hint::black_box(&plants),
                WeatherKind::Rain,
                std::hint::black_box(&window),
            )
        });
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_normalize_slot,
    bench_reconcile_and_claim,
    bench_full_evaluation
);
criterion_main!(benches);
