use chrono::{Days, NaiveDate};
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use treadlog_core::calendar::FirstDayOfWeek;
use treadlog_core::history::{Collator, DescendingPolicy, Direction};
use treadlog_core::model::{GearId, Run, RunId};

struct Tier {
    name: &'static str,
    runs: u64,
}

const TIERS: [Tier; 3] = [
    Tier {
        name: "season",
        runs: 200,
    },
    Tier {
        name: "decade",
        runs: 4_000,
    },
    Tier {
        name: "club",
        runs: 50_000,
    },
];

/// Runs every other day with a few weeks of rest mixed in, shuffled by a
/// fixed linear congruential step so collation has to sort.
fn synthetic_runs(count: u64, seed: u64) -> Vec<Run> {
    let start = NaiveDate::from_ymd_opt(2015, 1, 1)
        .and_then(|d| d.and_hms_opt(6, 0, 0))
        .unwrap_or_default();
    let mut state = seed;
    (0..count)
        .map(|i| {
            state = state.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
            let day = (state >> 33) % (count * 3);
            Run {
                id: RunId(i64::try_from(i).unwrap_or(i64::MAX)),
                gear_id: GearId(1),
                date: start + Days::new(day),
                distance: f64::from(u32::try_from(state % 40).unwrap_or(0)) / 4.0 + 1.0,
            }
        })
        .collect()
}

fn bench_collate(c: &mut Criterion) {
    let mut group = c.benchmark_group("history.collate");
    let policies = [
        ("reverse", DescendingPolicy::Reverse),
        ("omit-gap-fill", DescendingPolicy::OmitGapFill),
    ];

    for tier in TIERS {
        let runs = synthetic_runs(tier.runs, 0x7EAD_106);
        group.throughput(Throughput::Elements(tier.runs));

        group.bench_with_input(BenchmarkId::new("ascending", tier.name), &runs, |b, runs| {
            let collator = Collator::new(FirstDayOfWeek::Monday);
            b.iter(|| black_box(collator.collate(runs, Direction::Ascending).len()));
        });

        for (label, policy) in policies {
            let id = BenchmarkId::new(format!("descending/{label}"), tier.name);
            group.bench_with_input(id, &runs, |b, runs| {
                let collator = Collator::new(FirstDayOfWeek::Sunday).with_descending(policy);
                b.iter(|| black_box(collator.collate(runs, Direction::Descending).len()));
            });
        }
    }

    group.finish();
}

criterion_group!(benches, bench_collate);
criterion_main!(benches);
