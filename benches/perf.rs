use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use try_finder::analytics::{ProfitBasis, aggregate_by_confidence, summarize};
use try_finder::bet_log::BetRecord;
use try_finder::odds_fetch::parse_odds_json;
use try_finder::state::{AppState, Delta, apply_delta};

const ODDS_JSON: &str = include_str!("../tests/fixtures/odds_nrl.json");

fn sample_log(n: usize) -> Vec<BetRecord> {
    (0..n)
        .map(|i| BetRecord {
            date: "2026-03-07".to_string(),
            round: format!("{}", i % 27 + 1),
            match_name: "Melbourne Storm v Parramatta Eels".to_string(),
            player: format!("Player {}", i % 34),
            odds: 1.5 + (i % 20) as f64 * 0.25,
            book: if i % 2 == 0 { "SportsBet" } else { "bet365" }.to_string(),
            my_prob: 30.0,
            edge: (i % 15) as f64 - 5.0,
            stake: Some(10.0),
            bet_type: "Anytime Try".to_string(),
            result: match i % 3 {
                0 => "Win",
                1 => "Loss",
                _ => "Pending",
            }
            .to_string(),
            position: "Winger".to_string(),
            team_total: Some(44.5),
            status: "Placed".to_string(),
            confidence: ((i % 40) as f64 * 2.5).min(100.0),
        })
        .collect()
}

fn bench_odds_parse(c: &mut Criterion) {
    c.bench_function("odds_parse", |b| {
        b.iter(|| {
            let board = parse_odds_json(black_box(ODDS_JSON), black_box("storm")).unwrap();
            black_box(board.quotes.len());
        })
    });
}

fn bench_odds_load_delta(c: &mut Criterion) {
    let board = parse_odds_json(ODDS_JSON, "").unwrap();
    c.bench_function("odds_load_delta", |b| {
        b.iter(|| {
            let mut state = AppState::default();
            apply_delta(
                &mut state,
                Delta::OddsLoaded {
                    keyword: "Storm".to_string(),
                    odds: Ok(board.clone()),
                    rain: Ok(1.2),
                },
            );
            black_box(state.rows.len());
        })
    });
}

fn bench_confidence_buckets(c: &mut Criterion) {
    let log = sample_log(5_000);
    let basis = ProfitBasis::default();
    c.bench_function("confidence_buckets", |b| {
        b.iter(|| {
            let buckets = aggregate_by_confidence(black_box(&log), &basis);
            black_box(buckets.len());
        })
    });
}

fn bench_log_summary(c: &mut Criterion) {
    let log = sample_log(5_000);
    let basis = ProfitBasis::RecordStake { fallback: 10.0 };
    c.bench_function("log_summary", |b| {
        b.iter(|| {
            let summary = summarize(black_box(&log), &basis);
            black_box(summary.total_profit);
        })
    });
}

criterion_group!(
    perf,
    bench_odds_parse,
    bench_odds_load_delta,
    bench_confidence_buckets,
    bench_log_summary
);
criterion_main!(perf);
