//! Arena scoring benchmarks
//!
//! Measures the non-I/O half of a match round: reply parsing and payoff
//! lookup. Move parsing runs twice per round per match; these benches keep
//! the keyword scan honest as reply texts grow.
//!
//! Run with: `cargo bench`

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use promptgrid::arena::{parse_move, payoff};
use promptgrid::models::ArenaMove;
use std::hint::black_box;

/// Benchmark move parsing across representative reply shapes
fn bench_parse_move(c: &mut Criterion) {
    let long_reply = format!(
        "{} In conclusion, after weighing every consideration above, I cooperate.",
        "Let me think about the history of this match in detail. ".repeat(100)
    );
    let test_cases = vec![
        ("one_word", "COOPERATE".to_string()),
        (
            "verbose",
            "Given the opponent defected twice in a row, tit-for-tat suggests I \
            should retaliate this round. My move: DEFECT."
                .to_string(),
        ),
        (
            "unparseable",
            "I would rather discuss the weather, thanks for asking though.".to_string(),
        ),
        ("long_reply", long_reply),
    ];

    let mut group = c.benchmark_group("parse_move");

    for (name, reply) in test_cases {
        group.bench_with_input(BenchmarkId::from_parameter(name), &reply, |b, reply| {
            b.iter(|| parse_move(black_box(reply)));
        });
    }

    group.finish();
}

/// Benchmark the payoff lookup over the full matrix
fn bench_payoff(c: &mut Criterion) {
    c.bench_function("payoff_full_matrix", |b| {
        b.iter(|| {
            for move_a in [ArenaMove::Cooperate, ArenaMove::Defect] {
                for move_b in [ArenaMove::Cooperate, ArenaMove::Defect] {
                    black_box(payoff(black_box(move_a), black_box(move_b)));
                }
            }
        })
    });
}

criterion_group!(benches, bench_parse_move, bench_payoff);
criterion_main!(benches);
