//! Benchmarks for full indicator recomputation.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use charter_core::Candle;
use charter_indicators::{compute_all, rsi, sma, IndicatorKind};

fn generate_candles(count: usize) -> Vec<Candle> {
    let mut candles = Vec::with_capacity(count);
    let mut price = 100.0_f64;

    for i in 0..count {
        let trend = (i as f64 * 0.01).sin() * 10.0;
        let volatility = (i as f64 * 0.1).sin() * 2.0;

        let open = price;
        let close = (open + trend * 0.01 + volatility).max(1.0);
        let high = open.max(close) + volatility.abs() * 0.5;
        let low = open.min(close) - (volatility.abs() * 0.5).max(0.1);

        candles.push(Candle::new(
            i as i64 * 60_000,
            open,
            high,
            low,
            close,
            100.0 + (i % 100) as f64,
        ));

        price = close;
    }

    candles
}

fn bench_compute_all(c: &mut Criterion) {
    let mut group = c.benchmark_group("compute_all");
    let kinds = IndicatorKind::default_set();

    for size in [100, 500, 1000].iter() {
        let candles = generate_candles(*size);

        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &candles, |b, candles| {
            b.iter(|| compute_all(black_box(&kinds), black_box(candles)));
        });
    }

    group.finish();
}

fn bench_primitives(c: &mut Criterion) {
    let closes: Vec<f64> = generate_candles(1000).iter().map(|c| c.close).collect();

    c.bench_function("sma_20_1000", |b| b.iter(|| sma(black_box(&closes), 20)));
    c.bench_function("rsi_14_1000", |b| b.iter(|| rsi(black_box(&closes), 14)));
}

criterion_group!(benches, bench_compute_all, bench_primitives);
criterion_main!(benches);
