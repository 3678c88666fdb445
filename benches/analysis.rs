//! Benchmarks for indicator calculation, VCP detection and full analysis.

use chrono::{Days, NaiveDate};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use sepa::prelude::*;

/// Deterministic trending walk with pullbacks
fn generate_bars(n: usize) -> Vec<Bar> {
  let start = NaiveDate::from_ymd_opt(2015, 1, 1).unwrap();
  let mut bars = Vec::with_capacity(n);
  let mut price = 100.0;

  for i in 0..n {
    let change = ((i * 7 + 13) % 100) as f64 / 50.0 - 0.9; // Deterministic "random", slight drift
    let volatility = 1.0 + ((i * 3) % 10) as f64 / 5.0;

    let o = price;
    let c = (price + change).max(1.0);
    let h = o.max(c) + volatility * 0.5;
    let l = (o.min(c) - volatility * 0.5).max(0.5);
    let v = 1_000.0 + ((i * 11) % 500) as f64;

    bars.push(Bar::new(start + Days::new(i as u64), o, h, l, c, v));
    price = c;
  }

  bars
}

fn generate_series(symbol: &str, n: usize) -> PriceSeries {
  PriceSeries::new(symbol, generate_bars(n)).unwrap()
}

fn bench_indicators(c: &mut Criterion) {
  let series = generate_series("BENCH", 1000);
  let params = IndicatorParams::default();
  let calculator = IndicatorCalculator::new(&params);

  c.bench_function("indicators_1000_bars", |b| {
    b.iter(|| {
      let _ = black_box(calculator.compute(black_box(&series), None));
    })
  });
}

fn bench_vcp(c: &mut Criterion) {
  let engine = AnalysisEngine::default();
  let enriched = engine.enrich(&generate_series("BENCH", 1000), None);
  let params = VcpParams::default();
  let detector = VcpDetector::new(&params);

  c.bench_function("vcp_detect_1000_bars", |b| {
    b.iter(|| {
      let _ = black_box(detector.detect(black_box(&enriched)));
    })
  });
}

fn bench_analyze(c: &mut Criterion) {
  let engine = AnalysisEngine::default();
  let series = generate_series("BENCH", 1000);
  let index = generate_series("INDEX", 1000);

  c.bench_function("analyze_1000_bars", |b| {
    b.iter(|| {
      let _ = black_box(engine.analyze(black_box(&series), Some(&index)));
    })
  });
}

fn bench_scaling(c: &mut Criterion) {
  let engine = AnalysisEngine::default();

  let mut group = c.benchmark_group("scaling");

  for size in [250, 500, 1000, 2500, 5000].iter() {
    let series = generate_series("BENCH", *size);

    group.bench_with_input(BenchmarkId::new("analyze", size), size, |b, _| {
      b.iter(|| {
        let _ = black_box(engine.analyze(black_box(&series), None));
      })
    });
  }

  group.finish();
}

fn bench_screen_parallel(c: &mut Criterion) {
  let bars1 = generate_bars(1000);
  let bars2 = generate_bars(1000);
  let bars3 = generate_bars(1000);
  let bars4 = generate_bars(1000);
  let index = generate_series("INDEX", 1000);

  let engine = AnalysisEngine::default();

  let instruments: Vec<(&str, &[Bar])> =
    vec![("SYM1", &bars1), ("SYM2", &bars2), ("SYM3", &bars3), ("SYM4", &bars4)];

  c.bench_function("screen_parallel_4_instruments", |b| {
    b.iter(|| {
      let _ = black_box(screen_parallel(
        black_box(&engine),
        black_box(instruments.clone()),
        Some(&index),
      ));
    })
  });
}

criterion_group!(
  benches,
  bench_indicators,
  bench_vcp,
  bench_analyze,
  bench_scaling,
  bench_screen_parallel,
);

criterion_main!(benches);
