//! 遥测解析性能基准测试

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use simlink_protocol::{parse_telemetry, parse_telemetry_strict, split_frames};

fn full_frame() -> Vec<u8> {
    let body: Vec<String> = (0..32).map(|i| format!("{:.3}", i as f32 * 0.125)).collect();
    format!("S:{}\n", body.join(",")).into_bytes()
}

fn bench_parse(c: &mut Criterion) {
    let frame = full_frame();
    let malformed = b"S:1.0,bad,3.0,4.5x,,7\n".to_vec();
    let chunk: Vec<u8> = (0..8).flat_map(|_| frame.clone()).collect();

    c.bench_function("parse_telemetry_32_values", |b| {
        b.iter(|| parse_telemetry(black_box(&frame)))
    });

    c.bench_function("parse_telemetry_strict_32_values", |b| {
        b.iter(|| parse_telemetry_strict(black_box(&frame)))
    });

    c.bench_function("parse_telemetry_malformed", |b| {
        b.iter(|| parse_telemetry(black_box(&malformed)))
    });

    c.bench_function("split_and_parse_8_frames", |b| {
        b.iter(|| split_frames(black_box(&chunk)).filter_map(parse_telemetry).last())
    });
}

criterion_group!(benches, bench_parse);
criterion_main!(benches);
