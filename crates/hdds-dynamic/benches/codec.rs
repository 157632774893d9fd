// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com
//!
//! Benchmark: dynamic codec encode / decode / field streaming
//!
//! Compares the framing cost of FINAL, APPENDABLE and MUTABLE versions of
//! the same sensor sample under XCDR1 and XCDR2.

#![allow(clippy::uninlined_format_args)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use hdds_dynamic::{
    decode_dynamic, encode_dynamic, serialized_size, DynamicData, DynamicType, EncodingConfig,
    Extensibility, MetaStruct, PrimitiveKind, TypeDescriptorBuilder,
};
use std::sync::Arc;

// ============================================================================
// Fixtures
// ============================================================================

fn sensor_type(extensibility: Extensibility) -> Arc<DynamicType> {
    TypeDescriptorBuilder::new("SensorReading")
        .extensibility(extensibility)
        .key_field("sensor_id", PrimitiveKind::U32)
        .field("timestamp", PrimitiveKind::U64)
        .string_field("location")
        .sequence_field("samples", PrimitiveKind::F32)
        .field("temperature", PrimitiveKind::F64)
        .build()
        .expect("valid benchmark type")
}

fn sensor_sample(ty: &Arc<DynamicType>) -> DynamicData {
    let mut data = DynamicData::new(ty);
    data.set_by_name("sensor_id", 17u32).unwrap();
    data.set_by_name("timestamp", 1_700_000_000_000u64).unwrap();
    data.set_by_name("location", "building-3/floor-2").unwrap();
    data.set_by_name("samples", (0..64).map(|i| i as f32 * 0.5).collect::<Vec<f32>>())
        .unwrap();
    data.set_by_name("temperature", 21.75f64).unwrap();
    data
}

const EXTENSIBILITIES: [Extensibility; 3] = [
    Extensibility::Final,
    Extensibility::Appendable,
    Extensibility::Mutable,
];

fn configs() -> [(&'static str, EncodingConfig); 2] {
    [("xcdr1", EncodingConfig::xcdr1()), ("xcdr2", EncodingConfig::xcdr2())]
}

// ============================================================================
// Benchmarks
// ============================================================================

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");
    for extensibility in EXTENSIBILITIES {
        let ty = sensor_type(extensibility);
        let data = sensor_sample(&ty);
        for (name, config) in configs() {
            let id = BenchmarkId::new(format!("{:?}", extensibility), name);
            group.bench_with_input(id, &data, |b, data| {
                b.iter(|| encode_dynamic(black_box(data), &config).unwrap());
            });
        }
    }
    group.finish();
}

fn bench_serialized_size(c: &mut Criterion) {
    let ty = sensor_type(Extensibility::Mutable);
    let data = sensor_sample(&ty);
    let config = EncodingConfig::xcdr2();
    c.bench_function("serialized_size/Mutable", |b| {
        b.iter(|| serialized_size(black_box(&data), &config).unwrap());
    });
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");
    for extensibility in EXTENSIBILITIES {
        let ty = sensor_type(extensibility);
        let data = sensor_sample(&ty);
        for (name, config) in configs() {
            let bytes = encode_dynamic(&data, &config).unwrap();
            let id = BenchmarkId::new(format!("{:?}", extensibility), name);
            group.bench_with_input(id, &bytes, |b, bytes| {
                b.iter(|| decode_dynamic(black_box(bytes), &ty, &config).unwrap());
            });
        }
    }
    group.finish();
}

/// Reading the last member from the buffer vs. decoding everything.
fn bench_field_streaming(c: &mut Criterion) {
    let mut group = c.benchmark_group("field");
    let ty = sensor_type(Extensibility::Mutable);
    let meta = MetaStruct::new(&ty).unwrap();
    let config = EncodingConfig::xcdr2();
    let bytes = encode_dynamic(&sensor_sample(&ty), &config).unwrap();

    group.bench_function("value_from_buffer", |b| {
        b.iter(|| meta.value_from_buffer(black_box(&bytes), "temperature", &config).unwrap());
    });
    group.bench_function("decode_then_value_of", |b| {
        b.iter(|| {
            let data = decode_dynamic(black_box(&bytes), &ty, &config).unwrap();
            meta.value_of(&data, "temperature").unwrap()
        });
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_encode,
    bench_serialized_size,
    bench_decode,
    bench_field_streaming
);
criterion_main!(benches);
