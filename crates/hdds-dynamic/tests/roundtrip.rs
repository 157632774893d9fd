// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com
//
// Randomized encode/decode of a type graph that exercises every kind:
// primitives, bounded strings, enums, nested appendable structs, unions,
// sequences, arrays and maps, under both representations and byte orders.

#![allow(clippy::float_cmp)]

use hdds_dynamic::{
    decode_dynamic, decode_into, decode_key_only, encode_dynamic, key_cmp, serialized_size,
    ArrayBuilder, DynamicData, DynamicType, EncodingConfig, Endianness, EnumBuilder, MapBuilder,
    PrimitiveKind, SequenceBuilder, TypeDescriptorBuilder, TypeKind, UnionBuilder, Value,
};
use std::cmp::Ordering;
use std::sync::Arc;

const ROUNDS: usize = 200;

fn telemetry_type() -> Arc<DynamicType> {
    let mode = EnumBuilder::new("Mode")
        .literal("ON")
        .literal("OFF")
        .literal("STANDBY")
        .build()
        .unwrap();
    let vec3 = TypeDescriptorBuilder::new("Vec3")
        .appendable()
        .field("x", PrimitiveKind::F32)
        .field("y", PrimitiveKind::F32)
        .field("z", PrimitiveKind::F32)
        .build()
        .unwrap();
    let reading = UnionBuilder::new("Reading", DynamicType::primitive(PrimitiveKind::I32))
        .case("count", PrimitiveKind::U32, [1])
        .case("label", PrimitiveKind::String { max_length: Some(16) }, [2, 3])
        .case_with_type("where", vec3.clone(), [4])
        .default_case("raw", DynamicType::primitive(PrimitiveKind::F64))
        .build()
        .unwrap();
    let props = MapBuilder::new(DynamicType::string(None), DynamicType::primitive(PrimitiveKind::U32))
        .bounded(4)
        .build()
        .unwrap();
    let path = SequenceBuilder::new(vec3.clone()).bounded(5).build().unwrap();
    let modes = ArrayBuilder::new(mode.clone(), 2).build().unwrap();

    TypeDescriptorBuilder::new("Telemetry")
        .mutable()
        .key_field("id", PrimitiveKind::U32)
        .key_field("zone", PrimitiveKind::Char)
        .field("flag", PrimitiveKind::Bool)
        .field("level", PrimitiveKind::I8)
        .field("octet", PrimitiveKind::Byte)
        .field("small", PrimitiveKind::I16)
        .field("wide_char", PrimitiveKind::WChar)
        .field("big", PrimitiveKind::I64)
        .field("counter", PrimitiveKind::U64)
        .field("ratio", PrimitiveKind::F64)
        .string_field("name")
        .bounded_string_field("tag", 8)
        .field("label", PrimitiveKind::WString { max_length: None })
        .sequence_field("samples", PrimitiveKind::I32)
        .array_field("gains", PrimitiveKind::F64, 3)
        .field_with_type("pos", vec3)
        .field_with_type("mode", mode)
        .field_with_type("modes", modes)
        .field_with_type("reading", reading)
        .field_with_type("props", props)
        .field_with_type("path", path)
        .optional_field("note", PrimitiveKind::String { max_length: None })
        .optional_field("trim", PrimitiveKind::U16)
        .build()
        .unwrap()
}

fn random_string(rng: &mut fastrand::Rng, bound: Option<usize>) -> String {
    let len = rng.usize(..=bound.unwrap_or(12).min(12));
    (0..len).map(|_| rng.alphanumeric()).collect()
}

fn random_primitive(rng: &mut fastrand::Rng, kind: PrimitiveKind) -> Value {
    match kind {
        PrimitiveKind::Bool => Value::Bool(rng.bool()),
        PrimitiveKind::Byte => Value::Byte(rng.u8(..)),
        PrimitiveKind::U8 => Value::U8(rng.u8(..)),
        PrimitiveKind::U16 => Value::U16(rng.u16(..)),
        PrimitiveKind::U32 => Value::U32(rng.u32(..)),
        PrimitiveKind::U64 => Value::U64(rng.u64(..)),
        PrimitiveKind::I8 => Value::I8(rng.i8(..)),
        PrimitiveKind::I16 => Value::I16(rng.i16(..)),
        PrimitiveKind::I32 => Value::I32(rng.i32(..)),
        PrimitiveKind::I64 => Value::I64(rng.i64(..)),
        PrimitiveKind::F32 => Value::F32(rng.f32() * 1000.0 - 500.0),
        PrimitiveKind::F64 => Value::F64(rng.f64() * 1e6 - 5e5),
        PrimitiveKind::Char => Value::Char(rng.alphanumeric()),
        PrimitiveKind::WChar => Value::WChar(['a', 'é', 'Ω', '€'][rng.usize(..4)]),
        PrimitiveKind::String { max_length } => Value::String(random_string(rng, max_length)),
        PrimitiveKind::WString { max_length } => {
            let mut s = random_string(rng, max_length.map(|b| b.saturating_sub(1)));
            if max_length.map_or(true, |b| b > s.len()) {
                s.push('λ');
            }
            Value::WString(s)
        }
    }
}

fn random_value(rng: &mut fastrand::Rng, ty: &Arc<DynamicType>) -> Value {
    match ty.kind() {
        TypeKind::Primitive(kind) => random_primitive(rng, *kind),
        TypeKind::Enum(e) => Value::Enum(e.literals[rng.usize(..e.literals.len())].value),
        TypeKind::Struct(_) | TypeKind::Union(_) => Value::Data(random_data(rng, ty)),
        TypeKind::Sequence(s) => {
            let len = rng.usize(..=s.max_length.unwrap_or(4).min(4));
            Value::Sequence((0..len).map(|_| random_value(rng, &s.element_type)).collect())
        }
        TypeKind::Array(a) => {
            Value::Array((0..a.length).map(|_| random_value(rng, &a.element_type)).collect())
        }
        TypeKind::Map(m) => {
            let target = rng.usize(..=m.max_length.unwrap_or(3).min(3));
            let mut entries: Vec<(Value, Value)> = Vec::new();
            for _ in 0..target {
                let key = random_value(rng, &m.key_type);
                if entries.iter().all(|(k, _)| *k != key) {
                    entries.push((key, random_value(rng, &m.value_type)));
                }
            }
            Value::Map(entries)
        }
    }
}

fn random_data(rng: &mut fastrand::Rng, ty: &Arc<DynamicType>) -> DynamicData {
    let mut data = DynamicData::new(ty);
    if let Some(u) = ty.union_descriptor() {
        let member = &u.members[rng.usize(..u.members.len())];
        data.set(member.id, random_value(rng, &member.member_type))
            .unwrap();
        return data;
    }
    for member in ty.members() {
        if member.is_optional() && rng.bool() {
            continue;
        }
        data.set(member.id, random_value(rng, &member.member_type))
            .unwrap();
    }
    data
}

fn configs() -> [EncodingConfig; 4] {
    [
        EncodingConfig::xcdr2(),
        EncodingConfig::xcdr2().with_endianness(Endianness::Big),
        EncodingConfig::xcdr1(),
        EncodingConfig::xcdr1().with_endianness(Endianness::Big),
    ]
}

#[test]
fn random_samples_survive_every_representation() {
    let ty = telemetry_type();
    let mut rng = fastrand::Rng::with_seed(0x5EED_0001);

    for round in 0..ROUNDS {
        let sample = random_data(&mut rng, &ty);
        for config in configs() {
            let bytes = encode_dynamic(&sample, &config).unwrap();
            assert_eq!(serialized_size(&sample, &config).unwrap(), bytes.len());

            let decoded = decode_dynamic(&bytes, &ty, &config).unwrap();
            assert_eq!(decoded, sample, "round {} with {:?}", round, config);

            // Byte-stable: decoding never changes what would be written.
            assert_eq!(encode_dynamic(&decoded, &config).unwrap(), bytes);
        }
    }
}

#[test]
fn random_keys_round_trip_key_only() {
    let ty = telemetry_type();
    let mut rng = fastrand::Rng::with_seed(0x5EED_0002);

    for _ in 0..ROUNDS {
        let sample = random_data(&mut rng, &ty);
        let mut key = sample.clone();
        key.set_key_only(true);
        for config in configs() {
            let bytes = encode_dynamic(&key, &config).unwrap();
            let decoded = decode_key_only(&bytes, &ty, &config).unwrap();
            assert!(decoded.is_key_only());
            assert_eq!(key_cmp(&decoded, &sample).unwrap(), Ordering::Equal);
            assert!(!decoded.is_set(ty.member_by_name("name").unwrap().id));
        }
    }
}

#[test]
fn decode_into_replaces_previous_contents() {
    let ty = telemetry_type();
    let mut rng = fastrand::Rng::with_seed(0x5EED_0003);
    let config = EncodingConfig::xcdr2();

    let mut target = random_data(&mut rng, &ty);
    for _ in 0..20 {
        let sample = random_data(&mut rng, &ty);
        let bytes = encode_dynamic(&sample, &config).unwrap();
        decode_into(&mut target, &bytes, &config).unwrap();
        assert_eq!(target, sample);
    }
}

#[test]
fn truncated_samples_are_rejected() {
    let ty = telemetry_type();
    let mut rng = fastrand::Rng::with_seed(0x5EED_0004);

    for _ in 0..20 {
        let sample = random_data(&mut rng, &ty);
        for config in configs() {
            let bytes = encode_dynamic(&sample, &config).unwrap();
            let cut = rng.usize(..bytes.len());
            assert!(
                decode_dynamic(&bytes[..cut], &ty, &config).is_err(),
                "{} of {} bytes decoded under {:?}",
                cut,
                bytes.len(),
                config
            );
        }
    }
}
