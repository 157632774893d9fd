// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Field access by dotted path for content filters and query conditions.
//!
//! Paths name struct members by name (`"pose.position.x"`); `_d` names a
//! union discriminator. Values come either from a materialized
//! [`DynamicData`] or straight from an encoded buffer, in which case only
//! the bytes on the way to the field are walked and unrelated members are
//! skipped using the same framing rules as the codec.

use crate::codec::{Decoder, Scope};
use crate::compare::{compare_values, value_at};
use crate::config::EncodingConfig;
use crate::data::DynamicData;
use crate::error::{DynamicError, Result};
use crate::resolver::{key_paths, KeyPath};
use crate::types::{DynamicType, Extensibility, MemberId, TypeKind, DISCRIMINATOR_ID};
use crate::value::Value;
use std::cmp::Ordering;
use std::sync::Arc;

/// Path segment naming a union discriminator.
pub const DISCRIMINATOR_FIELD: &str = "_d";

/// Scalar view of a field, as consumed by filter expressions.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Integer(i64),
    Float(f64),
    String(String),
    Boolean(bool),
    Unsigned(u64),
}

impl FieldValue {
    /// Scalar values only; aggregates and collections yield `None`.
    pub fn from_value(value: &Value) -> Option<Self> {
        let field = match value {
            Value::Bool(v) => Self::Boolean(*v),
            Value::Byte(v) | Value::U8(v) => Self::Unsigned(u64::from(*v)),
            Value::U16(v) => Self::Unsigned(u64::from(*v)),
            Value::U32(v) => Self::Unsigned(u64::from(*v)),
            Value::U64(v) => Self::Unsigned(*v),
            Value::I8(v) => Self::Integer(i64::from(*v)),
            Value::I16(v) => Self::Integer(i64::from(*v)),
            Value::I32(v) | Value::Enum(v) => Self::Integer(i64::from(*v)),
            Value::I64(v) => Self::Integer(*v),
            Value::F32(v) => Self::Float(f64::from(*v)),
            Value::F64(v) => Self::Float(*v),
            Value::Char(c) | Value::WChar(c) => Self::String(c.to_string()),
            Value::String(s) | Value::WString(s) => Self::String(s.clone()),
            Value::Data(_) | Value::Sequence(_) | Value::Array(_) | Value::Map(_) => return None,
        };
        Some(field)
    }
}

/// One resolved path step.
#[derive(Debug, Clone)]
struct Step {
    id: MemberId,
    ty: Arc<DynamicType>,
}

/// Path-based view of one struct or union type.
#[derive(Debug, Clone)]
pub struct MetaStruct {
    ty: Arc<DynamicType>,
    keys: Vec<KeyPath>,
}

impl MetaStruct {
    pub fn new(ty: &Arc<DynamicType>) -> Result<Self> {
        if !ty.is_aggregate() {
            return Err(DynamicError::mismatch("struct or union", ty.kind().name()));
        }
        Ok(Self {
            ty: Arc::clone(ty),
            keys: key_paths(ty)?,
        })
    }

    pub fn dynamic_type(&self) -> &Arc<DynamicType> {
        &self.ty
    }

    fn resolve(&self, path: &str) -> Result<Vec<Step>> {
        let mut steps = Vec::new();
        let mut current = Arc::clone(&self.ty);
        for segment in path.split('.') {
            let next = match current.kind() {
                TypeKind::Union(u) if segment == DISCRIMINATOR_FIELD => Step {
                    id: DISCRIMINATOR_ID,
                    ty: Arc::clone(&u.discriminator),
                },
                TypeKind::Struct(_) | TypeKind::Union(_) => {
                    let member = current.member_by_name(segment)?;
                    Step {
                        id: member.id,
                        ty: Arc::clone(&member.member_type),
                    }
                }
                _ => {
                    return Err(DynamicError::MemberNotFound(format!(
                        "{}: '{}' is not an aggregate",
                        path, segment
                    )))
                }
            };
            current = Arc::clone(&next.ty);
            steps.push(next);
        }
        Ok(steps)
    }

    fn ids(&self, path: &str) -> Result<Vec<MemberId>> {
        Ok(self.resolve(path)?.into_iter().map(|s| s.id).collect())
    }

    /// Member id of the last segment of `path`.
    pub fn member_id_for(&self, path: &str) -> Result<MemberId> {
        self.resolve(path)?
            .last()
            .map(|s| s.id)
            .ok_or_else(|| DynamicError::MemberNotFound(path.to_string()))
    }

    /// Whether `path` is a key field or lies on the way to one.
    pub fn is_key(&self, path: &str) -> Result<bool> {
        let ids = self.ids(path)?;
        Ok(self
            .keys
            .iter()
            .any(|key| key.starts_with(&ids) || ids.starts_with(key.ids())))
    }

    pub fn key_count(&self) -> usize {
        self.keys.len()
    }

    /// Dotted paths of every leaf field, nested structs flattened.
    pub fn field_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        collect_names(&self.ty, "", &mut names);
        names
    }

    /// Field of a materialized sample.
    pub fn value_of(&self, data: &DynamicData, path: &str) -> Result<FieldValue> {
        let value = value_at(data, &self.ids(path)?)?;
        scalar(value, path)
    }

    /// Field read directly from an encoded sample of this type.
    pub fn value_from_buffer(
        &self,
        bytes: &[u8],
        path: &str,
        config: &EncodingConfig,
    ) -> Result<FieldValue> {
        let steps = self.resolve(path)?;
        let mut decoder = Decoder::new(bytes, config);
        let mut current = Arc::clone(&self.ty);
        for (i, step) in steps.iter().enumerate() {
            match decoder.seek_member(&current, step.id)? {
                Some(member) => decoder = member,
                None => return absent_field(&current, &steps[i..], path),
            }
            current = Arc::clone(&step.ty);
        }
        let value = decoder.read_value(&current, Scope::Full)?;
        scalar(&value, path)
    }

    /// Order `a` and `b` by one field.
    pub fn compare_field(&self, a: &DynamicData, b: &DynamicData, path: &str) -> Result<Ordering> {
        let ids = self.ids(path)?;
        Ok(compare_values(value_at(a, &ids)?, value_at(b, &ids)?))
    }
}

/// Field whose member is missing from the buffer. A full decode gives
/// absent non-optional members of mutable structs their default value;
/// anything else is not set.
fn absent_field(parent: &DynamicType, rest: &[Step], path: &str) -> Result<FieldValue> {
    let Some((step, nested)) = rest.split_first() else {
        return Err(DynamicError::MemberNotFound(path.to_string()));
    };
    let defaulted = parent.extensibility() == Extensibility::Mutable
        && parent.union_descriptor().is_none()
        && parent.member_by_id(step.id).is_ok_and(|m| !m.is_optional());
    if !defaulted {
        return Err(DynamicError::MemberNotSet(step.id));
    }
    let value = Value::default_for(&step.ty);
    if nested.is_empty() {
        return scalar(&value, path);
    }
    let ids: Vec<MemberId> = nested.iter().map(|s| s.id).collect();
    match &value {
        Value::Data(data) => scalar(value_at(data, &ids)?, path),
        other => Err(DynamicError::mismatch("data", other.tag())),
    }
}

fn scalar(value: &Value, path: &str) -> Result<FieldValue> {
    FieldValue::from_value(value)
        .ok_or_else(|| DynamicError::mismatch(format!("scalar field {}", path), value.tag()))
}

fn collect_names(ty: &DynamicType, prefix: &str, names: &mut Vec<String>) {
    let join = |name: &str| {
        if prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", prefix, name)
        }
    };
    if ty.union_descriptor().is_some() {
        names.push(join(DISCRIMINATOR_FIELD));
    }
    for member in ty.members() {
        let path = join(&member.name);
        match member.member_type.kind() {
            TypeKind::Struct(_) | TypeKind::Union(_) => {
                collect_names(&member.member_type, &path, names)
            }
            _ => names.push(path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{TypeDescriptorBuilder, UnionBuilder};
    use crate::codec::encode_dynamic;
    use crate::types::PrimitiveKind;

    fn vehicle() -> Arc<DynamicType> {
        let position = TypeDescriptorBuilder::new("Position")
            .appendable()
            .field("x", PrimitiveKind::F64)
            .field("y", PrimitiveKind::F64)
            .build()
            .unwrap();
        TypeDescriptorBuilder::new("Vehicle")
            .mutable()
            .key_field("id", PrimitiveKind::U32)
            .string_field("name")
            .field_with_type("position", position)
            .optional_field("speed", PrimitiveKind::F32)
            .build()
            .unwrap()
    }

    fn sample(ty: &Arc<DynamicType>) -> DynamicData {
        let position_ty = Arc::clone(&ty.member_by_name("position").unwrap().member_type);
        let mut position = DynamicData::new(&position_ty);
        position.set(0, 3.5f64).unwrap();
        position.set(1, -1.0f64).unwrap();

        let mut data = DynamicData::new(ty);
        data.set_by_name("id", 42u32).unwrap();
        data.set_by_name("name", "rover").unwrap();
        data.set_by_name("position", position).unwrap();
        data
    }

    #[test]
    fn test_paths() {
        let meta = MetaStruct::new(&vehicle()).unwrap();
        assert_eq!(meta.member_id_for("position.y").unwrap(), 1);
        assert_eq!(meta.member_id_for("speed").unwrap(), 3);
        assert!(meta.member_id_for("position.z").is_err());
        assert!(meta.member_id_for("name.len").is_err());
        assert!(meta.is_key("id").unwrap());
        assert!(!meta.is_key("name").unwrap());
        assert_eq!(meta.key_count(), 1);
        assert_eq!(
            meta.field_names(),
            vec!["id", "name", "position.x", "position.y", "speed"]
        );
    }

    #[test]
    fn test_value_of() {
        let ty = vehicle();
        let meta = MetaStruct::new(&ty).unwrap();
        let data = sample(&ty);
        assert_eq!(meta.value_of(&data, "id").unwrap(), FieldValue::Unsigned(42));
        assert_eq!(meta.value_of(&data, "position.x").unwrap(), FieldValue::Float(3.5));
        assert_eq!(
            meta.value_of(&data, "speed").unwrap_err(),
            DynamicError::MemberNotSet(3)
        );
        assert!(matches!(
            meta.value_of(&data, "position"),
            Err(DynamicError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_value_from_buffer_matches_materialized() {
        let ty = vehicle();
        let meta = MetaStruct::new(&ty).unwrap();
        let data = sample(&ty);
        for config in [EncodingConfig::xcdr2(), EncodingConfig::xcdr1()] {
            let bytes = encode_dynamic(&data, &config).unwrap();
            for path in ["id", "name", "position.x", "position.y"] {
                assert_eq!(
                    meta.value_from_buffer(&bytes, path, &config).unwrap(),
                    meta.value_of(&data, path).unwrap(),
                    "{} under {:?}",
                    path,
                    config.representation
                );
            }
            assert_eq!(
                meta.value_from_buffer(&bytes, "speed", &config).unwrap_err(),
                DynamicError::MemberNotSet(3)
            );
        }
    }

    #[test]
    fn test_union_discriminator_path() {
        let shape = UnionBuilder::new("Shape", DynamicType::primitive(PrimitiveKind::I16))
            .case("radius", PrimitiveKind::F32, [1])
            .case("side", PrimitiveKind::U16, [2])
            .build()
            .unwrap();
        let ty = TypeDescriptorBuilder::new("Drawing")
            .field("layer", PrimitiveKind::U8)
            .field_with_type("shape", shape.clone())
            .build()
            .unwrap();
        let mut inner = DynamicData::new(&shape);
        inner.set_by_name("side", 9u16).unwrap();
        let mut data = DynamicData::new(&ty);
        data.set(0, 1u8).unwrap();
        data.set(1, inner).unwrap();

        let meta = MetaStruct::new(&ty).unwrap();
        assert_eq!(
            meta.field_names(),
            vec!["layer", "shape._d", "shape.radius", "shape.side"]
        );
        let config = EncodingConfig::xcdr2();
        let bytes = encode_dynamic(&data, &config).unwrap();
        assert_eq!(
            meta.value_from_buffer(&bytes, "shape._d", &config).unwrap(),
            FieldValue::Integer(2)
        );
        assert_eq!(
            meta.value_from_buffer(&bytes, "shape.side", &config).unwrap(),
            FieldValue::Unsigned(9)
        );
        assert!(meta.value_from_buffer(&bytes, "shape.radius", &config).is_err());
    }

    #[test]
    fn test_compare_field() {
        let ty = vehicle();
        let meta = MetaStruct::new(&ty).unwrap();
        let a = sample(&ty);
        let mut b = sample(&ty);
        b.get_data_mut(2).unwrap().set(0, 10.0f64).unwrap();
        assert_eq!(meta.compare_field(&a, &b, "position.x").unwrap(), Ordering::Less);
        assert_eq!(meta.compare_field(&a, &b, "name").unwrap(), Ordering::Equal);
    }
}
