// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! DynamicData container for runtime data manipulation.
//!
//! A container is bound to one struct or union type and holds values for
//! populated members only; absent members are not defaulted. Every `set`
//! validates the value against the member's declared type.
//!
//! For unions the container keeps the discriminator under
//! [`DISCRIMINATOR_ID`] and at most one other member, which is always the
//! member the discriminator selects.

use crate::error::{DynamicError, Result};
use crate::types::{
    DynamicType, MemberDescriptor, MemberId, PrimitiveKind, TypeKind, UnionDescriptor,
    DISCRIMINATOR_ID,
};
use crate::value::{FromValue, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Dynamic data container with runtime type checking.
#[derive(Debug, Clone)]
pub struct DynamicData {
    ty: Arc<DynamicType>,
    values: BTreeMap<MemberId, Value>,
    key_only: bool,
}

impl DynamicData {
    /// Create an empty container; all members start absent.
    pub fn new(ty: &Arc<DynamicType>) -> Self {
        Self {
            ty: Arc::clone(ty),
            values: BTreeMap::new(),
            key_only: false,
        }
    }

    pub fn dynamic_type(&self) -> &Arc<DynamicType> {
        &self.ty
    }

    pub fn type_name(&self) -> &str {
        self.ty.name()
    }

    pub fn member_id(&self, name: &str) -> Result<MemberId> {
        self.ty.member_by_name(name).map(|m| m.id)
    }

    /// Restrict subsequent encode/decode to key members.
    pub fn set_key_only(&mut self, key_only: bool) {
        self.key_only = key_only;
    }

    pub fn is_key_only(&self) -> bool {
        self.key_only
    }

    pub fn is_set(&self, id: MemberId) -> bool {
        self.values.contains_key(&id)
    }

    /// Number of populated members (discriminator included).
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Populated members in id order.
    pub fn populated(&self) -> impl Iterator<Item = (MemberId, &Value)> {
        self.values.iter().map(|(id, v)| (*id, v))
    }

    // -----------------------------------------------------------------------
    // Member access
    // -----------------------------------------------------------------------

    pub fn get_value(&self, id: MemberId) -> Result<&Value> {
        self.slot_type(id)?;
        self.values.get(&id).ok_or(DynamicError::MemberNotSet(id))
    }

    pub fn get<T: FromValue>(&self, id: MemberId) -> Result<T> {
        T::from_value(self.get_value(id)?)
    }

    pub fn get_by_name<T: FromValue>(&self, name: &str) -> Result<T> {
        self.get(self.member_id(name)?)
    }

    /// Mutable access to a populated nested struct or union.
    pub fn get_data_mut(&mut self, id: MemberId) -> Result<&mut DynamicData> {
        self.slot_type(id)?;
        match self.values.get_mut(&id) {
            Some(Value::Data(data)) => Ok(data),
            Some(other) => Err(DynamicError::mismatch("data", other.tag())),
            None => Err(DynamicError::MemberNotSet(id)),
        }
    }

    pub fn set(&mut self, id: MemberId, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        let slot = Arc::clone(self.slot_type(id)?);
        validate_value(&slot, &value)?;
        let ty = Arc::clone(&self.ty);
        match ty.union_descriptor() {
            Some(u) => self.set_union(u, id, value),
            None => {
                self.values.insert(id, value);
                Ok(())
            }
        }
    }

    pub fn set_by_name(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        let id = self.member_id(name)?;
        self.set(id, value)
    }

    /// Make a member absent again.
    pub fn clear(&mut self, id: MemberId) -> Result<()> {
        self.slot_type(id)?;
        self.values.remove(&id);
        Ok(())
    }

    pub fn clear_all(&mut self) {
        self.values.clear();
    }

    // -----------------------------------------------------------------------
    // Unions
    // -----------------------------------------------------------------------

    pub fn discriminator(&self) -> Option<&Value> {
        self.values.get(&DISCRIMINATOR_ID)
    }

    /// Populated union member, if any.
    pub fn active_member(&self) -> Option<&MemberDescriptor> {
        self.ty.union_descriptor()?;
        self.values
            .keys()
            .find(|id| **id != DISCRIMINATOR_ID)
            .and_then(|id| self.ty.member_by_id(*id).ok())
    }

    /// Union member selected by the current discriminator.
    pub fn selected_member(&self) -> Option<&MemberDescriptor> {
        let u = self.ty.union_descriptor()?;
        let label = self.discriminator()?.as_label()?;
        u.member_for_label(label)
    }

    fn set_union(&mut self, u: &UnionDescriptor, id: MemberId, value: Value) -> Result<()> {
        if id == DISCRIMINATOR_ID {
            let label = value
                .as_label()
                .ok_or_else(|| DynamicError::mismatch("discriminator", value.tag()))?;
            let selected = u.member_for_label(label).map(|m| m.id);
            self.values
                .retain(|k, _| *k == DISCRIMINATOR_ID || Some(*k) == selected);
            self.values.insert(DISCRIMINATOR_ID, value);
            return Ok(());
        }

        let already_selected = self.selected_member().map(|m| m.id) == Some(id);
        if !already_selected {
            let member = self.ty.member_by_id(id)?;
            let label = match member.labels.first() {
                Some(label) => *label,
                None => default_label(u),
            };
            let discriminator = Value::from_label(&u.discriminator, label)?;
            self.values.insert(DISCRIMINATOR_ID, discriminator);
        }
        self.values.retain(|k, _| *k == DISCRIMINATOR_ID);
        self.values.insert(id, value);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Collections
    // -----------------------------------------------------------------------

    pub fn element_count(&self, id: MemberId) -> Result<usize> {
        match self.get_value(id)? {
            Value::Sequence(v) | Value::Array(v) => Ok(v.len()),
            Value::Map(entries) => Ok(entries.len()),
            other => Err(DynamicError::mismatch("collection", other.tag())),
        }
    }

    /// Element `index` of a sequence or array, or the value of the
    /// `index`-th map entry.
    pub fn get_element(&self, id: MemberId, index: usize) -> Result<&Value> {
        let out_of_range = |len: usize| DynamicError::BoundExceeded {
            bound: len,
            requested: index + 1,
        };
        match self.get_value(id)? {
            Value::Sequence(v) | Value::Array(v) => v.get(index).ok_or(out_of_range(v.len())),
            Value::Map(entries) => entries
                .get(index)
                .map(|(_, v)| v)
                .ok_or(out_of_range(entries.len())),
            other => Err(DynamicError::mismatch("collection", other.tag())),
        }
    }

    /// Replace element `index`; for sequences `index == len` appends while
    /// the declared bound allows it.
    pub fn set_element(&mut self, id: MemberId, index: usize, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        let slot = Arc::clone(self.slot_type(id)?);
        let (element_type, capacity) = match slot.kind() {
            TypeKind::Sequence(s) => (&s.element_type, s.max_length),
            TypeKind::Array(a) => (&a.element_type, Some(a.length)),
            TypeKind::Map(m) => (&m.value_type, m.max_length),
            other => return Err(DynamicError::mismatch("collection", other.name())),
        };
        validate_value(element_type, &value)?;
        if let Some(capacity) = capacity {
            if index >= capacity {
                return Err(DynamicError::BoundExceeded {
                    bound: capacity,
                    requested: index + 1,
                });
            }
        }
        if !self.values.contains_key(&id) {
            self.set(id, Value::default_for(&slot))?;
        }

        let current = self
            .values
            .get_mut(&id)
            .ok_or(DynamicError::MemberNotSet(id))?;
        match current {
            Value::Sequence(v) if index == v.len() => v.push(value),
            Value::Sequence(v) | Value::Array(v) => match v.get_mut(index) {
                Some(slot) => *slot = value,
                None => {
                    return Err(DynamicError::BoundExceeded {
                        bound: v.len(),
                        requested: index + 1,
                    })
                }
            },
            Value::Map(entries) => match entries.get_mut(index) {
                Some((_, slot)) => *slot = value,
                None => {
                    return Err(DynamicError::BoundExceeded {
                        bound: entries.len(),
                        requested: index + 1,
                    })
                }
            },
            other => return Err(DynamicError::mismatch("collection", other.tag())),
        }
        Ok(())
    }

    /// Append to a sequence member.
    pub fn push_element(&mut self, id: MemberId, value: impl Into<Value>) -> Result<()> {
        let len = match self.values.get(&id) {
            Some(Value::Sequence(v)) => v.len(),
            _ => 0,
        };
        self.set_element(id, len, value)
    }

    pub fn get_map_value(&self, id: MemberId, key: &Value) -> Result<&Value> {
        match self.get_value(id)? {
            Value::Map(entries) => entries
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v)
                .ok_or_else(|| DynamicError::MemberNotFound(format!("map key {:?}", key))),
            other => Err(DynamicError::mismatch("map", other.tag())),
        }
    }

    /// Insert or replace a map entry, bound-checked on insertion.
    pub fn insert_map_entry(
        &mut self,
        id: MemberId,
        key: impl Into<Value>,
        value: impl Into<Value>,
    ) -> Result<()> {
        let (key, value) = (key.into(), value.into());
        let slot = Arc::clone(self.slot_type(id)?);
        let TypeKind::Map(m) = slot.kind() else {
            return Err(DynamicError::mismatch("map", slot.kind().name()));
        };
        validate_value(&m.key_type, &key)?;
        validate_value(&m.value_type, &value)?;
        if !self.values.contains_key(&id) {
            self.set(id, Value::Map(Vec::new()))?;
        }
        let Some(Value::Map(entries)) = self.values.get_mut(&id) else {
            return Err(DynamicError::MemberNotSet(id));
        };
        if let Some((_, slot)) = entries.iter_mut().find(|(k, _)| *k == key) {
            *slot = value;
            return Ok(());
        }
        if let Some(max) = m.max_length {
            if entries.len() >= max {
                return Err(DynamicError::BoundExceeded {
                    bound: max,
                    requested: entries.len() + 1,
                });
            }
        }
        entries.push((key, value));
        Ok(())
    }

    /// Deep equality, see [`crate::compare::equals`].
    pub fn compare(&self, other: &DynamicData) -> bool {
        crate::compare::equals(self, other)
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    /// Declared type of a member slot.
    fn slot_type(&self, id: MemberId) -> Result<&Arc<DynamicType>> {
        match self.ty.kind() {
            TypeKind::Union(u) if id == DISCRIMINATOR_ID => Ok(&u.discriminator),
            TypeKind::Struct(_) | TypeKind::Union(_) => {
                self.ty.member_by_id(id).map(|m| &m.member_type)
            }
            other => Err(DynamicError::mismatch("struct or union", other.name())),
        }
    }

    /// Store an already validated value (decoder path).
    pub(crate) fn insert_decoded(&mut self, id: MemberId, value: Value) {
        self.values.insert(id, value);
    }
}

impl PartialEq for DynamicData {
    fn eq(&self, other: &Self) -> bool {
        crate::compare::equals(self, other)
    }
}

/// Label for a default case: an unused enumerator for enum discriminators,
/// otherwise the smallest unused non-negative value.
fn default_label(u: &UnionDescriptor) -> i64 {
    let claimed = |label: i64| u.members.iter().any(|m| m.labels.contains(&label));
    if let Some(e) = u.discriminator.enum_descriptor() {
        if let Some(literal) = e.literals.iter().find(|l| !claimed(i64::from(l.value))) {
            return i64::from(literal.value);
        }
    }
    u.implicit_default_label()
}

/// Check a value's tag, bounds and enum ordinals against `ty`.
pub(crate) fn validate_value(ty: &DynamicType, value: &Value) -> Result<()> {
    let mismatch = || DynamicError::mismatch(ty.name(), value.tag());
    match (ty.kind(), value) {
        (TypeKind::Primitive(kind), _) => validate_primitive(*kind, value).ok_or_else(mismatch)?,
        (TypeKind::Enum(e), Value::Enum(v)) => {
            if !e.contains(*v) {
                return Err(DynamicError::InvalidEnumValue {
                    type_name: ty.name().to_string(),
                    value: *v,
                });
            }
            Ok(())
        }
        (TypeKind::Struct(_) | TypeKind::Union(_), Value::Data(data)) => {
            if data.dynamic_type().type_identifier() != ty.type_identifier() {
                return Err(DynamicError::mismatch(ty.name(), data.type_name()));
            }
            Ok(())
        }
        (TypeKind::Sequence(s), Value::Sequence(items)) => {
            check_bound(s.max_length, items.len())?;
            items.iter().try_for_each(|v| validate_value(&s.element_type, v))
        }
        (TypeKind::Array(a), Value::Array(items)) => {
            if items.len() > a.length {
                return Err(DynamicError::BoundExceeded {
                    bound: a.length,
                    requested: items.len(),
                });
            }
            if items.len() < a.length {
                return Err(DynamicError::mismatch(
                    ty.name(),
                    format!("array of {}", items.len()),
                ));
            }
            items.iter().try_for_each(|v| validate_value(&a.element_type, v))
        }
        (TypeKind::Map(m), Value::Map(entries)) => {
            check_bound(m.max_length, entries.len())?;
            for (i, (k, v)) in entries.iter().enumerate() {
                validate_value(&m.key_type, k)?;
                validate_value(&m.value_type, v)?;
                if entries[..i].iter().any(|(seen, _)| seen == k) {
                    return Err(DynamicError::mismatch(
                        format!("{} with unique keys", ty.name()),
                        format!("repeated key {:?}", k),
                    ));
                }
            }
            Ok(())
        }
        _ => Err(mismatch()),
    }
}

/// `None` on a tag mismatch, `Some(Err)` on a bound violation.
fn validate_primitive(kind: PrimitiveKind, value: &Value) -> Option<Result<()>> {
    let ok = match (kind, value) {
        (PrimitiveKind::Bool, Value::Bool(_))
        | (PrimitiveKind::Byte, Value::Byte(_))
        | (PrimitiveKind::U8, Value::U8(_))
        | (PrimitiveKind::U16, Value::U16(_))
        | (PrimitiveKind::U32, Value::U32(_))
        | (PrimitiveKind::U64, Value::U64(_))
        | (PrimitiveKind::I8, Value::I8(_))
        | (PrimitiveKind::I16, Value::I16(_))
        | (PrimitiveKind::I32, Value::I32(_))
        | (PrimitiveKind::I64, Value::I64(_))
        | (PrimitiveKind::F32, Value::F32(_))
        | (PrimitiveKind::F64, Value::F64(_)) => Ok(()),
        (PrimitiveKind::Char, Value::Char(c)) => check_bound(Some(0xFF), u32::from(*c) as usize),
        (PrimitiveKind::WChar, Value::WChar(c)) => {
            check_bound(Some(0xFFFF), u32::from(*c) as usize)
        }
        (PrimitiveKind::String { max_length }, Value::String(s)) => {
            check_bound(max_length, s.len())
        }
        (PrimitiveKind::WString { max_length }, Value::WString(s)) => {
            check_bound(max_length, s.encode_utf16().count())
        }
        _ => return None,
    };
    Some(ok)
}

pub(crate) fn check_bound(bound: Option<usize>, requested: usize) -> Result<()> {
    match bound {
        Some(bound) if requested > bound => Err(DynamicError::BoundExceeded { bound, requested }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{EnumBuilder, TypeDescriptorBuilder, UnionBuilder};

    fn sample_type() -> Arc<DynamicType> {
        TypeDescriptorBuilder::new("Sample")
            .key_field("id", PrimitiveKind::U32)
            .bounded_string_field("name", 4)
            .bounded_sequence_field("values", PrimitiveKind::I16, 2)
            .array_field("rgb", PrimitiveKind::U8, 3)
            .build()
            .unwrap()
    }

    fn shape_union() -> Arc<DynamicType> {
        UnionBuilder::new("Shape", DynamicType::primitive(PrimitiveKind::I32))
            .case("circle", PrimitiveKind::F64, [1])
            .case("square", PrimitiveKind::F32, [2, 3])
            .default_case("other", DynamicType::string(None))
            .build()
            .unwrap()
    }

    #[test]
    fn test_members_start_absent() {
        let data = DynamicData::new(&sample_type());
        assert!(data.is_empty());
        assert_eq!(data.get_value(0).unwrap_err(), DynamicError::MemberNotSet(0));
        assert!(matches!(
            data.get_value(99),
            Err(DynamicError::MemberNotFound(_))
        ));
    }

    #[test]
    fn test_set_validates_tag_and_bounds() {
        let mut data = DynamicData::new(&sample_type());
        data.set(0, 7u32).unwrap();
        assert_eq!(data.get::<u32>(0).unwrap(), 7);

        assert!(matches!(
            data.set(0, 7i64),
            Err(DynamicError::TypeMismatch { .. })
        ));
        assert_eq!(
            data.set(1, "hello"),
            Err(DynamicError::BoundExceeded {
                bound: 4,
                requested: 5
            })
        );
        assert!(data.set(2, vec![1i16, 2, 3]).is_err());
        assert!(data.set(3, Value::Array(vec![Value::U8(1)])).is_err());
    }

    #[test]
    fn test_element_access() {
        let mut data = DynamicData::new(&sample_type());
        data.push_element(2, 10i16).unwrap();
        data.push_element(2, 20i16).unwrap();
        assert_eq!(
            data.push_element(2, 30i16),
            Err(DynamicError::BoundExceeded {
                bound: 2,
                requested: 3
            })
        );
        data.set_element(2, 0, 11i16).unwrap();
        assert_eq!(data.get_element(2, 0).unwrap(), &Value::I16(11));
        assert_eq!(data.element_count(2).unwrap(), 2);

        data.set_element(3, 2, 255u8).unwrap();
        assert_eq!(data.get_element(3, 0).unwrap(), &Value::U8(0));
        assert_eq!(data.get_element(3, 2).unwrap(), &Value::U8(255));
        assert!(matches!(
            data.set_element(3, 3, 1u8),
            Err(DynamicError::BoundExceeded { bound: 3, .. })
        ));
        assert!(data.get_element(3, 5).is_err());
    }

    #[test]
    fn test_union_exclusivity() {
        let shape = shape_union();
        let mut data = DynamicData::new(&shape);
        data.set(1, 2.0f64).unwrap();
        assert_eq!(data.discriminator(), Some(&Value::I32(1)));

        data.set(2, 4.0f32).unwrap();
        assert_eq!(data.discriminator(), Some(&Value::I32(2)));
        assert_eq!(data.get_value(1).unwrap_err(), DynamicError::MemberNotSet(1));
        assert_eq!(data.get::<f32>(2).unwrap(), 4.0);
        assert_eq!(data.len(), 2);
    }

    #[test]
    fn test_union_keeps_matching_discriminator() {
        let mut data = DynamicData::new(&shape_union());
        data.set(DISCRIMINATOR_ID, 3i32).unwrap();
        assert_eq!(data.selected_member().unwrap().name, "square");
        assert!(data.active_member().is_none());

        data.set(2, 1.5f32).unwrap();
        assert_eq!(data.discriminator(), Some(&Value::I32(3)));
        assert_eq!(data.active_member().unwrap().name, "square");

        // Switching the discriminator away drops the now unselected member.
        data.set(DISCRIMINATOR_ID, 1i32).unwrap();
        assert!(!data.is_set(2));
    }

    #[test]
    fn test_union_default_case_label() {
        let mut data = DynamicData::new(&shape_union());
        data.set(3, "hexagon").unwrap();
        assert_eq!(data.discriminator(), Some(&Value::I32(0)));
        assert_eq!(data.selected_member().unwrap().name, "other");
    }

    #[test]
    fn test_enum_values_checked() {
        let color = EnumBuilder::new("Color")
            .literal("RED")
            .literal("GREEN")
            .build()
            .unwrap();
        let ty = TypeDescriptorBuilder::new("Pixel")
            .field_with_type("color", color)
            .build()
            .unwrap();
        let mut data = DynamicData::new(&ty);
        data.set(0, Value::Enum(1)).unwrap();
        assert_eq!(
            data.set(0, Value::Enum(7)),
            Err(DynamicError::InvalidEnumValue {
                type_name: "Color".into(),
                value: 7
            })
        );
    }

    #[test]
    fn test_nested_data_type_checked() {
        let inner = TypeDescriptorBuilder::new("Inner")
            .field("a", PrimitiveKind::U8)
            .build()
            .unwrap();
        let other = TypeDescriptorBuilder::new("Other")
            .field("a", PrimitiveKind::U8)
            .build()
            .unwrap();
        let outer = TypeDescriptorBuilder::new("Outer")
            .field_with_type("inner", inner.clone())
            .build()
            .unwrap();

        let mut data = DynamicData::new(&outer);
        assert!(data.set(0, DynamicData::new(&other)).is_err());
        data.set(0, DynamicData::new(&inner)).unwrap();
        data.get_data_mut(0).unwrap().set(0, 9u8).unwrap();
        let nested: DynamicData = data.get(0).unwrap();
        assert_eq!(nested.get::<u8>(0).unwrap(), 9);
    }

    #[test]
    fn test_map_entries() {
        let map = crate::builder::MapBuilder::new(
            DynamicType::string(None),
            DynamicType::primitive(PrimitiveKind::I32),
        )
        .bounded(1)
        .build()
        .unwrap();
        let ty = TypeDescriptorBuilder::new("Counters")
            .field_with_type("counts", map)
            .build()
            .unwrap();
        let mut data = DynamicData::new(&ty);
        data.insert_map_entry(0, "a", 1i32).unwrap();
        data.insert_map_entry(0, "a", 2i32).unwrap();
        assert_eq!(
            data.get_map_value(0, &Value::from("a")).unwrap(),
            &Value::I32(2)
        );
        assert!(matches!(
            data.insert_map_entry(0, "b", 3i32),
            Err(DynamicError::BoundExceeded { bound: 1, .. })
        ));

        let unbounded = crate::builder::MapBuilder::new(
            DynamicType::string(None),
            DynamicType::primitive(PrimitiveKind::I32),
        )
        .build()
        .unwrap();
        let repeated = Value::Map(vec![
            (Value::from("a"), Value::I32(1)),
            (Value::from("a"), Value::I32(2)),
        ]);
        assert!(matches!(
            validate_value(&unbounded, &repeated),
            Err(DynamicError::TypeMismatch { .. })
        ));
    }
}
