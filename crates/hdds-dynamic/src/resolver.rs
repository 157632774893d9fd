// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Key and extensibility resolution over a type tree.
//!
//! Key rules:
//! - a struct's keys are its members flagged `@key`, visited in declaration
//!   order; a key member of struct type contributes that struct's keys, or all
//!   of its members when it declares none;
//! - a union contributes its discriminator when the discriminator is a key;
//!   keyed union members without a keyed discriminator are rejected.

use crate::error::{DynamicError, Result};
use crate::types::{
    DynamicType, Extensibility, MemberDescriptor, MemberId, TypeKind, UnionDescriptor,
    DISCRIMINATOR_ID,
};
use std::fmt;

/// Member ids leading from a top-level type to one leaf key field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyPath(Vec<MemberId>);

impl KeyPath {
    pub fn ids(&self) -> &[MemberId] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether `prefix` names this path or one of its ancestors.
    pub fn starts_with(&self, prefix: &[MemberId]) -> bool {
        self.0.starts_with(prefix)
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, id) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            write!(f, "{:#x}", id)?;
        }
        Ok(())
    }
}

/// Number of leaf key fields of `ty`.
pub fn key_count(ty: &DynamicType) -> Result<usize> {
    Ok(key_paths(ty)?.len())
}

/// Leaf key fields of `ty` in declaration order.
pub fn key_paths(ty: &DynamicType) -> Result<Vec<KeyPath>> {
    let mut paths = Vec::new();
    let mut prefix = Vec::new();
    collect_aggregate(ty, false, &mut prefix, &mut paths)?;
    Ok(paths)
}

fn collect_aggregate(
    ty: &DynamicType,
    nested: bool,
    prefix: &mut Vec<MemberId>,
    paths: &mut Vec<KeyPath>,
) -> Result<()> {
    match ty.kind() {
        TypeKind::Struct(_) => {
            for member in key_members(ty, nested) {
                prefix.push(member.id);
                collect_member(&member.member_type, prefix, paths)?;
                prefix.pop();
            }
            Ok(())
        }
        TypeKind::Union(u) => {
            check_union_keys(ty, u)?;
            if u.discriminator_is_key {
                prefix.push(DISCRIMINATOR_ID);
                paths.push(KeyPath(prefix.clone()));
                prefix.pop();
            } else if nested {
                return Err(DynamicError::NoKeyAnnotationOnUnion(ty.name().to_string()));
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

fn collect_member(
    member_type: &DynamicType,
    prefix: &mut Vec<MemberId>,
    paths: &mut Vec<KeyPath>,
) -> Result<()> {
    if member_type.is_aggregate() {
        collect_aggregate(member_type, true, prefix, paths)
    } else {
        paths.push(KeyPath(prefix.clone()));
        Ok(())
    }
}

fn check_union_keys(ty: &DynamicType, u: &UnionDescriptor) -> Result<()> {
    if !u.discriminator_is_key && u.members.iter().any(MemberDescriptor::is_key) {
        return Err(DynamicError::NoKeyAnnotationOnUnion(ty.name().to_string()));
    }
    Ok(())
}

/// Members of a struct taking part in its key, in declaration order.
///
/// A nested key struct without `@key` members is keyed on all of them.
pub(crate) fn key_members(ty: &DynamicType, nested: bool) -> Vec<&MemberDescriptor> {
    let members = ty.members();
    let keys: Vec<_> = members.iter().filter(|m| m.is_key()).collect();
    if keys.is_empty() && nested {
        members.iter().collect()
    } else {
        keys
    }
}

/// Most permissive extensibility among `ty` and every type nested in it.
pub fn max_extensibility(ty: &DynamicType) -> Extensibility {
    let own = ty.extensibility();
    match ty.kind() {
        TypeKind::Primitive(_) | TypeKind::Enum(_) => own,
        TypeKind::Struct(members) => members
            .iter()
            .map(|m| max_extensibility(&m.member_type))
            .fold(own, Extensibility::max),
        TypeKind::Union(u) => u
            .members
            .iter()
            .map(|m| max_extensibility(&m.member_type))
            .fold(own.max(max_extensibility(&u.discriminator)), Extensibility::max),
        TypeKind::Sequence(s) => own.max(max_extensibility(&s.element_type)),
        TypeKind::Array(a) => own.max(max_extensibility(&a.element_type)),
        TypeKind::Map(m) => own
            .max(max_extensibility(&m.key_type))
            .max(max_extensibility(&m.value_type)),
    }
}

/// Writer and reader aggregates must declare the same extensibility, member
/// by member for members both sides know.
pub fn check_extensibility(writer: &DynamicType, reader: &DynamicType) -> Result<()> {
    if !writer.is_aggregate() || !reader.is_aggregate() {
        return Ok(());
    }
    if writer.extensibility() != reader.extensibility() {
        return Err(DynamicError::IncompatibleExtensibility {
            type_name: reader.name().to_string(),
            writer: writer.extensibility(),
            reader: reader.extensibility(),
        });
    }
    for reader_member in reader.members() {
        if let Ok(writer_member) = writer.member_by_id(reader_member.id) {
            check_extensibility(&writer_member.member_type, &reader_member.member_type)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{SequenceBuilder, TypeDescriptorBuilder, UnionBuilder};
    use crate::types::PrimitiveKind;

    fn inner_with_three_keys() -> std::sync::Arc<DynamicType> {
        TypeDescriptorBuilder::new("Inner")
            .key_field("a", PrimitiveKind::U32)
            .key_field("b", PrimitiveKind::String { max_length: None })
            .key_field("c", PrimitiveKind::I16)
            .field("payload", PrimitiveKind::F64)
            .build()
            .unwrap()
    }

    #[test]
    fn test_key_count_nested() {
        let outer = TypeDescriptorBuilder::new("Outer")
            .key_field("id", PrimitiveKind::U64)
            .key_field_with_type("inner", inner_with_three_keys())
            .field("value", PrimitiveKind::F32)
            .build()
            .unwrap();
        assert_eq!(key_count(&outer).unwrap(), 4);

        let paths = key_paths(&outer).unwrap();
        assert_eq!(paths[0].ids(), &[0]);
        assert_eq!(paths[1].ids(), &[1, 0]);
        assert_eq!(paths[3].ids(), &[1, 2]);
    }

    #[test]
    fn test_nested_struct_without_keys_is_fully_keyed() {
        let inner = TypeDescriptorBuilder::new("Pair")
            .field("a", PrimitiveKind::U8)
            .field("b", PrimitiveKind::U8)
            .build()
            .unwrap();
        let outer = TypeDescriptorBuilder::new("Holder")
            .key_field_with_type("pair", inner)
            .build()
            .unwrap();
        assert_eq!(key_count(&outer).unwrap(), 2);
    }

    #[test]
    fn test_keyless_struct() {
        let ty = TypeDescriptorBuilder::new("Plain")
            .field("a", PrimitiveKind::U8)
            .build()
            .unwrap();
        assert_eq!(key_count(&ty).unwrap(), 0);
    }

    #[test]
    fn test_union_keys() {
        let keyed = UnionBuilder::new("Keyed", crate::DynamicType::primitive(PrimitiveKind::I32))
            .key_discriminator()
            .case("a", PrimitiveKind::U8, [1])
            .build()
            .unwrap();
        assert_eq!(key_count(&keyed).unwrap(), 1);

        let unkeyed = UnionBuilder::new("Unkeyed", crate::DynamicType::primitive(PrimitiveKind::I32))
            .case("a", PrimitiveKind::U8, [1])
            .build()
            .unwrap();
        assert_eq!(key_count(&unkeyed).unwrap(), 0);

        let holder = TypeDescriptorBuilder::new("Holder")
            .key_field_with_type("u", unkeyed)
            .build()
            .unwrap();
        assert!(matches!(
            key_count(&holder),
            Err(DynamicError::NoKeyAnnotationOnUnion(name)) if name == "Unkeyed"
        ));

        let bad = UnionBuilder::new("Bad", crate::DynamicType::primitive(PrimitiveKind::I32))
            .member(
                crate::MemberDescriptor::new("a", crate::DynamicType::primitive(PrimitiveKind::U8))
                    .with_labels([1])
                    .key(),
            )
            .build()
            .unwrap();
        assert!(matches!(
            key_count(&bad),
            Err(DynamicError::NoKeyAnnotationOnUnion(_))
        ));
    }

    #[test]
    fn test_max_extensibility_propagates() {
        let appendable = TypeDescriptorBuilder::new("Inner")
            .appendable()
            .field("a", PrimitiveKind::U8)
            .build()
            .unwrap();
        let seq = SequenceBuilder::new(appendable.clone()).build().unwrap();
        let outer = TypeDescriptorBuilder::new("Outer")
            .field_with_type("items", seq)
            .build()
            .unwrap();
        assert_eq!(outer.extensibility(), Extensibility::Final);
        assert_eq!(max_extensibility(&outer), Extensibility::Appendable);

        let mutable = TypeDescriptorBuilder::new("Top")
            .mutable()
            .field_with_type("inner", appendable)
            .build()
            .unwrap();
        assert_eq!(max_extensibility(&mutable), Extensibility::Mutable);
    }

    #[test]
    fn test_check_extensibility() {
        let writer = TypeDescriptorBuilder::new("T")
            .appendable()
            .field("a", PrimitiveKind::U8)
            .build()
            .unwrap();
        let reader = TypeDescriptorBuilder::new("T")
            .mutable()
            .field("a", PrimitiveKind::U8)
            .build()
            .unwrap();
        assert!(check_extensibility(&writer, &writer).is_ok());
        assert!(matches!(
            check_extensibility(&writer, &reader),
            Err(DynamicError::IncompatibleExtensibility {
                writer: Extensibility::Appendable,
                reader: Extensibility::Mutable,
                ..
            })
        ));
    }
}
