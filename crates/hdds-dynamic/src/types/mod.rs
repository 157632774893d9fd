// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Dynamic type model.
//!
//! A [`DynamicType`] is a validated, immutable [`TypeDescriptor`] together
//! with its minimal and complete [`TypeIdentifier`]s. Types are shared as
//! `Arc<DynamicType>` and nested types are referenced the same way, so a
//! type tree is built bottom-up and never changes afterwards.

mod canonical;
mod descriptor;

pub use descriptor::{
    hashed_member_id, ArrayDescriptor, EnumDescriptor, EnumLiteral, Extensibility,
    MapDescriptor, MemberDescriptor, MemberFlag, MemberId, PrimitiveKind, SequenceDescriptor,
    TypeDescriptor, TypeKind, UnionDescriptor, DISCRIMINATOR_ID, MEMBER_ID_MASK,
};

use crate::error::{DynamicError, Result};
use crate::resolver;
use crate::type_id::TypeIdentifier;
use canonical::Flavor;
use std::collections::HashSet;
use std::sync::Arc;

/// A registered (or registrable) runtime type.
#[derive(Debug)]
pub struct DynamicType {
    descriptor: TypeDescriptor,
    complete_id: TypeIdentifier,
    minimal_id: TypeIdentifier,
}

impl PartialEq for DynamicType {
    fn eq(&self, other: &Self) -> bool {
        self.complete_id == other.complete_id
    }
}

impl Eq for DynamicType {}

impl DynamicType {
    /// Validate a descriptor and compute its identifiers.
    pub fn new(descriptor: TypeDescriptor) -> Result<Arc<Self>> {
        validate(&descriptor)?;
        let complete_id = canonical::identifier(&descriptor, Flavor::Complete);
        let minimal_id = canonical::identifier(&descriptor, Flavor::Minimal);
        Ok(Arc::new(Self {
            descriptor,
            complete_id,
            minimal_id,
        }))
    }

    pub fn primitive(kind: PrimitiveKind) -> Arc<Self> {
        let descriptor = TypeDescriptor::primitive(kind);
        let id = canonical::inline_identifier(&descriptor.kind)
            .unwrap_or(TypeIdentifier::Primitive(kind.type_kind()));
        Arc::new(Self {
            descriptor,
            complete_id: id,
            minimal_id: id,
        })
    }

    pub fn string(max_length: Option<usize>) -> Arc<Self> {
        Self::primitive(PrimitiveKind::String { max_length })
    }

    pub fn descriptor(&self) -> &TypeDescriptor {
        &self.descriptor
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn kind(&self) -> &TypeKind {
        &self.descriptor.kind
    }

    /// Declared (base) extensibility.
    pub fn extensibility(&self) -> Extensibility {
        self.descriptor.extensibility
    }

    /// Complete TypeIdentifier.
    pub fn type_identifier(&self) -> TypeIdentifier {
        self.complete_id
    }

    pub fn minimal_identifier(&self) -> TypeIdentifier {
        self.minimal_id
    }

    pub fn is_aggregate(&self) -> bool {
        matches!(self.kind(), TypeKind::Struct(_) | TypeKind::Union(_))
    }

    /// Primitive (non-string) or enum: fixed size, no DHEADER in collections.
    pub fn is_primitive_like(&self) -> bool {
        self.fixed_size().is_some()
    }

    /// Wire size of fixed-size primitives and enums.
    pub fn fixed_size(&self) -> Option<usize> {
        match self.kind() {
            TypeKind::Primitive(p) => p.size(),
            TypeKind::Enum(e) => Some(e.wire_size()),
            _ => None,
        }
    }

    /// Members of a struct or union (empty for other kinds).
    pub fn members(&self) -> &[MemberDescriptor] {
        match self.kind() {
            TypeKind::Struct(members) => members,
            TypeKind::Union(u) => &u.members,
            _ => &[],
        }
    }

    pub fn union_descriptor(&self) -> Option<&UnionDescriptor> {
        match self.kind() {
            TypeKind::Union(u) => Some(u),
            _ => None,
        }
    }

    pub fn enum_descriptor(&self) -> Option<&EnumDescriptor> {
        match self.kind() {
            TypeKind::Enum(e) => Some(e),
            _ => None,
        }
    }

    pub fn member_by_id(&self, id: MemberId) -> Result<&MemberDescriptor> {
        self.members()
            .iter()
            .find(|m| m.id == id)
            .ok_or_else(|| DynamicError::MemberNotFound(format!("{}::{:#x}", self.name(), id)))
    }

    pub fn member_by_name(&self, name: &str) -> Result<&MemberDescriptor> {
        self.members()
            .iter()
            .find(|m| m.name == name)
            .ok_or_else(|| DynamicError::MemberNotFound(format!("{}::{}", self.name(), name)))
    }

    /// Member lookup by id or name.
    pub fn get_member<'a>(&self, member: impl Into<MemberRef<'a>>) -> Result<&MemberDescriptor> {
        match member.into() {
            MemberRef::Id(id) => self.member_by_id(id),
            MemberRef::Name(name) => self.member_by_name(name),
        }
    }

    pub fn key_count(&self) -> Result<usize> {
        resolver::key_count(self)
    }

    pub fn max_extensibility(&self) -> Extensibility {
        resolver::max_extensibility(self)
    }
}

/// Member selector for [`DynamicType::get_member`].
#[derive(Debug, Clone, Copy)]
pub enum MemberRef<'a> {
    Id(MemberId),
    Name(&'a str),
}

impl From<MemberId> for MemberRef<'_> {
    fn from(id: MemberId) -> Self {
        Self::Id(id)
    }
}

impl<'a> From<&'a str> for MemberRef<'a> {
    fn from(name: &'a str) -> Self {
        Self::Name(name)
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(desc: &TypeDescriptor) -> Result<()> {
    match &desc.kind {
        TypeKind::Primitive(_) => Ok(()),
        TypeKind::Enum(e) => validate_enum(&desc.name, e),
        TypeKind::Struct(members) => validate_members(&desc.name, members),
        TypeKind::Union(u) => validate_union(&desc.name, u),
        TypeKind::Sequence(s) if encodes_nothing(&s.element_type) => Err(
            DynamicError::InvalidType(format!(
                "{}: element type '{}' can encode to zero bytes",
                desc.name,
                s.element_type.name()
            )),
        ),
        TypeKind::Map(m) if encodes_nothing(&m.key_type) && encodes_nothing(&m.value_type) => {
            Err(DynamicError::InvalidType(format!(
                "{}: map entries can encode to zero bytes",
                desc.name
            )))
        }
        TypeKind::Sequence(_) | TypeKind::Map(_) => Ok(()),
        TypeKind::Array(a) if a.length == 0 => Err(DynamicError::InvalidType(format!(
            "{}: array length must be positive",
            desc.name
        ))),
        TypeKind::Array(_) => Ok(()),
    }
}

/// Whether a value of `ty` can occupy no bytes at all (member-less or
/// all-empty FINAL and APPENDABLE structs), so a count prefix alone could
/// announce any number of them.
fn encodes_nothing(ty: &DynamicType) -> bool {
    match ty.kind() {
        TypeKind::Struct(members) => {
            ty.extensibility() != Extensibility::Mutable
                && members
                    .iter()
                    .all(|m| !m.is_optional() && encodes_nothing(&m.member_type))
        }
        TypeKind::Array(a) => encodes_nothing(&a.element_type),
        _ => false,
    }
}

fn validate_members(type_name: &str, members: &[MemberDescriptor]) -> Result<()> {
    let mut ids = HashSet::new();
    let mut names = HashSet::new();
    for member in members {
        if member.id > MEMBER_ID_MASK || member.id == DISCRIMINATOR_ID {
            return Err(DynamicError::InvalidType(format!(
                "{}::{}: member id {:#x} out of range",
                type_name, member.name, member.id
            )));
        }
        if !ids.insert(member.id) {
            return Err(DynamicError::DuplicateMemberId {
                type_name: type_name.to_string(),
                id: member.id,
            });
        }
        if !names.insert(member.name.as_str()) {
            return Err(DynamicError::InvalidType(format!(
                "{}: duplicate member name '{}'",
                type_name, member.name
            )));
        }
        if member.is_key() && member.is_optional() {
            return Err(DynamicError::InvalidType(format!(
                "{}::{}: key members cannot be optional",
                type_name, member.name
            )));
        }
    }
    Ok(())
}

fn validate_union(type_name: &str, u: &UnionDescriptor) -> Result<()> {
    let valid_discriminator = match u.discriminator.kind() {
        TypeKind::Primitive(p) => p.is_discriminator(),
        TypeKind::Enum(_) => true,
        _ => false,
    };
    if !valid_discriminator {
        return Err(DynamicError::InvalidType(format!(
            "{}: discriminator type '{}' is not integral",
            type_name,
            u.discriminator.name()
        )));
    }
    validate_members(type_name, &u.members)?;

    let mut labels = HashSet::new();
    let mut defaults = 0;
    for member in &u.members {
        if member.default_label {
            defaults += 1;
        }
        for label in &member.labels {
            if !labels.insert(*label) {
                return Err(DynamicError::InvalidType(format!(
                    "{}: label {} used by more than one case",
                    type_name, label
                )));
            }
        }
    }
    if defaults > 1 {
        return Err(DynamicError::InvalidType(format!(
            "{}: more than one default case",
            type_name
        )));
    }
    Ok(())
}

fn validate_enum(type_name: &str, e: &EnumDescriptor) -> Result<()> {
    if !(1..=32).contains(&e.bit_bound) {
        return Err(DynamicError::InvalidType(format!(
            "{}: bit_bound {} outside 1..=32",
            type_name, e.bit_bound
        )));
    }
    let (min, max) = match e.wire_size() {
        1 => (i32::from(i8::MIN), i32::from(i8::MAX)),
        2 => (i32::from(i16::MIN), i32::from(i16::MAX)),
        _ => (i32::MIN, i32::MAX),
    };
    let mut values = HashSet::new();
    for literal in &e.literals {
        if !(min..=max).contains(&literal.value) {
            return Err(DynamicError::InvalidType(format!(
                "{}::{}: value {} does not fit bit_bound {}",
                type_name, literal.name, literal.value, e.bit_bound
            )));
        }
        if !values.insert(literal.value) {
            return Err(DynamicError::InvalidType(format!(
                "{}: duplicate enumerator value {}",
                type_name, literal.value
            )));
        }
    }
    Ok(())
}
