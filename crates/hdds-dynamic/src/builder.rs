// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Fluent builder API for dynamic types.
//!
//! # Example
//!
//! ```rust
//! use hdds_dynamic::{PrimitiveKind, TypeDescriptorBuilder};
//!
//! let point = TypeDescriptorBuilder::new("Point")
//!     .key_field("x", PrimitiveKind::F64)
//!     .key_field("y", PrimitiveKind::F64)
//!     .build()
//!     .unwrap();
//! assert_eq!(point.key_count().unwrap(), 2);
//! ```

use crate::error::{DynamicError, Result};
use crate::types::{
    hashed_member_id, ArrayDescriptor, DynamicType, EnumDescriptor, EnumLiteral, Extensibility,
    MapDescriptor, MemberDescriptor, MemberId, PrimitiveKind, SequenceDescriptor, TypeDescriptor,
    TypeKind, UnionDescriptor,
};
use std::sync::Arc;

/// How members without an explicit id get one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AutoId {
    /// Previous id + 1, starting at the first id of the aggregate.
    #[default]
    Sequential,
    /// MD5 of the member name.
    Hash,
}

#[derive(Debug)]
struct PendingMember {
    member: MemberDescriptor,
    explicit_id: bool,
}

fn resolve_ids(members: Vec<PendingMember>, autoid: AutoId, first: MemberId) -> Vec<MemberDescriptor> {
    let mut next = first;
    members
        .into_iter()
        .map(|pending| {
            let mut member = pending.member;
            if !pending.explicit_id {
                member.id = match autoid {
                    AutoId::Sequential => next,
                    AutoId::Hash => hashed_member_id(&member.name),
                };
            }
            next = member.id.saturating_add(1);
            member
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Structs
// ---------------------------------------------------------------------------

/// Builder for struct types.
#[derive(Debug)]
pub struct TypeDescriptorBuilder {
    name: String,
    extensibility: Extensibility,
    autoid: AutoId,
    members: Vec<PendingMember>,
    error: Option<DynamicError>,
}

impl TypeDescriptorBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            extensibility: Extensibility::Final,
            autoid: AutoId::Sequential,
            members: Vec::new(),
            error: None,
        }
    }

    pub fn extensibility(mut self, extensibility: Extensibility) -> Self {
        self.extensibility = extensibility;
        self
    }

    pub fn appendable(self) -> Self {
        self.extensibility(Extensibility::Appendable)
    }

    pub fn mutable(self) -> Self {
        self.extensibility(Extensibility::Mutable)
    }

    pub fn autoid(mut self, autoid: AutoId) -> Self {
        self.autoid = autoid;
        self
    }

    fn push(mut self, member: MemberDescriptor, explicit_id: bool) -> Self {
        self.members.push(PendingMember {
            member,
            explicit_id,
        });
        self
    }

    /// Add a primitive field.
    pub fn field(self, name: impl Into<String>, kind: PrimitiveKind) -> Self {
        self.field_with_type(name, DynamicType::primitive(kind))
    }

    pub fn key_field(self, name: impl Into<String>, kind: PrimitiveKind) -> Self {
        self.key_field_with_type(name, DynamicType::primitive(kind))
    }

    pub fn optional_field(self, name: impl Into<String>, kind: PrimitiveKind) -> Self {
        self.optional_field_with_type(name, DynamicType::primitive(kind))
    }

    /// Add a field with an explicit member id.
    pub fn field_with_id(self, name: impl Into<String>, kind: PrimitiveKind, id: MemberId) -> Self {
        let member = MemberDescriptor::new(name, DynamicType::primitive(kind)).with_id(id);
        self.push(member, true)
    }

    pub fn field_with_type(self, name: impl Into<String>, ty: Arc<DynamicType>) -> Self {
        self.push(MemberDescriptor::new(name, ty), false)
    }

    pub fn key_field_with_type(self, name: impl Into<String>, ty: Arc<DynamicType>) -> Self {
        self.push(MemberDescriptor::new(name, ty).key(), false)
    }

    pub fn optional_field_with_type(self, name: impl Into<String>, ty: Arc<DynamicType>) -> Self {
        self.push(MemberDescriptor::new(name, ty).optional(), false)
    }

    pub fn string_field(self, name: impl Into<String>) -> Self {
        self.field(name, PrimitiveKind::String { max_length: None })
    }

    pub fn bounded_string_field(self, name: impl Into<String>, max_length: usize) -> Self {
        self.field(
            name,
            PrimitiveKind::String {
                max_length: Some(max_length),
            },
        )
    }

    pub fn sequence_field(self, name: impl Into<String>, element: PrimitiveKind) -> Self {
        let seq = anonymous(TypeKind::Sequence(SequenceDescriptor {
            element_type: DynamicType::primitive(element),
            max_length: None,
        }));
        self.field_with_result(name, seq)
    }

    pub fn bounded_sequence_field(
        self,
        name: impl Into<String>,
        element: PrimitiveKind,
        max_length: usize,
    ) -> Self {
        let seq = anonymous(TypeKind::Sequence(SequenceDescriptor {
            element_type: DynamicType::primitive(element),
            max_length: Some(max_length),
        }));
        self.field_with_result(name, seq)
    }

    pub fn array_field(self, name: impl Into<String>, element: PrimitiveKind, length: usize) -> Self {
        let array = anonymous(TypeKind::Array(ArrayDescriptor {
            element_type: DynamicType::primitive(element),
            length,
        }));
        self.field_with_result(name, array)
    }

    /// Keeps the first construction error for `build`.
    fn field_with_result(mut self, name: impl Into<String>, ty: Result<Arc<DynamicType>>) -> Self {
        match ty {
            Ok(ty) => self.field_with_type(name, ty),
            Err(e) => {
                self.error.get_or_insert(e);
                self
            }
        }
    }

    /// Add a fully specified member; its id is kept as is.
    pub fn member(self, member: MemberDescriptor) -> Self {
        self.push(member, true)
    }

    pub fn build_descriptor(self) -> TypeDescriptor {
        let members = resolve_ids(self.members, self.autoid, 0);
        TypeDescriptor::struct_type(self.name, members).with_extensibility(self.extensibility)
    }

    pub fn build(mut self) -> Result<Arc<DynamicType>> {
        if let Some(e) = self.error.take() {
            return Err(e);
        }
        DynamicType::new(self.build_descriptor())
    }
}

fn anonymous(kind: TypeKind) -> Result<Arc<DynamicType>> {
    DynamicType::new(TypeDescriptor::new(collection_name(&kind), kind))
}

fn collection_name(kind: &TypeKind) -> String {
    match kind {
        TypeKind::Sequence(s) => match s.max_length {
            Some(max) => format!("sequence<{},{}>", s.element_type.name(), max),
            None => format!("sequence<{}>", s.element_type.name()),
        },
        TypeKind::Array(a) => format!("{}[{}]", a.element_type.name(), a.length),
        TypeKind::Map(m) => format!("map<{},{}>", m.key_type.name(), m.value_type.name()),
        other => other.name().to_string(),
    }
}

// ---------------------------------------------------------------------------
// Unions
// ---------------------------------------------------------------------------

/// Builder for union types.
#[derive(Debug)]
pub struct UnionBuilder {
    name: String,
    extensibility: Extensibility,
    discriminator: Arc<DynamicType>,
    discriminator_is_key: bool,
    members: Vec<PendingMember>,
}

impl UnionBuilder {
    pub fn new(name: impl Into<String>, discriminator: Arc<DynamicType>) -> Self {
        Self {
            name: name.into(),
            extensibility: Extensibility::Final,
            discriminator,
            discriminator_is_key: false,
            members: Vec::new(),
        }
    }

    pub fn extensibility(mut self, extensibility: Extensibility) -> Self {
        self.extensibility = extensibility;
        self
    }

    pub fn appendable(self) -> Self {
        self.extensibility(Extensibility::Appendable)
    }

    pub fn mutable(self) -> Self {
        self.extensibility(Extensibility::Mutable)
    }

    pub fn key_discriminator(mut self) -> Self {
        self.discriminator_is_key = true;
        self
    }

    pub fn case(
        self,
        name: impl Into<String>,
        kind: PrimitiveKind,
        labels: impl IntoIterator<Item = i64>,
    ) -> Self {
        self.case_with_type(name, DynamicType::primitive(kind), labels)
    }

    pub fn case_with_type(
        mut self,
        name: impl Into<String>,
        ty: Arc<DynamicType>,
        labels: impl IntoIterator<Item = i64>,
    ) -> Self {
        self.members.push(PendingMember {
            member: MemberDescriptor::new(name, ty).with_labels(labels),
            explicit_id: false,
        });
        self
    }

    pub fn default_case(mut self, name: impl Into<String>, ty: Arc<DynamicType>) -> Self {
        self.members.push(PendingMember {
            member: MemberDescriptor::new(name, ty).default_case(),
            explicit_id: false,
        });
        self
    }

    pub fn member(mut self, member: MemberDescriptor) -> Self {
        self.members.push(PendingMember {
            member,
            explicit_id: true,
        });
        self
    }

    pub fn build(self) -> Result<Arc<DynamicType>> {
        let members = resolve_ids(self.members, AutoId::Sequential, 1);
        let kind = TypeKind::Union(UnionDescriptor {
            discriminator: self.discriminator,
            discriminator_is_key: self.discriminator_is_key,
            members,
        });
        DynamicType::new(TypeDescriptor::new(self.name, kind).with_extensibility(self.extensibility))
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Builder for enum types.
#[derive(Debug)]
pub struct EnumBuilder {
    name: String,
    literals: Vec<EnumLiteral>,
    bit_bound: u16,
}

impl EnumBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            literals: Vec::new(),
            bit_bound: 32,
        }
    }

    /// Add a literal valued one past the previous one.
    pub fn literal(self, name: impl Into<String>) -> Self {
        let value = self.literals.last().map_or(0, |l| l.value + 1);
        self.literal_with_value(name, value)
    }

    pub fn literal_with_value(mut self, name: impl Into<String>, value: i32) -> Self {
        self.literals.push(EnumLiteral {
            name: name.into(),
            value,
            default: false,
        });
        self
    }

    /// Mark the last added literal as the default.
    pub fn default_literal(mut self) -> Self {
        if let Some(last) = self.literals.last_mut() {
            last.default = true;
        }
        self
    }

    pub fn bit_bound(mut self, bits: u16) -> Self {
        self.bit_bound = bits;
        self
    }

    pub fn build(self) -> Result<Arc<DynamicType>> {
        let mut desc = EnumDescriptor::new(self.literals);
        desc.bit_bound = self.bit_bound;
        DynamicType::new(TypeDescriptor::new(self.name, TypeKind::Enum(desc)))
    }
}

// ---------------------------------------------------------------------------
// Collections
// ---------------------------------------------------------------------------

/// Builder for sequence types.
#[derive(Debug)]
pub struct SequenceBuilder {
    element_type: Arc<DynamicType>,
    max_length: Option<usize>,
}

impl SequenceBuilder {
    pub fn new(element_type: Arc<DynamicType>) -> Self {
        Self {
            element_type,
            max_length: None,
        }
    }

    pub fn bounded(mut self, max_length: usize) -> Self {
        self.max_length = Some(max_length);
        self
    }

    pub fn build(self) -> Result<Arc<DynamicType>> {
        let kind = TypeKind::Sequence(SequenceDescriptor {
            element_type: self.element_type,
            max_length: self.max_length,
        });
        DynamicType::new(TypeDescriptor::new(collection_name(&kind), kind))
    }
}

/// Builder for array types.
#[derive(Debug)]
pub struct ArrayBuilder {
    element_type: Arc<DynamicType>,
    length: usize,
}

impl ArrayBuilder {
    pub fn new(element_type: Arc<DynamicType>, length: usize) -> Self {
        Self {
            element_type,
            length,
        }
    }

    pub fn build(self) -> Result<Arc<DynamicType>> {
        let kind = TypeKind::Array(ArrayDescriptor {
            element_type: self.element_type,
            length: self.length,
        });
        DynamicType::new(TypeDescriptor::new(collection_name(&kind), kind))
    }
}

/// Builder for map types.
#[derive(Debug)]
pub struct MapBuilder {
    key_type: Arc<DynamicType>,
    value_type: Arc<DynamicType>,
    max_length: Option<usize>,
}

impl MapBuilder {
    pub fn new(key_type: Arc<DynamicType>, value_type: Arc<DynamicType>) -> Self {
        Self {
            key_type,
            value_type,
            max_length: None,
        }
    }

    pub fn bounded(mut self, max_length: usize) -> Self {
        self.max_length = Some(max_length);
        self
    }

    pub fn build(self) -> Result<Arc<DynamicType>> {
        let kind = TypeKind::Map(MapDescriptor {
            key_type: self.key_type,
            value_type: self.value_type,
            max_length: self.max_length,
        });
        DynamicType::new(TypeDescriptor::new(collection_name(&kind), kind))
    }
}
