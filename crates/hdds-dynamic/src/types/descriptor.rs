// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Type and member descriptors for runtime type information.

use super::DynamicType;
use crate::type_id::*;
use md5::{Digest, Md5};
use std::sync::Arc;

/// Member identifier (28 significant bits on the wire).
pub type MemberId = u32;

/// Mask of the id bits in a member header.
pub const MEMBER_ID_MASK: u32 = 0x0FFF_FFFF;

/// Reserved id naming a union's discriminator.
pub const DISCRIMINATOR_ID: MemberId = 0x0FFF_FFFF;

/// Member id derived from a name (`@hashid`): first four bytes of MD5(name),
/// little-endian, masked to 28 bits.
pub fn hashed_member_id(name: &str) -> MemberId {
    let digest = Md5::digest(name.as_bytes());
    u32::from_le_bytes([digest[0], digest[1], digest[2], digest[3]]) & MEMBER_ID_MASK
}

/// Declared evolution policy, ordered by permissiveness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Extensibility {
    #[default]
    Final,
    Appendable,
    Mutable,
}

/// Primitive type kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Bool,
    Byte,
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
    Char,
    WChar,
    String { max_length: Option<usize> },
    WString { max_length: Option<usize> },
}

impl PrimitiveKind {
    /// Size in bytes (None for strings).
    pub fn size(&self) -> Option<usize> {
        match self {
            Self::Bool | Self::Byte | Self::U8 | Self::I8 | Self::Char => Some(1),
            Self::U16 | Self::I16 | Self::WChar => Some(2),
            Self::U32 | Self::I32 | Self::F32 => Some(4),
            Self::U64 | Self::I64 | Self::F64 => Some(8),
            Self::String { .. } | Self::WString { .. } => None,
        }
    }

    pub fn is_string(&self) -> bool {
        matches!(self, Self::String { .. } | Self::WString { .. })
    }

    /// Valid as a union discriminator.
    pub fn is_discriminator(&self) -> bool {
        !matches!(
            self,
            Self::F32 | Self::F64 | Self::String { .. } | Self::WString { .. }
        )
    }

    pub fn type_kind(&self) -> u8 {
        match self {
            Self::Bool => TK_BOOLEAN,
            Self::Byte => TK_BYTE,
            Self::U8 => TK_UINT8,
            Self::U16 => TK_UINT16,
            Self::U32 => TK_UINT32,
            Self::U64 => TK_UINT64,
            Self::I8 => TK_INT8,
            Self::I16 => TK_INT16,
            Self::I32 => TK_INT32,
            Self::I64 => TK_INT64,
            Self::F32 => TK_FLOAT32,
            Self::F64 => TK_FLOAT64,
            Self::Char => TK_CHAR8,
            Self::WChar => TK_CHAR16,
            Self::String { .. } => TK_STRING8,
            Self::WString { .. } => TK_STRING16,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Bool => "boolean",
            Self::Byte => "octet",
            Self::U8 => "uint8",
            Self::U16 => "uint16",
            Self::U32 => "uint32",
            Self::U64 => "uint64",
            Self::I8 => "int8",
            Self::I16 => "int16",
            Self::I32 => "int32",
            Self::I64 => "int64",
            Self::F32 => "float32",
            Self::F64 => "float64",
            Self::Char => "char8",
            Self::WChar => "char16",
            Self::String { .. } => "string",
            Self::WString { .. } => "wstring",
        }
    }
}

/// Member properties (@key, @optional, @must_understand).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct MemberFlag(pub u16);

impl MemberFlag {
    pub const IS_OPTIONAL: Self = Self(0x0008);
    pub const IS_MUST_UNDERSTAND: Self = Self(0x0010);
    pub const IS_KEY: Self = Self(0x0020);

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn contains(self, flag: Self) -> bool {
        (self.0 & flag.0) != 0
    }

    pub const fn with(self, flag: Self) -> Self {
        Self(self.0 | flag.0)
    }
}

/// One member of a struct or union.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberDescriptor {
    pub name: String,
    pub id: MemberId,
    pub member_type: Arc<DynamicType>,
    pub flags: MemberFlag,
    /// Union case labels selecting this member.
    pub labels: Vec<i64>,
    /// Union default case.
    pub default_label: bool,
}

impl MemberDescriptor {
    /// New member whose id is hashed from its name.
    pub fn new(name: impl Into<String>, member_type: Arc<DynamicType>) -> Self {
        let name = name.into();
        Self {
            id: hashed_member_id(&name),
            name,
            member_type,
            flags: MemberFlag::empty(),
            labels: Vec::new(),
            default_label: false,
        }
    }

    pub fn with_id(mut self, id: MemberId) -> Self {
        self.id = id;
        self
    }

    pub fn key(mut self) -> Self {
        self.flags = self.flags.with(MemberFlag::IS_KEY);
        self
    }

    pub fn optional(mut self) -> Self {
        self.flags = self.flags.with(MemberFlag::IS_OPTIONAL);
        self
    }

    pub fn must_understand(mut self) -> Self {
        self.flags = self.flags.with(MemberFlag::IS_MUST_UNDERSTAND);
        self
    }

    pub fn with_labels(mut self, labels: impl IntoIterator<Item = i64>) -> Self {
        self.labels.extend(labels);
        self
    }

    pub fn default_case(mut self) -> Self {
        self.default_label = true;
        self
    }

    pub fn is_key(&self) -> bool {
        self.flags.contains(MemberFlag::IS_KEY)
    }

    pub fn is_optional(&self) -> bool {
        self.flags.contains(MemberFlag::IS_OPTIONAL)
    }

    /// Keys are always must-understand.
    pub fn is_must_understand(&self) -> bool {
        self.flags.contains(MemberFlag::IS_MUST_UNDERSTAND) || self.is_key()
    }
}

/// Enumerator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumLiteral {
    pub name: String,
    pub value: i32,
    pub default: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumDescriptor {
    pub literals: Vec<EnumLiteral>,
    /// 1..=32; selects a 1, 2 or 4 byte encoding.
    pub bit_bound: u16,
}

impl EnumDescriptor {
    pub fn new(literals: Vec<EnumLiteral>) -> Self {
        Self {
            literals,
            bit_bound: 32,
        }
    }

    pub fn literal(&self, value: i32) -> Option<&EnumLiteral> {
        self.literals.iter().find(|l| l.value == value)
    }

    pub fn literal_by_name(&self, name: &str) -> Option<&EnumLiteral> {
        self.literals.iter().find(|l| l.name == name)
    }

    pub fn contains(&self, value: i32) -> bool {
        self.literal(value).is_some()
    }

    /// Literal flagged default, else the first one.
    pub fn default_value(&self) -> i32 {
        self.literals
            .iter()
            .find(|l| l.default)
            .or_else(|| self.literals.first())
            .map_or(0, |l| l.value)
    }

    pub fn wire_size(&self) -> usize {
        match self.bit_bound {
            0..=8 => 1,
            9..=16 => 2,
            _ => 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnionDescriptor {
    pub discriminator: Arc<DynamicType>,
    pub discriminator_is_key: bool,
    pub members: Vec<MemberDescriptor>,
}

impl UnionDescriptor {
    /// Member selected by a discriminator label (explicit label first, then default).
    pub fn member_for_label(&self, label: i64) -> Option<&MemberDescriptor> {
        self.members
            .iter()
            .find(|m| m.labels.contains(&label))
            .or_else(|| self.members.iter().find(|m| m.default_label))
    }

    /// Smallest non-negative label not claimed by any explicit case.
    pub fn implicit_default_label(&self) -> i64 {
        let mut label = 0i64;
        while self.members.iter().any(|m| m.labels.contains(&label)) {
            label += 1;
        }
        label
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SequenceDescriptor {
    pub element_type: Arc<DynamicType>,
    pub max_length: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrayDescriptor {
    pub element_type: Arc<DynamicType>,
    pub length: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapDescriptor {
    pub key_type: Arc<DynamicType>,
    pub value_type: Arc<DynamicType>,
    pub max_length: Option<usize>,
}

/// Type kind enumeration.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeKind {
    Primitive(PrimitiveKind),
    Enum(EnumDescriptor),
    Struct(Vec<MemberDescriptor>),
    Union(UnionDescriptor),
    Sequence(SequenceDescriptor),
    Array(ArrayDescriptor),
    Map(MapDescriptor),
}

impl TypeKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Primitive(p) => p.name(),
            Self::Enum(_) => "enum",
            Self::Struct(_) => "struct",
            Self::Union(_) => "union",
            Self::Sequence(_) => "sequence",
            Self::Array(_) => "array",
            Self::Map(_) => "map",
        }
    }

    pub fn type_kind(&self) -> u8 {
        match self {
            Self::Primitive(p) => p.type_kind(),
            Self::Enum(_) => TK_ENUM,
            Self::Struct(_) => TK_STRUCTURE,
            Self::Union(_) => TK_UNION,
            Self::Sequence(_) => TK_SEQUENCE,
            Self::Array(_) => TK_ARRAY,
            Self::Map(_) => TK_MAP,
        }
    }
}

/// A complete type descriptor, materialized by [`DynamicType::new`].
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDescriptor {
    pub name: String,
    pub kind: TypeKind,
    pub extensibility: Extensibility,
}

impl TypeDescriptor {
    pub fn new(name: impl Into<String>, kind: TypeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            extensibility: Extensibility::Final,
        }
    }

    pub fn primitive(kind: PrimitiveKind) -> Self {
        Self::new(kind.name(), TypeKind::Primitive(kind))
    }

    pub fn struct_type(name: impl Into<String>, members: Vec<MemberDescriptor>) -> Self {
        Self::new(name, TypeKind::Struct(members))
    }

    pub fn with_extensibility(mut self, extensibility: Extensibility) -> Self {
        self.extensibility = extensibility;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hashed_member_id() {
        // MD5("x") = 9dd4e461268c8034f5c8564e155c67a6
        assert_eq!(hashed_member_id("x"), 0x61e4_d49d & MEMBER_ID_MASK);
        assert!(hashed_member_id("some_long_member_name") <= MEMBER_ID_MASK);
    }

    #[test]
    fn test_extensibility_order() {
        assert!(Extensibility::Final < Extensibility::Appendable);
        assert!(Extensibility::Appendable < Extensibility::Mutable);
        assert_eq!(
            Extensibility::Final.max(Extensibility::Mutable),
            Extensibility::Mutable
        );
    }

    #[test]
    fn test_enum_sizes_and_default() {
        let mut desc = EnumDescriptor::new(vec![
            EnumLiteral { name: "RED".into(), value: 0, default: false },
            EnumLiteral { name: "GREEN".into(), value: 5, default: true },
        ]);
        assert_eq!(desc.wire_size(), 4);
        assert_eq!(desc.default_value(), 5);
        desc.bit_bound = 8;
        assert_eq!(desc.wire_size(), 1);
        desc.bit_bound = 16;
        assert_eq!(desc.wire_size(), 2);
    }

    #[test]
    fn test_key_implies_must_understand() {
        let ty = DynamicType::primitive(PrimitiveKind::U32);
        let member = MemberDescriptor::new("id", ty).key();
        assert!(member.is_key());
        assert!(member.is_must_understand());
        assert!(!member.is_optional());
    }
}
