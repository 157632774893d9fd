// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Canonical type description hashed into a TypeIdentifier.
//!
//! The description is written little-endian with XCDR2 alignment. Nested
//! types contribute their own identifier of the same flavour, so equal
//! identifiers imply equal trees.

use super::descriptor::*;
use crate::buffer::{ByteWriter, Sink};
use crate::config::Endianness;
use crate::type_id::{EquivalenceHash, TypeIdentifier};
use md5::{Digest, Md5};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flavor {
    Minimal,
    Complete,
}

/// Inline identifier for primitives and strings.
pub(crate) fn inline_identifier(kind: &TypeKind) -> Option<TypeIdentifier> {
    match kind {
        TypeKind::Primitive(PrimitiveKind::String { max_length }) => {
            Some(TypeIdentifier::string(max_length.unwrap_or(0) as u32))
        }
        TypeKind::Primitive(PrimitiveKind::WString { max_length }) => {
            Some(TypeIdentifier::wstring(max_length.unwrap_or(0) as u32))
        }
        TypeKind::Primitive(p) => Some(TypeIdentifier::Primitive(p.type_kind())),
        _ => None,
    }
}

pub(crate) fn identifier(desc: &TypeDescriptor, flavor: Flavor) -> TypeIdentifier {
    if let Some(id) = inline_identifier(&desc.kind) {
        return id;
    }
    let mut w = ByteWriter::new(Endianness::Little, 4);
    describe(desc, flavor, &mut w);
    let hash = EquivalenceHash::compute(&w.into_bytes());
    match flavor {
        Flavor::Minimal => TypeIdentifier::Minimal(hash),
        Flavor::Complete => TypeIdentifier::Complete(hash),
    }
}

fn describe<S: Sink>(desc: &TypeDescriptor, flavor: Flavor, w: &mut ByteWriter<S>) {
    w.write_u8(desc.kind.type_kind());
    w.write_u8(desc.extensibility as u8);
    if flavor == Flavor::Complete {
        write_string(w, &desc.name);
    }

    match &desc.kind {
        TypeKind::Primitive(_) => {}
        TypeKind::Enum(e) => {
            w.write_u16(e.bit_bound);
            w.write_u32(e.literals.len() as u32);
            for literal in &e.literals {
                w.write_i32(literal.value);
                w.write_bool(literal.default);
                write_name(w, &literal.name, flavor);
            }
        }
        TypeKind::Struct(members) => write_members(w, members, flavor),
        TypeKind::Union(u) => {
            member_type_id(&u.discriminator, flavor).write_to(w);
            w.write_bool(u.discriminator_is_key);
            write_members(w, &u.members, flavor);
        }
        TypeKind::Sequence(s) => {
            member_type_id(&s.element_type, flavor).write_to(w);
            w.write_u32(s.max_length.unwrap_or(0) as u32);
        }
        TypeKind::Array(a) => {
            member_type_id(&a.element_type, flavor).write_to(w);
            w.write_u32(a.length as u32);
        }
        TypeKind::Map(m) => {
            member_type_id(&m.key_type, flavor).write_to(w);
            member_type_id(&m.value_type, flavor).write_to(w);
            w.write_u32(m.max_length.unwrap_or(0) as u32);
        }
    }
}

fn write_members<S: Sink>(w: &mut ByteWriter<S>, members: &[MemberDescriptor], flavor: Flavor) {
    w.write_u32(members.len() as u32);
    for member in members {
        w.write_u32(member.id);
        w.write_u16(member.flags.0);
        member_type_id(&member.member_type, flavor).write_to(w);
        write_name(w, &member.name, flavor);
        w.write_u32(member.labels.len() as u32);
        for label in &member.labels {
            w.write_i64(*label);
        }
        w.write_bool(member.default_label);
    }
}

fn member_type_id(ty: &super::DynamicType, flavor: Flavor) -> TypeIdentifier {
    match flavor {
        Flavor::Minimal => ty.minimal_identifier(),
        Flavor::Complete => ty.type_identifier(),
    }
}

/// Complete descriptions carry names, minimal ones a 4-byte name hash.
fn write_name<S: Sink>(w: &mut ByteWriter<S>, name: &str, flavor: Flavor) {
    match flavor {
        Flavor::Complete => write_string(w, name),
        Flavor::Minimal => {
            let digest = Md5::digest(name.as_bytes());
            w.write_bytes(&digest[..4]);
        }
    }
}

fn write_string<S: Sink>(w: &mut ByteWriter<S>, s: &str) {
    w.write_u32(s.len() as u32 + 1);
    w.write_bytes(s.as_bytes());
    w.write_u8(0);
}
