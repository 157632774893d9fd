// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! XCDR bytes -> DynamicData.
//!
//! Every length read from the wire is checked against the remaining bytes
//! (and the declared bound) before anything is allocated. Delimited blocks
//! are decoded through a reader limited to the block, so a member can never
//! read past its DHEADER, EMHEADER or parameter length.

use super::headers::{read_emheader, read_parameter_header, MemberHeader};
use super::Scope;
use crate::buffer::ByteReader;
use crate::config::{EncodingConfig, Representation, UnknownEnumPolicy};
use crate::data::{check_bound, DynamicData};
use crate::error::{DynamicError, Result};
use crate::types::{
    DynamicType, Extensibility, MemberDescriptor, MemberId, PrimitiveKind, TypeKind,
    DISCRIMINATOR_ID,
};
use crate::value::Value;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct Decoder<'a, 'c> {
    r: ByteReader<'a>,
    config: &'c EncodingConfig,
}

impl<'a, 'c> Decoder<'a, 'c> {
    pub(crate) fn new(bytes: &'a [u8], config: &'c EncodingConfig) -> Self {
        Self {
            r: ByteReader::new(bytes, config.endianness, config.max_alignment()),
            config,
        }
    }

    pub(crate) fn position(&self) -> usize {
        self.r.position()
    }

    fn xcdr2(&self) -> bool {
        self.config.representation == Representation::Xcdr2
    }

    /// Decoder confined to `[position, end)`; the outer reader moves to `end`.
    fn take_block(&mut self, end: usize) -> Result<Decoder<'a, 'c>> {
        let block = Decoder {
            r: self.r.limited(end)?,
            config: self.config,
        };
        self.r.seek(end)?;
        Ok(block)
    }

    /// Read a DHEADER and split off the block it delimits.
    fn take_delimited(&mut self) -> Result<Decoder<'a, 'c>> {
        let at = self.r.position();
        let len = self.r.read_u32()? as usize;
        let end = self
            .r
            .position()
            .checked_add(len)
            .filter(|end| *end <= self.r.len())
            .ok_or_else(|| {
                DynamicError::malformed(at, format!("delimiter of {} bytes exceeds the buffer", len))
            })?;
        self.take_block(end)
    }

    /// Block holding the payload announced by a member header. XCDR1
    /// payloads align from their own first byte.
    fn take_member(&mut self, header: &MemberHeader) -> Result<Decoder<'a, 'c>> {
        self.r.seek(header.start)?;
        let mut block = self.take_block(header.end)?;
        if !self.xcdr2() {
            block.r.set_origin(header.start);
        }
        Ok(block)
    }

    /// Next member header of a mutable aggregate, `None` at the end of the
    /// block (XCDR2) or at the sentinel (XCDR1).
    fn next_header(&mut self) -> Result<Option<MemberHeader>> {
        if self.xcdr2() {
            if self.r.remaining() > 0 {
                self.r.align(4)?;
            }
            if self.r.remaining() == 0 {
                return Ok(None);
            }
            read_emheader(&mut self.r).map(Some)
        } else {
            read_parameter_header(&mut self.r)
        }
    }

    /// Blocks of mutable aggregates are bounded by a DHEADER in XCDR2; in
    /// XCDR1 the parameter list runs until its sentinel.
    fn mutable_block(&mut self) -> Result<Decoder<'a, 'c>> {
        if self.xcdr2() {
            self.take_delimited()
        } else {
            Ok(self.clone())
        }
    }

    /// Optional member of a non-mutable XCDR1 aggregate: parameter header
    /// with an empty payload when absent.
    fn optional_parameter(&mut self, id: MemberId) -> Result<Option<Decoder<'a, 'c>>> {
        let at = self.r.position();
        let header = read_parameter_header(&mut self.r)?
            .ok_or_else(|| DynamicError::malformed(at, "unexpected end of parameter list"))?;
        if header.id != id {
            return Err(DynamicError::malformed(
                at,
                format!("expected parameter {:#x}, found {:#x}", id, header.id),
            ));
        }
        let block = self.take_member(&header)?;
        Ok((header.end > header.start).then_some(block))
    }

    // -----------------------------------------------------------------------
    // Aggregates
    // -----------------------------------------------------------------------

    /// Decode a struct or union of type `ty` into a fresh container.
    pub(crate) fn read_data(&mut self, ty: &Arc<DynamicType>, scope: Scope) -> Result<DynamicData> {
        let mut data = DynamicData::new(ty);
        match ty.kind() {
            TypeKind::Struct(_) => self.read_struct(&mut data, scope)?,
            TypeKind::Union(_) => self.read_union(&mut data, scope)?,
            other => return Err(DynamicError::mismatch("struct or union", other.name())),
        }
        Ok(data)
    }

    fn read_struct(&mut self, data: &mut DynamicData, scope: Scope) -> Result<()> {
        let ty = Arc::clone(data.dynamic_type());
        let members = scope.members(&ty);
        let nested = scope.nested();

        match (self.config.representation, ty.extensibility()) {
            (Representation::Xcdr2, Extensibility::Final)
            | (Representation::PlainCdr, Extensibility::Final | Extensibility::Appendable) => {
                self.read_sequential(data, &members, nested, false)
            }
            (Representation::Xcdr2, Extensibility::Appendable) => {
                let mut block = self.take_delimited()?;
                block.read_sequential(data, &members, nested, true)
            }
            (_, Extensibility::Mutable) => {
                let mut block = self.mutable_block()?;
                block.read_mutable(data, nested, |id| {
                    members
                        .iter()
                        .find(|m| m.id == id)
                        .map(|m| Arc::clone(&m.member_type))
                })?;
                if !self.xcdr2() {
                    self.r.seek(block.position())?;
                }
                // Members an older writer did not know take their default.
                for member in &members {
                    if member.is_optional() || data.is_set(member.id) {
                        continue;
                    }
                    log::trace!("[codec] {} defaulting absent member '{}'", ty.name(), member.name);
                    data.insert_decoded(member.id, Value::default_for(&member.member_type));
                }
                Ok(())
            }
        }
    }

    fn read_sequential(
        &mut self,
        data: &mut DynamicData,
        members: &[&MemberDescriptor],
        scope: Scope,
        appendable: bool,
    ) -> Result<()> {
        for member in members {
            // Trailing members an older appendable writer did not know.
            if appendable && self.r.remaining() == 0 {
                if member.is_optional() {
                    continue;
                }
                return Err(DynamicError::malformed(
                    self.r.position(),
                    format!("delimited block ends before member '{}'", member.name),
                ));
            }
            if !member.is_optional() {
                let value = self.read_value(&member.member_type, scope)?;
                data.insert_decoded(member.id, value);
            } else if self.xcdr2() {
                if self.r.read_bool()? {
                    let value = self.read_value(&member.member_type, scope)?;
                    data.insert_decoded(member.id, value);
                }
            } else if let Some(mut block) = self.optional_parameter(member.id)? {
                let value = block.read_value(&member.member_type, scope)?;
                data.insert_decoded(member.id, value);
            }
        }
        Ok(())
    }

    /// Header-framed members: known ids are decoded, unknown ones skipped
    /// unless they carry must-understand.
    fn read_mutable(
        &mut self,
        data: &mut DynamicData,
        scope: Scope,
        member_type: impl Fn(MemberId) -> Option<Arc<DynamicType>>,
    ) -> Result<()> {
        let ty = Arc::clone(data.dynamic_type());
        while let Some(header) = self.next_header()? {
            let known = member_type(header.id);
            let mut block = self.take_member(&header)?;
            match known {
                Some(member_type) => {
                    if data.is_set(header.id) {
                        return Err(DynamicError::malformed(
                            header.start,
                            format!("member {:#x} appears twice", header.id),
                        ));
                    }
                    let value = block.read_value(&member_type, scope)?;
                    data.insert_decoded(header.id, value);
                }
                // Declared but outside the decoded scope (key-only decode).
                None if ty.member_by_id(header.id).is_ok() => {}
                None if header.must_understand => {
                    return Err(DynamicError::UnknownRequiredMember(header.id));
                }
                None => log::trace!(
                    "[codec] {} skipping unknown member {:#x} ({} bytes)",
                    ty.name(),
                    header.id,
                    header.end - header.start
                ),
            }
        }
        Ok(())
    }

    fn read_union(&mut self, data: &mut DynamicData, scope: Scope) -> Result<()> {
        let ty = Arc::clone(data.dynamic_type());
        let Some(u) = ty.union_descriptor() else {
            return Err(DynamicError::mismatch("union", ty.kind().name()));
        };
        if scope != Scope::Full && !u.discriminator_is_key {
            if scope == Scope::NestedKey {
                return Err(DynamicError::NoKeyAnnotationOnUnion(ty.name().to_string()));
            }
            // Nothing but framing.
            return match (self.config.representation, ty.extensibility()) {
                (Representation::Xcdr2, Extensibility::Final)
                | (Representation::PlainCdr, Extensibility::Final | Extensibility::Appendable) => {
                    Ok(())
                }
                (Representation::Xcdr2, _) => self.take_delimited().map(|_| ()),
                (Representation::PlainCdr, Extensibility::Mutable) => {
                    while let Some(header) = self.next_header()? {
                        self.r.seek(header.end)?;
                    }
                    Ok(())
                }
            };
        }

        let full = scope == Scope::Full;
        let nested = scope.nested();
        match (self.config.representation, ty.extensibility()) {
            (_, Extensibility::Mutable) => {
                let mut block = self.mutable_block()?;
                block.read_mutable(data, nested, |id| {
                    if id == DISCRIMINATOR_ID {
                        Some(Arc::clone(&u.discriminator))
                    } else if full {
                        ty.member_by_id(id).ok().map(|m| Arc::clone(&m.member_type))
                    } else {
                        None
                    }
                })?;
                if !self.xcdr2() {
                    self.r.seek(block.position())?;
                }
                check_union_selection(data, self.r.position())
            }
            (Representation::Xcdr2, Extensibility::Appendable) => {
                let mut block = self.take_delimited()?;
                block.read_union_body(data, full, nested)
            }
            _ => self.read_union_body(data, full, nested),
        }
    }

    fn read_union_body(&mut self, data: &mut DynamicData, full: bool, scope: Scope) -> Result<()> {
        let ty = Arc::clone(data.dynamic_type());
        let Some(u) = ty.union_descriptor() else {
            return Err(DynamicError::mismatch("union", ty.kind().name()));
        };
        let at = self.r.position();
        let discriminator = self.read_value(&u.discriminator, scope)?;
        let label = discriminator
            .as_label()
            .ok_or_else(|| DynamicError::malformed(at, "non-integral discriminator"))?;
        data.insert_decoded(DISCRIMINATOR_ID, discriminator);
        if full {
            if let Some(member) = u.member_for_label(label) {
                let value = self.read_value(&member.member_type, scope)?;
                data.insert_decoded(member.id, value);
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Values
    // -----------------------------------------------------------------------

    /// Block of a collection: DHEADER-delimited for non-primitive elements
    /// in XCDR2, inline otherwise.
    fn collection_block(&mut self, element: &DynamicType) -> Result<Option<Decoder<'a, 'c>>> {
        if self.xcdr2() && !element.is_primitive_like() {
            self.take_delimited().map(Some)
        } else {
            Ok(None)
        }
    }

    /// Fewest bytes one value of `ty` occupies in this representation,
    /// alignment padding aside.
    fn min_size(&self, ty: &DynamicType) -> usize {
        match ty.kind() {
            TypeKind::Primitive(p) => p.size().unwrap_or(4),
            TypeKind::Enum(e) => e.wire_size(),
            TypeKind::Sequence(_) | TypeKind::Map(_) => 4,
            TypeKind::Array(a) => {
                let header = if self.xcdr2() && !a.element_type.is_primitive_like() {
                    4
                } else {
                    0
                };
                a.length
                    .saturating_mul(self.min_size(&a.element_type))
                    .saturating_add(header)
            }
            TypeKind::Struct(_) | TypeKind::Union(_) => {
                match (self.config.representation, ty.extensibility()) {
                    (Representation::Xcdr2, Extensibility::Appendable | Extensibility::Mutable)
                    | (Representation::PlainCdr, Extensibility::Mutable) => 4,
                    _ => match ty.union_descriptor() {
                        Some(u) => self.min_size(&u.discriminator),
                        None => ty
                            .members()
                            .iter()
                            .map(|m| match (m.is_optional(), self.xcdr2()) {
                                (true, true) => 1,
                                (true, false) => 4,
                                (false, _) => self.min_size(&m.member_type),
                            })
                            .fold(0, usize::saturating_add),
                    },
                }
            }
        }
    }

    /// Element count prefix, checked against the declared bound and the
    /// bytes left. `element_size` is the smallest encoding of one element.
    fn read_count(&mut self, bound: Option<usize>, element_size: usize) -> Result<usize> {
        let at = self.r.position();
        let count = self.r.read_u32()? as usize;
        check_bound(bound, count)?;
        if count.saturating_mul(element_size.max(1)) > self.r.remaining() {
            return Err(DynamicError::malformed(
                at,
                format!("{} elements do not fit in {} bytes", count, self.r.remaining()),
            ));
        }
        Ok(count)
    }

    pub(crate) fn read_value(&mut self, ty: &Arc<DynamicType>, scope: Scope) -> Result<Value> {
        match ty.kind() {
            TypeKind::Primitive(kind) => self.read_primitive(*kind),
            TypeKind::Enum(e) => {
                let at = self.r.position();
                let raw = match e.wire_size() {
                    1 => i32::from(self.r.read_i8()?),
                    2 => i32::from(self.r.read_i16()?),
                    _ => self.r.read_i32()?,
                };
                if e.contains(raw) {
                    return Ok(Value::Enum(raw));
                }
                match self.config.unknown_enum {
                    UnknownEnumPolicy::Reject => Err(DynamicError::InvalidEnumValue {
                        type_name: ty.name().to_string(),
                        value: raw,
                    }),
                    UnknownEnumPolicy::DefaultLiteral => {
                        log::debug!(
                            "[codec] {} value {} at offset {} replaced by default literal",
                            ty.name(),
                            raw,
                            at
                        );
                        Ok(Value::Enum(e.default_value()))
                    }
                }
            }
            TypeKind::Struct(_) | TypeKind::Union(_) => self.read_data(ty, scope).map(Value::Data),
            TypeKind::Sequence(s) => {
                let mut block = self.collection_block(&s.element_type)?;
                let dec = block.as_mut().unwrap_or(self);
                let element_size = dec.min_size(&s.element_type);
                let count = dec.read_count(s.max_length, element_size)?;
                let mut items = Vec::with_capacity(count.min(dec.r.remaining()));
                for _ in 0..count {
                    items.push(dec.read_value(&s.element_type, Scope::Full)?);
                }
                Ok(Value::Sequence(items))
            }
            TypeKind::Array(a) => {
                let mut block = self.collection_block(&a.element_type)?;
                let dec = block.as_mut().unwrap_or(self);
                let mut items = Vec::with_capacity(a.length.min(dec.r.remaining()));
                for _ in 0..a.length {
                    items.push(dec.read_value(&a.element_type, Scope::Full)?);
                }
                Ok(Value::Array(items))
            }
            TypeKind::Map(m) => {
                let element = if m.key_type.is_primitive_like() {
                    &m.value_type
                } else {
                    &m.key_type
                };
                let mut block = self.collection_block(element)?;
                let dec = block.as_mut().unwrap_or(self);
                let entry_size = dec.min_size(&m.key_type) + dec.min_size(&m.value_type);
                let count = dec.read_count(m.max_length, entry_size)?;
                let mut entries: Vec<(Value, Value)> =
                    Vec::with_capacity(count.min(dec.r.remaining()));
                for _ in 0..count {
                    let at = dec.r.position();
                    let key = dec.read_value(&m.key_type, Scope::Full)?;
                    if entries.iter().any(|(k, _)| *k == key) {
                        return Err(DynamicError::malformed(
                            at,
                            format!("duplicate map key {:?}", key),
                        ));
                    }
                    let value = dec.read_value(&m.value_type, Scope::Full)?;
                    entries.push((key, value));
                }
                Ok(Value::Map(entries))
            }
        }
    }

    fn read_primitive(&mut self, kind: PrimitiveKind) -> Result<Value> {
        let value = match kind {
            PrimitiveKind::Bool => Value::Bool(self.r.read_bool()?),
            PrimitiveKind::Byte => Value::Byte(self.r.read_u8()?),
            PrimitiveKind::U8 => Value::U8(self.r.read_u8()?),
            PrimitiveKind::I8 => Value::I8(self.r.read_i8()?),
            PrimitiveKind::U16 => Value::U16(self.r.read_u16()?),
            PrimitiveKind::I16 => Value::I16(self.r.read_i16()?),
            PrimitiveKind::U32 => Value::U32(self.r.read_u32()?),
            PrimitiveKind::I32 => Value::I32(self.r.read_i32()?),
            PrimitiveKind::U64 => Value::U64(self.r.read_u64()?),
            PrimitiveKind::I64 => Value::I64(self.r.read_i64()?),
            PrimitiveKind::F32 => Value::F32(self.r.read_f32()?),
            PrimitiveKind::F64 => Value::F64(self.r.read_f64()?),
            PrimitiveKind::Char => Value::Char(char::from(self.r.read_u8()?)),
            PrimitiveKind::WChar => {
                let at = self.r.position();
                let unit = self.r.read_u16()?;
                let c = char::from_u32(u32::from(unit))
                    .ok_or_else(|| DynamicError::malformed(at, "surrogate wide character"))?;
                Value::WChar(c)
            }
            PrimitiveKind::String { max_length } => {
                let at = self.r.position();
                let len = self.r.read_u32()? as usize;
                if len == 0 {
                    return Ok(Value::String(String::new()));
                }
                let bytes = self.r.read_bytes(len)?;
                let (text, terminator) = bytes.split_at(len - 1);
                if terminator.first() != Some(&0) {
                    return Err(DynamicError::malformed(at, "string is not NUL-terminated"));
                }
                check_bound(max_length, text.len())?;
                let text = std::str::from_utf8(text)
                    .map_err(|e| DynamicError::malformed(at, format!("invalid UTF-8: {}", e)))?;
                Value::String(text.to_string())
            }
            PrimitiveKind::WString { max_length } => {
                let at = self.r.position();
                let prefix = self.r.read_u32()? as usize;
                let units = if self.xcdr2() {
                    if prefix % 2 != 0 {
                        return Err(DynamicError::malformed(at, "odd wide string byte length"));
                    }
                    prefix / 2
                } else {
                    prefix
                };
                check_bound(max_length, units)?;
                if units.saturating_mul(2) > self.r.remaining() {
                    return Err(DynamicError::malformed(at, "wide string exceeds the buffer"));
                }
                let mut buf = Vec::with_capacity(units);
                for _ in 0..units {
                    buf.push(self.r.read_u16()?);
                }
                let text = String::from_utf16(&buf)
                    .map_err(|_| DynamicError::malformed(at, "invalid UTF-16"))?;
                Value::WString(text)
            }
        };
        Ok(value)
    }

    // -----------------------------------------------------------------------
    // Skipping and seeking (streaming field access)
    // -----------------------------------------------------------------------

    /// Advance past one value of type `ty` without materializing it where
    /// the framing allows.
    pub(crate) fn skip_value(&mut self, ty: &Arc<DynamicType>) -> Result<()> {
        match ty.kind() {
            TypeKind::Primitive(PrimitiveKind::String { .. }) => {
                let len = self.r.read_u32()? as usize;
                self.r.skip(len)
            }
            TypeKind::Primitive(PrimitiveKind::WString { .. }) => {
                let prefix = self.r.read_u32()? as usize;
                let bytes = if self.xcdr2() {
                    prefix
                } else {
                    prefix.saturating_mul(2)
                };
                self.r.skip(bytes)
            }
            TypeKind::Primitive(_) | TypeKind::Enum(_) => {
                let size = ty.fixed_size().unwrap_or(1);
                self.r.align(size)?;
                self.r.skip(size)
            }
            TypeKind::Struct(_) | TypeKind::Union(_) => {
                match (self.config.representation, ty.extensibility()) {
                    (Representation::Xcdr2, Extensibility::Appendable | Extensibility::Mutable) => {
                        self.take_delimited().map(|_| ())
                    }
                    (Representation::PlainCdr, Extensibility::Mutable) => {
                        while let Some(header) = self.next_header()? {
                            self.r.seek(header.end)?;
                        }
                        Ok(())
                    }
                    _ => self.skip_sequential(ty),
                }
            }
            TypeKind::Sequence(s) => {
                if self.collection_block(&s.element_type)?.is_some() {
                    return Ok(());
                }
                let count = self.read_count(s.max_length, self.min_size(&s.element_type))?;
                self.skip_elements(&s.element_type, count)
            }
            TypeKind::Array(a) => {
                if self.collection_block(&a.element_type)?.is_some() {
                    return Ok(());
                }
                self.skip_elements(&a.element_type, a.length)
            }
            TypeKind::Map(m) => {
                let element = if m.key_type.is_primitive_like() {
                    &m.value_type
                } else {
                    &m.key_type
                };
                if self.collection_block(element)?.is_some() {
                    return Ok(());
                }
                let entry_size = self.min_size(&m.key_type) + self.min_size(&m.value_type);
                let count = self.read_count(m.max_length, entry_size)?;
                for _ in 0..count {
                    self.skip_value(&m.key_type)?;
                    self.skip_value(&m.value_type)?;
                }
                Ok(())
            }
        }
    }

    fn skip_elements(&mut self, element: &Arc<DynamicType>, count: usize) -> Result<()> {
        match element.fixed_size() {
            Some(size) if count > 0 => {
                self.r.align(size)?;
                let total = count
                    .checked_mul(size)
                    .ok_or_else(|| DynamicError::malformed(self.r.position(), "element count overflow"))?;
                self.r.skip(total)
            }
            Some(_) => Ok(()),
            None => (0..count).try_for_each(|_| self.skip_value(element)),
        }
    }

    /// Undelimited aggregate: walk its members in order.
    fn skip_sequential(&mut self, ty: &Arc<DynamicType>) -> Result<()> {
        if let Some(u) = ty.union_descriptor() {
            let at = self.r.position();
            let label = self
                .read_value(&u.discriminator, Scope::Full)?
                .as_label()
                .ok_or_else(|| DynamicError::malformed(at, "non-integral discriminator"))?;
            if let Some(member) = u.member_for_label(label) {
                self.skip_value(&member.member_type)?;
            }
            return Ok(());
        }
        for member in ty.members() {
            if !member.is_optional() {
                self.skip_value(&member.member_type)?;
            } else if self.xcdr2() {
                if self.r.read_bool()? {
                    self.skip_value(&member.member_type)?;
                }
            } else {
                self.optional_parameter(member.id)?;
            }
        }
        Ok(())
    }

    /// Position on member `id` of the aggregate `ty` starting here.
    ///
    /// Returns a decoder confined to the member's encoding, or `None` when
    /// the member is absent from this sample.
    pub(crate) fn seek_member(
        &mut self,
        ty: &Arc<DynamicType>,
        id: MemberId,
    ) -> Result<Option<Decoder<'a, 'c>>> {
        match (self.config.representation, ty.extensibility()) {
            (_, Extensibility::Mutable) => {
                // Walks the whole list: refused here iff a full decode refuses it.
                let mut block = self.mutable_block()?;
                let mut found = None;
                while let Some(header) = block.next_header()? {
                    let member = block.take_member(&header)?;
                    if header.id == id {
                        if found.is_some() {
                            return Err(DynamicError::malformed(
                                header.start,
                                format!("member {:#x} appears twice", header.id),
                            ));
                        }
                        found = Some(member);
                    } else if header.must_understand && !declares(ty, header.id) {
                        return Err(DynamicError::UnknownRequiredMember(header.id));
                    }
                }
                Ok(found)
            }
            (Representation::Xcdr2, Extensibility::Appendable) => {
                let mut block = self.take_delimited()?;
                block.seek_sequential(ty, id, true)
            }
            _ => self.seek_sequential(ty, id, false),
        }
    }

    fn seek_sequential(
        &mut self,
        ty: &Arc<DynamicType>,
        id: MemberId,
        appendable: bool,
    ) -> Result<Option<Decoder<'a, 'c>>> {
        if let Some(u) = ty.union_descriptor() {
            if id == DISCRIMINATOR_ID {
                return Ok(Some(self.clone()));
            }
            let at = self.r.position();
            let label = self
                .read_value(&u.discriminator, Scope::Full)?
                .as_label()
                .ok_or_else(|| DynamicError::malformed(at, "non-integral discriminator"))?;
            let selected = u.member_for_label(label).map(|m| m.id);
            return Ok((selected == Some(id)).then(|| self.clone()));
        }

        for member in ty.members() {
            let target = member.id == id;
            if appendable && self.r.remaining() == 0 {
                if member.is_optional() {
                    if target {
                        return Ok(None);
                    }
                    continue;
                }
                return Err(DynamicError::malformed(
                    self.r.position(),
                    format!("delimited block ends before member '{}'", member.name),
                ));
            }
            if !member.is_optional() {
                if target {
                    return Ok(Some(self.clone()));
                }
                self.skip_value(&member.member_type)?;
            } else if self.xcdr2() {
                let present = self.r.read_bool()?;
                if target {
                    return Ok(present.then(|| self.clone()));
                }
                if present {
                    self.skip_value(&member.member_type)?;
                }
            } else {
                let block = self.optional_parameter(member.id)?;
                if target {
                    return Ok(block);
                }
            }
        }
        Ok(None)
    }
}

fn declares(ty: &DynamicType, id: MemberId) -> bool {
    (id == DISCRIMINATOR_ID && ty.union_descriptor().is_some()) || ty.member_by_id(id).is_ok()
}

/// A decoded union holds at most one member, the one its discriminator
/// selects.
fn check_union_selection(data: &DynamicData, offset: usize) -> Result<()> {
    let members = data
        .populated()
        .filter(|(id, _)| *id != DISCRIMINATOR_ID)
        .count();
    if members > 1 {
        return Err(DynamicError::malformed(
            offset,
            format!("union carries {} members", members),
        ));
    }
    match (data.active_member(), data.discriminator()) {
        (None, _) => Ok(()),
        (Some(_), None) => Err(DynamicError::malformed(offset, "union member without discriminator")),
        (Some(active), Some(_)) => {
            if data.selected_member().map(|m| m.id) == Some(active.id) {
                Ok(())
            } else {
                Err(DynamicError::malformed(
                    offset,
                    format!("member '{}' not selected by the discriminator", active.name),
                ))
            }
        }
    }
}
