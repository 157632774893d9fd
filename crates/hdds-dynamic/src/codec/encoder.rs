// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! DynamicData -> XCDR bytes.
//!
//! The encoder is generic over the output [`Sink`]; running it with a
//! [`SizeCounter`](crate::buffer::SizeCounter) yields the exact serialized
//! size. XCDR1 parameter payloads go through a detached writer of the same
//! sink kind so their length is known before the header is written.

use super::headers::{
    write_emheader, write_list_end, write_parameter_header, LengthCode,
};
use super::Scope;
use crate::buffer::{ByteWriter, Sink};
use crate::config::{EncodingConfig, Representation};
use crate::data::{check_bound, DynamicData};
use crate::error::{DynamicError, Result};
use crate::types::{
    DynamicType, Extensibility, MemberId, PrimitiveKind, TypeKind, DISCRIMINATOR_ID,
};
use crate::value::Value;
use std::sync::Arc;

/// One member slot as it goes on the wire.
struct Field<'d> {
    id: MemberId,
    ty: &'d Arc<DynamicType>,
    optional: bool,
    must_understand: bool,
    value: Option<&'d Value>,
}

pub(crate) struct Encoder<'c, S: Sink> {
    w: ByteWriter<S>,
    config: &'c EncodingConfig,
}

impl<'c, S: Sink> Encoder<'c, S> {
    pub(crate) fn new(w: ByteWriter<S>, config: &'c EncodingConfig) -> Self {
        Self { w, config }
    }

    pub(crate) fn position(&self) -> usize {
        self.w.position()
    }

    pub(crate) fn into_sink(self) -> S {
        self.w.into_sink()
    }

    fn xcdr2(&self) -> bool {
        self.config.representation == Representation::Xcdr2
    }

    /// Encode a struct or union container.
    pub(crate) fn write_data(&mut self, data: &DynamicData, scope: Scope) -> Result<()> {
        let ty = data.dynamic_type();
        let fields = match ty.kind() {
            TypeKind::Struct(_) => struct_fields(data, scope)?,
            TypeKind::Union(_) => union_fields(data, scope)?,
            other => return Err(DynamicError::mismatch("struct or union", other.name())),
        };
        self.write_fields(ty.extensibility(), &fields, scope.nested())
    }

    fn write_fields(
        &mut self,
        extensibility: Extensibility,
        fields: &[Field<'_>],
        scope: Scope,
    ) -> Result<()> {
        match (self.config.representation, extensibility) {
            (Representation::Xcdr2, Extensibility::Final)
            | (Representation::PlainCdr, Extensibility::Final | Extensibility::Appendable) => {
                self.write_sequential(fields, scope)
            }
            (Representation::Xcdr2, Extensibility::Appendable) => {
                self.delimited(|enc| enc.write_sequential(fields, scope))
            }
            (Representation::Xcdr2, Extensibility::Mutable) => self.delimited(|enc| {
                for field in fields {
                    if let Some(value) = field.value {
                        enc.write_emheader_member(field, value, scope)?;
                    }
                }
                Ok(())
            }),
            (Representation::PlainCdr, Extensibility::Mutable) => {
                for field in fields.iter().filter(|f| f.value.is_some()) {
                    self.write_parameter(field, scope)?;
                }
                write_list_end(&mut self.w);
                Ok(())
            }
        }
    }

    /// Members back to back; optional members carry a presence flag
    /// (XCDR2) or a parameter header (XCDR1).
    fn write_sequential(&mut self, fields: &[Field<'_>], scope: Scope) -> Result<()> {
        for field in fields {
            match (field.optional, field.value) {
                (false, Some(value)) => self.write_value(field.ty, value, scope)?,
                (true, value) if self.xcdr2() => {
                    self.w.write_bool(value.is_some());
                    if let Some(value) = value {
                        self.write_value(field.ty, value, scope)?;
                    }
                }
                (true, _) => self.write_parameter(field, scope)?,
                // Required members were checked when the fields were gathered.
                (false, None) => return Err(DynamicError::MemberNotSet(field.id)),
            }
        }
        Ok(())
    }

    fn write_emheader_member(&mut self, field: &Field<'_>, value: &Value, scope: Scope) -> Result<()> {
        let lc = field
            .ty
            .fixed_size()
            .and_then(LengthCode::for_fixed_size)
            .unwrap_or(LengthCode::NextInt);
        write_emheader(&mut self.w, field.id, field.must_understand, lc);
        if lc == LengthCode::NextInt {
            self.delimited(|enc| enc.write_value(field.ty, value, scope))
        } else {
            self.write_value(field.ty, value, scope)
        }
    }

    /// XCDR1 parameter: header, then the payload aligned from its own start.
    /// The payload is written once into a detached writer so its length is
    /// known before the header.
    fn write_parameter(&mut self, field: &Field<'_>, scope: Scope) -> Result<()> {
        let payload = match field.value {
            Some(value) => {
                let mut payload = Encoder::new(self.w.detached(), self.config);
                payload.write_value(field.ty, value, scope)?;
                Some(payload.w)
            }
            None => None,
        };
        let size = payload.as_ref().map_or(0, |w| w.position());
        write_parameter_header(&mut self.w, field.id, field.must_understand, size)?;
        if let Some(payload) = payload {
            self.w.append(payload);
        }
        Ok(())
    }

    /// Write a u32 length placeholder, run `body`, then back-fill it.
    fn delimited(&mut self, body: impl FnOnce(&mut Self) -> Result<()>) -> Result<()> {
        let at = self.w.reserve_u32();
        body(self)?;
        let len = length_u32(self.w.position() - at - 4)?;
        self.w.patch_u32(at, len);
        Ok(())
    }

    fn collection(&mut self, element: &DynamicType, body: impl FnOnce(&mut Self) -> Result<()>) -> Result<()> {
        if self.xcdr2() && !element.is_primitive_like() {
            self.delimited(body)
        } else {
            body(self)
        }
    }

    pub(crate) fn write_value(&mut self, ty: &Arc<DynamicType>, value: &Value, scope: Scope) -> Result<()> {
        match (ty.kind(), value) {
            (TypeKind::Primitive(kind), _) => self.write_primitive(ty, *kind, value),
            (TypeKind::Enum(e), Value::Enum(v)) => {
                if !e.contains(*v) {
                    return Err(DynamicError::InvalidEnumValue {
                        type_name: ty.name().to_string(),
                        value: *v,
                    });
                }
                match e.wire_size() {
                    1 => self.w.write_i8(*v as i8),
                    2 => self.w.write_i16(*v as i16),
                    _ => self.w.write_i32(*v),
                }
                Ok(())
            }
            (TypeKind::Struct(_) | TypeKind::Union(_), Value::Data(data)) => {
                self.write_data(data, scope)
            }
            (TypeKind::Sequence(s), Value::Sequence(items)) => {
                check_bound(s.max_length, items.len())?;
                self.collection(&s.element_type, |enc| {
                    enc.w.write_u32(length_u32(items.len())?);
                    items
                        .iter()
                        .try_for_each(|item| enc.write_value(&s.element_type, item, Scope::Full))
                })
            }
            (TypeKind::Array(a), Value::Array(items)) => {
                if items.len() != a.length {
                    return Err(DynamicError::mismatch(
                        ty.name(),
                        format!("array of {}", items.len()),
                    ));
                }
                self.collection(&a.element_type, |enc| {
                    items
                        .iter()
                        .try_for_each(|item| enc.write_value(&a.element_type, item, Scope::Full))
                })
            }
            (TypeKind::Map(m), Value::Map(entries)) => {
                check_bound(m.max_length, entries.len())?;
                let element = if m.key_type.is_primitive_like() {
                    &m.value_type
                } else {
                    &m.key_type
                };
                self.collection(element, |enc| {
                    enc.w.write_u32(length_u32(entries.len())?);
                    entries.iter().try_for_each(|(k, v)| {
                        enc.write_value(&m.key_type, k, Scope::Full)?;
                        enc.write_value(&m.value_type, v, Scope::Full)
                    })
                })
            }
            _ => Err(DynamicError::mismatch(ty.name(), value.tag())),
        }
    }

    fn write_primitive(&mut self, ty: &DynamicType, kind: PrimitiveKind, value: &Value) -> Result<()> {
        match (kind, value) {
            (PrimitiveKind::Bool, Value::Bool(v)) => self.w.write_bool(*v),
            (PrimitiveKind::Byte, Value::Byte(v)) | (PrimitiveKind::U8, Value::U8(v)) => {
                self.w.write_u8(*v)
            }
            (PrimitiveKind::I8, Value::I8(v)) => self.w.write_i8(*v),
            (PrimitiveKind::U16, Value::U16(v)) => self.w.write_u16(*v),
            (PrimitiveKind::I16, Value::I16(v)) => self.w.write_i16(*v),
            (PrimitiveKind::U32, Value::U32(v)) => self.w.write_u32(*v),
            (PrimitiveKind::I32, Value::I32(v)) => self.w.write_i32(*v),
            (PrimitiveKind::U64, Value::U64(v)) => self.w.write_u64(*v),
            (PrimitiveKind::I64, Value::I64(v)) => self.w.write_i64(*v),
            (PrimitiveKind::F32, Value::F32(v)) => self.w.write_f32(*v),
            (PrimitiveKind::F64, Value::F64(v)) => self.w.write_f64(*v),
            (PrimitiveKind::Char, Value::Char(c)) => {
                let code = u32::from(*c);
                let byte = u8::try_from(code).map_err(|_| DynamicError::BoundExceeded {
                    bound: 0xFF,
                    requested: code as usize,
                })?;
                self.w.write_u8(byte);
            }
            (PrimitiveKind::WChar, Value::WChar(c)) => {
                let code = u32::from(*c);
                let unit = u16::try_from(code).map_err(|_| DynamicError::BoundExceeded {
                    bound: 0xFFFF,
                    requested: code as usize,
                })?;
                self.w.write_u16(unit);
            }
            (PrimitiveKind::String { max_length }, Value::String(s)) => {
                check_bound(max_length, s.len())?;
                self.w.write_u32(length_u32(s.len() + 1)?);
                self.w.write_bytes(s.as_bytes());
                self.w.write_u8(0);
            }
            (PrimitiveKind::WString { max_length }, Value::WString(s)) => {
                let units: Vec<u16> = s.encode_utf16().collect();
                check_bound(max_length, units.len())?;
                // XCDR2 counts bytes, XCDR1 counts code units.
                let prefix = if self.xcdr2() {
                    units.len() * 2
                } else {
                    units.len()
                };
                self.w.write_u32(length_u32(prefix)?);
                for unit in units {
                    self.w.write_u16(unit);
                }
            }
            _ => return Err(DynamicError::mismatch(ty.name(), value.tag())),
        }
        Ok(())
    }
}

fn length_u32(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| DynamicError::BoundExceeded {
        bound: u32::MAX as usize,
        requested: len,
    })
}

fn missing(data: &DynamicData, member: &str) -> DynamicError {
    DynamicError::MissingRequiredMember {
        type_name: data.type_name().to_string(),
        member: member.to_string(),
    }
}

fn struct_fields(data: &DynamicData, scope: Scope) -> Result<Vec<Field<'_>>> {
    scope
        .members(data.dynamic_type())
        .into_iter()
        .map(|m| {
            let value = data.get_value(m.id).ok();
            if value.is_none() && !m.is_optional() {
                return Err(missing(data, &m.name));
            }
            Ok(Field {
                id: m.id,
                ty: &m.member_type,
                optional: m.is_optional(),
                must_understand: m.is_must_understand(),
                value,
            })
        })
        .collect()
}

/// Discriminator first, then the selected member; key scopes keep only a
/// keyed discriminator.
fn union_fields(data: &DynamicData, scope: Scope) -> Result<Vec<Field<'_>>> {
    let ty = data.dynamic_type();
    let Some(u) = ty.union_descriptor() else {
        return Err(DynamicError::mismatch("union", ty.kind().name()));
    };
    if scope != Scope::Full && !u.discriminator_is_key {
        if scope == Scope::NestedKey {
            return Err(DynamicError::NoKeyAnnotationOnUnion(ty.name().to_string()));
        }
        return Ok(Vec::new());
    }

    let discriminator = data
        .discriminator()
        .ok_or_else(|| missing(data, "discriminator"))?;
    let mut fields = vec![Field {
        id: DISCRIMINATOR_ID,
        ty: &u.discriminator,
        optional: false,
        must_understand: true,
        value: Some(discriminator),
    }];
    if scope != Scope::Full {
        return Ok(fields);
    }

    let label = discriminator
        .as_label()
        .ok_or_else(|| DynamicError::mismatch("discriminator", discriminator.tag()))?;
    if let Some(member) = u.member_for_label(label) {
        let value = data
            .get_value(member.id)
            .map_err(|_| missing(data, &member.name))?;
        fields.push(Field {
            id: member.id,
            ty: &member.member_type,
            optional: false,
            must_understand: member.is_must_understand(),
            value: Some(value),
        });
    }
    Ok(fields)
}
