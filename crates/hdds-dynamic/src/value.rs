// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Dynamic value types.

use crate::data::DynamicData;
use crate::error::{DynamicError, Result};
use crate::types::{DynamicType, PrimitiveKind, TypeKind};
use std::sync::Arc;

/// A value of any dynamic type, held by a [`DynamicData`] member slot.
#[derive(Debug, Clone)]
pub enum Value {
    // Primitives
    Bool(bool),
    Byte(u8),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Char(char),
    WChar(char),
    String(String),
    WString(String),

    /// Enum ordinal.
    Enum(i32),

    // Composites
    /// Nested struct or union.
    Data(DynamicData),
    Sequence(Vec<Value>),
    Array(Vec<Value>),
    /// Map entries in insertion order.
    Map(Vec<(Value, Value)>),
}

macro_rules! impl_as {
    ($name:ident, $variant:ident, $ty:ty) => {
        pub fn $name(&self) -> Option<$ty> {
            match self {
                Self::$variant(v) => Some(*v),
                _ => None,
            }
        }
    };
}

impl Value {
    impl_as!(as_bool, Bool, bool);
    impl_as!(as_byte, Byte, u8);
    impl_as!(as_u8, U8, u8);
    impl_as!(as_u16, U16, u16);
    impl_as!(as_u32, U32, u32);
    impl_as!(as_u64, U64, u64);
    impl_as!(as_i8, I8, i8);
    impl_as!(as_i16, I16, i16);
    impl_as!(as_i32, I32, i32);
    impl_as!(as_i64, I64, i64);
    impl_as!(as_f32, F32, f32);
    impl_as!(as_f64, F64, f64);
    impl_as!(as_enum, Enum, i32);

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) | Self::WString(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_data(&self) -> Option<&DynamicData> {
        match self {
            Self::Data(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_elements(&self) -> Option<&[Value]> {
        match self {
            Self::Sequence(v) | Self::Array(v) => Some(v),
            _ => None,
        }
    }

    /// Tag name used in mismatch reports.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Bool(_) => "boolean",
            Self::Byte(_) => "octet",
            Self::U8(_) => "uint8",
            Self::U16(_) => "uint16",
            Self::U32(_) => "uint32",
            Self::U64(_) => "uint64",
            Self::I8(_) => "int8",
            Self::I16(_) => "int16",
            Self::I32(_) => "int32",
            Self::I64(_) => "int64",
            Self::F32(_) => "float32",
            Self::F64(_) => "float64",
            Self::Char(_) => "char8",
            Self::WChar(_) => "char16",
            Self::String(_) => "string",
            Self::WString(_) => "wstring",
            Self::Enum(_) => "enum",
            Self::Data(_) => "data",
            Self::Sequence(_) => "sequence",
            Self::Array(_) => "array",
            Self::Map(_) => "map",
        }
    }

    /// Integral view used for union discriminators.
    pub fn as_label(&self) -> Option<i64> {
        match self {
            Self::Bool(v) => Some(i64::from(*v)),
            Self::Byte(v) | Self::U8(v) => Some(i64::from(*v)),
            Self::U16(v) => Some(i64::from(*v)),
            Self::U32(v) => Some(i64::from(*v)),
            Self::U64(v) => i64::try_from(*v).ok(),
            Self::I8(v) => Some(i64::from(*v)),
            Self::I16(v) => Some(i64::from(*v)),
            Self::I32(v) | Self::Enum(v) => Some(i64::from(*v)),
            Self::I64(v) => Some(*v),
            Self::Char(c) | Self::WChar(c) => Some(i64::from(u32::from(*c))),
            _ => None,
        }
    }

    /// Discriminator value of type `ty` carrying `label`.
    pub fn from_label(ty: &DynamicType, label: i64) -> Result<Self> {
        let out_of_range = || DynamicError::mismatch(ty.name(), format!("label {}", label));
        let value = match ty.kind() {
            TypeKind::Enum(_) => Self::Enum(i32::try_from(label).map_err(|_| out_of_range())?),
            TypeKind::Primitive(kind) => match kind {
                PrimitiveKind::Bool => match label {
                    0 => Self::Bool(false),
                    1 => Self::Bool(true),
                    _ => return Err(out_of_range()),
                },
                PrimitiveKind::Byte => Self::Byte(u8::try_from(label).map_err(|_| out_of_range())?),
                PrimitiveKind::U8 => Self::U8(u8::try_from(label).map_err(|_| out_of_range())?),
                PrimitiveKind::U16 => Self::U16(u16::try_from(label).map_err(|_| out_of_range())?),
                PrimitiveKind::U32 => Self::U32(u32::try_from(label).map_err(|_| out_of_range())?),
                PrimitiveKind::U64 => Self::U64(u64::try_from(label).map_err(|_| out_of_range())?),
                PrimitiveKind::I8 => Self::I8(i8::try_from(label).map_err(|_| out_of_range())?),
                PrimitiveKind::I16 => Self::I16(i16::try_from(label).map_err(|_| out_of_range())?),
                PrimitiveKind::I32 => Self::I32(i32::try_from(label).map_err(|_| out_of_range())?),
                PrimitiveKind::I64 => Self::I64(label),
                PrimitiveKind::Char | PrimitiveKind::WChar => {
                    let c = u32::try_from(label)
                        .ok()
                        .and_then(char::from_u32)
                        .ok_or_else(out_of_range)?;
                    if matches!(kind, PrimitiveKind::Char) {
                        Self::Char(c)
                    } else {
                        Self::WChar(c)
                    }
                }
                _ => return Err(out_of_range()),
            },
            _ => return Err(out_of_range()),
        };
        Ok(value)
    }

    /// Zero value of `ty`: numeric zero, empty string or collection, default
    /// enum literal, or an empty container for aggregates.
    pub fn default_for(ty: &Arc<DynamicType>) -> Self {
        match ty.kind() {
            TypeKind::Primitive(kind) => match kind {
                PrimitiveKind::Bool => Self::Bool(false),
                PrimitiveKind::Byte => Self::Byte(0),
                PrimitiveKind::U8 => Self::U8(0),
                PrimitiveKind::U16 => Self::U16(0),
                PrimitiveKind::U32 => Self::U32(0),
                PrimitiveKind::U64 => Self::U64(0),
                PrimitiveKind::I8 => Self::I8(0),
                PrimitiveKind::I16 => Self::I16(0),
                PrimitiveKind::I32 => Self::I32(0),
                PrimitiveKind::I64 => Self::I64(0),
                PrimitiveKind::F32 => Self::F32(0.0),
                PrimitiveKind::F64 => Self::F64(0.0),
                PrimitiveKind::Char => Self::Char('\0'),
                PrimitiveKind::WChar => Self::WChar('\0'),
                PrimitiveKind::String { .. } => Self::String(String::new()),
                PrimitiveKind::WString { .. } => Self::WString(String::new()),
            },
            TypeKind::Enum(e) => Self::Enum(e.default_value()),
            TypeKind::Struct(_) | TypeKind::Union(_) => Self::Data(DynamicData::new(ty)),
            TypeKind::Sequence(_) => Self::Sequence(Vec::new()),
            TypeKind::Array(a) => {
                Self::Array((0..a.length).map(|_| Self::default_for(&a.element_type)).collect())
            }
            TypeKind::Map(_) => Self::Map(Vec::new()),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        crate::compare::values_equal(self, other)
    }
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

macro_rules! impl_from_native {
    ($ty:ty, $variant:ident) => {
        impl From<$ty> for Value {
            fn from(v: $ty) -> Self {
                Self::$variant(v)
            }
        }
    };
}

impl_from_native!(bool, Bool);
impl_from_native!(u8, U8);
impl_from_native!(u16, U16);
impl_from_native!(u32, U32);
impl_from_native!(u64, U64);
impl_from_native!(i8, I8);
impl_from_native!(i16, I16);
impl_from_native!(i32, I32);
impl_from_native!(i64, I64);
impl_from_native!(f32, F32);
impl_from_native!(f64, F64);
impl_from_native!(char, Char);
impl_from_native!(String, String);
impl_from_native!(DynamicData, Data);

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Self::Sequence(v.into_iter().map(Into::into).collect())
    }
}

/// Typed extraction from a [`Value`].
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Result<Self>;
}

macro_rules! impl_from_value {
    ($ty:ty, $variant:ident, $name:expr) => {
        impl FromValue for $ty {
            fn from_value(value: &Value) -> Result<Self> {
                match value {
                    Value::$variant(v) => Ok(v.clone()),
                    other => Err(DynamicError::mismatch($name, other.tag())),
                }
            }
        }
    };
}

impl_from_value!(bool, Bool, "boolean");
impl_from_value!(u16, U16, "uint16");
impl_from_value!(u32, U32, "uint32");
impl_from_value!(u64, U64, "uint64");
impl_from_value!(i8, I8, "int8");
impl_from_value!(i16, I16, "int16");
impl_from_value!(i64, I64, "int64");
impl_from_value!(f32, F32, "float32");
impl_from_value!(f64, F64, "float64");
impl_from_value!(DynamicData, Data, "data");

impl FromValue for u8 {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::U8(v) | Value::Byte(v) => Ok(*v),
            other => Err(DynamicError::mismatch("uint8", other.tag())),
        }
    }
}

impl FromValue for i32 {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::I32(v) | Value::Enum(v) => Ok(*v),
            other => Err(DynamicError::mismatch("int32", other.tag())),
        }
    }
}

impl FromValue for char {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Char(c) | Value::WChar(c) => Ok(*c),
            other => Err(DynamicError::mismatch("char", other.tag())),
        }
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self> {
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| DynamicError::mismatch("string", value.tag()))
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: &Value) -> Result<Self> {
        value
            .as_elements()
            .ok_or_else(|| DynamicError::mismatch("sequence", value.tag()))?
            .iter()
            .map(T::from_value)
            .collect()
    }
}
