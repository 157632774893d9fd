// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Extensible CDR codec for [`DynamicData`].
//!
//! Framing follows each aggregate's own declared extensibility, recursively:
//!
//! | extensibility | XCDR2 (`Xcdr2`)                 | XCDR1 (`PlainCdr`)              |
//! |---------------|---------------------------------|---------------------------------|
//! | FINAL         | members back to back            | members back to back            |
//! | APPENDABLE    | DHEADER + members               | members back to back            |
//! | MUTABLE       | DHEADER + EMHEADER1 per member  | parameter list + `PID_LIST_END` |
//!
//! Decoding is all-or-nothing: [`decode_into`] stages into a fresh container
//! and only replaces the destination when the whole sample decoded.
//!
//! # Example
//!
//! ```
//! use hdds_dynamic::codec::{decode_dynamic, encode_dynamic};
//! use hdds_dynamic::{DynamicData, EncodingConfig, PrimitiveKind, TypeDescriptorBuilder};
//!
//! let point = TypeDescriptorBuilder::new("Point")
//!     .key_field("x", PrimitiveKind::F64)
//!     .key_field("y", PrimitiveKind::F64)
//!     .build()
//!     .unwrap();
//! let mut data = DynamicData::new(&point);
//! data.set_by_name("x", 1.0f64).unwrap();
//! data.set_by_name("y", 2.0f64).unwrap();
//!
//! let config = EncodingConfig::xcdr2();
//! let bytes = encode_dynamic(&data, &config).unwrap();
//! assert_eq!(bytes.len(), 16);
//! assert_eq!(decode_dynamic(&bytes, &point, &config).unwrap(), data);
//! ```

mod decoder;
mod encapsulation;
mod encoder;
mod headers;

pub use encapsulation::{
    decode_sample, encapsulation_id, encode_sample, parse_encapsulation, CDR2_BE, CDR2_LE,
    CDR_BE, CDR_LE, D_CDR2_BE, D_CDR2_LE, PL_CDR2_BE, PL_CDR2_LE, PL_CDR_BE, PL_CDR_LE,
};

pub(crate) use decoder::Decoder;

use crate::buffer::ByteWriter;
use crate::config::EncodingConfig;
use crate::data::DynamicData;
use crate::error::Result;
use crate::resolver::key_members;
use crate::types::{DynamicType, MemberDescriptor};
use encoder::Encoder;
use std::sync::Arc;

/// Which members of an aggregate take part in an encode/decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Scope {
    Full,
    /// Top-level key-only sample: members flagged `@key`.
    Key,
    /// Inside a key member: its keys, or all members when it declares none.
    NestedKey,
}

impl Scope {
    fn of(data: &DynamicData) -> Self {
        if data.is_key_only() {
            Self::Key
        } else {
            Self::Full
        }
    }

    /// Scope applied to the values of the selected members.
    pub(crate) fn nested(self) -> Self {
        match self {
            Self::Full => Self::Full,
            Self::Key | Self::NestedKey => Self::NestedKey,
        }
    }

    pub(crate) fn members(self, ty: &DynamicType) -> Vec<&MemberDescriptor> {
        match self {
            Self::Full => ty.members().iter().collect(),
            Self::Key => key_members(ty, false),
            Self::NestedKey => key_members(ty, true),
        }
    }
}

/// Encode `data` (only its key members when it is key-only).
pub fn encode_dynamic(data: &DynamicData, config: &EncodingConfig) -> Result<Vec<u8>> {
    let writer = ByteWriter::new(config.endianness, config.max_alignment());
    let mut encoder = Encoder::new(writer, config);
    encoder.write_data(data, Scope::of(data))?;
    Ok(encoder.into_sink())
}

/// Exact length [`encode_dynamic`] would produce, computed without writing.
pub fn serialized_size(data: &DynamicData, config: &EncodingConfig) -> Result<usize> {
    let counter = ByteWriter::counter(config.endianness, config.max_alignment(), 0, 0);
    let mut encoder = Encoder::new(counter, config);
    encoder.write_data(data, Scope::of(data))?;
    Ok(encoder.position())
}

/// Decode a full sample of type `ty`.
pub fn decode_dynamic(bytes: &[u8], ty: &Arc<DynamicType>, config: &EncodingConfig) -> Result<DynamicData> {
    Decoder::new(bytes, config).read_data(ty, Scope::Full)
}

/// Decode a key-only sample of type `ty`; the result is marked key-only.
pub fn decode_key_only(bytes: &[u8], ty: &Arc<DynamicType>, config: &EncodingConfig) -> Result<DynamicData> {
    let mut data = Decoder::new(bytes, config).read_data(ty, Scope::Key)?;
    data.set_key_only(true);
    Ok(data)
}

/// Decode into an existing container, honouring its key-only flag.
///
/// On error `data` is left exactly as it was.
pub fn decode_into(data: &mut DynamicData, bytes: &[u8], config: &EncodingConfig) -> Result<()> {
    let scope = Scope::of(data);
    let ty = Arc::clone(data.dynamic_type());
    match Decoder::new(bytes, config).read_data(&ty, scope) {
        Ok(mut staged) => {
            staged.set_key_only(data.is_key_only());
            *data = staged;
            Ok(())
        }
        Err(e) => {
            log::debug!("[codec] decode of {} failed: {}", ty.name(), e);
            Err(e)
        }
    }
}
