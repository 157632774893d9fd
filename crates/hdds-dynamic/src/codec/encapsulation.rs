// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! RTPS serialized payload header (XTypes v1.3 Sec.7.6.3.1.2).
//!
//! ```text
//! 0      2      4
//! +------+------+------------------
//! |  id  | opts | body ...
//! +------+------+------------------
//! ```
//!
//! `id` is big-endian and selects representation and byte order; the two
//! low bits of `opts` count the padding bytes appended to the body.

use super::{decode_dynamic, encode_dynamic};
use crate::config::{EncodingConfig, Endianness, Representation};
use crate::data::DynamicData;
use crate::error::{DynamicError, Result};
use crate::types::{DynamicType, Extensibility};
use std::sync::Arc;

pub const CDR_BE: u16 = 0x0000;
pub const CDR_LE: u16 = 0x0001;
pub const PL_CDR_BE: u16 = 0x0002;
pub const PL_CDR_LE: u16 = 0x0003;
pub const CDR2_BE: u16 = 0x0010;
pub const CDR2_LE: u16 = 0x0011;
pub const PL_CDR2_BE: u16 = 0x0012;
pub const PL_CDR2_LE: u16 = 0x0013;
pub const D_CDR2_BE: u16 = 0x0014;
pub const D_CDR2_LE: u16 = 0x0015;

const HEADER_LEN: usize = 4;

/// Encapsulation identifier for a top-level type of the given extensibility.
pub fn encapsulation_id(
    representation: Representation,
    endianness: Endianness,
    extensibility: Extensibility,
) -> u16 {
    let big = endianness == Endianness::Big;
    let pick = |be: u16, le: u16| if big { be } else { le };
    match (representation, extensibility) {
        (Representation::PlainCdr, Extensibility::Mutable) => pick(PL_CDR_BE, PL_CDR_LE),
        (Representation::PlainCdr, _) => pick(CDR_BE, CDR_LE),
        (Representation::Xcdr2, Extensibility::Final) => pick(CDR2_BE, CDR2_LE),
        (Representation::Xcdr2, Extensibility::Appendable) => pick(D_CDR2_BE, D_CDR2_LE),
        (Representation::Xcdr2, Extensibility::Mutable) => pick(PL_CDR2_BE, PL_CDR2_LE),
    }
}

/// Representation and byte order announced by an encapsulation identifier.
pub fn parse_encapsulation(id: u16) -> Option<(Representation, Endianness)> {
    let representation = match id {
        CDR_BE | CDR_LE | PL_CDR_BE | PL_CDR_LE => Representation::PlainCdr,
        CDR2_BE | CDR2_LE | PL_CDR2_BE | PL_CDR2_LE | D_CDR2_BE | D_CDR2_LE => {
            Representation::Xcdr2
        }
        _ => return None,
    };
    let endianness = if id & 0x0001 == 0 {
        Endianness::Big
    } else {
        Endianness::Little
    };
    Some((representation, endianness))
}

/// Encode `data` behind an encapsulation header, padding the body to 4 bytes.
pub fn encode_sample(data: &DynamicData, config: &EncodingConfig) -> Result<Vec<u8>> {
    let body = encode_dynamic(data, config)?;
    let id = encapsulation_id(
        config.representation,
        config.endianness,
        data.dynamic_type().extensibility(),
    );
    let padding = (4 - body.len() % 4) % 4;

    let mut out = Vec::with_capacity(HEADER_LEN + body.len() + padding);
    out.extend_from_slice(&id.to_be_bytes());
    out.extend_from_slice(&[0, padding as u8]);
    out.extend_from_slice(&body);
    out.resize(out.len() + padding, 0);
    Ok(out)
}

/// Decode a sample produced by [`encode_sample`] (or any XTypes writer).
///
/// Representation and byte order come from the header; the remaining
/// settings of `config` (unknown enum policy) apply.
pub fn decode_sample(
    bytes: &[u8],
    ty: &Arc<DynamicType>,
    config: &EncodingConfig,
) -> Result<DynamicData> {
    if bytes.len() < HEADER_LEN {
        return Err(DynamicError::malformed(0, "missing encapsulation header"));
    }
    let id = u16::from_be_bytes([bytes[0], bytes[1]]);
    let (representation, endianness) = parse_encapsulation(id).ok_or_else(|| {
        DynamicError::malformed(0, format!("unknown encapsulation {:#06x}", id))
    })?;
    let padding = usize::from(bytes[3] & 0x03);
    let body = &bytes[HEADER_LEN..];
    let body = &body[..body.len().saturating_sub(padding)];

    let config = config
        .with_representation(representation)
        .with_endianness(endianness);
    decode_dynamic(body, ty, &config)
}
