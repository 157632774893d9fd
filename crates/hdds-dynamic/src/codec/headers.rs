// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Member framing for MUTABLE aggregates.
//!
//! XCDR2 (XTypes v1.3 Sec.7.4.3.4.3): `EMHEADER1 = M_FLAG(31) | LC(28..30) | id(0..27)`,
//! optionally followed by `NEXTINT`. The enclosing DHEADER bounds the block.
//!
//! XCDR1 (Sec.7.4.1.2): parameter list with 16-bit `PID | flags` and 16-bit
//! length, `PID_EXTENDED` for ids >= 0x3F00 or long payloads, and
//! `PID_LIST_END` as the sentinel.

use crate::buffer::{ByteReader, ByteWriter, Sink};
use crate::error::{DynamicError, Result};
use crate::types::{MemberId, MEMBER_ID_MASK};

pub(crate) const EM_FLAG_MUST_UNDERSTAND: u32 = 1 << 31;

pub(crate) const PID_FLAG_IMPL_EXTENSION: u16 = 0x8000;
pub(crate) const PID_FLAG_MUST_UNDERSTAND: u16 = 0x4000;
pub(crate) const PID_MASK: u16 = 0x3FFF;
pub(crate) const PID_EXTENDED: u16 = 0x3F01;
pub(crate) const PID_LIST_END: u16 = 0x3F02;
pub(crate) const PID_IGNORE: u16 = 0x3F03;
const SHORT_PID_LIMIT: u32 = 0x3F00;

/// Length code of an EMHEADER1.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum LengthCode {
    Lc1 = 0,
    Lc2 = 1,
    Lc4 = 2,
    Lc8 = 3,
    /// Separate NEXTINT holds the length.
    NextInt = 4,
    /// NEXTINT is part of the payload and counts bytes.
    NextIntBytes = 5,
    /// NEXTINT counts 4-byte elements.
    NextIntWords = 6,
    /// NEXTINT counts 8-byte elements.
    NextIntDwords = 7,
}

impl LengthCode {
    pub(crate) fn for_fixed_size(size: usize) -> Option<Self> {
        match size {
            1 => Some(Self::Lc1),
            2 => Some(Self::Lc2),
            4 => Some(Self::Lc4),
            8 => Some(Self::Lc8),
            _ => None,
        }
    }

    fn from_bits(bits: u32) -> Self {
        match bits & 0x7 {
            0 => Self::Lc1,
            1 => Self::Lc2,
            2 => Self::Lc4,
            3 => Self::Lc8,
            4 => Self::NextInt,
            5 => Self::NextIntBytes,
            6 => Self::NextIntWords,
            _ => Self::NextIntDwords,
        }
    }
}

/// Decoded member header with the payload extent it announces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct MemberHeader {
    pub id: MemberId,
    pub must_understand: bool,
    /// Absolute offset of the first payload byte.
    pub start: usize,
    /// Absolute offset one past the last payload byte.
    pub end: usize,
}

// ---------------------------------------------------------------------------
// XCDR2
// ---------------------------------------------------------------------------

pub(crate) fn write_emheader<S: Sink>(
    w: &mut ByteWriter<S>,
    id: MemberId,
    must_understand: bool,
    lc: LengthCode,
) {
    let mut em = ((lc as u32) << 28) | (id & MEMBER_ID_MASK);
    if must_understand {
        em |= EM_FLAG_MUST_UNDERSTAND;
    }
    w.write_u32(em);
}

/// Read one EMHEADER1 (and NEXTINT when the length code needs it).
pub(crate) fn read_emheader(r: &mut ByteReader<'_>) -> Result<MemberHeader> {
    let at = r.position();
    let em = r.read_u32()?;
    let id = em & MEMBER_ID_MASK;
    let must_understand = em & EM_FLAG_MUST_UNDERSTAND != 0;

    let (start, length) = match LengthCode::from_bits(em >> 28) {
        LengthCode::Lc1 => (r.position(), Some(1)),
        LengthCode::Lc2 => (r.position(), Some(2)),
        LengthCode::Lc4 => (r.position(), Some(4)),
        LengthCode::Lc8 => (r.position(), Some(8)),
        LengthCode::NextInt => {
            let len = r.read_u32()? as usize;
            (r.position(), Some(len))
        }
        lc => {
            let start = r.position();
            let count = r.peek_u32()? as usize;
            let unit = match lc {
                LengthCode::NextIntBytes => 1,
                LengthCode::NextIntWords => 4,
                _ => 8,
            };
            (start, count.checked_mul(unit).and_then(|n| n.checked_add(4)))
        }
    };
    let end = length
        .and_then(|len| start.checked_add(len))
        .filter(|end| *end <= r.len())
        .ok_or_else(|| {
            DynamicError::malformed(at, format!("member {:#x} length exceeds its block", id))
        })?;

    Ok(MemberHeader {
        id,
        must_understand,
        start,
        end,
    })
}

// ---------------------------------------------------------------------------
// XCDR1 parameter list
// ---------------------------------------------------------------------------

/// Write a parameter header for a payload of `size` bytes.
pub(crate) fn write_parameter_header<S: Sink>(
    w: &mut ByteWriter<S>,
    id: MemberId,
    must_understand: bool,
    size: usize,
) -> Result<()> {
    let flag = if must_understand {
        PID_FLAG_MUST_UNDERSTAND
    } else {
        0
    };
    w.align(4);
    if id < SHORT_PID_LIMIT && size <= usize::from(u16::MAX) {
        w.write_u16(flag | id as u16);
        w.write_u16(size as u16);
    } else {
        let size = u32::try_from(size).map_err(|_| DynamicError::BoundExceeded {
            bound: u32::MAX as usize,
            requested: size,
        })?;
        w.write_u16(flag | PID_EXTENDED);
        w.write_u16(8);
        w.write_u32(id);
        w.write_u32(size);
    }
    Ok(())
}

pub(crate) fn write_list_end<S: Sink>(w: &mut ByteWriter<S>) {
    w.align(4);
    w.write_u16(PID_LIST_END);
    w.write_u16(0);
}

/// Read the next parameter header; `None` at the list-end sentinel.
pub(crate) fn read_parameter_header(r: &mut ByteReader<'_>) -> Result<Option<MemberHeader>> {
    loop {
        r.align(4)?;
        let at = r.position();
        let raw = r.read_u16()?;
        let len = r.read_u16()? as usize;
        let must_understand = raw & PID_FLAG_MUST_UNDERSTAND != 0;
        let pid = raw & PID_MASK;

        let (id, start, length) = match pid {
            PID_LIST_END => return Ok(None),
            PID_IGNORE => {
                r.skip(len)?;
                continue;
            }
            PID_EXTENDED => {
                if len < 8 {
                    return Err(DynamicError::malformed(at, "short extended parameter header"));
                }
                let id = r.read_u32()? & MEMBER_ID_MASK;
                let size = r.read_u32()? as usize;
                r.skip(len - 8)?;
                (id, r.position(), size)
            }
            _ if raw & PID_FLAG_IMPL_EXTENSION != 0 => {
                // Vendor-specific parameter, never one of ours.
                r.skip(len)?;
                continue;
            }
            short => (MemberId::from(short), r.position(), len),
        };

        let end = start
            .checked_add(length)
            .filter(|end| *end <= r.len())
            .ok_or_else(|| {
                DynamicError::malformed(at, format!("parameter {:#x} exceeds the buffer", id))
            })?;
        return Ok(Some(MemberHeader {
            id,
            must_understand,
            start,
            end,
        }));
    }
}
