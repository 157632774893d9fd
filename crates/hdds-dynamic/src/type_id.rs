// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! TypeIdentifier and EquivalenceHash (DDS-XTypes v1.3 Sec.7.3.4).
//!
//! Primitive and string types are identified inline by their kind byte
//! (plus a bound for strings). Every other type is identified by a 14-byte
//! MD5 hash of its canonical description, in a minimal or complete flavour.

use crate::buffer::{ByteReader, ByteWriter};
use crate::config::Endianness;
use crate::error::{DynamicError, Result};
use md5::{Digest, Md5};
use std::fmt;

// ---------------------------------------------------------------------------
// Type kind bytes (XTypes Sec.7.3.4.1)
// ---------------------------------------------------------------------------

pub const TK_BOOLEAN: u8 = 0x01;
pub const TK_BYTE: u8 = 0x02;
pub const TK_INT16: u8 = 0x03;
pub const TK_INT32: u8 = 0x04;
pub const TK_INT64: u8 = 0x05;
pub const TK_UINT16: u8 = 0x06;
pub const TK_UINT32: u8 = 0x07;
pub const TK_UINT64: u8 = 0x08;
pub const TK_FLOAT32: u8 = 0x09;
pub const TK_FLOAT64: u8 = 0x0A;
pub const TK_INT8: u8 = 0x0C;
pub const TK_UINT8: u8 = 0x0D;
pub const TK_CHAR8: u8 = 0x10;
pub const TK_CHAR16: u8 = 0x11;
pub const TK_STRING8: u8 = 0x20;
pub const TK_STRING16: u8 = 0x21;
pub const TK_ENUM: u8 = 0x40;
pub const TK_SEQUENCE: u8 = 0x60;
pub const TK_ARRAY: u8 = 0x61;
pub const TK_MAP: u8 = 0x62;
pub const TK_STRUCTURE: u8 = 0x51;
pub const TK_UNION: u8 = 0x52;

pub const TI_STRING8_SMALL: u8 = 0x70;
pub const TI_STRING8_LARGE: u8 = 0x71;
pub const TI_STRING16_SMALL: u8 = 0x72;
pub const TI_STRING16_LARGE: u8 = 0x73;

pub const EK_MINIMAL: u8 = 0xF1;
pub const EK_COMPLETE: u8 = 0xF2;

const PRIMITIVE_KINDS: [u8; 14] = [
    TK_BOOLEAN, TK_BYTE, TK_INT16, TK_INT32, TK_INT64, TK_UINT16, TK_UINT32, TK_UINT64,
    TK_FLOAT32, TK_FLOAT64, TK_INT8, TK_UINT8, TK_CHAR8, TK_CHAR16,
];

// ---------------------------------------------------------------------------
// EquivalenceHash
// ---------------------------------------------------------------------------

/// First 14 bytes of the MD5 digest of a canonical type description.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EquivalenceHash([u8; 14]);

impl EquivalenceHash {
    pub const fn from_bytes(bytes: [u8; 14]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; 14] {
        &self.0
    }

    pub fn compute(data: &[u8]) -> Self {
        let digest = Md5::digest(data);
        let mut bytes = [0u8; 14];
        bytes.copy_from_slice(&digest[..14]);
        Self(bytes)
    }
}

impl fmt::Debug for EquivalenceHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EquivalenceHash({})", self)
    }
}

impl fmt::Display for EquivalenceHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// TypeIdentifier
// ---------------------------------------------------------------------------

/// Content-derived identity of a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeIdentifier {
    /// Primitive identified by its `TK_*` byte.
    Primitive(u8),
    /// String8 with bound < 256 (0 = unbounded).
    StringSmall { bound: u8 },
    StringLarge { bound: u32 },
    WStringSmall { bound: u8 },
    WStringLarge { bound: u32 },
    /// Hash of the minimal description (no names).
    Minimal(EquivalenceHash),
    /// Hash of the complete description.
    Complete(EquivalenceHash),
}

impl TypeIdentifier {
    pub fn string(bound: u32) -> Self {
        match u8::try_from(bound) {
            Ok(bound) => Self::StringSmall { bound },
            Err(_) => Self::StringLarge { bound },
        }
    }

    pub fn wstring(bound: u32) -> Self {
        match u8::try_from(bound) {
            Ok(bound) => Self::WStringSmall { bound },
            Err(_) => Self::WStringLarge { bound },
        }
    }

    /// Discriminator byte of the wire form.
    pub const fn discriminator(&self) -> u8 {
        match self {
            Self::Primitive(kind) => *kind,
            Self::StringSmall { .. } => TI_STRING8_SMALL,
            Self::StringLarge { .. } => TI_STRING8_LARGE,
            Self::WStringSmall { .. } => TI_STRING16_SMALL,
            Self::WStringLarge { .. } => TI_STRING16_LARGE,
            Self::Minimal(_) => EK_MINIMAL,
            Self::Complete(_) => EK_COMPLETE,
        }
    }

    pub const fn is_hash_based(&self) -> bool {
        matches!(self, Self::Minimal(_) | Self::Complete(_))
    }

    pub fn hash(&self) -> Option<&EquivalenceHash> {
        match self {
            Self::Minimal(hash) | Self::Complete(hash) => Some(hash),
            _ => None,
        }
    }

    /// Serialize into an XCDR2 stream.
    pub fn write_to<S: crate::buffer::Sink>(&self, w: &mut ByteWriter<S>) {
        w.write_u8(self.discriminator());
        match self {
            Self::Primitive(_) => {}
            Self::StringSmall { bound } | Self::WStringSmall { bound } => w.write_u8(*bound),
            Self::StringLarge { bound } | Self::WStringLarge { bound } => w.write_u32(*bound),
            Self::Minimal(hash) | Self::Complete(hash) => w.write_bytes(hash.as_bytes()),
        }
    }

    pub fn read_from(r: &mut ByteReader<'_>) -> Result<Self> {
        let at = r.position();
        let discriminator = r.read_u8()?;
        let id = match discriminator {
            TI_STRING8_SMALL => Self::StringSmall { bound: r.read_u8()? },
            TI_STRING8_LARGE => Self::StringLarge { bound: r.read_u32()? },
            TI_STRING16_SMALL => Self::WStringSmall { bound: r.read_u8()? },
            TI_STRING16_LARGE => Self::WStringLarge { bound: r.read_u32()? },
            EK_MINIMAL | EK_COMPLETE => {
                let mut bytes = [0u8; 14];
                bytes.copy_from_slice(r.read_bytes(14)?);
                let hash = EquivalenceHash::from_bytes(bytes);
                if discriminator == EK_MINIMAL {
                    Self::Minimal(hash)
                } else {
                    Self::Complete(hash)
                }
            }
            kind if PRIMITIVE_KINDS.contains(&kind) => Self::Primitive(kind),
            other => {
                return Err(DynamicError::malformed(
                    at,
                    format!("unknown TypeIdentifier discriminator {:#04x}", other),
                ))
            }
        };
        Ok(id)
    }

    /// Little-endian XCDR2 wire form.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut w = ByteWriter::new(Endianness::Little, 4);
        self.write_to(&mut w);
        w.into_bytes()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::read_from(&mut ByteReader::new(bytes, Endianness::Little, 4))
    }
}

impl fmt::Display for TypeIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primitive(kind) => write!(f, "primitive:{:#04x}", kind),
            Self::StringSmall { bound } => write!(f, "string<{}>", bound),
            Self::StringLarge { bound } => write!(f, "string<{}>", bound),
            Self::WStringSmall { bound } => write!(f, "wstring<{}>", bound),
            Self::WStringLarge { bound } => write!(f, "wstring<{}>", bound),
            Self::Minimal(hash) => write!(f, "minimal:{}", hash),
            Self::Complete(hash) => write!(f, "complete:{}", hash),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_truncated_md5() {
        // MD5("") = d41d8cd98f00b204e9800998ecf8427e
        let hash = EquivalenceHash::compute(b"");
        assert_eq!(hash.to_string(), "d41d8cd98f00b204e9800998ecf8");
    }

    #[test]
    fn test_wire_form() {
        assert_eq!(TypeIdentifier::Primitive(TK_INT32).to_bytes(), vec![0x04]);
        assert_eq!(TypeIdentifier::string(64).to_bytes(), vec![0x70, 64]);
        assert_eq!(
            TypeIdentifier::string(1000).to_bytes(),
            vec![0x71, 0, 0, 0, 0xE8, 0x03, 0, 0]
        );

        let hash = EquivalenceHash::from_bytes([7; 14]);
        let bytes = TypeIdentifier::Complete(hash).to_bytes();
        assert_eq!(bytes.len(), 15);
        assert_eq!(bytes[0], EK_COMPLETE);
        assert_eq!(TypeIdentifier::from_bytes(&bytes).unwrap(), TypeIdentifier::Complete(hash));
    }

    #[test]
    fn test_unknown_discriminator_rejected() {
        assert!(matches!(
            TypeIdentifier::from_bytes(&[0xEE]),
            Err(DynamicError::MalformedHeader { offset: 0, .. })
        ));
        assert!(TypeIdentifier::from_bytes(&[EK_MINIMAL, 1, 2]).is_err());
    }
}
