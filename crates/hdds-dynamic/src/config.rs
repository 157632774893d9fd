// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Encoding configuration passed explicitly to every encode/decode call.
//!
//! # Example
//!
//! ```rust
//! use hdds_dynamic::{EncodingConfig, Endianness, Representation};
//!
//! let config = EncodingConfig::default()
//!     .with_representation(Representation::PlainCdr)
//!     .with_endianness(Endianness::Big);
//! assert_eq!(config.max_alignment(), 8);
//! ```

#[cfg(feature = "config-loaders")]
use serde::{Deserialize, Serialize};

/// Environment variable overriding the preferred wire representation.
pub const REPRESENTATION_ENV: &str = "HDDS_DYNAMIC_REPRESENTATION";

/// Wire representation (DDS `DataRepresentationId`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "config-loaders", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config-loaders", serde(rename_all = "snake_case"))]
pub enum Representation {
    /// XCDR1 (PLAIN_CDR / PL_CDR).
    PlainCdr,
    /// XCDR2 (PLAIN_CDR2 / DELIMITED_CDR2 / PL_CDR2).
    #[default]
    Xcdr2,
}

impl Representation {
    /// `XCDR_DATA_REPRESENTATION` / `XCDR2_DATA_REPRESENTATION` values.
    pub const fn id(self) -> i16 {
        match self {
            Self::PlainCdr => 0,
            Self::Xcdr2 => 2,
        }
    }

    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            0 => Some(Self::PlainCdr),
            2 => Some(Self::Xcdr2),
            _ => None,
        }
    }

    /// Largest alignment applied to primitives in this representation.
    pub const fn max_alignment(self) -> usize {
        match self {
            Self::PlainCdr => 8,
            Self::Xcdr2 => 4,
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "xcdr1" | "xcdr" | "plain_cdr" | "cdr" => Some(Self::PlainCdr),
            "xcdr2" | "plain_cdr2" | "cdr2" => Some(Self::Xcdr2),
            _ => None,
        }
    }
}

/// Byte order of a serialized stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "config-loaders", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config-loaders", serde(rename_all = "snake_case"))]
pub enum Endianness {
    #[default]
    Little,
    Big,
}

impl Endianness {
    /// Byte order of the host.
    pub const fn native() -> Self {
        if cfg!(target_endian = "big") {
            Self::Big
        } else {
            Self::Little
        }
    }
}

/// What the decoder does with an enum ordinal that has no declared enumerator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "config-loaders", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config-loaders", serde(rename_all = "snake_case"))]
pub enum UnknownEnumPolicy {
    /// Fail with `InvalidEnumValue`.
    #[default]
    Reject,
    /// Substitute the enum's default literal and keep decoding.
    DefaultLiteral,
}

/// Codec parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "config-loaders", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config-loaders", serde(default))]
pub struct EncodingConfig {
    pub representation: Representation,
    pub endianness: Endianness,
    pub unknown_enum: UnknownEnumPolicy,
}

impl EncodingConfig {
    pub const fn new(representation: Representation, endianness: Endianness) -> Self {
        Self {
            representation,
            endianness,
            unknown_enum: UnknownEnumPolicy::Reject,
        }
    }

    /// XCDR2 little-endian, the representation announced by default.
    pub const fn xcdr2() -> Self {
        Self::new(Representation::Xcdr2, Endianness::Little)
    }

    /// XCDR1 little-endian.
    pub const fn xcdr1() -> Self {
        Self::new(Representation::PlainCdr, Endianness::Little)
    }

    pub fn with_representation(mut self, representation: Representation) -> Self {
        self.representation = representation;
        self
    }

    pub fn with_endianness(mut self, endianness: Endianness) -> Self {
        self.endianness = endianness;
        self
    }

    pub fn with_unknown_enum(mut self, policy: UnknownEnumPolicy) -> Self {
        self.unknown_enum = policy;
        self
    }

    pub const fn max_alignment(&self) -> usize {
        self.representation.max_alignment()
    }

    /// Default configuration with the representation taken from
    /// `HDDS_DYNAMIC_REPRESENTATION` when it is set to a known value.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(value) = std::env::var(REPRESENTATION_ENV) {
            match Representation::parse(&value) {
                Some(representation) => config.representation = representation,
                None => log::debug!(
                    "[config] ignoring unknown {}={}",
                    REPRESENTATION_ENV,
                    value
                ),
            }
        }
        config
    }

    /// Parse a configuration from YAML, missing keys keep their defaults.
    ///
    /// ```yaml
    /// representation: plain_cdr
    /// endianness: big
    /// unknown_enum: default_literal
    /// ```
    #[cfg(feature = "config-loaders")]
    pub fn from_yaml(yaml: &str) -> Result<Self, String> {
        serde_yaml::from_str(yaml).map_err(|e| format!("Failed to parse encoding config: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EncodingConfig::default();
        assert_eq!(config, EncodingConfig::xcdr2());
        assert_eq!(config.max_alignment(), 4);
        assert_eq!(config.unknown_enum, UnknownEnumPolicy::Reject);
    }

    #[test]
    fn test_representation_ids() {
        assert_eq!(Representation::PlainCdr.id(), 0);
        assert_eq!(Representation::Xcdr2.id(), 2);
        assert_eq!(Representation::from_id(2), Some(Representation::Xcdr2));
        assert_eq!(Representation::from_id(1), None);
    }

    #[test]
    fn test_parse_names() {
        assert_eq!(Representation::parse("XCDR1"), Some(Representation::PlainCdr));
        assert_eq!(Representation::parse(" xcdr2 "), Some(Representation::Xcdr2));
        assert_eq!(Representation::parse("json"), None);
    }

    #[cfg(feature = "config-loaders")]
    #[test]
    fn test_from_yaml() {
        let config =
            EncodingConfig::from_yaml("representation: plain_cdr\nendianness: big\n").unwrap();
        assert_eq!(config.representation, Representation::PlainCdr);
        assert_eq!(config.endianness, Endianness::Big);
        assert_eq!(config.unknown_enum, UnknownEnumPolicy::Reject);

        assert!(EncodingConfig::from_yaml("representation: xml").is_err());
    }
}
