// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error taxonomy shared by the type model, the data container and the codec.

use crate::type_id::TypeIdentifier;
use crate::types::{Extensibility, MemberId};
use thiserror::Error;

/// Errors returned by dynamic type and data operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DynamicError {
    /// A value's tag does not match the declared type of its slot.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    /// No member with that id or name exists in the type.
    #[error("member not found: {0}")]
    MemberNotFound(String),

    /// The member exists but is not populated.
    #[error("member {0:#x} is not set")]
    MemberNotSet(MemberId),

    /// A sequence, array, map or string bound was exceeded.
    #[error("bound exceeded: {requested} exceeds bound {bound}")]
    BoundExceeded { bound: usize, requested: usize },

    /// A non-optional member is absent when encoding.
    #[error("{type_name}: required member '{member}' is not set")]
    MissingRequiredMember { type_name: String, member: String },

    /// A must-understand member id unknown to the local type was received.
    #[error("unknown must-understand member {0:#x}")]
    UnknownRequiredMember(MemberId),

    /// An enum ordinal that is not one of the declared enumerators.
    #[error("{type_name}: invalid enum value {value}")]
    InvalidEnumValue { type_name: String, value: i32 },

    /// Framing or content that cannot be parsed (includes truncated input).
    #[error("malformed header at offset {offset}: {reason}")]
    MalformedHeader { offset: usize, reason: String },

    /// A union member is keyed without its discriminator being a key.
    #[error("union '{0}' has key members but its discriminator is not a key")]
    NoKeyAnnotationOnUnion(String),

    /// Two types are not assignable because their extensibility kinds differ.
    #[error("incompatible extensibility for '{type_name}': writer {writer:?}, reader {reader:?}")]
    IncompatibleExtensibility {
        type_name: String,
        writer: Extensibility,
        reader: Extensibility,
    },

    /// Registry lookup miss.
    #[error("type not found: {0}")]
    TypeNotFound(TypeIdentifier),

    /// Two members of one type share an id.
    #[error("{type_name}: duplicate member id {id:#x}")]
    DuplicateMemberId { type_name: String, id: MemberId },

    /// A descriptor that cannot be materialized into a type.
    #[error("invalid type: {0}")]
    InvalidType(String),
}

impl DynamicError {
    pub(crate) fn malformed(offset: usize, reason: impl Into<String>) -> Self {
        Self::MalformedHeader {
            offset,
            reason: reason.into(),
        }
    }

    pub(crate) fn mismatch(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            found: found.into(),
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, DynamicError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_carries_context() {
        let err = DynamicError::malformed(12, "delimiter exceeds buffer");
        assert_eq!(
            err.to_string(),
            "malformed header at offset 12: delimiter exceeds buffer"
        );

        let err = DynamicError::MemberNotSet(0x2a);
        assert_eq!(err.to_string(), "member 0x2a is not set");
    }
}
