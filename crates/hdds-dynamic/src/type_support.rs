// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-topic type support over a [`DynamicType`].
//!
//! Bundles what a reader or writer needs from its topic type: identifiers
//! for discovery, the data representations it may announce, sample
//! encode/decode and the 16-byte instance key hash.

use crate::codec::{decode_dynamic, decode_key_only, encode_dynamic};
use crate::config::{EncodingConfig, Endianness, Representation};
use crate::data::DynamicData;
use crate::error::{DynamicError, Result};
use crate::resolver;
use crate::type_id::TypeIdentifier;
use crate::types::{DynamicType, Extensibility};
use md5::{Digest, Md5};
use std::sync::Arc;

/// Length of an instance key hash.
pub const KEY_HASH_LEN: usize = 16;

#[derive(Debug, Clone)]
pub struct TypeSupport {
    ty: Arc<DynamicType>,
    key_count: usize,
    max_extensibility: Extensibility,
}

impl TypeSupport {
    /// Fails when the key layout of `ty` is invalid (key on a union member).
    pub fn new(ty: &Arc<DynamicType>) -> Result<Self> {
        Ok(Self {
            ty: Arc::clone(ty),
            key_count: resolver::key_count(ty)?,
            max_extensibility: resolver::max_extensibility(ty),
        })
    }

    pub fn dynamic_type(&self) -> &Arc<DynamicType> {
        &self.ty
    }

    pub fn name(&self) -> &str {
        self.ty.name()
    }

    /// Number of key fields, nested keys flattened.
    pub fn key_count(&self) -> usize {
        self.key_count
    }

    pub fn has_key(&self) -> bool {
        self.key_count > 0
    }

    pub fn base_extensibility(&self) -> Extensibility {
        self.ty.extensibility()
    }

    /// Most permissive extensibility anywhere in the type graph.
    pub fn max_extensibility(&self) -> Extensibility {
        self.max_extensibility
    }

    /// Representations this type can be published with, preferred first.
    ///
    /// XCDR1 cannot carry APPENDABLE evolution, so it is only offered for
    /// all-FINAL type graphs.
    pub fn allowed_representations(&self) -> Vec<Representation> {
        if self.max_extensibility == Extensibility::Final {
            vec![Representation::Xcdr2, Representation::PlainCdr]
        } else {
            vec![Representation::Xcdr2]
        }
    }

    pub fn minimal_type_identifier(&self) -> TypeIdentifier {
        self.ty.minimal_identifier()
    }

    pub fn complete_type_identifier(&self) -> TypeIdentifier {
        self.ty.type_identifier()
    }

    pub fn create_data(&self) -> DynamicData {
        DynamicData::new(&self.ty)
    }

    pub fn encode(&self, data: &DynamicData, config: &EncodingConfig) -> Result<Vec<u8>> {
        self.check_owned(data)?;
        encode_dynamic(data, config)
    }

    pub fn decode(&self, bytes: &[u8], config: &EncodingConfig) -> Result<DynamicData> {
        decode_dynamic(bytes, &self.ty, config)
    }

    pub fn decode_key_only(&self, bytes: &[u8], config: &EncodingConfig) -> Result<DynamicData> {
        decode_key_only(bytes, &self.ty, config)
    }

    /// Instance key hash of `data`.
    ///
    /// The key members are encoded as big-endian XCDR2; encodings longer
    /// than 16 bytes are replaced by their MD5 digest, shorter ones are
    /// zero-padded. Unkeyed types hash to all zeroes.
    pub fn key_hash(&self, data: &DynamicData) -> Result<[u8; KEY_HASH_LEN]> {
        self.check_owned(data)?;
        let mut hash = [0u8; KEY_HASH_LEN];
        if !self.has_key() {
            return Ok(hash);
        }

        let mut key = data.clone();
        key.set_key_only(true);
        let config = EncodingConfig::xcdr2().with_endianness(Endianness::Big);
        let bytes = encode_dynamic(&key, &config)?;

        if bytes.len() > KEY_HASH_LEN {
            hash.copy_from_slice(&Md5::digest(&bytes));
        } else {
            hash[..bytes.len()].copy_from_slice(&bytes);
        }
        Ok(hash)
    }

    fn check_owned(&self, data: &DynamicData) -> Result<()> {
        let ty = data.dynamic_type();
        if Arc::ptr_eq(ty, &self.ty) || ty.type_identifier() == self.ty.type_identifier() {
            Ok(())
        } else {
            Err(DynamicError::mismatch(self.ty.name(), ty.name()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::TypeDescriptorBuilder;
    use crate::types::PrimitiveKind;

    fn sensor() -> Arc<DynamicType> {
        TypeDescriptorBuilder::new("Sensor")
            .key_field("id", PrimitiveKind::U32)
            .field("value", PrimitiveKind::F32)
            .build()
            .unwrap()
    }

    #[test]
    fn test_type_information() {
        let support = TypeSupport::new(&sensor()).unwrap();
        assert_eq!(support.name(), "Sensor");
        assert_eq!(support.key_count(), 1);
        assert_eq!(support.base_extensibility(), Extensibility::Final);
        assert_eq!(
            support.allowed_representations(),
            vec![Representation::Xcdr2, Representation::PlainCdr]
        );
        assert!(support.complete_type_identifier().is_hash_based());
        assert_ne!(
            support.minimal_type_identifier(),
            support.complete_type_identifier()
        );

        let nested = TypeDescriptorBuilder::new("Outer")
            .field_with_type(
                "inner",
                TypeDescriptorBuilder::new("Inner")
                    .appendable()
                    .field("x", PrimitiveKind::I16)
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap();
        let support = TypeSupport::new(&nested).unwrap();
        assert_eq!(support.base_extensibility(), Extensibility::Final);
        assert_eq!(support.max_extensibility(), Extensibility::Appendable);
        assert_eq!(support.allowed_representations(), vec![Representation::Xcdr2]);
    }

    #[test]
    fn test_short_key_hash_is_padded_encoding() {
        let support = TypeSupport::new(&sensor()).unwrap();
        let mut data = support.create_data();
        data.set(0, 0x0A0B_0C0Du32).unwrap();
        data.set(1, 1.5f32).unwrap();

        let hash = support.key_hash(&data).unwrap();
        let mut expected = [0u8; 16];
        expected[..4].copy_from_slice(&[0x0A, 0x0B, 0x0C, 0x0D]);
        assert_eq!(hash, expected);

        // Non-key members do not change the hash.
        data.set(1, -7.0f32).unwrap();
        assert_eq!(support.key_hash(&data).unwrap(), expected);
    }

    #[test]
    fn test_long_key_hash_is_md5() {
        let ty = TypeDescriptorBuilder::new("Named")
            .key_field("name", PrimitiveKind::String { max_length: None })
            .build()
            .unwrap();
        let support = TypeSupport::new(&ty).unwrap();
        let mut data = support.create_data();
        data.set(0, "a rather long instance name").unwrap();

        let key = {
            let mut key = data.clone();
            key.set_key_only(true);
            encode_dynamic(&key, &EncodingConfig::xcdr2().with_endianness(Endianness::Big)).unwrap()
        };
        assert!(key.len() > KEY_HASH_LEN);
        let digest = Md5::digest(&key);
        assert_eq!(support.key_hash(&data).unwrap()[..], digest[..]);
    }

    #[test]
    fn test_unkeyed_and_foreign_samples() {
        let ty = TypeDescriptorBuilder::new("Plain")
            .field("v", PrimitiveKind::U8)
            .build()
            .unwrap();
        let support = TypeSupport::new(&ty).unwrap();
        assert_eq!(support.key_hash(&support.create_data()).unwrap(), [0u8; 16]);

        let foreign = DynamicData::new(&sensor());
        assert!(matches!(
            support.encode(&foreign, &EncodingConfig::default()),
            Err(DynamicError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_encode_decode() {
        let support = TypeSupport::new(&sensor()).unwrap();
        let mut data = support.create_data();
        data.set(0, 5u32).unwrap();
        data.set(1, 0.25f32).unwrap();
        let config = EncodingConfig::xcdr1();
        let bytes = support.encode(&data, &config).unwrap();
        assert_eq!(support.decode(&bytes, &config).unwrap(), data);

        let mut key = data.clone();
        key.set_key_only(true);
        let bytes = support.encode(&key, &config).unwrap();
        assert_eq!(bytes.len(), 4);
        let key = support.decode_key_only(&bytes, &config).unwrap();
        assert!(key.is_key_only());
        assert!(!key.is_set(1));
        assert_eq!(key.get::<u32>(0).unwrap(), 5);
    }
}
