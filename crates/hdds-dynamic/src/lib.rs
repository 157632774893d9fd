// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! HDDS Dynamic Types
//!
//! Runtime XTypes type model and extensible CDR serialization:
//! - Dynamic types built at runtime and shared through a [`TypeRegistry`]
//! - [`DynamicData`] containers validated against their type
//! - XCDR1 and XCDR2 codec for FINAL, APPENDABLE and MUTABLE types
//! - Structural equality, key ordering and instance key hashes
//! - Field access by path ([`MetaStruct`]) for content filters
//!
//! # Quick Start
//!
//! ```
//! use hdds_dynamic::{
//!     encode_dynamic, decode_dynamic, DynamicData, EncodingConfig, PrimitiveKind,
//!     TypeDescriptorBuilder, TypeRegistry,
//! };
//!
//! let registry = TypeRegistry::new();
//! let sensor = registry.register_type(
//!     &TypeDescriptorBuilder::new("Sensor")
//!         .mutable()
//!         .key_field("id", PrimitiveKind::U32)
//!         .field("celsius", PrimitiveKind::F32)
//!         .build()
//!         .unwrap(),
//! );
//!
//! let mut sample = DynamicData::new(&sensor);
//! sample.set_by_name("id", 7u32).unwrap();
//! sample.set_by_name("celsius", 21.5f32).unwrap();
//!
//! let config = EncodingConfig::xcdr2();
//! let bytes = encode_dynamic(&sample, &config).unwrap();
//! assert_eq!(decode_dynamic(&bytes, &sensor, &config).unwrap(), sample);
//! ```
//!
//! # Representations
//!
//! | Extensibility | XCDR1 | XCDR2 |
//! |---------------|-------|-------|
//! | FINAL | [OK] | [OK] |
//! | APPENDABLE | [OK] (no evolution) | [OK] |
//! | MUTABLE | [OK] (parameter list) | [OK] |

pub mod buffer;
pub mod builder;
pub mod codec;
pub mod compare;
pub mod config;
pub mod data;
pub mod error;
pub mod meta_struct;
pub mod registry;
pub mod resolver;
pub mod type_id;
pub mod type_support;
pub mod types;
pub mod value;

pub use builder::{
    ArrayBuilder, AutoId, EnumBuilder, MapBuilder, SequenceBuilder, TypeDescriptorBuilder,
    UnionBuilder,
};
pub use codec::{
    decode_dynamic, decode_into, decode_key_only, decode_sample, encode_dynamic, encode_sample,
    serialized_size,
};
pub use compare::{equals, key_cmp};
pub use config::{EncodingConfig, Endianness, Representation, UnknownEnumPolicy};
pub use data::DynamicData;
pub use error::{DynamicError, Result};
pub use meta_struct::{FieldValue, MetaStruct};
pub use registry::{RegistryStats, TypeRegistry};
pub use resolver::{check_extensibility, key_paths, KeyPath};
pub use type_id::{EquivalenceHash, TypeIdentifier};
pub use type_support::TypeSupport;
pub use types::{
    DynamicType, Extensibility, MemberDescriptor, MemberId, PrimitiveKind, TypeDescriptor,
    TypeKind, DISCRIMINATOR_ID,
};
pub use value::{FromValue, Value};
