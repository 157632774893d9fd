// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Concurrent registry of dynamic types keyed by TypeIdentifier.
//!
//! Registration is first-writer-wins: when several threads register the
//! same structural type at once, exactly one `Arc<DynamicType>` is published
//! and every caller gets that instance back. Published types are immutable,
//! so lookups hand out clones of the `Arc` without further locking.

use crate::error::{DynamicError, Result};
use crate::type_id::TypeIdentifier;
use crate::types::{DynamicType, TypeDescriptor, TypeKind};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::Arc;

/// Registration and lookup counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RegistryStats {
    /// Types published by this registry.
    pub registrations: u64,
    /// Registrations that found an equal type already published.
    pub reuses: u64,
    pub lookups: u64,
    pub misses: u64,
}

/// Shared store of registered types.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    types: DashMap<TypeIdentifier, Arc<DynamicType>>,
    /// Minimal identifier -> complete identifier of the first type seen.
    minimal: DashMap<TypeIdentifier, TypeIdentifier>,
    by_name: DashMap<String, TypeIdentifier>,
    stats: RwLock<RegistryStats>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Materialize `descriptor` and register it; idempotent for equal types.
    pub fn register(&self, descriptor: TypeDescriptor) -> Result<TypeIdentifier> {
        let ty = DynamicType::new(descriptor)?;
        Ok(self.register_type(&ty).type_identifier())
    }

    /// Register an already built type (and the types nested in it).
    ///
    /// Returns the published instance, which is `ty` itself unless an equal
    /// type was registered first.
    pub fn register_type(&self, ty: &Arc<DynamicType>) -> Arc<DynamicType> {
        for nested in nested_types(ty) {
            if nested.type_identifier().is_hash_based() {
                self.register_type(nested);
            }
        }

        let id = ty.type_identifier();
        let published = match self.types.entry(id) {
            Entry::Occupied(existing) => {
                self.stats.write().reuses += 1;
                return Arc::clone(existing.get());
            }
            Entry::Vacant(slot) => Arc::clone(slot.insert(Arc::clone(ty)).value()),
        };

        self.minimal.entry(ty.minimal_identifier()).or_insert(id);
        self.by_name.entry(ty.name().to_string()).or_insert(id);
        self.stats.write().registrations += 1;
        log::debug!("[registry] registered {} as {}", ty.name(), id);
        published
    }

    /// Type registered under `id` (complete or minimal identifier).
    pub fn lookup(&self, id: &TypeIdentifier) -> Result<Arc<DynamicType>> {
        self.stats.write().lookups += 1;
        let complete = match id {
            TypeIdentifier::Minimal(_) => self.minimal.get(id).map(|c| *c.value()),
            _ => Some(*id),
        };
        match complete.and_then(|c| self.types.get(&c).map(|t| Arc::clone(t.value()))) {
            Some(ty) => Ok(ty),
            None => {
                self.stats.write().misses += 1;
                Err(DynamicError::TypeNotFound(*id))
            }
        }
    }

    /// First type registered under `name`.
    pub fn lookup_by_name(&self, name: &str) -> Option<Arc<DynamicType>> {
        let id = *self.by_name.get(name)?.value();
        self.lookup(&id).ok()
    }

    pub fn contains(&self, id: &TypeIdentifier) -> bool {
        self.types.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Registered (identifier, descriptor) pairs for announcement, ordered
    /// by type name.
    pub fn snapshot(&self) -> Vec<(TypeIdentifier, TypeDescriptor)> {
        let mut entries: Vec<_> = self
            .types
            .iter()
            .map(|e| (*e.key(), e.value().descriptor().clone()))
            .collect();
        entries.sort_by(|a, b| a.1.name.cmp(&b.1.name));
        entries
    }

    pub fn stats(&self) -> RegistryStats {
        *self.stats.read()
    }
}

/// Types directly referenced by `ty`.
fn nested_types(ty: &DynamicType) -> Vec<&Arc<DynamicType>> {
    match ty.kind() {
        TypeKind::Primitive(_) | TypeKind::Enum(_) => Vec::new(),
        TypeKind::Struct(members) => members.iter().map(|m| &m.member_type).collect(),
        TypeKind::Union(u) => std::iter::once(&u.discriminator)
            .chain(u.members.iter().map(|m| &m.member_type))
            .collect(),
        TypeKind::Sequence(s) => vec![&s.element_type],
        TypeKind::Array(a) => vec![&a.element_type],
        TypeKind::Map(m) => vec![&m.key_type, &m.value_type],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{EnumBuilder, TypeDescriptorBuilder};
    use crate::types::PrimitiveKind;

    fn sensor() -> TypeDescriptorBuilder {
        TypeDescriptorBuilder::new("Sensor")
            .key_field("id", PrimitiveKind::U32)
            .field("value", PrimitiveKind::F32)
    }

    #[test]
    fn test_register_is_idempotent() {
        let registry = TypeRegistry::new();
        let first = registry.register(sensor().build_descriptor()).unwrap();
        let second = registry.register(sensor().build_descriptor()).unwrap();
        assert_eq!(first, second);
        assert_eq!(registry.len(), 1);
        assert_eq!(
            registry.stats(),
            RegistryStats {
                registrations: 1,
                reuses: 1,
                lookups: 0,
                misses: 0
            }
        );
    }

    #[test]
    fn test_winner_is_reused() {
        let registry = TypeRegistry::new();
        let a = sensor().build().unwrap();
        let b = sensor().build().unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        let published_a = registry.register_type(&a);
        let published_b = registry.register_type(&b);
        assert!(Arc::ptr_eq(&published_a, &a));
        assert!(Arc::ptr_eq(&published_b, &a));
    }

    #[test]
    fn test_nested_types_registered() {
        let registry = TypeRegistry::new();
        let mode = EnumBuilder::new("Mode").literal("ON").literal("OFF").build().unwrap();
        let outer = sensor()
            .field_with_type("mode", mode.clone())
            .build()
            .unwrap();
        registry.register_type(&outer);
        assert!(registry.contains(&mode.type_identifier()));
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.lookup_by_name("Mode").unwrap().type_identifier(), mode.type_identifier());

        let names: Vec<_> = registry
            .snapshot()
            .into_iter()
            .map(|(_, desc)| desc.name)
            .collect();
        assert_eq!(names, vec!["Mode", "Sensor"]);
    }

    #[test]
    fn test_lookup_by_minimal_identifier() {
        let registry = TypeRegistry::new();
        let ty = sensor().build().unwrap();
        registry.register_type(&ty);
        let found = registry.lookup(&ty.minimal_identifier()).unwrap();
        assert!(Arc::ptr_eq(&found, &ty));
    }

    #[test]
    fn test_lookup_miss() {
        let registry = TypeRegistry::new();
        let id = sensor().build().unwrap().type_identifier();
        assert_eq!(registry.lookup(&id).unwrap_err(), DynamicError::TypeNotFound(id));
        assert_eq!(registry.stats().misses, 1);
        assert!(registry.lookup_by_name("Sensor").is_none());
    }
}
