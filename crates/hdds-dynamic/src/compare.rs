// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Structural equality and key ordering of DynamicData.

use crate::data::DynamicData;
use crate::error::{DynamicError, Result};
use crate::resolver::key_paths;
use crate::types::{DynamicType, MemberId, DISCRIMINATOR_ID};
use crate::value::Value;
use std::cmp::Ordering;
use std::sync::Arc;

/// Identifier-equal, or structurally equal descriptors.
fn same_type(a: &Arc<DynamicType>, b: &Arc<DynamicType>) -> bool {
    Arc::ptr_eq(a, b)
        || a.type_identifier() == b.type_identifier()
        || a.descriptor() == b.descriptor()
}

/// Deep equality: same type, every member equal in declared order, absent
/// only matching absent. Floats compare bit-wise.
pub fn equals(a: &DynamicData, b: &DynamicData) -> bool {
    let ty = a.dynamic_type();
    if !same_type(ty, b.dynamic_type()) {
        return false;
    }
    if ty.union_descriptor().is_some()
        && !optional_equal(slot(a, DISCRIMINATOR_ID), slot(b, DISCRIMINATOR_ID))
    {
        return false;
    }
    ty.members()
        .iter()
        .all(|m| optional_equal(slot(a, m.id), slot(b, m.id)))
}

fn slot(data: &DynamicData, id: MemberId) -> Option<&Value> {
    data.get_value(id).ok()
}

fn optional_equal(a: Option<&Value>, b: Option<&Value>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => values_equal(a, b),
        (None, None) => true,
        _ => false,
    }
}

/// Value equality; backs `PartialEq for Value`.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    use Value::*;
    match (a, b) {
        (Bool(x), Bool(y)) => x == y,
        (Byte(x), Byte(y)) | (U8(x), U8(y)) => x == y,
        (U16(x), U16(y)) => x == y,
        (U32(x), U32(y)) => x == y,
        (U64(x), U64(y)) => x == y,
        (I8(x), I8(y)) => x == y,
        (I16(x), I16(y)) => x == y,
        (I32(x), I32(y)) | (Enum(x), Enum(y)) => x == y,
        (I64(x), I64(y)) => x == y,
        (F32(x), F32(y)) => x.to_bits() == y.to_bits(),
        (F64(x), F64(y)) => x.to_bits() == y.to_bits(),
        (Char(x), Char(y)) | (WChar(x), WChar(y)) => x == y,
        (String(x), String(y)) | (WString(x), WString(y)) => x == y,
        (Data(x), Data(y)) => equals(x, y),
        (Sequence(x), Sequence(y)) | (Array(x), Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(x, y)| values_equal(x, y))
        }
        // Entry order is not significant; keys are unique.
        (Map(x), Map(y)) => {
            x.len() == y.len()
                && x.iter().all(|(k, v)| {
                    y.iter()
                        .any(|(k2, v2)| values_equal(k, k2) && values_equal(v, v2))
                })
        }
        _ => false,
    }
}

/// Order two samples of the same type by their key fields, lexicographically
/// in key declaration order.
pub fn key_cmp(a: &DynamicData, b: &DynamicData) -> Result<Ordering> {
    if !same_type(a.dynamic_type(), b.dynamic_type()) {
        return Err(DynamicError::mismatch(a.type_name(), b.type_name()));
    }
    for path in key_paths(a.dynamic_type())? {
        let ordering = compare_values(value_at(a, path.ids())?, value_at(b, path.ids())?);
        if ordering != Ordering::Equal {
            return Ok(ordering);
        }
    }
    Ok(Ordering::Equal)
}

/// Value reached by following `ids` through nested containers.
pub(crate) fn value_at<'d>(data: &'d DynamicData, ids: &[MemberId]) -> Result<&'d Value> {
    let (first, rest) = ids
        .split_first()
        .ok_or_else(|| DynamicError::MemberNotFound(format!("{}: empty path", data.type_name())))?;
    let value = data.get_value(*first)?;
    if rest.is_empty() {
        return Ok(value);
    }
    match value {
        Value::Data(nested) => value_at(nested, rest),
        other => Err(DynamicError::mismatch("data", other.tag())),
    }
}

/// Total order over values of the same declared type. Floats use IEEE
/// total ordering; collections compare lexicographically.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    use Value::*;
    match (a, b) {
        (F32(x), F32(y)) => x.total_cmp(y),
        (F64(x), F64(y)) => x.total_cmp(y),
        (Bool(x), Bool(y)) => x.cmp(y),
        (String(x), String(y)) | (WString(x), WString(y)) => x.cmp(y),
        (Sequence(x), Sequence(y)) | (Array(x), Array(y)) => x
            .iter()
            .zip(y)
            .map(|(x, y)| compare_values(x, y))
            .find(|o| *o != Ordering::Equal)
            .unwrap_or_else(|| x.len().cmp(&y.len())),
        (Map(x), Map(y)) => by_key(x)
            .into_iter()
            .zip(by_key(y))
            .map(|((kx, vx), (ky, vy))| compare_values(kx, ky).then_with(|| compare_values(vx, vy)))
            .find(|o| *o != Ordering::Equal)
            .unwrap_or_else(|| x.len().cmp(&y.len())),
        (Data(x), Data(y)) => compare_data(x, y),
        _ => match (integral(a), integral(b)) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => Ordering::Equal,
        },
    }
}

/// Map entries in key order, insertion order being insignificant.
fn by_key(entries: &[(Value, Value)]) -> Vec<&(Value, Value)> {
    let mut sorted: Vec<_> = entries.iter().collect();
    sorted.sort_by(|(a, _), (b, _)| compare_values(a, b));
    sorted
}

/// Member-wise ordering in declared order; absent sorts first.
fn compare_data(a: &DynamicData, b: &DynamicData) -> Ordering {
    let ty = a.dynamic_type();
    let mut ids: Vec<_> = ty.members().iter().map(|m| m.id).collect();
    if ty.union_descriptor().is_some() {
        ids.insert(0, DISCRIMINATOR_ID);
    }
    ids.into_iter()
        .map(|id| match (slot(a, id), slot(b, id)) {
            (Some(x), Some(y)) => compare_values(x, y),
            (x, y) => x.is_some().cmp(&y.is_some()),
        })
        .find(|o| *o != Ordering::Equal)
        .unwrap_or(Ordering::Equal)
}

fn integral(v: &Value) -> Option<i128> {
    match v {
        Value::U64(x) => Some(i128::from(*x)),
        other => other.as_label().map(i128::from),
    }
}
