//! The row-oriented value model and the write-time coercion policy.
//!
//! Per the design notes, coercion is "a policy function on
//! `(declared_type, incoming_value)` returning `Accept(coerced) | Drop`".
//! `coerce` below is exactly that function: `None` means the caller must
//! clear the row's presence bit for this field rather than fail the write.

use std::collections::BTreeMap;

use crate::schema::FieldType;

/// One cell of a row. Absent keys and `Null` are indistinguishable on the
/// wire; both simply produce no key in a rebuilt row.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    I64(i64),
    U64(u64),
    F64(f64),
    Bool(bool),
    String(String),
    Bytes(Vec<u8>),
    BoolArray(Vec<bool>),
    U64Array(Vec<u64>),
}

/// `name → Value` mapping. Uses `BTreeMap` so iteration order (and thus
/// test fixtures) is deterministic; column order on the wire is governed
/// by the schema, not by this map's iteration order.
pub type Row = BTreeMap<String, Value>;

/// A value coerced to exactly the representation its column codec needs,
/// independent of the original host-facing `Value` variant.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Coerced {
    I64(i64),
    U64(u64),
    /// Already scaled: `round(v * 10^s)`.
    F64Scaled(i64),
    Bool(bool),
    Bytes(Vec<u8>),
    BoolArray(Vec<bool>),
    U64Array(Vec<u64>),
}

/// Implements the §4.3 coercion table. Returns `None` ("Drop") when the
/// value cannot losslessly coerce into `field_type` — overflow, a type
/// mismatch, or (for F64) a non-finite input.
pub(crate) fn coerce(value: &Value, field_type: FieldType, scale: Option<u8>) -> Option<Coerced> {
    match (field_type, value) {
        (FieldType::I64, Value::I64(v)) => Some(Coerced::I64(*v)),
        (FieldType::I64, Value::U64(v)) => i64::try_from(*v).ok().map(Coerced::I64),
        (FieldType::I64, Value::F64(v)) => float_to_i64(*v).map(Coerced::I64),

        (FieldType::U64, Value::U64(v)) => Some(Coerced::U64(*v)),
        (FieldType::U64, Value::I64(v)) => u64::try_from(*v).ok().map(Coerced::U64),
        (FieldType::U64, Value::F64(v)) => float_to_u64(*v).map(Coerced::U64),

        (FieldType::F64, Value::F64(v)) => v.is_finite().then(|| scale_f64(*v, scale.unwrap_or(0))).flatten().map(Coerced::F64Scaled),
        (FieldType::F64, Value::I64(v)) => i64_to_f64_exact(*v).and_then(|f| scale_f64(f, scale.unwrap_or(0))).map(Coerced::F64Scaled),
        (FieldType::F64, Value::U64(v)) => u64_to_f64_exact(*v).and_then(|f| scale_f64(f, scale.unwrap_or(0))).map(Coerced::F64Scaled),

        (FieldType::Bool, Value::Bool(v)) => Some(Coerced::Bool(*v)),

        (FieldType::String, Value::String(v)) => Some(Coerced::Bytes(v.clone().into_bytes())),
        (FieldType::String, Value::Bytes(v)) => Some(Coerced::Bytes(v.clone())),

        (FieldType::ByteArray, Value::Bytes(v)) => Some(Coerced::Bytes(v.clone())),

        (FieldType::BoolArray, Value::BoolArray(v)) => Some(Coerced::BoolArray(v.clone())),
        (FieldType::U64Array, Value::U64Array(v)) => Some(Coerced::U64Array(v.clone())),

        _ => None,
    }
}

/// `v as f64`, but only if the round trip back to `i64` is lossless —
/// "integers are converted exactly" (spec.md §4.3), not merely truncated.
fn i64_to_f64_exact(v: i64) -> Option<f64> {
    let f = v as f64;
    (f as i64 == v).then_some(f)
}

/// `v as f64`, but only if the round trip back to `u64` is lossless.
fn u64_to_f64_exact(v: u64) -> Option<f64> {
    let f = v as f64;
    (f as u64 == v).then_some(f)
}

fn float_to_i64(v: f64) -> Option<i64> {
    if !v.is_finite() {
        return None;
    }
    let truncated = v.trunc();
    if truncated >= -(2f64.powi(63)) && truncated < 2f64.powi(63) {
        Some(truncated as i64)
    } else {
        None
    }
}

fn float_to_u64(v: f64) -> Option<u64> {
    if !v.is_finite() || v < 0.0 {
        return None;
    }
    let truncated = v.trunc();
    if truncated < 2f64.powi(64) {
        Some(truncated as u64)
    } else {
        None
    }
}

/// `round(v * 10^s)`, rejecting results outside `i64` range.
fn scale_f64(v: f64, scale: u8) -> Option<i64> {
    let factor = 10f64.powi(scale as i32);
    let scaled = (v * factor).round();
    if scaled.is_finite() && scaled >= -(2f64.powi(63)) && scaled < 2f64.powi(63) {
        Some(scaled as i64)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn i64_accepts_integer() {
        assert_eq!(coerce(&Value::I64(40), FieldType::I64, None), Some(Coerced::I64(40)));
    }

    #[test]
    fn i64_truncates_float_toward_zero() {
        assert_eq!(coerce(&Value::F64(40.9), FieldType::I64, None), Some(Coerced::I64(40)));
        assert_eq!(coerce(&Value::F64(-40.9), FieldType::I64, None), Some(Coerced::I64(-40)));
    }

    #[test]
    fn u64_rejects_negative() {
        assert_eq!(coerce(&Value::I64(-1), FieldType::U64, None), None);
    }

    #[test]
    fn f64_rejects_non_finite() {
        assert_eq!(coerce(&Value::F64(f64::NAN), FieldType::F64, Some(2)), None);
        assert_eq!(coerce(&Value::F64(f64::INFINITY), FieldType::F64, Some(2)), None);
    }

    #[test]
    fn f64_scale_fixture() {
        // 0.0003 @ scale 7 -> 3000.
        assert_eq!(coerce(&Value::F64(0.0003), FieldType::F64, Some(7)), Some(Coerced::F64Scaled(3000)));
    }

    #[test]
    fn i64_converts_exactly_into_f64() {
        assert_eq!(coerce(&Value::I64(40), FieldType::F64, Some(0)), Some(Coerced::F64Scaled(40)));
    }

    #[test]
    fn i64_too_large_for_exact_f64_drops() {
        // not representable exactly as f64 (loses the low bit).
        let unrepresentable = (1i64 << 53) + 1;
        assert_eq!(coerce(&Value::I64(unrepresentable), FieldType::F64, Some(0)), None);
    }

    #[test]
    fn u64_too_large_for_exact_f64_drops() {
        let unrepresentable = (1u64 << 53) + 1;
        assert_eq!(coerce(&Value::U64(unrepresentable), FieldType::F64, Some(0)), None);
    }

    #[test]
    fn type_mismatch_drops() {
        assert_eq!(coerce(&Value::Bool(true), FieldType::I64, None), None);
        assert_eq!(coerce(&Value::String("x".into()), FieldType::Bool, None), None);
    }
}
