use serde::Serialize;
use serde_json::{Number, Value};

use crate::error::{AuthError, Result};

/// Largest integer a browser represents exactly (`Number.MAX_SAFE_INTEGER`)
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Canonical byte form of a payload: its UTF-8 JSON text
///
/// Object keys keep their insertion order, which is the order a browser
/// produces with `JSON.stringify`. Whole-number floats within the safe
/// integer range are written as integers (`1.0` becomes `1`), again as a
/// browser would. The same function is used at signing and at verification
/// time.
pub fn canonical_bytes<T: Serialize + ?Sized>(payload: &T) -> Result<Vec<u8>> {
    let mut value =
        serde_json::to_value(payload).map_err(|e| AuthError::Serialization(e.to_string()))?;
    normalize_numbers(&mut value);
    serde_json::to_vec(&value).map_err(|e| AuthError::Serialization(e.to_string()))
}

fn normalize_numbers(value: &mut Value) {
    match value {
        Value::Number(n) => {
            if let Some(whole) = whole_float(n) {
                *n = Number::from(whole);
            }
        }
        Value::Array(items) => items.iter_mut().for_each(normalize_numbers),
        Value::Object(fields) => fields.values_mut().for_each(normalize_numbers),
        _ => {}
    }
}

fn whole_float(n: &Number) -> Option<i64> {
    if !n.is_f64() {
        return None;
    }
    let f = n.as_f64()?;
    (f.fract() == 0.0 && f.abs() <= MAX_SAFE_INTEGER).then_some(f as i64)
}
