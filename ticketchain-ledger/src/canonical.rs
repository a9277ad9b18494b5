//! Canonical byte production for hashing.
//!
//! Every producer and verifier of block hashes goes through [`canonical_bytes`]:
//! the value is converted to a JSON tree, non-integer numbers are rejected,
//! and the tree is serialized per RFC 8785 (sorted keys, compact separators).

use serde::Serialize;
use serde_json::Value;

use crate::error::EncodingError;

/// Serializes `value` into its canonical byte form.
pub fn canonical_bytes(value: &impl Serialize) -> Result<Vec<u8>, EncodingError> {
    let tree = serde_json::to_value(value)?;
    reject_floats(&tree)?;
    Ok(serde_jcs::to_vec(&tree)?)
}

fn reject_floats(value: &Value) -> Result<(), EncodingError> {
    match value {
        Value::Null | Value::Bool(_) | Value::String(_) => Ok(()),
        Value::Number(n) => {
            if n.is_f64() {
                return Err(EncodingError::FloatRejected(n.as_f64().unwrap_or(f64::NAN)));
            }
            Ok(())
        }
        Value::Array(items) => items.iter().try_for_each(reject_floats),
        Value::Object(map) => map.values().try_for_each(reject_floats),
    }
}
