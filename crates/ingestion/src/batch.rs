//! Batch shape decoding.
//!
//! The API answers with a list of records, a single record, or nothing.
//! Anything else is rejected before any record is produced.

use agrimarket_core::{Error, RawRecord, Result};
use serde_json::Value;

/// Decode a JSON response into raw records.
///
/// - array of objects -> one record per element
/// - object -> one-record batch
/// - `null` or `[]` -> empty batch
/// - scalar, or an array with a non-object element -> `InvalidBatchShape`
pub fn decode_batch(value: &Value) -> Result<Vec<RawRecord>> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Object(object) => Ok(vec![RawRecord::from_json_object(object)]),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| match item {
                Value::Object(object) => Ok(RawRecord::from_json_object(object)),
                other => Err(Error::invalid_batch_shape(format!(
                    "{} at index {i}",
                    describe(other)
                ))),
            })
            .collect(),
        other => Err(Error::invalid_batch_shape(describe(other))),
    }
}

/// Decode JSON text into raw records.
pub fn decode_batch_str(text: &str) -> Result<Vec<RawRecord>> {
    let value: Value = serde_json::from_str(text)?;
    decode_batch(&value)
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
