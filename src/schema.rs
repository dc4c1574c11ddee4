use serde_json::{Map, Value};

use crate::features::FEATURE_NAMES;
use crate::types::PredictError;

// Presence checks only; value types are handled by vector assembly.

pub fn validate_item(item: &Map<String, Value>) -> Result<(), PredictError> {
    match first_missing_field(item) {
        Some(field) => Err(PredictError::MissingField {
            field,
            in_batch: false,
        }),
        None => Ok(()),
    }
}

pub fn validate_batch(items: &[Value]) -> Result<(), PredictError> {
    for item in items {
        // A non-object item has no keys, so the first canonical field is reported.
        let missing = match item.as_object() {
            Some(map) => first_missing_field(map),
            None => Some(FEATURE_NAMES[0]),
        };
        if let Some(field) = missing {
            return Err(PredictError::MissingField {
                field,
                in_batch: true,
            });
        }
    }
    Ok(())
}

fn first_missing_field(item: &Map<String, Value>) -> Option<&'static str> {
    FEATURE_NAMES
        .iter()
        .find(|name| !item.contains_key(**name))
        .copied()
}
