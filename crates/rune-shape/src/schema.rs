use std::sync::OnceLock;

use jsonschema::{Draft, JSONSchema};
use serde_json::Value;

static SHAPE_SCHEMA: OnceLock<JSONSchema> = OnceLock::new();

fn compile_schema(source: &'static str) -> JSONSchema {
    let schema_value: Value =
        serde_json::from_str(source).expect("embedded schema should parse as JSON");
    JSONSchema::options()
        .with_draft(Draft::Draft202012)
        .compile(&schema_value)
        .expect("embedded schema should compile")
}

fn shape_schema() -> &'static JSONSchema {
    SHAPE_SCHEMA.get_or_init(|| compile_schema(include_str!("../schema/shape.schema.json")))
}

/// Checks one raw shape record against the embedded schema. On failure returns every
/// violation joined into one message.
pub fn validate_shape_record(value: &Value) -> Result<(), String> {
    if let Err(errors) = shape_schema().validate(value) {
        let messages: Vec<String> = errors.into_iter().map(|err| err.to_string()).collect();
        return Err(messages.join("; "));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_numeric_string_geometry() {
        let record = json!({"id": "s1", "x": "10", "y": 4, "width": "20.5", "height": 8});
        validate_shape_record(&record).expect("numeric strings are allowed");
    }

    #[test]
    fn rejects_missing_id_and_object_geometry() {
        assert!(validate_shape_record(&json!({"x": 0, "y": 0, "width": 1, "height": 1})).is_err());
        let bad = json!({"id": "s1", "x": {"v": 1}, "y": 0, "width": 1, "height": 1});
        assert!(validate_shape_record(&bad).is_err());
    }
}
