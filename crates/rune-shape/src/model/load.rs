use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{
    ClassificationWarning, Outcome, ParseError, Result, ShapeError, ValidationError, WarningKind,
};
use crate::schema::validate_shape_record;

use super::{
    FunctionBinding, Shape, ShapeState, ShapeType, VectorFromCenter,
    color::{is_transparent, normalize_color},
    truncate_label, validate::validate_shapes,
};

/// Wire form of a shape record: geometry may be numeric strings, colors may be any
/// accepted color syntax, type may be any spelling.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawShape {
    id: String,
    #[serde(rename = "type", default)]
    kind: Option<String>,
    x: Value,
    y: Value,
    width: Value,
    height: Value,
    #[serde(default)]
    z_index: Option<Value>,
    #[serde(default)]
    vector_from_center: Option<VectorFromCenter>,
    #[serde(default)]
    fill: Option<String>,
    #[serde(default)]
    border: Option<String>,
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    function: Option<String>,
    #[serde(default)]
    source_data: Option<Value>,
    #[serde(default)]
    area: Option<u32>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    created: Option<String>,
    #[serde(default)]
    updated: Option<String>,
}

impl TryFrom<RawShape> for Shape {
    type Error = ValidationError;

    fn try_from(raw: RawShape) -> std::result::Result<Self, Self::Error> {
        let shape = Shape {
            x: integer_field("x", &raw.x)?,
            y: integer_field("y", &raw.y)?,
            width: integer_field("width", &raw.width)?,
            height: integer_field("height", &raw.height)?,
            z_index: match &raw.z_index {
                Some(value) => integer_field("zIndex", value)?,
                None => 0,
            },
            kind: raw
                .kind
                .as_deref()
                .map(ShapeType::parse)
                .unwrap_or_default(),
            vector_from_center: raw.vector_from_center,
            fill: color_field("fill", raw.fill)?,
            border: color_field("border", raw.border)?,
            label: raw
                .label
                .as_deref()
                .map(truncate_label)
                .filter(|l| !l.is_empty()),
            text: raw.text.filter(|t| !t.trim().is_empty()),
            function: raw.function.as_deref().and_then(FunctionBinding::parse),
            source_data: raw.source_data.filter(|v| !v.is_null()),
            area: raw.area.unwrap_or(1),
            state: raw.state.map(ShapeState::from).unwrap_or_default(),
            created: raw.created,
            updated: raw.updated,
            id: raw.id,
        };
        shape.validate()?;
        Ok(shape)
    }
}

/// Accepts a JSON number or numeric string, rounding to the nearest integer.
fn integer_field(field: &'static str, value: &Value) -> std::result::Result<i64, ValidationError> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match number {
        Some(n) if n.is_finite() => Ok(n.round() as i64),
        Some(n) => Err(ValidationError::new(field, n, "must be finite")),
        None => Err(ValidationError::new(
            field,
            value,
            "expected a number or numeric string",
        )),
    }
}

fn color_field(
    field: &'static str,
    value: Option<String>,
) -> std::result::Result<Option<String>, ValidationError> {
    match value {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() || is_transparent(&raw) => Ok(None),
        Some(raw) => normalize_color(&raw).map(Some).ok_or_else(|| {
            ValidationError::new(field, raw, "not a hex, rgb() or rgba() color")
        }),
    }
}

/// Loads a shape list from JSON text. Non-JSON or non-array input fails the call; bad
/// records are skipped with a warning.
pub fn load_shapes(json: &str) -> std::result::Result<Outcome<Vec<Shape>>, ParseError> {
    let value: Value = serde_json::from_str(json)?;
    shapes_from_value(value)
}

pub fn shapes_from_value(value: Value) -> std::result::Result<Outcome<Vec<Shape>>, ParseError> {
    let items = match value {
        Value::Array(items) => items,
        other => {
            return Err(ParseError::NotAnArray {
                found: json_kind(&other),
            });
        }
    };
    let mut warnings = Vec::new();
    let mut shapes = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        let subject = item
            .get("id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("#{index}"));
        if let Err(message) = validate_shape_record(&item) {
            warn!(record = %subject, %message, "shape record failed schema check");
            warnings.push(ClassificationWarning::new(
                WarningKind::SchemaViolation,
                subject,
                message,
            ));
            continue;
        }
        let converted = serde_json::from_value::<RawShape>(item)
            .map_err(|err| err.to_string())
            .and_then(|raw| Shape::try_from(raw).map_err(|err| err.to_string()));
        match converted {
            Ok(shape) => shapes.push(shape),
            Err(message) => {
                warn!(record = %subject, %message, "skipping malformed shape record");
                warnings.push(ClassificationWarning::new(
                    WarningKind::SkippedShape,
                    subject,
                    message,
                ));
            }
        }
    }
    let validated = validate_shapes(shapes);
    warnings.extend(validated.warnings);
    debug!(
        loaded = validated.value.len(),
        skipped = warnings.len(),
        "loaded shape list"
    );
    Ok(Outcome::new(validated.value, warnings))
}

pub fn load_shapes_file(path: &Path) -> Result<Outcome<Vec<Shape>>> {
    let json = std::fs::read_to_string(path)?;
    load_shapes(&json).map_err(ShapeError::from)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
