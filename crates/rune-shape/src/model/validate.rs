use std::collections::HashSet;

use chrono::DateTime;
use tracing::warn;

use crate::error::{ClassificationWarning, Outcome, ValidationError, WarningKind};

use super::{LABEL_MAX_CHARS, Shape, color::normalize_color};

impl Shape {
    /// Checks a single record. Does not modify it.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.trim().is_empty() {
            return Err(ValidationError::new("id", &self.id, "must not be empty"));
        }
        if self.width <= 0 {
            return Err(ValidationError::new("width", self.width, "must be positive"));
        }
        if self.height <= 0 {
            return Err(ValidationError::new("height", self.height, "must be positive"));
        }
        if let Some(label) = &self.label {
            if label.chars().count() > LABEL_MAX_CHARS {
                return Err(ValidationError::new(
                    "label",
                    label,
                    format!("longer than {LABEL_MAX_CHARS} characters"),
                ));
            }
        }
        check_color("fill", self.fill.as_deref())?;
        check_color("border", self.border.as_deref())?;
        check_timestamp("created", self.created.as_deref())?;
        check_timestamp("updated", self.updated.as_deref())?;
        Ok(())
    }
}

fn check_color(field: &'static str, value: Option<&str>) -> Result<(), ValidationError> {
    let Some(raw) = value else {
        return Ok(());
    };
    match normalize_color(raw) {
        Some(normalized) if normalized == raw => Ok(()),
        Some(normalized) => Err(ValidationError::new(
            field,
            raw,
            format!("not normalized, expected `{normalized}`"),
        )),
        None => Err(ValidationError::new(
            field,
            raw,
            "not a visible hex, rgb() or rgba() color",
        )),
    }
}

fn check_timestamp(field: &'static str, value: Option<&str>) -> Result<(), ValidationError> {
    match value {
        Some(raw) if DateTime::parse_from_rfc3339(raw).is_err() => Err(ValidationError::new(
            field,
            raw,
            "not an ISO-8601 / RFC 3339 timestamp",
        )),
        _ => Ok(()),
    }
}

/// Keeps valid shapes with unique ids, in input order. Invalid or duplicate records are
/// dropped with a warning. Already-valid lists come back unchanged.
pub fn validate_shapes(shapes: Vec<Shape>) -> Outcome<Vec<Shape>> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut kept = Vec::with_capacity(shapes.len());
    let mut warnings = Vec::new();
    for shape in shapes {
        if let Err(err) = shape.validate() {
            warn!(id = %shape.id, field = err.field, value = %err.value, "skipping invalid shape");
            warnings.push(ClassificationWarning::new(
                WarningKind::SkippedShape,
                shape.id.clone(),
                err.to_string(),
            ));
            continue;
        }
        if !seen.insert(shape.id.clone()) {
            warn!(id = %shape.id, "skipping shape with duplicate id");
            warnings.push(ClassificationWarning::new(
                WarningKind::DuplicateId,
                shape.id.clone(),
                "id already used earlier in the list",
            ));
            continue;
        }
        kept.push(shape);
    }
    Outcome::new(kept, warnings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ShapeType;

    fn sample() -> Vec<Shape> {
        vec![
            Shape::new("a", ShapeType::Text, 0, 0, 100, 20).with_label("Title"),
            Shape::new("b", ShapeType::Button, 10, 10, 80, 30).with_fill("#ff0000"),
        ]
    }

    #[test]
    fn validation_is_idempotent() {
        let first = validate_shapes(sample());
        assert!(first.warnings.is_empty());
        let second = validate_shapes(first.value.clone());
        assert_eq!(first.value, second.value);
        assert_eq!(second.value, sample());
    }

    #[test]
    fn rejects_non_positive_dimensions() {
        let err = Shape::new("z", ShapeType::Rectangle, 0, 0, 0, 10)
            .validate()
            .expect_err("zero width");
        assert_eq!(err.field, "width");
        assert_eq!(err.value, "0");
    }

    #[test]
    fn rejects_unnormalized_colors() {
        let err = Shape::new("c", ShapeType::Rectangle, 0, 0, 10, 10)
            .with_fill("#FF0000")
            .validate()
            .expect_err("uppercase hex");
        assert_eq!(err.field, "fill");

        let err = Shape::new("c", ShapeType::Rectangle, 0, 0, 10, 10)
            .with_border("tomato")
            .validate()
            .expect_err("named color");
        assert_eq!(err.field, "border");
    }

    #[test]
    fn rejects_malformed_timestamps() {
        let mut shape = Shape::new("t", ShapeType::Rectangle, 0, 0, 10, 10);
        shape.created = Some("2024-01-01T10:00:00Z".into());
        assert!(shape.validate().is_ok());
        shape.updated = Some("yesterday".into());
        assert_eq!(shape.validate().expect_err("bad stamp").field, "updated");
    }

    #[test]
    fn drops_duplicates_and_invalid_records_with_warnings() {
        let mut shapes = sample();
        shapes.push(Shape::new("a", ShapeType::Text, 0, 0, 5, 5));
        shapes.push(Shape::new("neg", ShapeType::Text, 0, 0, 5, -1));
        let outcome = validate_shapes(shapes);
        assert_eq!(outcome.value.len(), 2);
        let kinds: Vec<_> = outcome.warnings.iter().map(|w| w.kind).collect();
        assert_eq!(kinds, vec![WarningKind::DuplicateId, WarningKind::SkippedShape]);
    }
}
