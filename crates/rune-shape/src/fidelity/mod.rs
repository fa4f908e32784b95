//! Diffs an original shape list against a round-tripped one and scores what survived.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::diagnostics::diagnostics_enabled;
use crate::model::{FunctionBinding, Shape, ShapeType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CompareOptions {
    /// Leave `x`, `y`, `width`, `height` and `zIndex` out of the equality check.
    pub ignore_geometry: bool,
    /// Compare only shapes whose `state` is `active`.
    pub active_only: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModifiedShape {
    pub original: Shape,
    pub extracted: Shape,
}

/// Categorized change set plus a score in `[0, 1]`.
///
/// The score is `unchanged / original`, so shapes that only appear in the extracted list
/// never lower it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FidelityReport {
    pub unchanged: Vec<Shape>,
    pub modified: Vec<ModifiedShape>,
    pub added: Vec<Shape>,
    pub removed: Vec<Shape>,
    pub score: f64,
}

impl FidelityReport {
    pub fn is_perfect(&self) -> bool {
        self.modified.is_empty() && self.removed.is_empty()
    }
}

/// The part of a shape that takes part in equality.
#[derive(Debug, PartialEq)]
struct Comparable<'a> {
    id: &'a str,
    kind: ShapeType,
    label: Option<&'a str>,
    function: Option<&'a FunctionBinding>,
    fill: Option<&'a str>,
    border: Option<&'a str>,
    geometry: Option<(i64, i64, i64, i64, i64)>,
}

impl<'a> Comparable<'a> {
    fn of(shape: &'a Shape, options: &CompareOptions) -> Self {
        Self {
            id: &shape.id,
            kind: shape.kind,
            label: shape.label.as_deref(),
            function: shape.function.as_ref(),
            fill: shape.fill.as_deref(),
            border: shape.border.as_deref(),
            geometry: (!options.ignore_geometry)
                .then_some((shape.x, shape.y, shape.width, shape.height, shape.z_index)),
        }
    }
}

/// Equality used by [`compare`].
pub fn shapes_match(a: &Shape, b: &Shape, options: &CompareOptions) -> bool {
    Comparable::of(a, options) == Comparable::of(b, options)
}

pub fn compare(original: &[Shape], extracted: &[Shape], options: &CompareOptions) -> FidelityReport {
    let included = |shape: &&Shape| !options.active_only || shape.state.is_active();
    let original: Vec<&Shape> = original.iter().filter(included).collect();
    let extracted: Vec<&Shape> = extracted.iter().filter(included).collect();

    let extracted_by_id: HashMap<&str, &Shape> = extracted
        .iter()
        .map(|shape| (shape.id.as_str(), *shape))
        .collect();
    let original_ids: HashSet<&str> = original.iter().map(|shape| shape.id.as_str()).collect();

    let mut unchanged = Vec::new();
    let mut modified = Vec::new();
    let mut removed = Vec::new();
    for shape in &original {
        match extracted_by_id.get(shape.id.as_str()) {
            Some(other) if shapes_match(shape, other, options) => unchanged.push((*shape).clone()),
            Some(other) => {
                if diagnostics_enabled("fidelity") {
                    info!(id = %shape.id, "diagnostics: shape modified in round trip");
                }
                modified.push(ModifiedShape {
                    original: (*shape).clone(),
                    extracted: (*other).clone(),
                })
            }
            None => removed.push((*shape).clone()),
        }
    }
    let added: Vec<Shape> = extracted
        .iter()
        .filter(|shape| !original_ids.contains(shape.id.as_str()))
        .map(|shape| (*shape).clone())
        .collect();

    // Vacuous full fidelity: with nothing to lose, extra shapes still do not count.
    let score = if original.is_empty() {
        1.0
    } else {
        unchanged.len() as f64 / original.len() as f64
    };

    debug!(
        unchanged = unchanged.len(),
        modified = modified.len(),
        added = added.len(),
        removed = removed.len(),
        score,
        "fidelity compared"
    );

    FidelityReport {
        unchanged,
        modified,
        added,
        removed,
        score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ShapeState;

    fn shape(id: &str) -> Shape {
        Shape::new(id, ShapeType::Rectangle, 10, 10, 50, 50)
    }

    #[test]
    fn empty_lists_score_one() {
        let report = compare(&[], &[], &CompareOptions::default());
        assert_eq!(report.score, 1.0);
        assert!(report.is_perfect());
    }

    #[test]
    fn fill_difference_is_a_modification() {
        let original = vec![shape("a").with_fill("#ff0000"), shape("b")];
        let extracted = vec![shape("a").with_fill("#00ff00"), shape("b")];
        let report = compare(&original, &extracted, &CompareOptions::default());
        assert_eq!(report.modified.len(), 1);
        assert_eq!(report.modified[0].original.id, "a");
        assert_eq!(report.unchanged.len(), 1);
        assert_eq!(report.score, 0.5);
    }

    #[test]
    fn geometry_counts_unless_ignored() {
        let original = vec![Shape::new("s1", ShapeType::Text, 800, 10, 320, 40).with_label("Title")];
        let extracted = vec![Shape::new("s1", ShapeType::Text, 0, 0, 320, 40).with_label("Title")];
        let strict = compare(&original, &extracted, &CompareOptions::default());
        assert_eq!(strict.modified.len(), 1);
        assert_eq!(strict.score, 0.0);
        let loose = compare(
            &original,
            &extracted,
            &CompareOptions {
                ignore_geometry: true,
                ..CompareOptions::default()
            },
        );
        assert_eq!(loose.unchanged.len(), 1);
        assert_eq!(loose.score, 1.0);
    }

    #[test]
    fn added_shapes_do_not_lower_the_score() {
        let report = compare(
            &[shape("a")],
            &[shape("a"), shape("extra")],
            &CompareOptions::default(),
        );
        assert_eq!(report.added.len(), 1);
        assert_eq!(report.score, 1.0);
    }

    #[test]
    fn empty_original_ignores_added_shapes() {
        let report = compare(&[], &[shape("x")], &CompareOptions::default());
        assert_eq!(report.added.len(), 1);
        assert_eq!(report.score, 1.0);
    }

    #[test]
    fn removed_and_nothing_matching_scores_zero() {
        let report = compare(&[shape("a")], &[shape("z")], &CompareOptions::default());
        assert_eq!(report.removed.len(), 1);
        assert_eq!(report.added.len(), 1);
        assert_eq!(report.score, 0.0);
        assert!(!report.is_perfect());
    }

    #[test]
    fn bookkeeping_fields_are_not_compared() {
        let mut extracted = shape("a");
        extracted.area = 7;
        extracted.text = Some("body".into());
        extracted.created = Some("2024-01-01T00:00:00Z".into());
        let report = compare(&[shape("a")], &[extracted], &CompareOptions::default());
        assert_eq!(report.score, 1.0);
    }

    #[test]
    fn active_only_filters_inactive_shapes() {
        let mut hidden = shape("h");
        hidden.state = ShapeState::Other("archived".into());
        let options = CompareOptions {
            active_only: true,
            ..CompareOptions::default()
        };
        let report = compare(&[shape("a"), hidden], &[shape("a")], &options);
        assert!(report.removed.is_empty());
        assert_eq!(report.score, 1.0);
    }

    #[test]
    fn report_serializes_with_expected_keys() {
        let report = compare(&[shape("a")], &[shape("a")], &CompareOptions::default());
        let json = serde_json::to_value(&report).expect("serialize");
        for key in ["unchanged", "modified", "added", "removed", "score"] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
    }
}
