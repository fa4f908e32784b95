//! Reconstructs a shape list from a rendered structure ("packing"), the inverse of
//! [`crate::codegen`].

mod boxes;
pub mod html;
mod infer;
pub mod style;
pub mod tree;

use std::collections::HashSet;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::codegen::COMPONENT_ID_PREFIX;
use crate::diagnostics::diagnostics_enabled;
use crate::error::{ClassificationWarning, Outcome, ParseError, WarningKind};
use crate::model::{Shape, Viewport, normalize_color, validate_shapes};

pub use html::{HtmlTree, stylesheet_links};
pub use infer::STRUCTURAL_TAGS;
pub use tree::{Rect, StructuralTree};

/// Nodes whose box is smaller than this on either side are not shapes.
pub const MIN_VISIBLE_SIZE: f64 = 5.0;
/// Prefix of ids synthesized for nodes without a usable id.
pub const SYNTHETIC_ID_PREFIX: &str = "shape-";

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractOptions {
    pub viewport: Viewport,
    /// Reuse node ids (minus the generated `component-` prefix) as shape ids.
    pub preserve_ids: bool,
    /// Guess function bindings from text and class keywords when none is declared.
    pub infer_functions: bool,
    /// Stamp `created`/`updated` with the extraction time.
    pub stamp_timestamps: bool,
}

struct Walker<'t, T: StructuralTree> {
    tree: &'t T,
    options: &'t ExtractOptions,
    shapes: Vec<Shape>,
    warnings: Vec<ClassificationWarning>,
    used_ids: HashSet<String>,
    stamp: Option<String>,
}

impl<'t, T: StructuralTree> Walker<'t, T> {
    fn visit(&mut self, node: T::Node) {
        let tag = self.tree.tag_name(node);
        if tree::NON_RENDERED_TAGS.contains(&tag) {
            return;
        }
        if !infer::qualifies(self.tree, node) {
            for child in self.tree.children(node) {
                self.visit(child);
            }
            return;
        }

        let rect = self.tree.bounding_box(node);
        if !rect.is_visible(MIN_VISIBLE_SIZE) {
            let subject = infer::describe(self.tree, node);
            warn!(node = %subject, width = rect.width, height = rect.height, "skipping node below minimum visible size");
            self.warnings.push(ClassificationWarning::new(
                WarningKind::SkippedNode,
                subject,
                format!(
                    "box {}x{} is below the {MIN_VISIBLE_SIZE}px minimum",
                    rect.width, rect.height
                ),
            ));
            for child in self.tree.children(node) {
                self.visit(child);
            }
            return;
        }

        // Descendants of an emitted node are part of it.
        self.emit(node, rect);
    }

    fn emit(&mut self, node: T::Node, rect: Rect) {
        let tree = self.tree;
        let options = self.options;
        let viewport = &options.viewport;
        let index = self.shapes.len() + 1;
        let id = self.assign_id(node, index);
        let kind = infer::infer_type(tree, node, &rect, viewport);

        let function = infer::infer_function(tree, node, options.infer_functions);
        if function.is_none() && options.infer_functions && infer::is_interactive(tree, node) {
            self.warnings.push(ClassificationWarning::new(
                WarningKind::FunctionUninferred,
                id.clone(),
                format!(
                    "interactive `{}` matched no known function keyword",
                    infer::describe(tree, node)
                ),
            ));
        }

        let label = infer::infer_label(tree, node);
        let text = Some(tree.text_content(node)).filter(|t| !t.is_empty() && Some(t) != label.as_ref());

        let mut shape = Shape::new(
            id,
            kind,
            rect.x.round() as i64,
            rect.y.round() as i64,
            rect.width.round() as i64,
            rect.height.round() as i64,
        );
        shape.z_index = tree.z_index(node);
        shape.fill = tree
            .computed_color(node, "background-color")
            .and_then(|c| normalize_color(&c));
        shape.border = tree
            .computed_color(node, "border-color")
            .and_then(|c| normalize_color(&c));
        shape.label = label;
        shape.text = text;
        shape.function = function;
        shape.source_data = infer::infer_source_data(tree, node, kind);
        shape.created = self.stamp.clone();
        shape.updated = self.stamp.clone();
        let shape = shape.with_vector_from(viewport);

        if diagnostics_enabled("pack") {
            info!(
                id = %shape.id,
                kind = %shape.kind,
                node = %infer::describe(tree, node),
                x = shape.x,
                y = shape.y,
                width = shape.width,
                height = shape.height,
                "diagnostics: node packed"
            );
        }
        self.shapes.push(shape);
    }

    /// Preserved id when requested and unused, else `shape-<index>`.
    fn assign_id(&mut self, node: T::Node, index: usize) -> String {
        if self.options.preserve_ids {
            if let Some(raw) = self.tree.attribute(node, "id") {
                let raw = raw.trim();
                let candidate = raw.strip_prefix(COMPONENT_ID_PREFIX).unwrap_or(raw);
                if !candidate.is_empty() {
                    if self.used_ids.insert(candidate.to_string()) {
                        return candidate.to_string();
                    }
                    warn!(id = %candidate, "duplicate node id, synthesizing a new one");
                    self.warnings.push(ClassificationWarning::new(
                        WarningKind::DuplicateId,
                        candidate,
                        "id already used by an earlier node",
                    ));
                }
            }
        }
        let mut n = index;
        loop {
            let synthetic = format!("{SYNTHETIC_ID_PREFIX}{n}");
            if self.used_ids.insert(synthetic.clone()) {
                return synthetic;
            }
            n += 1;
        }
    }
}

/// Walks `tree` in document order and reconstructs one shape per significant node.
pub fn extract<T: StructuralTree>(
    tree: &T,
    options: &ExtractOptions,
) -> Result<Outcome<Vec<Shape>>, ParseError> {
    options.viewport.ensure_valid()?;
    let mut walker = Walker {
        tree,
        options,
        shapes: Vec::new(),
        warnings: Vec::new(),
        used_ids: HashSet::new(),
        stamp: options
            .stamp_timestamps
            .then(|| Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)),
    };
    for child in tree.children(tree.root()) {
        walker.visit(child);
    }

    let Walker {
        shapes,
        mut warnings,
        ..
    } = walker;
    let validated = validate_shapes(shapes);
    warnings.extend(validated.warnings);
    debug!(
        shapes = validated.value.len(),
        warnings = warnings.len(),
        "extraction finished"
    );
    Ok(Outcome::new(validated.value, warnings))
}

/// Parses `markup`, applies `stylesheets` after its own `<style>` blocks, and extracts.
pub fn extract_from_markup(
    markup: &str,
    stylesheets: &[String],
    options: &ExtractOptions,
) -> Result<Outcome<Vec<Shape>>, ParseError> {
    let tree = HtmlTree::parse(markup, stylesheets, &options.viewport)?;
    extract(&tree, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FunctionBinding, ShapeType};

    fn options(preserve_ids: bool, infer_functions: bool) -> ExtractOptions {
        ExtractOptions {
            viewport: Viewport::new(1000, 800),
            preserve_ids,
            infer_functions,
            stamp_timestamps: false,
        }
    }

    fn run(markup: &str, opts: &ExtractOptions) -> Outcome<Vec<Shape>> {
        extract_from_markup(markup, &[], opts).expect("extraction")
    }

    #[test]
    fn empty_document_is_a_parse_error() {
        assert!(matches!(
            extract_from_markup("", &[], &ExtractOptions::default()),
            Err(ParseError::EmptyDocument)
        ));
    }

    #[test]
    fn synthetic_ids_count_emitted_shapes() {
        let outcome = run(
            "<body><p>one</p><div><p>two</p></div><p style=\"display:none\">gone</p><p>three</p></body>",
            &options(false, false),
        );
        let ids: Vec<_> = outcome.value.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["shape-1", "shape-2", "shape-3"]);
        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(outcome.warnings[0].kind, WarningKind::SkippedNode);
    }

    #[test]
    fn descendants_of_a_shape_are_not_shapes() {
        let outcome = run(
            "<body><section style=\"height: 200px\"><h2>Panel</h2><button>Go</button></section></body>",
            &options(false, false),
        );
        assert_eq!(outcome.value.len(), 1);
        assert_eq!(outcome.value[0].label.as_deref(), Some("Panel Go"));
    }

    #[test]
    fn undersized_node_is_skipped_but_its_children_are_searched() {
        let outcome = run(
            "<body><section style=\"height:2px\"><button style=\"width:80px;height:30px\">Go</button></section></body>",
            &options(false, false),
        );
        assert_eq!(outcome.value.len(), 1);
        let button = &outcome.value[0];
        assert_eq!(button.kind, ShapeType::Button);
        assert_eq!((button.width, button.height), (80, 30));
        assert_eq!(button.label.as_deref(), Some("Go"));
        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(outcome.warnings[0].kind, WarningKind::SkippedNode);
        assert_eq!(outcome.warnings[0].subject, "section");
    }

    #[test]
    fn negated_id_selector_outranks_class_pair() {
        let outcome = extract_from_markup(
            "<body><div class=\"component x y\" style=\"height: 40px\"></div></body>",
            &[".x.y{background-color:#00ff00} div:not(#zz){background-color:#ff0000}".to_string()],
            &options(false, false),
        )
        .expect("extraction");
        assert_eq!(outcome.value[0].fill.as_deref(), Some("#ff0000"));
    }

    #[test]
    fn preserved_ids_drop_component_prefix_and_fall_back_on_duplicates() {
        let outcome = run(
            "<body><p id=\"component-a\">x</p><p id=\"b\">y</p><p id=\"a\">z</p></body>",
            &options(true, false),
        );
        let ids: Vec<_> = outcome.value.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "shape-3"]);
        assert!(
            outcome
                .warnings
                .iter()
                .any(|w| w.kind == WarningKind::DuplicateId)
        );
    }

    #[test]
    fn colors_are_normalized_or_dropped() {
        let outcome = run(
            "<body><div class=\"component\" style=\"height: 50px; background-color: rgba(255, 0, 0, 0.5); border: 1px solid #00FF00\"></div>\
             <div class=\"component\" style=\"height: 50px; background: transparent; border-color: red\"></div></body>",
            &options(false, false),
        );
        let shapes = outcome.value;
        assert_eq!(shapes[0].fill.as_deref(), Some("#ff000080"));
        assert_eq!(shapes[0].border.as_deref(), Some("#00ff00"));
        assert_eq!(shapes[1].fill, None);
        assert_eq!(shapes[1].border, None);
    }

    #[test]
    fn function_inference_is_opt_in_and_reports_misses() {
        let markup = "<body><button>Save game</button><button>Jump</button></body>";
        let off = run(markup, &options(false, false));
        assert!(off.value.iter().all(|s| s.function.is_none()));
        assert!(off.warnings.is_empty());

        let on = run(markup, &options(false, true));
        assert_eq!(on.value[0].function, Some(FunctionBinding::SaveState));
        assert_eq!(on.value[1].function, None);
        assert_eq!(on.warnings.len(), 1);
        assert_eq!(on.warnings[0].kind, WarningKind::FunctionUninferred);
        assert_eq!(on.warnings[0].subject, "shape-2");
    }

    #[test]
    fn geometry_is_page_relative_with_polar_vector() {
        let outcome = run(
            "<body><div class=\"component\" style=\"position: absolute; left: 450px; top: 1500px; width: 100px; height: 100px\"></div></body>",
            &options(false, false),
        );
        let shape = &outcome.value[0];
        assert_eq!((shape.x, shape.y, shape.width, shape.height), (450, 1500, 100, 100));
        let vector = shape.vector_from_center.expect("vector");
        assert!((vector.angle - 90.0).abs() < 1e-9);
        assert!((vector.distance - 1150.0).abs() < 1e-9);
    }

    #[test]
    fn timestamps_are_stamped_on_request() {
        let opts = ExtractOptions {
            stamp_timestamps: true,
            ..options(false, false)
        };
        let outcome = run("<body><p>x</p></body>", &opts);
        let shape = &outcome.value[0];
        assert!(shape.created.is_some());
        assert_eq!(shape.created, shape.updated);
        assert!(shape.validate().is_ok());
    }

    #[test]
    fn authored_structure_maps_to_types() {
        let outcome = run(
            "<body><nav style=\"height: 40px\"><a href=\"/\">Home</a></nav>\
             <aside style=\"width: 200px; height: 300px\">Tools</aside>\
             <h1>Welcome</h1><img src=\"pet.png\" alt=\"Pet\" width=\"64\" height=\"64\"></body>",
            &options(false, false),
        );
        let kinds: Vec<_> = outcome.value.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ShapeType::NavigationHorizontal,
                ShapeType::FunctionSidepanel,
                ShapeType::Text,
                ShapeType::Image
            ]
        );
        assert_eq!(
            outcome.value[3].source_data,
            Some(serde_json::Value::String("pet.png".into()))
        );
    }
}
