use serde::{Deserialize, Serialize};

/// Axis-aligned box in page coordinates (CSS pixels, origin at the top-left of the page).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Both sides at least `min` pixels.
    pub fn is_visible(&self, min: f64) -> bool {
        self.width >= min && self.height >= min
    }
}

/// Read-only view of a rendered document, enough to reconstruct shapes from it.
///
/// Only element nodes are exposed; text is reachable through [`StructuralTree::own_text`]
/// and [`StructuralTree::text_content`].
pub trait StructuralTree {
    type Node: Copy + Eq;

    /// Element whose descendants are candidate shapes (usually `body`).
    fn root(&self) -> Self::Node;

    /// Element children in document order.
    fn children(&self, node: Self::Node) -> Vec<Self::Node>;

    /// Lowercase tag name.
    fn tag_name(&self, node: Self::Node) -> &str;

    fn bounding_box(&self, node: Self::Node) -> Rect;

    /// All descendant text, whitespace collapsed.
    fn text_content(&self, node: Self::Node) -> String;

    /// Text from direct text children only, whitespace collapsed.
    fn own_text(&self, node: Self::Node) -> String;

    fn attribute(&self, node: Self::Node, name: &str) -> Option<&str>;

    /// Resolved color value for `background-color` or `border-color`, unnormalized.
    fn computed_color(&self, node: Self::Node, property: &str) -> Option<String>;

    /// Paint order; `0` when the tree has no notion of stacking.
    fn z_index(&self, _node: Self::Node) -> i64 {
        0
    }

    fn has_class(&self, node: Self::Node, class: &str) -> bool {
        self.attribute(node, "class")
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
    }
}

/// Elements that never render a box of their own.
pub(crate) const NON_RENDERED_TAGS: &[&str] = &[
    "head", "script", "style", "meta", "link", "title", "template", "noscript",
];

pub(crate) fn normalize_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}
