//! Type, function, label and payload cues read off a structural node.

use serde_json::{Value, json};

use crate::codegen::{FUNCTION_ATTR, REGION_ATTR};
use crate::layout::{Placement, Vertical};
use crate::model::{FunctionBinding, ShapeType, Viewport, truncate_label};

use super::tree::{Rect, StructuralTree};

/// Tags that make a node a shape candidate even without text.
pub const STRUCTURAL_TAGS: &[&str] = &[
    "a", "article", "aside", "button", "figure", "footer", "form", "header", "img", "input",
    "nav", "section", "select", "textarea",
];
const INTERACTIVE_TAGS: &[&str] = &["a", "button", "input", "select", "textarea"];
const NAV_WORDS: &[&str] = &["nav", "navbar", "navigation", "menu", "menubar"];
const SIDEBAR_WORDS: &[&str] = &["sidebar", "sidepanel", "sidenav"];
const COMPONENT_CLASS: &str = "component";

fn class_words<T: StructuralTree>(tree: &T, node: T::Node) -> Vec<String> {
    tree.attribute(node, "class")
        .unwrap_or_default()
        .split(|c: char| c.is_whitespace() || c == '-' || c == '_')
        .filter(|w| !w.is_empty())
        .map(str::to_ascii_lowercase)
        .collect()
}

fn role<T: StructuralTree>(tree: &T, node: T::Node) -> String {
    tree.attribute(node, "role")
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Whether a node may become a shape, ignoring its size. Region wrappers never qualify.
pub fn qualifies<T: StructuralTree>(tree: &T, node: T::Node) -> bool {
    if tree.attribute(node, REGION_ATTR).is_some() {
        return false;
    }
    STRUCTURAL_TAGS.contains(&tree.tag_name(node))
        || tree.attribute(node, "role").is_some()
        || tree.attribute(node, FUNCTION_ATTR).is_some()
        || tree.has_class(node, COMPONENT_CLASS)
        || !tree.own_text(node).is_empty()
}

pub fn is_interactive<T: StructuralTree>(tree: &T, node: T::Node) -> bool {
    INTERACTIVE_TAGS.contains(&tree.tag_name(node)) || role(tree, node) == "button"
}

/// Type from, in order: the `shape-*` marker class, navigation and sidebar cues,
/// tag cues, then the node's position on screen.
pub fn infer_type<T: StructuralTree>(
    tree: &T,
    node: T::Node,
    rect: &Rect,
    viewport: &Viewport,
) -> ShapeType {
    let marker = tree
        .attribute(node, "class")
        .unwrap_or_default()
        .split_whitespace()
        .find_map(ShapeType::from_css_class);
    if let Some(kind) = marker {
        return kind;
    }

    let tag = tree.tag_name(node);
    let role = role(tree, node);
    let words = class_words(tree, node);
    let has_word = |vocab: &[&str]| words.iter().any(|w| vocab.contains(&w.as_str()));

    if tag == "nav" || role == "navigation" || role == "menubar" || has_word(NAV_WORDS) {
        return if rect.width >= rect.height {
            ShapeType::NavigationHorizontal
        } else {
            ShapeType::NavigationVertical
        };
    }
    if tag == "aside" || role == "complementary" || has_word(SIDEBAR_WORDS) {
        return ShapeType::FunctionSidepanel;
    }

    match tag {
        "button" => return ShapeType::Button,
        "input" => {
            let kind = tree.attribute(node, "type").unwrap_or_default();
            if ["button", "submit", "reset"]
                .iter()
                .any(|t| kind.eq_ignore_ascii_case(t))
            {
                return ShapeType::Button;
            }
        }
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => return ShapeType::Text,
        "img" => return ShapeType::Image,
        _ => {}
    }
    match role.as_str() {
        "button" => return ShapeType::Button,
        "heading" => return ShapeType::Text,
        "img" => return ShapeType::Image,
        _ => {}
    }

    let (cx, cy) = rect.center();
    let placement = Placement::of_point(cx, cy, viewport);
    if placement.vertical == Vertical::Upper {
        ShapeType::Text
    } else if placement.is_side() {
        ShapeType::FunctionSidepanel
    } else {
        ShapeType::Rectangle
    }
}

/// The declared `data-function` binding, else (when `infer` is set) a keyword match over
/// the node's text and class names.
pub fn infer_function<T: StructuralTree>(
    tree: &T,
    node: T::Node,
    infer: bool,
) -> Option<FunctionBinding> {
    if let Some(declared) = tree
        .attribute(node, FUNCTION_ATTR)
        .and_then(FunctionBinding::parse)
    {
        return Some(declared);
    }
    if !infer {
        return None;
    }
    let haystack = format!(
        "{} {}",
        tree.text_content(node),
        tree.attribute(node, "class").unwrap_or_default()
    );
    FunctionBinding::from_keywords(&haystack)
}

/// First non-empty of `aria-label`, `alt`, `title` and the text content, bounded.
pub fn infer_label<T: StructuralTree>(tree: &T, node: T::Node) -> Option<String> {
    ["aria-label", "alt", "title"]
        .iter()
        .filter_map(|name| tree.attribute(node, name))
        .map(str::to_string)
        .chain(std::iter::once(tree.text_content(node)))
        .map(|raw| truncate_label(&raw))
        .find(|label| !label.is_empty())
}

/// Payload the generator knows how to render again: image sources and navigation links.
pub fn infer_source_data<T: StructuralTree>(
    tree: &T,
    node: T::Node,
    kind: ShapeType,
) -> Option<Value> {
    match kind {
        ShapeType::Image => {
            let img = if tree.tag_name(node) == "img" {
                Some(node)
            } else {
                descendants(tree, node)
                    .into_iter()
                    .find(|n| tree.tag_name(*n) == "img")
            }?;
            let src = tree.attribute(img, "src")?.trim();
            (!src.is_empty()).then(|| Value::String(src.to_string()))
        }
        ShapeType::NavigationHorizontal | ShapeType::NavigationVertical => {
            let items: Vec<Value> = descendants(tree, node)
                .into_iter()
                .filter(|n| tree.tag_name(*n) == "a")
                .filter_map(|a| {
                    let label = tree.text_content(a);
                    if label.is_empty() {
                        return None;
                    }
                    let href = tree.attribute(a, "href").unwrap_or("#");
                    Some(json!({ "label": label, "href": href }))
                })
                .collect();
            (!items.is_empty()).then_some(Value::Array(items))
        }
        _ => None,
    }
}

/// Element descendants in document order, excluding `node`.
pub(crate) fn descendants<T: StructuralTree>(tree: &T, node: T::Node) -> Vec<T::Node> {
    let mut out = Vec::new();
    let mut stack: Vec<T::Node> = tree.children(node).into_iter().rev().collect();
    while let Some(next) = stack.pop() {
        out.push(next);
        stack.extend(tree.children(next).into_iter().rev());
    }
    out
}

/// Short selector-like description for warnings, e.g. `button#save.primary`.
pub fn describe<T: StructuralTree>(tree: &T, node: T::Node) -> String {
    let mut out = tree.tag_name(node).to_string();
    if let Some(id) = tree.attribute(node, "id").filter(|id| !id.trim().is_empty()) {
        out.push('#');
        out.push_str(id.trim());
    }
    if let Some(class) = tree
        .attribute(node, "class")
        .and_then(|c| c.split_whitespace().next())
    {
        out.push('.');
        out.push_str(class);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pack::HtmlTree;

    fn parse(markup: &str) -> HtmlTree {
        HtmlTree::parse(markup, &[], &Viewport::new(1000, 1000)).expect("parse")
    }

    fn first_child(tree: &HtmlTree) -> <HtmlTree as StructuralTree>::Node {
        tree.children(tree.root())[0]
    }

    #[test]
    fn marker_class_beats_tag_cues() {
        let tree = parse("<body><button class=\"component shape-text\">x</button></body>");
        let node = first_child(&tree);
        let rect = tree.bounding_box(node);
        assert_eq!(
            infer_type(&tree, node, &rect, &Viewport::new(1000, 1000)),
            ShapeType::Text
        );
    }

    #[test]
    fn navigation_orientation_follows_aspect() {
        let vp = Viewport::new(1000, 1000);
        let tree = parse("<body><div class=\"main-nav\">links</div></body>");
        let node = first_child(&tree);
        assert_eq!(
            infer_type(&tree, node, &Rect::new(0.0, 500.0, 600.0, 40.0), &vp),
            ShapeType::NavigationHorizontal
        );
        assert_eq!(
            infer_type(&tree, node, &Rect::new(0.0, 500.0, 40.0, 600.0), &vp),
            ShapeType::NavigationVertical
        );
    }

    #[test]
    fn class_words_do_not_match_inside_other_words() {
        let tree = parse("<body><div class=\"unavailable\">x</div></body>");
        let node = first_child(&tree);
        let vp = Viewport::new(1000, 1000);
        assert_eq!(
            infer_type(&tree, node, &Rect::new(400.0, 500.0, 100.0, 40.0), &vp),
            ShapeType::Rectangle
        );
    }

    #[test]
    fn positional_fallback() {
        let tree = parse("<body><div>x</div></body>");
        let node = first_child(&tree);
        let vp = Viewport::new(1000, 1000);
        let at = |x, y| infer_type(&tree, node, &Rect::new(x, y, 10.0, 10.0), &vp);
        assert_eq!(at(500.0, 10.0), ShapeType::Text);
        assert_eq!(at(10.0, 500.0), ShapeType::FunctionSidepanel);
        assert_eq!(at(900.0, 500.0), ShapeType::FunctionSidepanel);
        assert_eq!(at(500.0, 500.0), ShapeType::Rectangle);
    }

    #[test]
    fn declared_function_wins_over_keywords() {
        let tree = parse(
            "<body><button data-function=\"function:loadState\">Save</button><button class=\"btn-status\">Go</button><button>Go</button></body>",
        );
        let nodes = tree.children(tree.root());
        assert_eq!(
            infer_function(&tree, nodes[0], true),
            Some(FunctionBinding::LoadState)
        );
        assert_eq!(
            infer_function(&tree, nodes[1], true),
            Some(FunctionBinding::ShowStatus)
        );
        assert_eq!(infer_function(&tree, nodes[1], false), None);
        assert_eq!(infer_function(&tree, nodes[2], true), None);
    }

    #[test]
    fn label_precedence() {
        let tree = parse(
            "<body><img alt=\"Pet\" title=\"t\" src=\"p.png\"><div aria-label=\"Aria\" title=\"t\">text</div><p>  Plain   text </p></body>",
        );
        let nodes = tree.children(tree.root());
        assert_eq!(infer_label(&tree, nodes[0]).as_deref(), Some("Pet"));
        assert_eq!(infer_label(&tree, nodes[1]).as_deref(), Some("Aria"));
        assert_eq!(infer_label(&tree, nodes[2]).as_deref(), Some("Plain text"));
    }

    #[test]
    fn region_wrappers_never_qualify() {
        let tree = parse("<body><main data-region=\"main\">text</main><span></span><nav></nav></body>");
        let nodes = tree.children(tree.root());
        assert!(!qualifies(&tree, nodes[0]));
        assert!(!qualifies(&tree, nodes[1]));
        assert!(qualifies(&tree, nodes[2]));
    }

    #[test]
    fn navigation_links_become_source_data() {
        let tree = parse("<body><nav><a href=\"/a\">A</a><a href=\"/b\">B</a></nav></body>");
        let node = first_child(&tree);
        let data = infer_source_data(&tree, node, ShapeType::NavigationHorizontal)
            .expect("links");
        assert_eq!(data[1]["href"], "/b");
        assert_eq!(describe(&tree, node), "nav");
    }
}
