//! [`StructuralTree`] over a parsed HTML document, with bounding boxes computed by
//! [`super::boxes`] instead of a browser.

use std::collections::HashMap;
use std::ops::Deref;

use ego_tree::{NodeId, NodeRef};
use scraper::{ElementRef, Html, Node, Selector};
use tracing::{debug, info};

use crate::diagnostics::diagnostics_enabled;
use crate::error::ParseError;
use crate::model::Viewport;
use crate::model::color::is_color_literal;

use super::boxes::{CssLength, layout_boxes};
use super::style::{Declarations, StyleSheet, split_top_level};
use super::tree::{Rect, StructuralTree, normalize_whitespace};

const BORDER_KEYWORDS: &[&str] = &["none", "hidden"];

pub struct HtmlTree {
    document: Html,
    root: NodeId,
    styles: HashMap<NodeId, Declarations>,
    boxes: HashMap<NodeId, Rect>,
}

impl HtmlTree {
    /// Parses `markup`, cascades its `<style>` blocks followed by `stylesheets`, and lays
    /// the body out against `viewport`.
    pub fn parse(
        markup: &str,
        stylesheets: &[String],
        viewport: &Viewport,
    ) -> Result<Self, ParseError> {
        if markup.trim().is_empty() {
            return Err(ParseError::EmptyDocument);
        }
        if !markup.contains('<') {
            return Err(ParseError::MissingRoot);
        }
        viewport.ensure_valid()?;

        let document = Html::parse_document(markup);
        let root = find_body(&document);
        let mut sources = embedded_styles(&document);
        sources.extend(stylesheets.iter().cloned());
        let sheet = StyleSheet::from_sources(&sources);
        let styles = compute_styles(&document, root, &sheet);

        let boxes = layout_boxes(&document, root, &styles, viewport)?;
        debug!(elements = styles.len(), "html tree parsed");

        if diagnostics_enabled("pack") {
            info!(
                rules = sheet.len(),
                elements = styles.len(),
                boxes = boxes.len(),
                "diagnostics: html tree laid out"
            );
        }

        Ok(Self {
            document,
            root,
            styles,
            boxes,
        })
    }

    fn node(&self, id: NodeId) -> Option<NodeRef<'_, Node>> {
        self.document.tree.get(id)
    }

    fn element(&self, id: NodeId) -> Option<ElementRef<'_>> {
        self.node(id).and_then(ElementRef::wrap)
    }
}

impl StructuralTree for HtmlTree {
    type Node = NodeId;

    fn root(&self) -> NodeId {
        self.root
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.node(node)
            .map(|n| {
                n.children()
                    .filter(|c| c.value().is_element())
                    .map(|c| c.id())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn tag_name(&self, node: NodeId) -> &str {
        self.element(node)
            .map(|el| el.value().name())
            .unwrap_or_default()
    }

    fn bounding_box(&self, node: NodeId) -> Rect {
        self.boxes.get(&node).copied().unwrap_or_default()
    }

    fn text_content(&self, node: NodeId) -> String {
        self.element(node)
            .map(|el| normalize_whitespace(&el.text().collect::<Vec<_>>().join(" ")))
            .unwrap_or_default()
    }

    fn own_text(&self, node: NodeId) -> String {
        let Some(n) = self.node(node) else {
            return String::new();
        };
        let raw: String = n
            .children()
            .filter_map(|c| match c.value() {
                Node::Text(text) => Some(text.deref()),
                _ => None,
            })
            .collect();
        normalize_whitespace(&raw)
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        self.element(node).and_then(|el| el.value().attr(name))
    }

    fn computed_color(&self, node: NodeId, property: &str) -> Option<String> {
        let style = self.styles.get(&node)?;
        match property {
            "background-color" => style
                .get("background-color")
                .or_else(|| style.get("background"))
                .and_then(|value| color_token(value)),
            "border-color" => {
                if let Some(value) = style.get("border-color") {
                    return color_token(value);
                }
                let shorthand = style.get("border")?;
                let tokens = value_tokens(shorthand);
                let hidden = tokens.iter().any(|t| {
                    BORDER_KEYWORDS.contains(&t.to_ascii_lowercase().as_str())
                        || CssLength::parse(t) == Some(CssLength::Px(0.0))
                });
                if hidden {
                    return None;
                }
                color_token(shorthand)
            }
            other => style.get(other).cloned(),
        }
    }

    fn z_index(&self, node: NodeId) -> i64 {
        self.styles
            .get(&node)
            .and_then(|s| s.get("z-index"))
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(0)
    }
}

/// `href` of every `<link rel="stylesheet">`, in document order.
pub fn stylesheet_links(markup: &str) -> Vec<String> {
    let document = Html::parse_document(markup);
    let Ok(selector) = Selector::parse("link[href]") else {
        return Vec::new();
    };
    document
        .select(&selector)
        .filter(|el| {
            el.value()
                .attr("rel")
                .unwrap_or_default()
                .to_ascii_lowercase()
                .split_whitespace()
                .any(|rel| rel == "stylesheet")
        })
        .filter_map(|el| el.value().attr("href"))
        .map(|href| href.trim().to_string())
        .filter(|href| !href.is_empty())
        .collect()
}

fn find_body(document: &Html) -> NodeId {
    Selector::parse("body")
        .ok()
        .and_then(|selector| document.select(&selector).next().map(|body| body.id()))
        .unwrap_or_else(|| document.root_element().id())
}

fn embedded_styles(document: &Html) -> Vec<String> {
    let Ok(selector) = Selector::parse("style") else {
        return Vec::new();
    };
    document
        .select(&selector)
        .map(|node| node.text().collect::<String>())
        .filter(|css| !css.trim().is_empty())
        .collect()
}

fn compute_styles(
    document: &Html,
    root: NodeId,
    sheet: &StyleSheet,
) -> HashMap<NodeId, Declarations> {
    let mut styles = HashMap::new();
    let Some(root) = document.tree.get(root) else {
        return styles;
    };
    for node in root.descendants() {
        if let Some(el) = ElementRef::wrap(node) {
            styles.insert(node.id(), sheet.compute_for(&el, el.value().attr("style")));
        }
    }
    styles
}

fn value_tokens(value: &str) -> Vec<&str> {
    split_top_level(value, ' ')
        .into_iter()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect()
}

fn color_token(value: &str) -> Option<String> {
    value_tokens(value)
        .into_iter()
        .find(|t| is_color_literal(t))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree(markup: &str, css: &[&str]) -> HtmlTree {
        let sheets: Vec<String> = css.iter().map(|s| s.to_string()).collect();
        HtmlTree::parse(markup, &sheets, &Viewport::new(1000, 800)).expect("parse")
    }

    fn by_id(tree: &HtmlTree, id: &str) -> NodeId {
        let selector = Selector::parse(&format!("#{id}")).expect("selector");
        tree.document
            .select(&selector)
            .next()
            .expect("element with id")
            .id()
    }

    #[test]
    fn empty_and_plain_text_inputs_fail() {
        let vp = Viewport::default();
        assert!(matches!(
            HtmlTree::parse("  \n", &[], &vp),
            Err(ParseError::EmptyDocument)
        ));
        assert!(matches!(
            HtmlTree::parse("just words", &[], &vp),
            Err(ParseError::MissingRoot)
        ));
    }

    #[test]
    fn blocks_stack_vertically() {
        let t = tree(
            "<body><div id=\"a\" style=\"height: 40px\"></div><div id=\"b\" style=\"height: 30px\"></div></body>",
            &[],
        );
        assert_eq!(t.bounding_box(by_id(&t, "a")), Rect::new(0.0, 0.0, 1000.0, 40.0));
        assert_eq!(t.bounding_box(by_id(&t, "b")), Rect::new(0.0, 40.0, 1000.0, 30.0));
    }

    #[test]
    fn flex_row_places_items_side_by_side_and_grows() {
        let t = tree(
            "<body><div class=\"row\"><div id=\"side\"></div><div id=\"main\"><p id=\"text\">hi</p></div></div></body>",
            &[".row { display: flex; } #side { width: 20%; height: 100px; } #main { flex: 1; }"],
        );
        assert_eq!(t.bounding_box(by_id(&t, "side")), Rect::new(0.0, 0.0, 200.0, 100.0));
        let main = t.bounding_box(by_id(&t, "main"));
        assert_eq!((main.x, main.width, main.height), (200.0, 800.0, 100.0));
        let text = t.bounding_box(by_id(&t, "text"));
        assert_eq!((text.x, text.width, text.height), (200.0, 800.0, 20.0));
    }

    #[test]
    fn wrapping_row_starts_new_line() {
        let t = tree(
            "<body><div style=\"display: flex; flex-wrap: wrap; gap: 10px\">\
             <div id=\"a\" style=\"width: 600px; height: 50px\"></div>\
             <div id=\"b\" style=\"width: 600px; height: 50px\"></div></div></body>",
            &[],
        );
        assert_eq!(t.bounding_box(by_id(&t, "b")), Rect::new(0.0, 60.0, 600.0, 50.0));
    }

    #[test]
    fn absolute_and_hidden_elements() {
        let t = tree(
            "<body><div id=\"abs\" style=\"position: absolute; left: 100px; top: 250px; width: 50px; height: 60px\"></div>\
             <div id=\"gone\" style=\"display: none\">text</div></body>",
            &[],
        );
        assert_eq!(t.bounding_box(by_id(&t, "abs")), Rect::new(100.0, 250.0, 50.0, 60.0));
        assert!(!t.bounding_box(by_id(&t, "gone")).is_visible(1.0));
    }

    #[test]
    fn padding_offsets_content_and_long_text_wraps() {
        let t = tree(
            "<body><div id=\"box\" style=\"width: 200px; padding: 10px 20px\">\
             <p id=\"p\">aaaa bbbb cccc dddd eeee ffff</p></div></body>",
            &[],
        );
        assert_eq!(t.bounding_box(by_id(&t, "p")), Rect::new(20.0, 10.0, 160.0, 40.0));
        assert_eq!(t.bounding_box(by_id(&t, "box")), Rect::new(0.0, 0.0, 200.0, 60.0));
    }

    #[test]
    fn fixed_elements_are_placed_against_the_page() {
        let t = tree(
            "<body><div style=\"height: 300px\">\
             <div id=\"f\" style=\"position: fixed; right: 0; top: 10px; width: 100px; height: 50px\"></div>\
             </div></body>",
            &[],
        );
        assert_eq!(t.bounding_box(by_id(&t, "f")), Rect::new(900.0, 10.0, 100.0, 50.0));
    }

    #[test]
    fn inline_elements_shrink_to_text() {
        let t = tree("<body><p><a id=\"l\" href=\"#\">Docs</a></p></body>", &[]);
        let link = t.bounding_box(by_id(&t, "l"));
        assert_eq!((link.width, link.height), (32.0, 20.0));
    }

    #[test]
    fn image_size_comes_from_attributes() {
        let t = tree("<body><img id=\"i\" src=\"a.png\" width=\"64\" height=\"48\"></body>", &[]);
        let img = t.bounding_box(by_id(&t, "i"));
        assert_eq!((img.width, img.height), (64.0, 48.0));
    }

    #[test]
    fn colors_resolve_from_longhands_and_shorthands() {
        let t = tree(
            "<body><div id=\"c\" style=\"background: #112233; border: 2px solid rgb(255, 0, 0)\"></div>\
             <div id=\"n\" style=\"border: none\"></div></body>",
            &[],
        );
        let c = by_id(&t, "c");
        assert_eq!(t.computed_color(c, "background-color").as_deref(), Some("#112233"));
        assert_eq!(t.computed_color(c, "border-color").as_deref(), Some("rgb(255, 0, 0)"));
        assert_eq!(t.computed_color(by_id(&t, "n"), "border-color"), None);
    }

    #[test]
    fn text_helpers_split_own_and_descendant_text() {
        let t = tree("<body><div id=\"d\"> Hello <b>big</b>\n world </div></body>", &[]);
        let d = by_id(&t, "d");
        assert_eq!(t.own_text(d), "Hello world");
        assert_eq!(t.text_content(d), "Hello big world");
        assert_eq!(t.tag_name(d), "div");
        assert_eq!(t.children(d).len(), 1);
    }

    #[test]
    fn stylesheet_links_are_listed() {
        let links = stylesheet_links(
            "<head><link rel=\"stylesheet\" href=\"a.css\"><link rel=\"manifest\" href=\"m.json\"></head>",
        );
        assert_eq!(links, vec!["a.css".to_string()]);
    }
}
