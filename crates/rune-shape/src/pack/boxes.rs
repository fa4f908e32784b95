//! Page boxes for an HTML document, computed by Taffy from the cascaded declarations.
//!
//! Elements map onto Taffy nodes the way a browser forms boxes: block-level elements
//! become block containers, runs of inline content are wrapped in wrapping flex rows that
//! stand in for line boxes, and `display: flex` maps directly. Text is measured with a
//! fixed advance per character.

use std::collections::HashMap;
use std::ops::Deref;

use ego_tree::{NodeId, NodeRef};
use scraper::{Html, Node};
use taffy::{
    AlignItems, AvailableSpace, Dimension, Display, FlexDirection, FlexWrap, LengthPercentage,
    LengthPercentageAuto, Position, Size, TaffyResult, TaffyTree,
};
use tracing::debug;

use crate::error::ParseError;
use crate::model::Viewport;

use super::style::Declarations;
use super::tree::{NON_RENDERED_TAGS, Rect, normalize_whitespace};

const LINE_HEIGHT_PX: f32 = 20.0;
const CHAR_WIDTH_PX: f32 = 8.0;
const ROOT_FONT_SIZE_PX: f32 = 16.0;
/// Size of a replaced element with no declared or attribute size.
const REPLACED_DEFAULT: (f32, f32) = (300.0, 150.0);
const CONTROL_DEFAULT: (f32, f32) = (160.0, 24.0);

const INLINE_TAGS: &[&str] = &[
    "a", "abbr", "b", "button", "code", "em", "i", "img", "input", "label", "select", "small",
    "span", "strong", "sub", "sup", "textarea",
];

/// A CSS length that Taffy can resolve: absolute pixels or a fraction of the container.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum CssLength {
    Px(f32),
    Fraction(f32),
}

impl CssLength {
    /// First token of `value`. `em`/`rem` use the root font size; bare numbers are pixels.
    pub(crate) fn parse(value: &str) -> Option<Self> {
        let token = value.split_whitespace().next()?.to_ascii_lowercase();
        if let Some(px) = token.strip_suffix("px") {
            return px.parse().ok().map(Self::Px);
        }
        if let Some(pct) = token.strip_suffix('%') {
            return pct.parse::<f32>().ok().map(|p| Self::Fraction(p / 100.0));
        }
        if let Some(em) = token.strip_suffix("rem").or_else(|| token.strip_suffix("em")) {
            return em.parse::<f32>().ok().map(|v| Self::Px(v * ROOT_FONT_SIZE_PX));
        }
        token.parse().ok().map(Self::Px)
    }

    fn dimension(self) -> Dimension {
        match self {
            Self::Px(v) => Dimension::Length(v),
            Self::Fraction(f) => Dimension::Percent(f),
        }
    }

    fn length_percentage(self) -> LengthPercentage {
        match self {
            Self::Px(v) => LengthPercentage::Length(v.max(0.0)),
            Self::Fraction(f) => LengthPercentage::Percent(f.max(0.0)),
        }
    }

    fn length_percentage_auto(self) -> LengthPercentageAuto {
        match self {
            Self::Px(v) => LengthPercentageAuto::Length(v),
            Self::Fraction(f) => LengthPercentageAuto::Percent(f),
        }
    }
}

/// Measure context of a text leaf.
#[derive(Debug, Clone, Copy)]
struct TextRun {
    chars: usize,
    longest_word: usize,
}

impl TextRun {
    fn new(raw: &str) -> Option<Self> {
        let text = normalize_whitespace(raw);
        if text.is_empty() {
            return None;
        }
        Some(Self {
            chars: text.chars().count(),
            longest_word: text
                .split(' ')
                .map(|w| w.chars().count())
                .max()
                .unwrap_or(0),
        })
    }
}

/// Wraps at whole characters once the run is wider than the width it is given.
fn measure_text(
    run: &TextRun,
    known: Size<Option<f32>>,
    available: Size<AvailableSpace>,
) -> Size<f32> {
    let full = run.chars as f32 * CHAR_WIDTH_PX;
    let limit = known.width.or(match available.width {
        AvailableSpace::Definite(width) => Some(width),
        AvailableSpace::MinContent => Some(run.longest_word as f32 * CHAR_WIDTH_PX),
        AvailableSpace::MaxContent => None,
    });
    let width = limit.map_or(full, |limit| full.min(limit.max(0.0)));
    let lines = if width > 0.0 {
        (full / width).ceil().max(1.0)
    } else {
        1.0
    };
    Size {
        width: known.width.unwrap_or(width),
        height: known.height.unwrap_or(lines * LINE_HEIGHT_PX),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Positioning {
    Flow,
    Absolute,
    Fixed,
}

#[derive(Debug, Clone, Copy)]
enum Item {
    Block(taffy::NodeId),
    Inline(taffy::NodeId),
}

fn line_box(style: &mut taffy::Style) {
    style.display = Display::Flex;
    style.flex_direction = FlexDirection::Row;
    style.flex_wrap = FlexWrap::Wrap;
    style.align_items = Some(AlignItems::FlexStart);
}

struct BoxBuilder<'a> {
    styles: &'a HashMap<NodeId, Declarations>,
    taffy: TaffyTree<TextRun>,
    elements: HashMap<taffy::NodeId, NodeId>,
    fixed: Vec<taffy::NodeId>,
}

impl<'a> BoxBuilder<'a> {
    fn prop(&self, id: NodeId, name: &str) -> Option<&'a str> {
        self.styles
            .get(&id)
            .and_then(|s| s.get(name))
            .map(|v| v.trim())
    }

    fn length(&self, id: NodeId, name: &str) -> Option<CssLength> {
        self.prop(id, name).and_then(CssLength::parse)
    }

    fn dimension(&self, id: NodeId, name: &str) -> Dimension {
        self.length(id, name)
            .map_or(Dimension::Auto, CssLength::dimension)
    }

    fn inset(&self, id: NodeId, name: &str) -> LengthPercentageAuto {
        self.length(id, name)
            .map_or(LengthPercentageAuto::Auto, CssLength::length_percentage_auto)
    }

    fn is_hidden(&self, node: NodeRef<'_, Node>) -> bool {
        let name = tag(node);
        NON_RENDERED_TAGS.contains(&name)
            || self.prop(node.id(), "display") == Some("none")
            || attr(node, "hidden").is_some()
            || (name == "input"
                && attr(node, "type").is_some_and(|t| t.eq_ignore_ascii_case("hidden")))
    }

    fn is_inline(&self, node: NodeRef<'_, Node>) -> bool {
        match self.prop(node.id(), "display") {
            Some(display) => display.starts_with("inline"),
            None => INLINE_TAGS.contains(&tag(node)),
        }
    }

    fn positioning(&self, id: NodeId) -> Positioning {
        match self.prop(id, "position") {
            Some("absolute") => Positioning::Absolute,
            Some("fixed") => Positioning::Fixed,
            _ => Positioning::Flow,
        }
    }

    /// Size, padding, insets and flex-item factors shared by every element box.
    fn base_style(&self, id: NodeId) -> taffy::Style {
        let mut style = taffy::Style {
            display: Display::Block,
            size: Size {
                width: self.dimension(id, "width"),
                height: self.dimension(id, "height"),
            },
            min_size: Size {
                width: self.dimension(id, "min-width"),
                height: self.dimension(id, "min-height"),
            },
            max_size: Size {
                width: self.dimension(id, "max-width"),
                height: self.dimension(id, "max-height"),
            },
            padding: self.padding(id),
            ..Default::default()
        };
        if self.positioning(id) != Positioning::Flow {
            style.position = Position::Absolute;
            style.inset = taffy::Rect {
                left: self.inset(id, "left"),
                right: self.inset(id, "right"),
                top: self.inset(id, "top"),
                bottom: self.inset(id, "bottom"),
            };
        }
        self.apply_flex_item(id, &mut style);
        style
    }

    /// `padding` shorthand with one to four values, then the per-side longhands.
    fn padding(&self, id: NodeId) -> taffy::Rect<LengthPercentage> {
        let zero = LengthPercentage::Length(0.0);
        let values: Vec<LengthPercentage> = self
            .prop(id, "padding")
            .map(|v| {
                v.split_whitespace()
                    .filter_map(CssLength::parse)
                    .map(CssLength::length_percentage)
                    .collect()
            })
            .unwrap_or_default();
        let side = |i: usize| values.get(i).copied();
        let top = side(0).unwrap_or(zero);
        let right = side(1).unwrap_or(top);
        let bottom = side(2).unwrap_or(top);
        let left = side(3).unwrap_or(right);
        let longhand = |name: &str, fallback: LengthPercentage| {
            self.length(id, name)
                .map_or(fallback, CssLength::length_percentage)
        };
        taffy::Rect {
            top: longhand("padding-top", top),
            right: longhand("padding-right", right),
            bottom: longhand("padding-bottom", bottom),
            left: longhand("padding-left", left),
        }
    }

    fn apply_flex_item(&self, id: NodeId, style: &mut taffy::Style) {
        match self.prop(id, "flex") {
            Some("none") => {
                style.flex_grow = 0.0;
                style.flex_shrink = 0.0;
            }
            Some("auto") => style.flex_grow = 1.0,
            Some(value) => {
                let mut tokens = value.split_whitespace();
                if let Some(grow) = tokens.next().and_then(|t| t.parse::<f32>().ok()) {
                    style.flex_grow = grow;
                    style.flex_basis = Dimension::Length(0.0);
                    let mut rest = tokens.peekable();
                    if let Some(shrink) = rest.peek().and_then(|t| t.parse::<f32>().ok()) {
                        style.flex_shrink = shrink;
                        rest.next();
                    }
                    if let Some(basis) = rest.next() {
                        style.flex_basis = CssLength::parse(basis)
                            .map_or(Dimension::Auto, CssLength::dimension);
                    }
                }
            }
            None => {}
        }
        if let Some(grow) = self.prop(id, "flex-grow").and_then(|v| v.parse().ok()) {
            style.flex_grow = grow;
        }
        if let Some(shrink) = self.prop(id, "flex-shrink").and_then(|v| v.parse().ok()) {
            style.flex_shrink = shrink;
        }
        if self.prop(id, "flex-basis").is_some() {
            style.flex_basis = self.dimension(id, "flex-basis");
        }
    }

    fn apply_flex_container(&self, id: NodeId, style: &mut taffy::Style) {
        style.display = Display::Flex;
        style.flex_direction = match self.prop(id, "flex-direction") {
            Some("column") => FlexDirection::Column,
            Some("column-reverse") => FlexDirection::ColumnReverse,
            Some("row-reverse") => FlexDirection::RowReverse,
            _ => FlexDirection::Row,
        };
        style.flex_wrap = match self.prop(id, "flex-wrap") {
            Some("wrap") => FlexWrap::Wrap,
            Some("wrap-reverse") => FlexWrap::WrapReverse,
            _ => FlexWrap::NoWrap,
        };
        style.align_items = match self.prop(id, "align-items") {
            Some("flex-start" | "start") => Some(AlignItems::FlexStart),
            Some("flex-end" | "end") => Some(AlignItems::FlexEnd),
            Some("center") => Some(AlignItems::Center),
            Some("baseline") => Some(AlignItems::Baseline),
            _ => None,
        };
        // `gap: <row> <column>`
        let gaps: Vec<LengthPercentage> = self
            .prop(id, "gap")
            .map(|v| {
                v.split_whitespace()
                    .filter_map(CssLength::parse)
                    .map(CssLength::length_percentage)
                    .collect()
            })
            .unwrap_or_default();
        if let Some(row) = gaps.first().copied() {
            style.gap = Size {
                width: gaps.get(1).copied().unwrap_or(row),
                height: row,
            };
        }
    }

    /// Declared size of a replaced element (`img`, form controls), if it is one.
    fn replaced_size(&self, node: NodeRef<'_, Node>) -> Option<Size<Dimension>> {
        let default = match tag(node) {
            "img" | "video" | "canvas" | "iframe" => REPLACED_DEFAULT,
            "input" | "select" | "textarea" => CONTROL_DEFAULT,
            _ => return None,
        };
        let id = node.id();
        let side = |name: &str, fallback: f32| {
            self.length(id, name)
                .or_else(|| attr(node, name).and_then(CssLength::parse))
                .map_or(Dimension::Length(fallback), CssLength::dimension)
        };
        Some(Size {
            width: side("width", default.0),
            height: side("height", default.1),
        })
    }

    /// Builds the box of `node` and its subtree. Hidden elements get no box.
    fn element(&mut self, node: NodeRef<'_, Node>) -> TaffyResult<Option<taffy::NodeId>> {
        if self.is_hidden(node) {
            return Ok(None);
        }
        let id = node.id();
        let mut style = self.base_style(id);
        let layout_id = if let Some(size) = self.replaced_size(node) {
            style.size = size;
            style.flex_shrink = 0.0;
            self.taffy.new_leaf(style)?
        } else {
            let mut items = Vec::new();
            let mut positioned = Vec::new();
            for child in node.children() {
                match child.value() {
                    Node::Text(text) => {
                        if let Some(run) = TextRun::new(text.deref()) {
                            let leaf = self
                                .taffy
                                .new_leaf_with_context(taffy::Style::default(), run)?;
                            items.push(Item::Inline(leaf));
                        }
                    }
                    Node::Element(_) => {
                        let inline = self.is_inline(child);
                        let positioning = self.positioning(child.id());
                        let Some(child_id) = self.element(child)? else {
                            continue;
                        };
                        match positioning {
                            Positioning::Absolute => positioned.push(child_id),
                            Positioning::Fixed => self.fixed.push(child_id),
                            Positioning::Flow if inline => items.push(Item::Inline(child_id)),
                            Positioning::Flow => items.push(Item::Block(child_id)),
                        }
                    }
                    _ => {}
                }
            }

            let mut children = if matches!(self.prop(id, "display"), Some("flex" | "inline-flex"))
            {
                self.apply_flex_container(id, &mut style);
                items.iter().map(Item::id).collect()
            } else if items.iter().all(|item| matches!(item, Item::Inline(_))) {
                line_box(&mut style);
                items.iter().map(Item::id).collect()
            } else {
                self.group_lines(items)?
            };
            children.extend(positioned);
            self.taffy.new_with_children(style, &children)?
        };
        self.elements.insert(layout_id, id);
        Ok(Some(layout_id))
    }

    /// Block children stay as they are; each run of inline items gets its own line box.
    fn group_lines(&mut self, items: Vec<Item>) -> TaffyResult<Vec<taffy::NodeId>> {
        let mut out = Vec::new();
        let mut line = Vec::new();
        for item in items {
            match item {
                Item::Inline(id) => line.push(id),
                Item::Block(id) => {
                    self.close_line(&mut line, &mut out)?;
                    out.push(id);
                }
            }
        }
        self.close_line(&mut line, &mut out)?;
        Ok(out)
    }

    fn close_line(
        &mut self,
        line: &mut Vec<taffy::NodeId>,
        out: &mut Vec<taffy::NodeId>,
    ) -> TaffyResult<()> {
        if line.is_empty() {
            return Ok(());
        }
        let mut style = taffy::Style::default();
        line_box(&mut style);
        out.push(self.taffy.new_with_children(style, line)?);
        line.clear();
        Ok(())
    }

    /// Page-relative boxes of every element under `node`.
    fn collect(
        &self,
        node: taffy::NodeId,
        origin: (f32, f32),
        boxes: &mut HashMap<NodeId, Rect>,
    ) -> TaffyResult<()> {
        let layout = self.taffy.layout(node)?;
        let x = origin.0 + layout.location.x;
        let y = origin.1 + layout.location.y;
        if let Some(id) = self.elements.get(&node) {
            boxes.insert(
                *id,
                Rect::new(
                    f64::from(x),
                    f64::from(y),
                    f64::from(layout.size.width),
                    f64::from(layout.size.height),
                ),
            );
        }
        for child in self.taffy.children(node)? {
            self.collect(child, (x, y), boxes)?;
        }
        Ok(())
    }
}

impl Item {
    fn id(&self) -> taffy::NodeId {
        match *self {
            Self::Block(id) | Self::Inline(id) => id,
        }
    }
}

fn tag<'n>(node: NodeRef<'n, Node>) -> &'n str {
    node.value()
        .as_element()
        .map(|el| el.name())
        .unwrap_or_default()
}

fn attr<'n>(node: NodeRef<'n, Node>, name: &str) -> Option<&'n str> {
    node.value().as_element().and_then(|el| el.attr(name))
}

/// Lays out the subtree under `root` at the viewport width and returns each element's
/// box in page coordinates. Hidden elements and their descendants are absent.
pub(crate) fn layout_boxes(
    document: &Html,
    root: NodeId,
    styles: &HashMap<NodeId, Declarations>,
    viewport: &Viewport,
) -> Result<HashMap<NodeId, Rect>, ParseError> {
    let mut boxes = HashMap::new();
    let Some(root) = document.tree.get(root) else {
        return Ok(boxes);
    };
    let mut builder = BoxBuilder {
        styles,
        taffy: TaffyTree::new(),
        elements: HashMap::new(),
        fixed: Vec::new(),
    };
    let Some(root_id) = builder.element(root)? else {
        return Ok(boxes);
    };

    let width = viewport.width as f32;
    let mut root_style = builder.taffy.style(root_id)?.clone();
    root_style.size.width = Dimension::Length(width);
    builder.taffy.set_style(root_id, root_style)?;
    for fixed in std::mem::take(&mut builder.fixed) {
        builder.taffy.add_child(root_id, fixed)?;
    }

    builder.taffy.compute_layout_with_measure(
        root_id,
        Size {
            width: AvailableSpace::Definite(width),
            height: AvailableSpace::MaxContent,
        },
        |known, available, _node, context, _style| match context {
            Some(run) => measure_text(run, known, available),
            None => Size::ZERO,
        },
    )?;
    builder.collect(root_id, (0.0, 0.0), &mut boxes)?;
    debug!(
        layout_nodes = builder.taffy.total_node_count(),
        boxes = boxes.len(),
        "page boxes computed"
    );
    Ok(boxes)
}
