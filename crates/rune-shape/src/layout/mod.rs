//! Classifies a flat shape list into semantic page regions by screen position.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::diagnostics::diagnostics_enabled;
use crate::error::{Outcome, ParseError};
use crate::model::{FunctionBinding, Shape, ShapeType, Viewport, validate_shapes};

/// Fraction of the viewport height treated as the upper band.
pub const UPPER_FRACTION: f64 = 0.2;
/// Fraction of the viewport height below which the lower band starts.
pub const LOWER_FRACTION: f64 = 0.8;
pub const LEFT_FRACTION: f64 = 1.0 / 3.0;
pub const RIGHT_FRACTION: f64 = 2.0 / 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vertical {
    Upper,
    Middle,
    Lower,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Horizontal {
    Left,
    Center,
    Right,
}

/// Cell of the 3x3 logical grid a point falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Placement {
    pub vertical: Vertical,
    pub horizontal: Horizontal,
}

impl Placement {
    /// Classifies a point in page coordinates. Points outside the viewport clamp to the
    /// nearest band.
    pub fn of_point(x: f64, y: f64, viewport: &Viewport) -> Self {
        let fx = x / viewport.width.max(1) as f64;
        let fy = y / viewport.height.max(1) as f64;
        let vertical = if fy < UPPER_FRACTION {
            Vertical::Upper
        } else if fy >= LOWER_FRACTION {
            Vertical::Lower
        } else {
            Vertical::Middle
        };
        let horizontal = if fx < LEFT_FRACTION {
            Horizontal::Left
        } else if fx >= RIGHT_FRACTION {
            Horizontal::Right
        } else {
            Horizontal::Center
        };
        Self {
            vertical,
            horizontal,
        }
    }

    pub fn is_side(&self) -> bool {
        matches!(self.horizontal, Horizontal::Left | Horizontal::Right)
    }
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let v = match self.vertical {
            Vertical::Upper => "upper",
            Vertical::Middle => "middle",
            Vertical::Lower => "lower",
        };
        let h = match self.horizontal {
            Horizontal::Left => "left",
            Horizontal::Center => "center",
            Horizontal::Right => "right",
        };
        write!(f, "{v} {h}")
    }
}

/// Placement of a shape, judged by its center point.
pub fn classify_position(shape: &Shape, viewport: &Viewport) -> Placement {
    let center = shape.center();
    Placement::of_point(center.x, center.y, viewport)
}

/// Semantic page region. Each maps to one fixed container element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    Header,
    Navigation,
    Sidebar,
    Main,
    Footer,
}

impl Region {
    /// Document order of the generated containers.
    pub const ALL: [Region; 5] = [
        Region::Header,
        Region::Navigation,
        Region::Sidebar,
        Region::Main,
        Region::Footer,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            Region::Header => "header",
            Region::Navigation => "nav",
            Region::Sidebar => "aside",
            Region::Main => "main",
            Region::Footer => "footer",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Region::Header => "header",
            Region::Navigation => "navigation",
            Region::Sidebar => "sidebar",
            Region::Main => "main",
            Region::Footer => "footer",
        }
    }
}

/// Bucket precedence, first match wins.
pub fn assign_region(shape: &Shape, placement: Placement) -> Region {
    if shape.kind == ShapeType::NavigationHorizontal || placement.vertical == Vertical::Upper {
        let header_text = shape.kind == ShapeType::Text
            && placement.vertical == Vertical::Upper
            && placement.horizontal == Horizontal::Center;
        return if header_text {
            Region::Header
        } else {
            Region::Navigation
        };
    }
    if shape.kind == ShapeType::FunctionSidepanel || placement.is_side() {
        return Region::Sidebar;
    }
    if placement.vertical == Vertical::Lower {
        return Region::Footer;
    }
    Region::Main
}

/// Shapes grouped into regions, in source order within each bucket.
///
/// Every bucket defaults to empty when deserialized, so a layout missing a key is read
/// as having nothing in that region.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Layout {
    pub header: Vec<Shape>,
    pub navigation: Vec<Shape>,
    pub sidebar: Vec<Shape>,
    pub main: Vec<Shape>,
    pub footer: Vec<Shape>,
    /// `shape id -> binding` for every shape that declares one.
    pub functions: BTreeMap<String, FunctionBinding>,
    /// `shape id -> placement` computed during analysis.
    pub placements: BTreeMap<String, Placement>,
}

impl Layout {
    pub fn bucket(&self, region: Region) -> &[Shape] {
        match region {
            Region::Header => &self.header,
            Region::Navigation => &self.navigation,
            Region::Sidebar => &self.sidebar,
            Region::Main => &self.main,
            Region::Footer => &self.footer,
        }
    }

    fn bucket_mut(&mut self, region: Region) -> &mut Vec<Shape> {
        match region {
            Region::Header => &mut self.header,
            Region::Navigation => &mut self.navigation,
            Region::Sidebar => &mut self.sidebar,
            Region::Main => &mut self.main,
            Region::Footer => &mut self.footer,
        }
    }

    /// Total shapes across all buckets.
    pub fn len(&self) -> usize {
        Region::ALL.iter().map(|r| self.bucket(*r).len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All shapes in region order, then source order.
    pub fn shapes(&self) -> impl Iterator<Item = (Region, &Shape)> {
        Region::ALL
            .into_iter()
            .flat_map(move |region| self.bucket(region).iter().map(move |s| (region, s)))
    }

    pub fn region_of(&self, id: &str) -> Option<Region> {
        self.shapes()
            .find(|(_, shape)| shape.id == id)
            .map(|(region, _)| region)
    }
}

/// Builds a fresh layout from a shape list. Invalid and duplicate shapes are skipped with
/// a warning; every remaining shape lands in exactly one bucket.
pub fn analyze(shapes: &[Shape], viewport: &Viewport) -> Result<Outcome<Layout>, ParseError> {
    viewport.ensure_valid()?;
    let validated = validate_shapes(shapes.to_vec());
    let mut layout = Layout::default();
    for shape in validated.value {
        let placement = classify_position(&shape, viewport);
        let region = assign_region(&shape, placement);
        if diagnostics_enabled("layout") {
            info!(id = %shape.id, kind = %shape.kind, %placement, region = region.name(), "diagnostics: shape bucketed");
        }
        if let Some(function) = &shape.function {
            layout.functions.insert(shape.id.clone(), function.clone());
        }
        layout.placements.insert(shape.id.clone(), placement);
        layout
            .bucket_mut(region)
            .push(shape.with_vector_from(viewport));
    }
    debug!(
        header = layout.header.len(),
        navigation = layout.navigation.len(),
        sidebar = layout.sidebar.len(),
        main = layout.main.len(),
        footer = layout.footer.len(),
        "layout analyzed"
    );
    Ok(Outcome::new(layout, validated.warnings))
}
