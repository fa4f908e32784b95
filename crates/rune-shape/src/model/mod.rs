//! The shape record exchanged between visual designs and generated interfaces.

pub mod binding;
pub mod color;
pub mod load;
pub mod validate;

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ParseError;

pub use binding::FunctionBinding;
pub use color::normalize_color;
pub use load::{load_shapes, load_shapes_file, shapes_from_value};
pub use validate::validate_shapes;

/// Upper bound on `label` length, in characters.
pub const LABEL_MAX_CHARS: usize = 50;

/// Shape classification vocabulary. Unrecognized inputs land on [`ShapeType::Generic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShapeType {
    Text,
    NavigationHorizontal,
    NavigationVertical,
    Image,
    FunctionSidepanel,
    FunctionChatBox,
    Button,
    Rectangle,
    #[default]
    #[serde(other)]
    Generic,
}

impl ShapeType {
    pub const ALL: [ShapeType; 9] = [
        ShapeType::Text,
        ShapeType::NavigationHorizontal,
        ShapeType::NavigationVertical,
        ShapeType::Image,
        ShapeType::FunctionSidepanel,
        ShapeType::FunctionChatBox,
        ShapeType::Button,
        ShapeType::Rectangle,
        ShapeType::Generic,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ShapeType::Text => "TEXT",
            ShapeType::NavigationHorizontal => "NAVIGATION_HORIZONTAL",
            ShapeType::NavigationVertical => "NAVIGATION_VERTICAL",
            ShapeType::Image => "IMAGE",
            ShapeType::FunctionSidepanel => "FUNCTION_SIDEPANEL",
            ShapeType::FunctionChatBox => "FUNCTION_CHAT_BOX",
            ShapeType::Button => "BUTTON",
            ShapeType::Rectangle => "RECTANGLE",
            ShapeType::Generic => "GENERIC",
        }
    }

    /// Lenient parse: case-insensitive, `-` and `_` interchangeable. Never fails.
    pub fn parse(raw: &str) -> ShapeType {
        let wanted = raw.trim().to_ascii_uppercase().replace('-', "_");
        ShapeType::ALL
            .into_iter()
            .find(|kind| kind.as_str() == wanted)
            .unwrap_or(ShapeType::Generic)
    }

    /// Marker class written on generated components, e.g. `shape-function-chat-box`.
    pub fn css_class(self) -> String {
        format!("shape-{}", self.as_str().to_ascii_lowercase().replace('_', "-"))
    }

    /// Inverse of [`ShapeType::css_class`]; `None` for classes that are not type markers.
    pub fn from_css_class(class: &str) -> Option<ShapeType> {
        ShapeType::ALL
            .into_iter()
            .find(|kind| kind.css_class() == class)
    }
}

impl fmt::Display for ShapeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state. Only `active` has meaning; everything else is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ShapeState {
    #[default]
    Active,
    Other(String),
}

impl ShapeState {
    pub fn is_active(&self) -> bool {
        matches!(self, ShapeState::Active)
    }
}

impl From<String> for ShapeState {
    fn from(value: String) -> Self {
        if value.trim().eq_ignore_ascii_case("active") {
            ShapeState::Active
        } else {
            ShapeState::Other(value)
        }
    }
}

impl From<ShapeState> for String {
    fn from(value: ShapeState) -> Self {
        match value {
            ShapeState::Active => "active".to_string(),
            ShapeState::Other(other) => other,
        }
    }
}

/// Polar position of a shape's center relative to the viewport center.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VectorFromCenter {
    /// Degrees, `atan2` convention with screen y growing downwards.
    pub angle: f64,
    pub distance: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Logical screen the shapes are laid out against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn center(&self) -> Point {
        Point {
            x: self.width as f64 / 2.0,
            y: self.height as f64 / 2.0,
        }
    }

    pub fn ensure_valid(&self) -> Result<(), ParseError> {
        if self.width == 0 || self.height == 0 {
            return Err(ParseError::InvalidViewport {
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }
}

impl FromStr for Viewport {
    type Err = ParseError;

    /// Parses `WIDTHxHEIGHT`, e.g. `1920x1080`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseError::InvalidViewport {
            width: 0,
            height: 0,
        };
        let (w, h) = s
            .trim()
            .to_ascii_lowercase()
            .split_once('x')
            .map(|(w, h)| (w.trim().to_string(), h.trim().to_string()))
            .ok_or_else(invalid)?;
        let viewport = Viewport {
            width: w.parse().map_err(|_| invalid())?,
            height: h.parse().map_err(|_| invalid())?,
        };
        viewport.ensure_valid()?;
        Ok(viewport)
    }
}

/// A serializable rectangle with geometry, style and semantic-role metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shape {
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: ShapeType,
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
    #[serde(default)]
    pub z_index: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vector_from_center: Option<VectorFromCenter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<FunctionBinding>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_data: Option<Value>,
    #[serde(default = "default_area")]
    pub area: u32,
    #[serde(default)]
    pub state: ShapeState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<String>,
}

fn default_area() -> u32 {
    1
}

impl Shape {
    /// Minimal active shape with the given id, type and geometry.
    pub fn new(id: impl Into<String>, kind: ShapeType, x: i64, y: i64, width: i64, height: i64) -> Self {
        Self {
            id: id.into(),
            kind,
            x,
            y,
            width,
            height,
            z_index: 0,
            vector_from_center: None,
            fill: None,
            border: None,
            label: None,
            text: None,
            function: None,
            source_data: None,
            area: default_area(),
            state: ShapeState::Active,
            created: None,
            updated: None,
        }
    }

    pub fn with_label(mut self, label: impl AsRef<str>) -> Self {
        self.label = Some(truncate_label(label.as_ref()));
        self
    }

    pub fn with_fill(mut self, fill: impl Into<String>) -> Self {
        self.fill = Some(fill.into());
        self
    }

    pub fn with_border(mut self, border: impl Into<String>) -> Self {
        self.border = Some(border.into());
        self
    }

    pub fn with_function(mut self, function: FunctionBinding) -> Self {
        self.function = Some(function);
        self
    }

    /// Corners in clockwise order starting top-left.
    pub fn corners(&self) -> [Point; 4] {
        let (x, y) = (self.x as f64, self.y as f64);
        let (r, b) = (x + self.width as f64, y + self.height as f64);
        [
            Point { x, y },
            Point { x: r, y },
            Point { x: r, y: b },
            Point { x, y: b },
        ]
    }

    pub fn center(&self) -> Point {
        Point {
            x: self.x as f64 + self.width as f64 / 2.0,
            y: self.y as f64 + self.height as f64 / 2.0,
        }
    }

    pub fn polar_from_center(&self, origin: Point) -> VectorFromCenter {
        polar(self.center(), origin)
    }

    /// Recomputes `vector_from_center` against the viewport center.
    pub fn with_vector_from(mut self, viewport: &Viewport) -> Self {
        self.vector_from_center = Some(self.polar_from_center(viewport.center()));
        self
    }

    /// Text shown when the shape is rendered: explicit text, else the label.
    pub fn display_text(&self) -> Option<&str> {
        self.text
            .as_deref()
            .or(self.label.as_deref())
            .filter(|t| !t.trim().is_empty())
    }
}

pub(crate) fn polar(point: Point, origin: Point) -> VectorFromCenter {
    let dx = point.x - origin.x;
    let dy = point.y - origin.y;
    VectorFromCenter {
        angle: dy.atan2(dx).to_degrees(),
        distance: dx.hypot(dy),
    }
}

/// Truncates to [`LABEL_MAX_CHARS`] characters, respecting char boundaries.
pub fn truncate_label(input: &str) -> String {
    let trimmed = input.trim();
    match trimmed.char_indices().nth(LABEL_MAX_CHARS) {
        Some((cut, _)) => trimmed[..cut].trim_end().to_string(),
        None => trimmed.to_string(),
    }
}
