use std::fmt::Write as _;

use crate::layout::Layout;
use crate::model::Shape;

use super::{GenerateOptions, component_id};

/// Border width used when a shape declares a border color.
const BORDER_WIDTH_PX: u32 = 1;

const BASE_STYLES: &str = "\
* { box-sizing: border-box; }
body { margin: 0; font-family: system-ui, -apple-system, sans-serif; }
.page { display: flex; flex-direction: column; min-height: 100vh; }
.region-header, .region-navigation, .region-footer { display: flex; flex-wrap: wrap; gap: 8px; }
.region-body { display: flex; flex: 1; }
.region-sidebar { display: flex; flex-direction: column; width: 20%; gap: 8px; }
.region-main { display: flex; flex-direction: column; flex: 1; gap: 8px; }
.component { flex: none; overflow: hidden; }
.component[data-function] { cursor: pointer; }
.shape-navigation-horizontal ul { display: flex; list-style: none; margin: 0; padding: 0; gap: 16px; }
.shape-navigation-vertical ul { list-style: none; margin: 0; padding: 0; }
.shape-function-chat-box .chat-log { min-height: 4em; }
";

const RESPONSIVE_STYLES: &str = "\
@media (max-width: 768px) {
  .region-body { flex-direction: column; }
  .region-sidebar { width: 100%; }
}
";

/// Flow-layout stylesheet. Only `width`, `height`, `fill` and `border` carry over from
/// each shape; `x`/`y` are not reproduced.
pub(super) fn render_styles(layout: &Layout, options: &GenerateOptions) -> String {
    let mut css = String::from(BASE_STYLES);
    if options.responsive {
        css.push_str(RESPONSIVE_STYLES);
    }
    for (_, shape) in layout.shapes() {
        css.push_str(&component_rule(shape));
    }
    css
}

fn component_rule(shape: &Shape) -> String {
    let mut rule = format!(
        "{} {{ width: {}px; height: {}px;",
        id_selector(&component_id(&shape.id)),
        shape.width,
        shape.height
    );
    if let Some(fill) = &shape.fill {
        let _ = write!(rule, " background-color: {fill};");
    }
    if let Some(border) = &shape.border {
        let _ = write!(rule, " border: {BORDER_WIDTH_PX}px solid {border};");
    }
    rule.push_str(" }\n");
    rule
}

/// `#id` when the id is a plain identifier, otherwise an attribute selector.
fn id_selector(id: &str) -> String {
    let plain = id
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic())
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if plain {
        format!("#{id}")
    } else {
        format!("[id=\"{}\"]", id.replace('\\', "\\\\").replace('"', "\\\""))
    }
}
