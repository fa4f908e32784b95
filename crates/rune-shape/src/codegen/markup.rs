use std::fmt::Write as _;

use htmlize::{escape_attribute, escape_text};
use serde_json::Value;

use crate::layout::{Layout, Region};
use crate::model::{Shape, ShapeType};

use super::{BEHAVIOR_JS, GenerateOptions, MANIFEST_JSON, STYLES_CSS, component_id};

/// Attribute carried by region containers. The extractor treats such containers as
/// transparent wrappers rather than shapes.
pub const REGION_ATTR: &str = "data-region";
pub const FUNCTION_ATTR: &str = "data-function";

pub(super) fn render_markup(layout: &Layout, options: &GenerateOptions) -> String {
    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("  <meta charset=\"utf-8\">\n");
    if options.responsive {
        html.push_str(
            "  <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n",
        );
    }
    let _ = writeln!(html, "  <title>{}</title>", escape_text(options.title.as_str()));
    let _ = writeln!(html, "  <link rel=\"stylesheet\" href=\"{STYLES_CSS}\">");
    if options.manifest {
        let _ = writeln!(html, "  <link rel=\"manifest\" href=\"{MANIFEST_JSON}\">");
    }
    html.push_str("</head>\n");
    let _ = writeln!(
        html,
        "<body data-theme=\"{}\">",
        escape_attribute(options.theme.as_str())
    );
    html.push_str("  <div class=\"page\">\n");
    render_region(&mut html, layout, Region::Header, 4);
    render_region(&mut html, layout, Region::Navigation, 4);
    html.push_str("    <div class=\"region-body\">\n");
    render_region(&mut html, layout, Region::Sidebar, 6);
    render_region(&mut html, layout, Region::Main, 6);
    html.push_str("    </div>\n");
    render_region(&mut html, layout, Region::Footer, 4);
    html.push_str("  </div>\n");
    let _ = writeln!(html, "  <script src=\"{BEHAVIOR_JS}\"></script>");
    html.push_str("</body>\n</html>\n");
    html
}

fn render_region(html: &mut String, layout: &Layout, region: Region, indent: usize) {
    let pad = " ".repeat(indent);
    let tag = region.tag();
    let name = region.name();
    let _ = writeln!(
        html,
        "{pad}<{tag} id=\"region-{name}\" class=\"region region-{name}\" {REGION_ATTR}=\"{name}\">"
    );
    for shape in layout.bucket(region) {
        let _ = writeln!(html, "{pad}  {}", render_component(shape, region));
    }
    let _ = writeln!(html, "{pad}</{tag}>");
}

fn common_attributes(shape: &Shape) -> String {
    let mut attrs = format!(
        "id=\"{}\" class=\"component {}\"",
        escape_attribute(component_id(&shape.id)),
        shape.kind.css_class()
    );
    if let Some(function) = &shape.function {
        let _ = write!(
            attrs,
            " {FUNCTION_ATTR}=\"{}\"",
            escape_attribute(function.qualified())
        );
    }
    if let Some(label) = &shape.label {
        let _ = write!(attrs, " aria-label=\"{}\"", escape_attribute(label.as_str()));
    }
    attrs
}

fn render_component(shape: &Shape, region: Region) -> String {
    let attrs = common_attributes(shape);
    let text = shape.display_text().map(escape_text).unwrap_or_default();
    match shape.kind {
        ShapeType::Text => {
            let tag = if region == Region::Header { "h1" } else { "p" };
            format!("<{tag} {attrs}>{text}</{tag}>")
        }
        ShapeType::NavigationHorizontal | ShapeType::NavigationVertical => {
            let items = nav_items(shape.source_data.as_ref());
            let mut list = String::new();
            if items.is_empty() && !text.is_empty() {
                let _ = write!(list, "<li><span>{text}</span></li>");
            }
            for (label, href) in items {
                let _ = write!(
                    list,
                    "<li><a href=\"{}\">{}</a></li>",
                    escape_attribute(href.as_str()),
                    escape_text(label.as_str())
                );
            }
            format!("<div {attrs} role=\"navigation\"><ul>{list}</ul></div>")
        }
        ShapeType::Image => match image_source(shape.source_data.as_ref()) {
            Some(src) => format!(
                "<img {attrs} src=\"{}\" alt=\"{}\">",
                escape_attribute(src.as_str()),
                escape_attribute(shape.label.as_deref().unwrap_or_default())
            ),
            None => format!("<div {attrs} role=\"img\"></div>"),
        },
        ShapeType::FunctionSidepanel => format!(
            "<section {attrs}><h2 class=\"panel-title\">{text}</h2><div class=\"panel-body\"></div></section>"
        ),
        ShapeType::FunctionChatBox => format!(
            "<section {attrs}><div class=\"chat-log\" aria-live=\"polite\"></div>\
             <form class=\"chat-input\"><input type=\"text\" placeholder=\"{}\">\
             <button type=\"submit\">Send</button></form></section>",
            escape_attribute(shape.display_text().unwrap_or("Message"))
        ),
        ShapeType::Button => format!("<button type=\"button\" {attrs}>{text}</button>"),
        ShapeType::Rectangle | ShapeType::Generic => format!("<div {attrs}>{text}</div>"),
    }
}

/// Navigation entries from `sourceData`: either an array, or an object with an `items`
/// array. Entries are strings or objects with `label`/`text` and optional `href`.
pub(crate) fn nav_items(source: Option<&Value>) -> Vec<(String, String)> {
    let entries = match source {
        Some(Value::Array(items)) => items,
        Some(Value::Object(map)) => match map.get("items") {
            Some(Value::Array(items)) => items,
            _ => return Vec::new(),
        },
        _ => return Vec::new(),
    };
    entries
        .iter()
        .filter_map(|entry| match entry {
            Value::String(label) => Some((label.clone(), "#".to_string())),
            Value::Object(map) => {
                let label = map
                    .get("label")
                    .or_else(|| map.get("text"))
                    .and_then(Value::as_str)?;
                let href = map.get("href").and_then(Value::as_str).unwrap_or("#");
                Some((label.to_string(), href.to_string()))
            }
            _ => None,
        })
        .collect()
}

/// Image URI from `sourceData`: a bare string or an object with `src`, `uri` or `url`.
pub(crate) fn image_source(source: Option<&Value>) -> Option<String> {
    match source? {
        Value::String(uri) if !uri.trim().is_empty() => Some(uri.clone()),
        Value::Object(map) => ["src", "uri", "url"]
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_str))
            .map(str::to_string),
        _ => None,
    }
}
