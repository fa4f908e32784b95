//! Synthesizes markup, styles, behavior bindings and an app manifest from a [`Layout`].

mod behavior;
mod bundle;
mod manifest;
mod markup;
mod styles;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::diagnostics::diagnostics_enabled;
use crate::error::{ClassificationWarning, Outcome, ParseError, WarningKind};
use crate::layout::{Layout, analyze};
use crate::model::{Shape, Viewport};

pub use bundle::{BundleEntry, BundleToc, TOC_FILE};
pub use manifest::{AppManifest, ManifestIcon, build_manifest};
pub use markup::{FUNCTION_ATTR, REGION_ATTR};

pub const INDEX_HTML: &str = "index.html";
pub const STYLES_CSS: &str = "generated-styles.css";
pub const BEHAVIOR_JS: &str = "generated-interface.js";
pub const MANIFEST_JSON: &str = "manifest.json";

/// Prefix joining a shape id to the element id of its generated component.
pub const COMPONENT_ID_PREFIX: &str = "component-";

pub fn component_id(shape_id: &str) -> String {
    format!("{COMPONENT_ID_PREFIX}{shape_id}")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerateOptions {
    pub title: String,
    /// Adds the viewport meta tag and a narrow-screen media block.
    pub responsive: bool,
    /// Emits `manifest.json` and links it from the markup.
    pub manifest: bool,
    /// Passed through to `body[data-theme]`.
    pub theme: String,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            title: "Generated Interface".to_string(),
            responsive: true,
            manifest: false,
            theme: "light".to_string(),
        }
    }
}

/// The generated artifacts plus the layout they came from.
#[derive(Debug, Clone)]
pub struct GeneratedInterface {
    pub markup: String,
    pub styles: String,
    pub behavior: String,
    pub manifest: Option<AppManifest>,
    pub layout: Layout,
}

/// Generates the interface for an already-classified layout. Never fails: absent buckets
/// are empty, unknown function bindings become runtime warnings in the script.
pub fn generate(layout: &Layout, options: &GenerateOptions) -> Outcome<GeneratedInterface> {
    let mut warnings = Vec::new();
    for (id, binding) in &layout.functions {
        if !binding.is_known() {
            warn!(id = %id, function = %binding, "function binding has no generated handler");
            warnings.push(ClassificationWarning::new(
                WarningKind::UnknownFunction,
                id.clone(),
                format!("`{binding}` will log a warning when clicked"),
            ));
        }
    }

    let markup = markup::render_markup(layout, options);
    let styles = styles::render_styles(layout, options);
    let behavior = behavior::render_behavior(layout, options);
    let manifest = options.manifest.then(|| build_manifest(&options.title));

    if diagnostics_enabled("codegen") {
        info!(
            markup_bytes = markup.len(),
            styles_bytes = styles.len(),
            behavior_bytes = behavior.len(),
            manifest = manifest.is_some(),
            "diagnostics: interface generated"
        );
    }
    debug!(components = layout.len(), title = %options.title, "generated interface");

    Outcome::new(
        GeneratedInterface {
            markup,
            styles,
            behavior,
            manifest,
            layout: layout.clone(),
        },
        warnings,
    )
}

/// Classifies `shapes` against `viewport` and generates the interface in one call.
pub fn generate_from_shapes(
    shapes: &[Shape],
    viewport: &Viewport,
    options: &GenerateOptions,
) -> Result<Outcome<GeneratedInterface>, ParseError> {
    let (layout, mut warnings) = analyze(shapes, viewport)?.into_parts();
    let (interface, generated) = generate(&layout, options).into_parts();
    warnings.extend(generated);
    Ok(Outcome::new(interface, warnings))
}
