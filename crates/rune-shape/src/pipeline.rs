//! The generate, extract, compare cycle driven by one explicit [`Context`].

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::codegen::{GenerateOptions, GeneratedInterface, generate_from_shapes};
use crate::error::{ClassificationWarning, Result};
use crate::fidelity::{CompareOptions, FidelityReport, compare};
use crate::model::{Shape, Viewport};
use crate::pack::{ExtractOptions, extract_from_markup};

/// Everything a round trip reads. Nothing is taken from ambient state.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Context {
    pub viewport: Viewport,
    pub generate: GenerateOptions,
    pub extract: ExtractOptions,
    pub compare: CompareOptions,
}

impl Context {
    /// Defaults for a round trip: ids preserved, no keyword guessing.
    pub fn round_trip(viewport: Viewport) -> Self {
        Self {
            viewport,
            extract: ExtractOptions {
                viewport,
                preserve_ids: true,
                infer_functions: false,
                stamp_timestamps: false,
            },
            ..Self::default()
        }
    }

    /// Extraction options with the context viewport applied.
    pub fn extract_options(&self) -> ExtractOptions {
        ExtractOptions {
            viewport: self.viewport,
            ..self.extract.clone()
        }
    }
}

#[derive(Debug, Clone)]
pub struct RoundTrip {
    pub interface: GeneratedInterface,
    pub extracted: Vec<Shape>,
    pub report: FidelityReport,
    /// Warnings from every stage, in stage order.
    pub warnings: Vec<ClassificationWarning>,
}

/// Generates an interface from `shapes`, extracts shapes back from its markup and styles,
/// and compares the two lists. The original list is validated first, so shapes that
/// could never be generated do not count against the score.
pub fn round_trip(ctx: &Context, shapes: &[Shape]) -> Result<RoundTrip> {
    let (interface, mut warnings) =
        generate_from_shapes(shapes, &ctx.viewport, &ctx.generate)?.into_parts();
    let original: Vec<Shape> = interface
        .layout
        .shapes()
        .map(|(_, shape)| shape.clone())
        .collect();

    let (extracted, extract_warnings) = extract_from_markup(
        &interface.markup,
        std::slice::from_ref(&interface.styles),
        &ctx.extract_options(),
    )?
    .into_parts();
    warnings.extend(extract_warnings);

    let report = compare(&original, &extracted, &ctx.compare);
    info!(
        original = original.len(),
        extracted = extracted.len(),
        score = report.score,
        warnings = warnings.len(),
        "round trip finished"
    );
    Ok(RoundTrip {
        interface,
        extracted,
        report,
        warnings,
    })
}
