//! Shape model to web interface engine: layout classification, code generation, reverse
//! extraction and round-trip fidelity scoring.

pub mod codegen;
pub mod diagnostics;
pub mod error;
pub mod fidelity;
pub mod layout;
pub mod model;
pub mod pack;
pub mod pipeline;
pub mod schema;

pub use codegen::{GenerateOptions, GeneratedInterface, generate, generate_from_shapes};
pub use error::{
    ClassificationWarning, Outcome, ParseError, Result, ShapeError, ValidationError, WarningKind,
};
pub use fidelity::{CompareOptions, FidelityReport, ModifiedShape, compare};
pub use layout::{Layout, Placement, Region, analyze, classify_position};
pub use model::{FunctionBinding, Shape, ShapeType, Viewport, load_shapes, load_shapes_file};
pub use pack::{ExtractOptions, HtmlTree, StructuralTree, extract, extract_from_markup};
pub use pipeline::{Context, RoundTrip, round_trip};
