pub mod annotation;
pub mod beam;
pub mod canvas;
pub mod context;
pub mod error;
pub mod generator;
pub mod items;
pub mod options;
pub mod slur;
pub mod sprites;
pub mod staff;
pub mod symbols;
pub mod vocabulary;

pub use annotation::{parse, repair_annotation, stringify, validate_annotation};
pub use annotation::{AnnotationWarning, ParsedAnnotation, TokenGroup};
pub use canvas::{annotation_to_canvas, Canvas, ScoreGeometry};
pub use context::LayoutContext;
pub use error::*;
pub use generator::generate_random_annotation;
pub use options::{CanvasOptions, RawCanvasOptions};

/// Lay an annotation out on a fresh canvas.
/// This is the main entry point for the library.
pub fn layout_annotation(
    annotation: &str,
    options: CanvasOptions,
    ctx: &mut LayoutContext,
) -> Result<ScoreGeometry, HandstaffError> {
    let mut canvas = Canvas::new(options);
    annotation_to_canvas(&mut canvas, annotation)?;
    canvas.render_geometry(ctx)
}

/// Lay out an annotation that must parse without warnings.
pub fn layout_valid_annotation(
    annotation: &str,
    options: CanvasOptions,
    ctx: &mut LayoutContext,
) -> Result<ScoreGeometry, HandstaffError> {
    validate_annotation(annotation)?;
    layout_annotation(annotation, options, ctx)
}
