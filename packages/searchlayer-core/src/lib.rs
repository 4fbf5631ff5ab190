pub mod compositor;
pub mod config;
pub mod engine;
pub mod fit;
pub mod font;
pub mod geometry;
pub mod markup;
pub mod pipeline;
pub mod reconcile;
pub mod region;
pub mod repair;
pub mod sidecar;

pub use compositor::{
    CompositeError, Compositor, ImagePlacement, ImageRef, PageCanvas, PagePlan, PlacedImage, PlanRecorder,
    TextRendering, TextRun,
};
pub use config::{ConfigError, OverlayConfig, TextColor};
pub use engine::{EngineError, MarkupPass, OcrInput, Recognition, RecognitionBackend};
pub use fit::{fit_font_size, FitError, FontFit};
pub use font::{FontError, FontMetrics, GlyphMetrics, UniformMetrics};
pub use geometry::{compute_page_geometry, Dpi, PageGeometry, PixelSize, ScalePolicy, Size};
pub use markup::{parse_markup, MarkupDocument};
pub use pipeline::{Frame, RunContext, RunError, RunReport, SourceImage};
pub use reconcile::{reconcile_page, ReconcileOptions, TextPositioning, Transcript};
pub use region::{BoundingBox, PageIndex, PixelBox, TextRegion};
pub use repair::repair_word_boxes;
pub use sidecar::SidecarBackend;
