//! Lays out one output page: the background image and a text run per region, each run
//! fitted so that its glyphs cover the region's box.

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::config::{ConfigError, OverlayConfig, TextColor};
use crate::fit::{fit_font_size, FitError};
use crate::font::FontMetrics;
use crate::geometry::{PageGeometry, Size};
use crate::region::{BoundingBox, TextRegion};

#[derive(Debug, Error)]
pub enum CompositeError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("font fit failed: {0}")]
    Fit(#[from] FitError),
    #[error("canvas error: {0}")]
    Canvas(String),
}

/// How a text run is painted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case", tag = "mode", content = "color")]
pub enum TextRendering {
    Fill(TextColor),
    /// Searchable and selectable, never drawn.
    Invisible,
}

/// Where an image is drawn on the page, in points from the bottom-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ImagePlacement {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// The image backing a page: a source file and the frame within it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageRef {
    pub source: String,
    pub frame: u32,
}

/// One fitted text run, positioned in page points.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextRun {
    pub text: String,
    pub x: f32,
    /// Baseline position.
    pub y: f32,
    pub font_size: f32,
    /// Horizontal glyph scaling in percent.
    pub horizontal_scale: f32,
    pub rendering: TextRendering,
    pub bounding_box: BoundingBox,
}

/// Page/canvas capability the compositor draws through.
pub trait PageCanvas {
    fn begin_page(&mut self, size: Size) -> Result<(), CompositeError>;
    fn draw_image(&mut self, image: &ImageRef, placement: ImagePlacement) -> Result<(), CompositeError>;
    fn draw_text(&mut self, run: TextRun) -> Result<(), CompositeError>;
    fn end_page(&mut self) -> Result<(), CompositeError>;
}

/// Placement instructions of one output page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PagePlan {
    pub width: f32,
    pub height: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<PlacedImage>,
    pub text: Vec<TextRun>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacedImage {
    #[serde(flatten)]
    pub image: ImageRef,
    #[serde(flatten)]
    pub placement: ImagePlacement,
}

/// Canvas that records instructions instead of drawing them.
#[derive(Debug, Default)]
pub struct PlanRecorder {
    pages: Vec<PagePlan>,
    open: Option<PagePlan>,
}

impl PlanRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pages(&self) -> &[PagePlan] {
        &self.pages
    }

    pub fn into_pages(self) -> Vec<PagePlan> {
        self.pages
    }

    fn current(&mut self) -> Result<&mut PagePlan, CompositeError> {
        self.open
            .as_mut()
            .ok_or_else(|| CompositeError::Canvas("no page is open".to_string()))
    }
}

impl PageCanvas for PlanRecorder {
    fn begin_page(&mut self, size: Size) -> Result<(), CompositeError> {
        if self.open.is_some() {
            return Err(CompositeError::Canvas("previous page was not ended".to_string()));
        }
        self.open = Some(PagePlan {
            width: size.width,
            height: size.height,
            image: None,
            text: Vec::new(),
        });
        Ok(())
    }

    fn draw_image(&mut self, image: &ImageRef, placement: ImagePlacement) -> Result<(), CompositeError> {
        self.current()?.image = Some(PlacedImage {
            image: image.clone(),
            placement,
        });
        Ok(())
    }

    fn draw_text(&mut self, run: TextRun) -> Result<(), CompositeError> {
        self.current()?.text.push(run);
        Ok(())
    }

    fn end_page(&mut self) -> Result<(), CompositeError> {
        let page = self
            .open
            .take()
            .ok_or_else(|| CompositeError::Canvas("no page is open".to_string()))?;
        self.pages.push(page);
        Ok(())
    }
}

/// Counts for one composited page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageStats {
    pub runs: usize,
    pub skipped: usize,
}

pub struct Compositor<'a> {
    config: &'a OverlayConfig,
    metrics: &'a dyn FontMetrics,
}

impl<'a> Compositor<'a> {
    pub fn new(config: &'a OverlayConfig, metrics: &'a dyn FontMetrics) -> Self {
        Self { config, metrics }
    }

    pub fn rendering(&self) -> TextRendering {
        match self.config.text_color {
            Some(color) => TextRendering::Fill(color),
            None => TextRendering::Invisible,
        }
    }

    /// Page size and the offset of the image within it. The image is centered on a larger
    /// fixed page, per axis, and sits at the origin otherwise.
    pub fn page_layout(&self, geometry: &PageGeometry) -> (Size, f32, f32) {
        let dest = geometry.destination;
        match self.config.page_size {
            Some(page) => {
                let dx = ((page.width - dest.width) / 2.0).max(0.0);
                let dy = ((page.height - dest.height) / 2.0).max(0.0);
                (page, dx, dy)
            }
            None => (dest, 0.0, 0.0),
        }
    }

    /// Fits one region already in page points. The run starts at the box's left edge with
    /// its baseline lifted off the box bottom by the font descent.
    pub fn fit_region(&self, text: &str, bbox: BoundingBox) -> Result<TextRun, CompositeError> {
        let fit = fit_font_size(self.metrics, text, bbox.width(), bbox.height())?;
        Ok(TextRun {
            text: text.to_string(),
            x: bbox.left,
            y: bbox.bottom + self.metrics.descent(fit.font_size),
            font_size: fit.font_size,
            horizontal_scale: fit.horizontal_scale,
            rendering: self.rendering(),
            bounding_box: bbox,
        })
    }

    /// Draws one complete page: the image layer (when given) and then the text layer.
    pub fn compose_page(
        &self,
        canvas: &mut dyn PageCanvas,
        image: Option<&ImageRef>,
        geometry: &PageGeometry,
        regions: &[TextRegion],
    ) -> Result<PageStats, CompositeError> {
        let (page, dx, dy) = self.page_layout(geometry);
        canvas.begin_page(page)?;

        if let Some(image) = image {
            canvas.draw_image(
                image,
                ImagePlacement {
                    x: dx,
                    y: dy,
                    width: geometry.destination.width,
                    height: geometry.destination.height,
                },
            )?;
        }

        let mut stats = PageStats::default();
        for region in regions {
            let bbox = geometry.to_page_space(&region.bounding_box).translated(dx, dy);
            if bbox.is_degenerate() {
                debug!(text = %region.text, "skipping region with an empty box");
                stats.skipped += 1;
                continue;
            }
            canvas.draw_text(self.fit_region(&region.text, bbox)?)?;
            stats.runs += 1;
        }

        canvas.end_page()?;
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fit::FIT_SLACK;
    use crate::font::UniformMetrics;
    use crate::geometry::{compute_page_geometry, Dpi, PixelSize, ScalePolicy};

    fn image() -> ImageRef {
        ImageRef {
            source: "scan.png".into(),
            frame: 0,
        }
    }

    #[test]
    fn test_invisible_by_default_and_fill_with_color() {
        let metrics = UniformMetrics::default();
        let config = OverlayConfig::default();
        assert_eq!(Compositor::new(&config, &metrics).rendering(), TextRendering::Invisible);

        let colored = OverlayConfig {
            text_color: Some(TextColor::new(255, 0, 0)),
            ..Default::default()
        };
        assert_eq!(
            Compositor::new(&colored, &metrics).rendering(),
            TextRendering::Fill(TextColor::new(255, 0, 0))
        );
    }

    #[test]
    fn test_compose_hello_keep_original() {
        let metrics = UniformMetrics::default();
        let config = OverlayConfig::default();
        let compositor = Compositor::new(&config, &metrics);
        let geometry = compute_page_geometry(
            PixelSize::new(200, 100),
            Some(Dpi::uniform(72.0)),
            ScalePolicy::KeepOriginal,
            None,
        )
        .unwrap();
        let regions = vec![TextRegion::new(1, "Hello", BoundingBox::new(10.0, 70.0, 60.0, 90.0))];

        let mut canvas = PlanRecorder::new();
        let stats = compositor
            .compose_page(&mut canvas, Some(&image()), &geometry, &regions)
            .unwrap();
        assert_eq!(stats.runs, 1);

        let pages = canvas.into_pages();
        assert_eq!(pages.len(), 1);
        assert_eq!((pages[0].width, pages[0].height), (200.0, 100.0));
        let placed = pages[0].image.as_ref().unwrap();
        assert_eq!(placed.placement.x, 0.0);

        let run = &pages[0].text[0];
        assert_eq!(run.bounding_box, BoundingBox::new(10.0, 70.0, 60.0, 90.0));
        assert!(metrics.text_width("Hello", run.font_size) <= 50.0 * FIT_SLACK);
        assert_eq!(run.rendering, TextRendering::Invisible);
        assert!((run.y - (70.0 + metrics.descent(run.font_size))).abs() < 1e-4);
    }

    #[test]
    fn test_fixed_page_centers_image_and_text() {
        let metrics = UniformMetrics::default();
        let config = OverlayConfig {
            scale_policy: ScalePolicy::ScaleToFit,
            target: Some(Size::new(100.0, 100.0)),
            page_size: Some(Size::new(100.0, 100.0)),
            ..Default::default()
        };
        let compositor = Compositor::new(&config, &metrics);
        let geometry = compute_page_geometry(
            PixelSize::new(200, 100),
            None,
            ScalePolicy::ScaleToFit,
            config.target,
        )
        .unwrap();
        assert_eq!(geometry.destination, Size::new(100.0, 50.0));

        let regions = vec![TextRegion::new(1, "word", BoundingBox::new(0.0, 0.0, 100.0, 20.0))];
        let mut canvas = PlanRecorder::new();
        compositor
            .compose_page(&mut canvas, Some(&image()), &geometry, &regions)
            .unwrap();

        let page = &canvas.pages()[0];
        let placed = page.image.as_ref().unwrap();
        assert_eq!((placed.placement.x, placed.placement.y), (0.0, 25.0));
        assert_eq!(page.text[0].bounding_box, BoundingBox::new(0.0, 25.0, 50.0, 35.0));
    }

    #[test]
    fn test_image_only_page() {
        let metrics = UniformMetrics::default();
        let config = OverlayConfig::default();
        let geometry =
            compute_page_geometry(PixelSize::new(50, 50), None, ScalePolicy::KeepOriginal, None).unwrap();
        let mut canvas = PlanRecorder::new();
        let stats = Compositor::new(&config, &metrics)
            .compose_page(&mut canvas, Some(&image()), &geometry, &[])
            .unwrap();
        assert_eq!(stats.runs, 0);
        assert!(canvas.pages()[0].text.is_empty());
        assert!(canvas.pages()[0].image.is_some());
    }

    #[test]
    fn test_degenerate_regions_skipped() {
        let metrics = UniformMetrics::default();
        let config = OverlayConfig::default();
        let geometry =
            compute_page_geometry(PixelSize::new(50, 50), None, ScalePolicy::KeepOriginal, None).unwrap();
        let regions = vec![TextRegion::new(1, "flat", BoundingBox::new(0.0, 10.0, 20.0, 10.0))];
        let mut canvas = PlanRecorder::new();
        let stats = Compositor::new(&config, &metrics)
            .compose_page(&mut canvas, None, &geometry, &regions)
            .unwrap();
        assert_eq!(stats, PageStats { runs: 0, skipped: 1 });
    }

    #[test]
    fn test_recorder_rejects_unbalanced_pages() {
        let mut canvas = PlanRecorder::new();
        assert!(canvas.end_page().is_err());
        canvas.begin_page(Size::new(1.0, 1.0)).unwrap();
        assert!(canvas.begin_page(Size::new(1.0, 1.0)).is_err());
    }

    #[test]
    fn test_text_run_serializes_rendering_mode() {
        let run = TextRun {
            text: "x".into(),
            x: 0.0,
            y: 0.0,
            font_size: 1.0,
            horizontal_scale: 100.0,
            rendering: TextRendering::Invisible,
            bounding_box: BoundingBox::default(),
        };
        let json = serde_json::to_value(&run).unwrap();
        assert_eq!(json["rendering"]["mode"], "invisible");
    }
}
