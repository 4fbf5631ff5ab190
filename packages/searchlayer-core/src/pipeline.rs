//! Per-document run: recognition output in, composited pages out.
//!
//! A [`RunContext`] is created by the caller for one output document and torn down with
//! [`RunContext::finish`]. Sources are processed one after another in the order given,
//! since pages are appended to a single canvas.

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::compositor::{CompositeError, Compositor, ImageRef, PageCanvas};
use crate::config::{ConfigError, OverlayConfig};
use crate::engine::{EngineError, MarkupPass, OcrInput, Recognition, RecognitionBackend};
use crate::font::FontMetrics;
use crate::geometry::{compute_page_geometry, Dpi, PixelSize};
use crate::markup::parse_markup;
use crate::reconcile::{reconcile_page, Transcript};
use crate::region::PageIndex;

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Composite(#[from] CompositeError),
}

impl From<ConfigError> for RunError {
    fn from(e: ConfigError) -> Self {
        RunError::Composite(CompositeError::Config(e))
    }
}

/// One decoded frame of a source image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub pixels: PixelSize,
    pub dpi: Option<Dpi>,
}

/// A source image and its frames, in page order. Single-page images have one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceImage {
    pub path: PathBuf,
    pub frames: Vec<Frame>,
}

impl SourceImage {
    pub fn single(path: impl Into<PathBuf>, pixels: PixelSize, dpi: Option<Dpi>) -> Self {
        Self {
            path: path.into(),
            frames: vec![Frame { pixels, dpi }],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Renumbered {
    pub source: String,
    pub claimed: u32,
    pub assigned: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrphanedPage {
    pub source: String,
    pub page: u32,
}

/// Diagnostics and counts accumulated over a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunReport {
    pub sources: usize,
    pub pages: usize,
    pub text_runs: usize,
    pub unparsable_elements: Vec<String>,
    pub unplaceable_elements: Vec<String>,
    pub unmatched_transcript_lines: Vec<String>,
    pub low_confidence_lines: Vec<String>,
    pub repaired_words: usize,
    pub skipped_regions: usize,
    pub renumbered_pages: Vec<Renumbered>,
    /// Pages recognized for which the source had no frame.
    pub orphaned_pages: Vec<OrphanedPage>,
}

pub struct RunContext {
    config: OverlayConfig,
    metrics: Box<dyn FontMetrics>,
    report: RunReport,
}

impl RunContext {
    /// Validates `config` up front; an invalid configuration fails the whole run.
    pub fn new(config: OverlayConfig, metrics: Box<dyn FontMetrics>) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            metrics,
            report: RunReport::default(),
        })
    }

    pub fn config(&self) -> &OverlayConfig {
        &self.config
    }

    pub fn report(&self) -> &RunReport {
        &self.report
    }

    /// Builds the page index of one source from its recognition output.
    pub fn index_recognition(&mut self, source: &str, recognition: Recognition) -> PageIndex {
        match recognition {
            Recognition::Regions(index) => index,
            Recognition::Markup(passes) => {
                let mut index = PageIndex::new();
                for pass in &passes {
                    self.index_pass(source, pass, &mut index);
                }
                index
            }
        }
    }

    fn index_pass(&mut self, source: &str, pass: &MarkupPass, index: &mut PageIndex) {
        let doc = parse_markup(&pass.markup);
        self.report
            .unparsable_elements
            .extend(doc.unparsable.iter().map(|id| format!("{}#{}", source, id)));

        let mut transcripts = match (&pass.transcript, self.config.use_transcript) {
            (Some(text), true) => Transcript::split_pages(text).into_iter(),
            _ => Vec::new().into_iter(),
        };
        let options = self.config.reconcile_options();

        for page in &doc.pages {
            let reconciled = reconcile_page(page, transcripts.next(), &options);
            let diagnostics = reconciled.diagnostics;
            let qualify = |id: &String| format!("{}#{}", source, id);
            self.report
                .unplaceable_elements
                .extend(diagnostics.unplaceable.iter().map(qualify));
            self.report
                .unmatched_transcript_lines
                .extend(diagnostics.unmatched_lines.iter().map(qualify));
            self.report
                .low_confidence_lines
                .extend(diagnostics.low_confidence_lines.iter().map(qualify));
            self.report.repaired_words += diagnostics.repaired_words;

            let assigned = index.insert_page(reconciled.number, reconciled.regions);
            if assigned != reconciled.number {
                debug!(source, claimed = reconciled.number, assigned, "page number collision");
                self.report.renumbered_pages.push(Renumbered {
                    source: source.to_string(),
                    claimed: reconciled.number,
                    assigned,
                });
            }
        }
    }

    /// Composites every frame of `source` onto `canvas`, frame `n` (0-based) taking page
    /// `n + 1` of `index`. Frames without recognized text still get an image-only page.
    pub fn compose_source(
        &mut self,
        canvas: &mut dyn PageCanvas,
        source: &SourceImage,
        index: &PageIndex,
    ) -> Result<(), CompositeError> {
        let label = source.path.display().to_string();
        let compositor = Compositor::new(&self.config, self.metrics.as_ref());

        for (i, frame) in source.frames.iter().enumerate() {
            let page_number = i as u32 + 1;
            let geometry = compute_page_geometry(
                frame.pixels,
                frame.dpi,
                self.config.scale_policy,
                self.config.target,
            )?;
            let regions = index.get(page_number).unwrap_or_default();
            let image = ImageRef {
                source: label.clone(),
                frame: i as u32,
            };
            let stats = compositor.compose_page(canvas, Some(&image), &geometry, regions)?;
            debug!(
                source = %label,
                page = page_number,
                width = geometry.destination.width,
                height = geometry.destination.height,
                runs = stats.runs,
                "composited page"
            );
            self.report.pages += 1;
            self.report.text_runs += stats.runs;
            self.report.skipped_regions += stats.skipped;
        }

        let frames = source.frames.len() as u32;
        for (page, _) in index.pages().filter(|(page, _)| *page > frames) {
            warn!(source = %label, page, "recognized page has no matching image frame");
            self.report.orphaned_pages.push(OrphanedPage {
                source: label.clone(),
                page,
            });
        }

        self.report.sources += 1;
        Ok(())
    }

    /// Recognizes `source` through `backend` and composites it.
    pub async fn process_source(
        &mut self,
        backend: &dyn RecognitionBackend,
        canvas: &mut dyn PageCanvas,
        source: &SourceImage,
    ) -> Result<PageIndex, RunError> {
        let recognition = backend
            .recognize(&OcrInput::FilePath(source.path.clone()))
            .await?;
        let label = source.path.display().to_string();
        let index = self.index_recognition(&label, recognition);
        self.compose_source(canvas, source, &index)?;
        Ok(index)
    }

    /// Ends the run and hands back its report.
    pub fn finish(self) -> RunReport {
        info!(
            sources = self.report.sources,
            pages = self.report.pages,
            text_runs = self.report.text_runs,
            "run finished"
        );
        self.report
    }
}
