//! Drives the core pipeline for the two working subcommands.
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use searchlayer_core::{
    EngineError, FontMetrics, GlyphMetrics, MarkupPass, OverlayConfig, PageIndex, PlanRecorder, Recognition,
    RecognitionBackend, RunContext, RunError, RunReport, SidecarBackend, UniformMetrics,
};
use tokio::fs;
use tracing::{info, warn};

use crate::inputs::{collect_inputs, probe_image};
use crate::plan::PlacementPlan;

#[derive(Debug, Clone)]
pub struct ComposeOptions {
    pub inputs: Vec<PathBuf>,
    pub config: OverlayConfig,
    /// Resolution assumed for every input image. Unset means one pixel per point.
    pub dpi: Option<f32>,
    /// TrueType/OpenType font used for text measurement.
    pub font: Option<PathBuf>,
}

fn load_metrics(font: Option<&Path>) -> Result<Box<dyn FontMetrics>> {
    match font {
        Some(path) => {
            let metrics =
                GlyphMetrics::from_file(path).with_context(|| format!("failed to load font {}", path.display()))?;
            Ok(Box::new(metrics))
        }
        None => Ok(Box::new(UniformMetrics::default())),
    }
}

/// Composites every input into one placement plan, recognizing each image through its
/// hOCR sidecar files.
pub async fn run_compose(options: &ComposeOptions) -> Result<PlacementPlan> {
    run_compose_with(options, &SidecarBackend::new()).await
}

pub async fn run_compose_with(
    options: &ComposeOptions,
    backend: &dyn RecognitionBackend,
) -> Result<PlacementPlan> {
    let files = collect_inputs(&options.inputs)?;
    if files.is_empty() {
        anyhow::bail!("no input images found");
    }

    let metrics = load_metrics(options.font.as_deref())?;
    let mut ctx = RunContext::new(options.config.clone(), metrics)?;
    let mut canvas = PlanRecorder::new();

    for file in &files {
        let source = probe_image(file, options.dpi)?;
        match ctx.process_source(backend, &mut canvas, &source).await {
            Ok(index) => info!(source = %file.display(), pages = index.len(), "composited source"),
            Err(RunError::Engine(EngineError::MissingOutput(_))) => {
                warn!(source = %file.display(), "no recognition output, page will carry the image only");
                ctx.compose_source(&mut canvas, &source, &PageIndex::new())?;
            }
            Err(e) => return Err(e).with_context(|| format!("failed to process {}", file.display())),
        }
    }

    let report = ctx.finish();
    Ok(PlacementPlan::new(options.config.clone(), canvas.into_pages(), report))
}

/// Parses one hOCR file (plus an optional transcript) into a page index.
pub async fn run_inspect(
    markup: &Path,
    transcript: Option<&Path>,
    config: OverlayConfig,
) -> Result<(PageIndex, RunReport)> {
    let text = fs::read_to_string(markup)
        .await
        .with_context(|| format!("failed to read {}", markup.display()))?;
    let mut pass = MarkupPass::new(text);
    if let Some(path) = transcript {
        let transcript = fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        pass = pass.with_transcript(transcript);
    }

    let mut ctx = RunContext::new(config, Box::new(UniformMetrics::default()))?;
    let label = markup.display().to_string();
    let index = ctx.index_recognition(&label, Recognition::Markup(vec![pass]));
    Ok((index, ctx.finish()))
}
