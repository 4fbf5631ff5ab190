//! Command line arguments backing the `searchlayer` binary.
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use searchlayer_core::{OverlayConfig, ScalePolicy, Size, TextColor, TextPositioning};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
  name = "searchlayer",
  about = "Normalize hOCR output and composite searchable text layers over scanned pages",
  version
)]
pub struct Args {
  /// Only log warnings and errors
  #[arg(long, short = 'q', global = true, conflicts_with = "verbose")]
  pub quiet: bool,

  /// Log per-page details
  #[arg(long, short = 'v', global = true)]
  pub verbose: bool,

  #[command(subcommand)]
  pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
  /// Print version information
  Version,
  /// Parse an hOCR file and print the resulting page index as JSON
  Inspect {
    /// hOCR file to parse
    markup: PathBuf,

    /// Plain-text transcript of the same recognition pass
    #[arg(long, short = 't')]
    transcript: Option<PathBuf>,

    /// Disable repair of word boxes that fall outside their line
    #[arg(long)]
    no_repair: bool,

    #[command(flatten)]
    text: TextOptions,
  },
  /// Composite images and their hOCR sidecars into a JSON placement plan
  Compose {
    /// Image files or directories of images
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Where to write the placement plan
    #[arg(long, short = 'o', default_value = "plan.json")]
    output: PathBuf,

    /// How images are scaled onto the page
    #[arg(long, value_enum, default_value_t = ScaleArg::KeepOriginal)]
    scale: ScaleArg,

    /// Target rectangle for scaling: a4, letter or WIDTHxHEIGHT in points
    #[arg(long)]
    target: Option<Size>,

    /// Fixed paper size; the scaled image is centered on it
    #[arg(long)]
    page_size: Option<Size>,

    /// Render text visibly in this color (#rrggbb) instead of invisibly
    #[arg(long)]
    text_color: Option<TextColor>,

    /// Use transcript files next to the hOCR to correct the recognized text
    #[arg(long)]
    use_transcript: bool,

    /// Image resolution; defaults to one pixel per point
    #[arg(long)]
    dpi: Option<f32>,

    /// TrueType/OpenType font used to measure text
    #[arg(long)]
    font: Option<PathBuf>,

    #[command(flatten)]
    text: TextOptions,
  },
}

#[derive(ClapArgs, Debug, Clone)]
pub struct TextOptions {
  /// Drop lines whose mean word confidence is below this (0-100)
  #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=100))]
  pub min_confidence: u8,

  /// Granularity at which text is placed
  #[arg(long, value_enum, default_value_t = PositioningArg::Line)]
  pub positioning: PositioningArg,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleArg {
  KeepOriginal,
  ScaleWidth,
  ScaleHeight,
  ScaleToFit,
}

impl From<ScaleArg> for ScalePolicy {
  fn from(arg: ScaleArg) -> Self {
    match arg {
      ScaleArg::KeepOriginal => ScalePolicy::KeepOriginal,
      ScaleArg::ScaleWidth => ScalePolicy::ScaleWidth,
      ScaleArg::ScaleHeight => ScalePolicy::ScaleHeight,
      ScaleArg::ScaleToFit => ScalePolicy::ScaleToFit,
    }
  }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositioningArg {
  Line,
  Word,
  WordClamped,
}

impl From<PositioningArg> for TextPositioning {
  fn from(arg: PositioningArg) -> Self {
    match arg {
      PositioningArg::Line => TextPositioning::ByLine,
      PositioningArg::Word => TextPositioning::ByWord,
      PositioningArg::WordClamped => TextPositioning::ByWordClampedToLine,
    }
  }
}

impl TextOptions {
  pub fn apply(&self, config: &mut OverlayConfig) {
    config.min_confidence = self.min_confidence;
    config.positioning = self.positioning.into();
  }
}

impl Args {
  /// Default log directive for the chosen verbosity.
  pub fn log_level(&self) -> &'static str {
    if self.quiet {
      "warn"
    } else if self.verbose {
      "debug"
    } else {
      "info"
    }
  }
}
