//! # searchlayer-rs
//!
//! Turns scanned page images and the hOCR a recognizer wrote for them into a placement plan
//! for a searchable document: each page carries the image and an invisible (or colored)
//! text layer whose runs are sized to sit exactly over the recognized words.
//!
//! ## Quick Start
//!
//! ```ignore
//! use searchlayer_rs::prelude::*;
//!
//! let options = ComposeOptions {
//!     inputs: vec!["scans/".into()],
//!     config: OverlayConfig::default(),
//!     dpi: Some(300.0),
//!     font: None,
//! };
//! let plan = run_compose(&options).await?;
//! plan.write("plan.json".as_ref()).await?;
//! ```
//!
//! Each image `scans/page.png` is recognized through `scans/page.hocr` (and per-page
//! `scans/page.1.hocr`, `scans/page.2.hocr`, ...), optionally with `.txt` transcripts.

pub mod inputs;
pub mod plan;
pub mod runner;

pub use inputs::{collect_inputs, probe_image};
pub use plan::PlacementPlan;
pub use runner::{run_compose, run_compose_with, run_inspect, ComposeOptions};

/// Prelude module for convenient imports
///
/// ```ignore
/// use searchlayer_rs::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        collect_inputs, probe_image, run_compose, run_compose_with, run_inspect, ComposeOptions, PlacementPlan,
    };
    pub use searchlayer_core::{
        OverlayConfig, PageIndex, RunReport, ScalePolicy, Size, TextColor, TextPositioning, TextRegion,
    };
}
