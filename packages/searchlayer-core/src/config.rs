use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::{ScalePolicy, Size};
use crate::reconcile::{ReconcileOptions, TextPositioning};

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("scale policy {0:?} requires a target rectangle")]
    MissingTarget(ScalePolicy),
    #[error("invalid size: {0}")]
    InvalidSize(String),
    #[error("invalid text color: {0}")]
    InvalidColor(String),
    #[error("minimal confidence must be within 0-100, got {0}")]
    ConfidenceOutOfRange(u8),
    #[error("image has no pixels ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },
}

/// RGB fill color of a visible text layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl TextColor {
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl fmt::Display for TextColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Parses `#rrggbb` or `rrggbb`.
impl FromStr for TextColor {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim().trim_start_matches('#');
        let invalid = || ConfigError::InvalidColor(s.to_string());
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(invalid());
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
        Ok(TextColor::new(channel(0)?, channel(2)?, channel(4)?))
    }
}

/// Everything a compositing run is configured with. Fixed for the duration of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    pub scale_policy: ScalePolicy,
    /// Required by every policy except keep-original.
    pub target: Option<Size>,
    /// Fixed output paper size. The scaled image is centered on it when set.
    pub page_size: Option<Size>,
    /// Visible text in this color; invisible text when unset.
    pub text_color: Option<TextColor>,
    /// Lines whose mean word confidence is below this are dropped. 0 keeps everything.
    pub min_confidence: u8,
    pub positioning: TextPositioning,
    pub use_transcript: bool,
    pub repair_broken_boxes: bool,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            scale_policy: ScalePolicy::KeepOriginal,
            target: None,
            page_size: None,
            text_color: None,
            min_confidence: 0,
            positioning: TextPositioning::ByLine,
            use_transcript: false,
            repair_broken_boxes: true,
        }
    }
}

impl OverlayConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scale_policy.requires_target() {
            let target = self.target.ok_or(ConfigError::MissingTarget(self.scale_policy))?;
            if !target.is_positive() {
                return Err(ConfigError::InvalidSize(target.to_string()));
            }
        }
        if let Some(page) = self.page_size {
            if !page.is_positive() {
                return Err(ConfigError::InvalidSize(page.to_string()));
            }
        }
        if self.min_confidence > 100 {
            return Err(ConfigError::ConfidenceOutOfRange(self.min_confidence));
        }
        Ok(())
    }

    pub fn reconcile_options(&self) -> ReconcileOptions {
        ReconcileOptions {
            positioning: self.positioning,
            min_confidence: self.min_confidence,
            repair_broken_boxes: self.repair_broken_boxes,
        }
    }
}
