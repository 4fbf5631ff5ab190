//! Text measurement used by the font-size fit.

use std::path::Path;

use ab_glyph::{Font, FontVec};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FontError {
    #[error("failed to read font file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid font data")]
    InvalidFont,
    #[error("font has no units-per-em")]
    MissingUnitsPerEm,
}

/// Measures a single unwrapped line of text at a given font size, in points.
pub trait FontMetrics: Send + Sync {
    /// Advance width of `text` laid out on one line.
    fn text_width(&self, text: &str, font_size: f32) -> f32;
    /// Distance from the lowest descender to the highest ascender.
    fn line_height(&self, font_size: f32) -> f32;
    /// Depth of the descender below the baseline, as a positive value.
    fn descent(&self, font_size: f32) -> f32;
}

/// Metrics where every character has the same advance. Ratios are fractions of the em.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UniformMetrics {
    pub advance: f32,
    pub ascent: f32,
    pub descent: f32,
}

impl Default for UniformMetrics {
    fn default() -> Self {
        Self {
            advance: 0.5,
            ascent: 0.8,
            descent: 0.2,
        }
    }
}

impl FontMetrics for UniformMetrics {
    fn text_width(&self, text: &str, font_size: f32) -> f32 {
        text.chars().count() as f32 * self.advance * font_size
    }

    fn line_height(&self, font_size: f32) -> f32 {
        (self.ascent + self.descent) * font_size
    }

    fn descent(&self, font_size: f32) -> f32 {
        self.descent * font_size
    }
}

/// Metrics read from a TrueType/OpenType font.
pub struct GlyphMetrics {
    font: FontVec,
    units_per_em: f32,
}

impl GlyphMetrics {
    pub fn from_bytes(data: Vec<u8>) -> Result<Self, FontError> {
        let font = FontVec::try_from_vec(data).map_err(|_| FontError::InvalidFont)?;
        let units_per_em = font.units_per_em().ok_or(FontError::MissingUnitsPerEm)?;
        Ok(Self { font, units_per_em })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, FontError> {
        Self::from_bytes(std::fs::read(path)?)
    }
}

impl FontMetrics for GlyphMetrics {
    fn text_width(&self, text: &str, font_size: f32) -> f32 {
        let mut units = 0.0;
        let mut previous = None;
        for c in text.chars() {
            let id = self.font.glyph_id(c);
            if let Some(prev) = previous {
                units += self.font.kern_unscaled(prev, id);
            }
            units += self.font.h_advance_unscaled(id);
            previous = Some(id);
        }
        units / self.units_per_em * font_size
    }

    fn line_height(&self, font_size: f32) -> f32 {
        self.font.height_unscaled() / self.units_per_em * font_size
    }

    fn descent(&self, font_size: f32) -> f32 {
        -self.font.descent_unscaled() / self.units_per_em * font_size
    }
}
