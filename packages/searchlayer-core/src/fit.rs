//! Font-size fitting: the largest size at which a text run fits its box, plus the horizontal
//! scaling that stretches the run to the exact box width.

use thiserror::Error;

use crate::font::FontMetrics;

/// Headroom granted around the box while searching.
pub const FIT_SLACK: f32 = 1.5;
/// Search stops once the bracket is narrower than this, in points.
pub const FIT_TOLERANCE: f32 = 0.1;
/// Hard ceiling on bisection steps.
pub const MAX_FIT_ITERATIONS: usize = 32;
pub const MIN_FONT_SIZE: f32 = 1.0;
/// Size used for empty text objects.
pub const NOMINAL_FONT_SIZE: f32 = 1.0;

#[derive(Debug, Error, PartialEq)]
pub enum FitError {
    #[error("font-size search bracket inverted: lower {lower} > upper {upper}")]
    InvalidBracket { lower: f32, upper: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontFit {
    pub font_size: f32,
    /// Horizontal glyph scaling in percent (100 = unscaled).
    pub horizontal_scale: f32,
}

fn fits(metrics: &dyn FontMetrics, text: &str, size: f32, width: f32, height: f32) -> bool {
    metrics.text_width(text, size) <= width * FIT_SLACK
        && metrics.line_height(size) <= height * FIT_SLACK
}

/// Fits `text` into a `width` x `height` box (points) by bisection over
/// `[MIN_FONT_SIZE, 2 * height]`.
pub fn fit_font_size(
    metrics: &dyn FontMetrics,
    text: &str,
    width: f32,
    height: f32,
) -> Result<FontFit, FitError> {
    if text.is_empty() {
        return Ok(FontFit {
            font_size: NOMINAL_FONT_SIZE,
            horizontal_scale: 100.0,
        });
    }

    let mut lower = MIN_FONT_SIZE;
    let mut upper = (2.0 * height).max(MIN_FONT_SIZE);
    for _ in 0..MAX_FIT_ITERATIONS {
        if lower > upper {
            return Err(FitError::InvalidBracket { lower, upper });
        }
        if upper - lower < FIT_TOLERANCE {
            break;
        }
        let mid = (lower + upper) / 2.0;
        if fits(metrics, text, mid, width, height) {
            lower = mid;
        } else {
            upper = mid;
        }
    }

    let natural = metrics.text_width(text, lower);
    let horizontal_scale = if natural > 0.0 {
        width / natural * 100.0
    } else {
        100.0
    };
    Ok(FontFit {
        font_size: lower,
        horizontal_scale,
    })
}
