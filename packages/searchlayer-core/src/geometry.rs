//! Output page sizing and pixel-to-point conversion.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::region::BoundingBox;

/// Points per inch of the output page space.
pub const POINTS_PER_INCH: f32 = 72.0;

/// How an output page is sized from its source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScalePolicy {
    /// Intrinsic image size converted to points.
    #[default]
    KeepOriginal,
    /// Fixed target width, height follows the aspect ratio.
    ScaleWidth,
    /// Fixed target height, width follows the aspect ratio.
    ScaleHeight,
    /// Largest uniform scale that fits inside the target rectangle.
    ScaleToFit,
}

impl ScalePolicy {
    pub fn requires_target(&self) -> bool {
        !matches!(self, ScalePolicy::KeepOriginal)
    }
}

/// Width and height in page points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub const A4: Size = Size {
        width: 595.0,
        height: 842.0,
    };
    pub const LETTER: Size = Size {
        width: 612.0,
        height: 792.0,
    };

    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn is_positive(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Accepts `a4`, `letter` or `<width>x<height>` in points.
impl FromStr for Size {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "a4" => return Ok(Size::A4),
            "letter" => return Ok(Size::LETTER),
            _ => {}
        }
        let invalid = || ConfigError::InvalidSize(s.to_string());
        let (w, h) = trimmed
            .split_once(|c: char| c == 'x' || c == 'X')
            .ok_or_else(invalid)?;
        let width = w.trim().parse::<f32>().map_err(|_| invalid())?;
        let height = h.trim().parse::<f32>().map_err(|_| invalid())?;
        let size = Size::new(width, height);
        if !size.is_positive() {
            return Err(invalid());
        }
        Ok(size)
    }
}

/// Intrinsic size of a decoded image frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelSize {
    pub width: u32,
    pub height: u32,
}

impl PixelSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Resolution declared by an image, per axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dpi {
    pub x: f32,
    pub y: f32,
}

impl Dpi {
    pub fn uniform(dpi: f32) -> Self {
        Self { x: dpi, y: dpi }
    }
}

/// Derived geometry of one output page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PageGeometry {
    /// Intrinsic image size in points.
    pub original: Size,
    /// Size the image is drawn at.
    pub destination: Size,
    /// Points per pixel, per axis.
    pub pixel_to_point_x: f32,
    pub pixel_to_point_y: f32,
    /// `destination.width / original.width`, applied to both axes of every text box.
    pub text_scale: f32,
}

impl PageGeometry {
    /// Maps a pixel-space box (bottom-up, relative to the image) into destination points.
    pub fn to_page_space(&self, bbox: &BoundingBox) -> BoundingBox {
        bbox.scaled(
            self.pixel_to_point_x * self.text_scale,
            self.pixel_to_point_y * self.text_scale,
        )
    }
}

/// Computes the destination rectangle of an image under `policy`.
///
/// Without a positive DPI on both axes the image is taken to be 72 DPI, one pixel per point.
pub fn compute_page_geometry(
    pixels: PixelSize,
    dpi: Option<Dpi>,
    policy: ScalePolicy,
    target: Option<Size>,
) -> Result<PageGeometry, ConfigError> {
    if pixels.width == 0 || pixels.height == 0 {
        return Err(ConfigError::EmptyImage {
            width: pixels.width,
            height: pixels.height,
        });
    }

    let (pixel_to_point_x, pixel_to_point_y) = match dpi {
        Some(d) if d.x > 0.0 && d.y > 0.0 => (POINTS_PER_INCH / d.x, POINTS_PER_INCH / d.y),
        _ => (1.0, 1.0),
    };
    let original = Size::new(
        pixels.width as f32 * pixel_to_point_x,
        pixels.height as f32 * pixel_to_point_y,
    );

    let target = if policy.requires_target() {
        let target = target.ok_or(ConfigError::MissingTarget(policy))?;
        if !target.is_positive() {
            return Err(ConfigError::InvalidSize(target.to_string()));
        }
        Some(target)
    } else {
        None
    };

    let destination = match (policy, target) {
        (ScalePolicy::ScaleWidth, Some(t)) => {
            Size::new(t.width, original.height * t.width / original.width)
        }
        (ScalePolicy::ScaleHeight, Some(t)) => {
            Size::new(original.width * t.height / original.height, t.height)
        }
        (ScalePolicy::ScaleToFit, Some(t)) => {
            let ratio = (t.width / original.width).min(t.height / original.height);
            Size::new(original.width * ratio, original.height * ratio)
        }
        _ => original,
    };

    Ok(PageGeometry {
        original,
        destination,
        pixel_to_point_x,
        pixel_to_point_y,
        text_scale: destination.width / original.width,
    })
}
