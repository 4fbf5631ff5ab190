//! Resolving command line inputs into source images.
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use searchlayer_core::{Dpi, Frame, PixelSize, SourceImage};
use tiff::decoder::ifd::Value;
use tiff::decoder::Decoder;
use tiff::tags::Tag;
use tracing::debug;
use walkdir::WalkDir;

/// File extensions treated as scanned page images when walking a directory.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "tif", "tiff"];

pub fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Expands `paths` into image files. Files are taken as given, in the given order;
/// directories contribute their images sorted by path.
pub fn collect_inputs(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_file() {
            files.push(path.clone());
        } else if path.is_dir() {
            let mut found: Vec<PathBuf> = WalkDir::new(path)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file() && is_image(e.path()))
                .map(|e| e.into_path())
                .collect();
            found.sort();
            debug!(dir = %path.display(), images = found.len(), "walked input directory");
            files.extend(found);
        } else {
            bail!("input not found: {}", path.display());
        }
    }
    Ok(files)
}

fn is_tiff(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| matches!(ext.to_ascii_lowercase().as_str(), "tif" | "tiff"))
        .unwrap_or(false)
}

/// Reads the frames of `path` without decoding pixel data. TIFF files yield one frame per
/// directory; every other format is a single frame. `dpi` overrides any resolution stored
/// in the file.
pub fn probe_image(path: &Path, dpi: Option<f32>) -> Result<SourceImage> {
    let dpi = dpi.map(Dpi::uniform);
    if is_tiff(path) {
        let frames = probe_tiff_frames(path, dpi)?;
        debug!(source = %path.display(), frames = frames.len(), "probed multi-frame image");
        return Ok(SourceImage {
            path: path.to_path_buf(),
            frames,
        });
    }

    let (width, height) =
        image::image_dimensions(path).with_context(|| format!("failed to read image {}", path.display()))?;
    Ok(SourceImage::single(path, PixelSize::new(width, height), dpi))
}

fn probe_tiff_frames(path: &Path, dpi: Option<Dpi>) -> Result<Vec<Frame>> {
    let file = File::open(path).with_context(|| format!("failed to open image {}", path.display()))?;
    let mut decoder =
        Decoder::new(BufReader::new(file)).with_context(|| format!("failed to read TIFF {}", path.display()))?;

    let mut frames = Vec::new();
    loop {
        let (width, height) = decoder.dimensions()?;
        frames.push(Frame {
            pixels: PixelSize::new(width, height),
            dpi: dpi.or_else(|| stored_resolution(&mut decoder)),
        });
        if !decoder.more_images() {
            break;
        }
        decoder.next_image()?;
    }
    Ok(frames)
}

/// Resolution recorded in the current TIFF directory, in dots per inch.
fn stored_resolution<R: std::io::Read + std::io::Seek>(decoder: &mut Decoder<R>) -> Option<Dpi> {
    let per_unit = |value: Option<Value>| match value {
        Some(Value::Rational(n, d)) if d != 0 && n != 0 => Some(n as f32 / d as f32),
        _ => None,
    };
    let x = per_unit(decoder.find_tag(Tag::XResolution).ok()?)?;
    let y = per_unit(decoder.find_tag(Tag::YResolution).ok()?).unwrap_or(x);
    // ResolutionUnit: 2 = inch (the default), 3 = centimeter, 1 = no absolute unit.
    let unit = match decoder.find_tag(Tag::ResolutionUnit).ok()? {
        Some(value) => value.into_u16().ok()?,
        None => 2,
    };
    match unit {
        2 => Some(Dpi { x, y }),
        3 => Some(Dpi {
            x: x * 2.54,
            y: y * 2.54,
        }),
        _ => None,
    }
}
