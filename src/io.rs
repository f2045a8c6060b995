use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use image::codecs::bmp::BmpEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::tga::TgaEncoder;
use image::codecs::tiff::TiffEncoder;
use image::imageops::{self, FilterType};
use image::{ColorType, DynamicImage, ImageEncoder, ImageFormat, RgbaImage};

/// JPEG quality used when none is given.
pub const DEFAULT_QUALITY: u8 = 90;

// ============================================================================
// SAVE FORMATS
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SaveFormat {
    #[default]
    Png,
    Jpeg,
    Webp,
    Bmp,
    Tga,
    Tiff,
}

impl SaveFormat {
    pub fn all() -> &'static [SaveFormat] {
        &[
            SaveFormat::Png,
            SaveFormat::Jpeg,
            SaveFormat::Webp,
            SaveFormat::Bmp,
            SaveFormat::Tga,
            SaveFormat::Tiff,
        ]
    }

    pub fn extension(&self) -> &'static str {
        match self {
            SaveFormat::Png => "png",
            SaveFormat::Jpeg => "jpg",
            SaveFormat::Webp => "webp",
            SaveFormat::Bmp => "bmp",
            SaveFormat::Tga => "tga",
            SaveFormat::Tiff => "tiff",
        }
    }

    /// Parse a format name or extension (`"jpg"`, `"JPEG"`, `"tif"`, ...).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().trim_start_matches('.').to_lowercase().as_str() {
            "png" => Some(SaveFormat::Png),
            "jpg" | "jpeg" => Some(SaveFormat::Jpeg),
            "webp" => Some(SaveFormat::Webp),
            "bmp" => Some(SaveFormat::Bmp),
            "tga" => Some(SaveFormat::Tga),
            "tif" | "tiff" => Some(SaveFormat::Tiff),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_name)
    }
}

// ============================================================================
// LOADING
// ============================================================================

/// Decode any supported image to RGBA8, optionally shrinking it to fit
/// `fit = (max_width, max_height)`.
pub fn load_image_sync(path: &Path, fit: Option<(u32, u32)>) -> anyhow::Result<RgbaImage> {
    let img = image::open(path)
        .with_context(|| format!("could not decode '{}'", path.display()))?
        .to_rgba8();
    if img.width() == 0 || img.height() == 0 {
        bail!("'{}' has no pixels", path.display());
    }

    match fit {
        Some((max_w, max_h)) => Ok(fit_within(img, max_w, max_h)),
        None => Ok(img),
    }
}

/// Size that fits `width x height` inside the bounds, keeping the aspect
/// ratio. Width is bounded first, then height; never enlarges and never
/// returns a zero side.
pub fn fit_size(width: u32, height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    let (mut w, mut h) = (width as f64, height as f64);
    let (max_w, max_h) = (max_width.max(1) as f64, max_height.max(1) as f64);

    if w > max_w {
        h = h * max_w / w;
        w = max_w;
    }
    if h > max_h {
        w = w * max_h / h;
        h = max_h;
    }
    ((w.round() as u32).max(1), (h.round() as u32).max(1))
}

pub fn fit_within(img: RgbaImage, max_width: u32, max_height: u32) -> RgbaImage {
    let (w, h) = fit_size(img.width(), img.height(), max_width, max_height);
    if (w, h) == img.dimensions() {
        return img;
    }
    tracing::info!(
        "scaling {}x{} -> {}x{} to fit {}x{}",
        img.width(),
        img.height(),
        w,
        h,
        max_width,
        max_height
    );
    imageops::resize(&img, w, h, FilterType::Triangle)
}

// ============================================================================
// SAVING
// ============================================================================

/// `<dir>/<stem>_retouched.<ext>` next to `input`, or under `dir` if given.
pub fn default_output_path(input: &Path, dir: Option<&Path>, format: SaveFormat) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("image");
    let name = format!("{}_retouched.{}", stem, format.extension());
    match dir {
        Some(d) => d.join(name),
        None => input.with_file_name(name),
    }
}

/// Encode `image` and write it to `path`. `quality` (1-100) applies to JPEG.
pub fn encode_and_write(
    image: &RgbaImage,
    path: &Path,
    format: SaveFormat,
    quality: u8,
) -> anyhow::Result<()> {
    let (w, h) = image.dimensions();

    // WebP goes through the generic writer, which needs a path
    if format == SaveFormat::Webp {
        return DynamicImage::ImageRgba8(image.clone())
            .save_with_format(path, ImageFormat::WebP)
            .with_context(|| format!("could not write '{}'", path.display()));
    }

    let file = File::create(path).with_context(|| format!("could not create '{}'", path.display()))?;
    let mut writer = BufWriter::new(file);

    let encoded = match format {
        SaveFormat::Png => PngEncoder::new(&mut writer).write_image(image.as_raw(), w, h, ColorType::Rgba8),
        SaveFormat::Jpeg => {
            let rgb = DynamicImage::ImageRgba8(image.clone()).to_rgb8();
            JpegEncoder::new_with_quality(&mut writer, quality.clamp(1, 100)).encode(
                rgb.as_raw(),
                w,
                h,
                ColorType::Rgb8,
            )
        }
        SaveFormat::Bmp => BmpEncoder::new(&mut writer).encode(image.as_raw(), w, h, ColorType::Rgba8),
        SaveFormat::Tga => TgaEncoder::new(&mut writer).encode(image.as_raw(), w, h, ColorType::Rgba8),
        SaveFormat::Tiff => TiffEncoder::new(&mut writer).encode(image.as_raw(), w, h, ColorType::Rgba8),
        SaveFormat::Webp => Ok(()),
    };
    encoded.with_context(|| format!("could not encode {} '{}'", format.extension(), path.display()))?;
    writer
        .flush()
        .with_context(|| format!("could not write '{}'", path.display()))?;
    Ok(())
}
