//! Re-encode background images until they fit a storage budget.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use tracing::{debug, info, warn};

use crate::data_uri::{bytes_to_data_uri, decode_data_uri};
use crate::ImageError;

/// First JPEG quality tried.
const JPEG_START_QUALITY: u8 = 100;
/// Quality lost per attempt.
const JPEG_QUALITY_STEP: u8 = 10;
/// Lowest quality tried.
const JPEG_MIN_QUALITY: u8 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetFormat {
    Png,
    Jpeg,
}

impl TargetFormat {
    pub fn mime(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
        }
    }
}

/// Target box, output format and maximum data-URI length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Budget {
    pub width: u32,
    pub height: u32,
    pub format: TargetFormat,
    pub max_bytes: usize,
}

impl Budget {
    /// Tile backgrounds: 800×600 PNG, 200 KB.
    pub const TILE: Self = Self {
        width: 800,
        height: 600,
        format: TargetFormat::Png,
        max_bytes: 200 * 1024,
    };

    /// Canvas backgrounds: the viewport size, JPEG, 2000 KB.
    pub fn canvas(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            format: TargetFormat::Jpeg,
            max_bytes: 2000 * 1024,
        }
    }
}

/// Shrink `data_uri` to fit `budget`.
///
/// Input already within the byte limit is returned unchanged. Otherwise the
/// image is scaled down to fit the target box (aspect ratio kept, never
/// enlarged) and encoded; JPEG output steps its quality down until it fits
/// or the minimum quality is reached. The last attempt is returned even if
/// it is still over the limit.
pub fn trim_to_budget(data_uri: &str, budget: &Budget) -> crate::Result<String> {
    if data_uri.len() <= budget.max_bytes {
        debug!("Image already within budget ({} bytes)", data_uri.len());
        return Ok(data_uri.to_string());
    }
    if budget.width == 0 || budget.height == 0 {
        return Err(ImageError::InvalidDimensions {
            width: budget.width,
            height: budget.height,
        });
    }

    let (_, bytes) = decode_data_uri(data_uri)?;
    let img = image::load_from_memory(&bytes).map_err(ImageError::Decode)?;
    let img = fit_within(img, budget.width, budget.height);

    let uri = match budget.format {
        TargetFormat::Png => encode_png(&img)?,
        TargetFormat::Jpeg => {
            let mut quality = JPEG_START_QUALITY;
            loop {
                let uri = encode_jpeg(&img, quality)?;
                if uri.len() <= budget.max_bytes || quality <= JPEG_MIN_QUALITY {
                    break uri;
                }
                debug!("JPEG at quality {quality} is {} bytes, retrying", uri.len());
                quality -= JPEG_QUALITY_STEP;
            }
        }
    };

    if uri.len() > budget.max_bytes {
        warn!(
            "Image still over budget after re-encoding ({} > {} bytes)",
            uri.len(),
            budget.max_bytes
        );
    }
    info!(
        "Re-encoded image from {} to {} bytes ({}x{})",
        data_uri.len(),
        uri.len(),
        img.width(),
        img.height()
    );
    Ok(uri)
}

fn fit_within(img: DynamicImage, width: u32, height: u32) -> DynamicImage {
    if img.width() <= width && img.height() <= height {
        return img;
    }
    img.resize(width, height, FilterType::Triangle)
}

fn encode_png(img: &DynamicImage) -> crate::Result<String> {
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(ImageError::Encode)?;
    Ok(bytes_to_data_uri(&bytes, TargetFormat::Png.mime()))
}

fn encode_jpeg(img: &DynamicImage, quality: u8) -> crate::Result<String> {
    let rgb = img.to_rgb8();
    let mut bytes = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut bytes, quality);
    rgb.write_with_encoder(encoder).map_err(ImageError::Encode)?;
    Ok(bytes_to_data_uri(&bytes, TargetFormat::Jpeg.mime()))
}
