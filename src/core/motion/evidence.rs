//! Evidence rendering: turns intensity planes into encoded images attached
//! to detection events.

use std::io::Cursor;

use image::imageops::{self, FilterType};
use image::{GrayImage, ImageBuffer, ImageOutputFormat, Luma, Rgb, RgbImage};

use super::config::EvidenceFormat;
use super::decider::BoundingBox;
use super::error::DetectorError;
use crate::core::video::GrayPlane;

const MARK_BORDER_PX: u32 = 3;
const MARK_COLOR: Rgb<u8> = Rgb([255, 0, 0]);

/// Borrowed raster handed to a sink.
#[derive(Debug, Clone, Copy)]
pub enum EvidenceRaster<'a> {
    Gray {
        data: &'a [u8],
        width: u32,
        height: u32,
    },
    Rgb {
        data: &'a [u8],
        width: u32,
        height: u32,
    },
}

impl<'a> EvidenceRaster<'a> {
    pub fn from_plane(plane: &'a GrayPlane) -> Self {
        EvidenceRaster::Gray {
            data: &plane.data,
            width: plane.width,
            height: plane.height,
        }
    }

    pub fn from_rgb(image: &'a RgbImage) -> Self {
        EvidenceRaster::Rgb {
            data: image.as_raw(),
            width: image.width(),
            height: image.height(),
        }
    }
}

/// Opaque evidence handle produced by a sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvidenceImage {
    pub width: u32,
    pub height: u32,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Rendering capability the engine delegates evidence capture to.
pub trait EvidenceSink: Send + Sync {
    fn render(&self, raster: EvidenceRaster<'_>) -> Result<EvidenceImage, DetectorError>;
}

/// Default sink: encodes rasters in memory with the `image` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct EncodedEvidenceSink {
    format: EvidenceFormat,
}

impl EncodedEvidenceSink {
    pub fn new(format: EvidenceFormat) -> Self {
        Self { format }
    }

    fn output_format(&self) -> (ImageOutputFormat, &'static str) {
        match self.format {
            EvidenceFormat::Png => (ImageOutputFormat::Png, "image/png"),
            EvidenceFormat::Jpeg { quality } => {
                (ImageOutputFormat::Jpeg(quality.clamp(1, 100)), "image/jpeg")
            }
        }
    }
}

impl EvidenceSink for EncodedEvidenceSink {
    fn render(&self, raster: EvidenceRaster<'_>) -> Result<EvidenceImage, DetectorError> {
        let (format, mime_type) = self.output_format();
        let mut buffer = Cursor::new(Vec::new());

        let (width, height) = match raster {
            EvidenceRaster::Gray { data, width, height } => {
                let img: ImageBuffer<Luma<u8>, &[u8]> = ImageBuffer::from_raw(width, height, data)
                    .ok_or_else(|| {
                        DetectorError::EvidenceRendering(format!(
                            "gray raster of {} bytes does not fit {}x{}",
                            data.len(),
                            width,
                            height
                        ))
                    })?;
                img.write_to(&mut buffer, format)?;
                (width, height)
            }
            EvidenceRaster::Rgb { data, width, height } => {
                let img: ImageBuffer<Rgb<u8>, &[u8]> = ImageBuffer::from_raw(width, height, data)
                    .ok_or_else(|| {
                        DetectorError::EvidenceRendering(format!(
                            "rgb raster of {} bytes does not fit {}x{}",
                            data.len(),
                            width,
                            height
                        ))
                    })?;
                img.write_to(&mut buffer, format)?;
                (width, height)
            }
        };

        Ok(EvidenceImage {
            width,
            height,
            mime_type,
            bytes: buffer.into_inner(),
        })
    }
}

/// Crops `current` to `bbox` (whole frame when absent), scales the crop to
/// `output_size` and draws a red frame around it.
pub fn render_marked(
    current: &GrayPlane,
    bbox: Option<BoundingBox>,
    output_size: (u32, u32),
) -> Result<RgbImage, DetectorError> {
    let (out_w, out_h) = output_size;
    if out_w == 0 || out_h == 0 {
        return Err(DetectorError::EvidenceRendering("zero output size".into()));
    }
    let source: ImageBuffer<Luma<u8>, &[u8]> =
        ImageBuffer::from_raw(current.width, current.height, current.data.as_slice()).ok_or_else(
            || DetectorError::EvidenceRendering("plane does not match its geometry".into()),
        )?;

    let scaled: GrayImage = match bbox {
        Some(b) => {
            let crop = imageops::crop_imm(&source, b.x, b.y, b.w.max(1), b.h.max(1));
            imageops::resize(&*crop, out_w, out_h, FilterType::Triangle)
        }
        None => imageops::resize(&source, out_w, out_h, FilterType::Triangle),
    };

    let border = MARK_BORDER_PX.min(out_w / 2).min(out_h / 2);
    Ok(RgbImage::from_fn(out_w, out_h, |x, y| {
        let on_border = x < border || y < border || x >= out_w - border || y >= out_h - border;
        if on_border {
            MARK_COLOR
        } else {
            let v = scaled.get_pixel(x, y).0[0];
            Rgb([v, v, v])
        }
    }))
}
