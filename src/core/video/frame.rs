use std::time::Duration;

use crate::core::motion::error::DetectorError;

/// Channel layout of a raw frame raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// One intensity sample per pixel
    Gray,
    Rgb,
    /// RGBA, alpha ignored
    Rgba,
}

impl PixelFormat {
    pub fn channels(self) -> usize {
        match self {
            PixelFormat::Gray => 1,
            PixelFormat::Rgb => 3,
            PixelFormat::Rgba => 4,
        }
    }
}

/// 帧数据结构 - one raster delivered by the frame source per tick
#[derive(Debug, Clone)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub data: Vec<u8>,
    pub timestamp: Duration,
    pub frame_number: u64,
}

impl Frame {
    pub fn new(
        width: u32,
        height: u32,
        format: PixelFormat,
        data: Vec<u8>,
        timestamp_ms: u64,
        frame_number: u64,
    ) -> Self {
        Self {
            width,
            height,
            format,
            data,
            timestamp: Duration::from_millis(timestamp_ms),
            frame_number,
        }
    }

    pub fn rgba(width: u32, height: u32, data: Vec<u8>, timestamp_ms: u64, frame_number: u64) -> Self {
        Self::new(width, height, PixelFormat::Rgba, data, timestamp_ms, frame_number)
    }

    pub fn gray(width: u32, height: u32, data: Vec<u8>, timestamp_ms: u64, frame_number: u64) -> Self {
        Self::new(width, height, PixelFormat::Gray, data, timestamp_ms, frame_number)
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn timestamp_ms(&self) -> u64 {
        self.timestamp.as_millis() as u64
    }

    /// Zero-sized frames carry nothing to analyse.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    fn check_len(&self) -> Result<(), DetectorError> {
        let expected = self.pixel_count() * self.format.channels();
        if self.data.len() != expected {
            return Err(DetectorError::MalformedFrame {
                expected,
                actual: self.data.len(),
            });
        }
        Ok(())
    }
}

/// Row-major 8-bit intensity plane. Used for the converted frame, the
/// previous-frame cache and the background.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GrayPlane {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl GrayPlane {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self { width, height, data }
    }

    pub fn filled(width: u32, height: u32, value: u8) -> Self {
        Self {
            width,
            height,
            data: vec![value; width as usize * height as usize],
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn same_geometry(&self, other: &GrayPlane) -> bool {
        self.width == other.width && self.height == other.height
    }

    /// Mean brightness, 0 for an empty plane.
    pub fn mean(&self) -> f64 {
        if self.data.is_empty() {
            return 0.0;
        }
        let sum: u64 = self.data.iter().map(|&v| v as u64).sum();
        sum as f64 / self.data.len() as f64
    }

    /// Overwrites this plane with `other`, reusing the allocation when the
    /// geometry already matches.
    pub fn copy_from(&mut self, other: &GrayPlane) {
        self.width = other.width;
        self.height = other.height;
        if self.data.len() == other.data.len() {
            self.data.copy_from_slice(&other.data);
        } else {
            self.data.clear();
            self.data.extend_from_slice(&other.data);
        }
    }
}

#[inline]
fn luma(r: u8, g: u8, b: u8) -> u8 {
    // weights sum to 1000, so +500 rounds half up and the result never exceeds 255
    ((r as u32 * 299 + g as u32 * 587 + b as u32 * 114 + 500) / 1000) as u8
}

/// Converts `frame` into `out`, reusing `out`'s buffer when the size allows.
pub fn to_grayscale_into(frame: &Frame, out: &mut GrayPlane) -> Result<(), DetectorError> {
    if frame.is_empty() {
        return Err(DetectorError::InputUnavailable);
    }
    frame.check_len()?;

    out.width = frame.width;
    out.height = frame.height;
    out.data.resize(frame.pixel_count(), 0);

    match frame.format {
        PixelFormat::Gray => out.data.copy_from_slice(&frame.data),
        PixelFormat::Rgb => {
            for (dst, px) in out.data.iter_mut().zip(frame.data.chunks_exact(3)) {
                *dst = luma(px[0], px[1], px[2]);
            }
        }
        PixelFormat::Rgba => {
            for (dst, px) in out.data.iter_mut().zip(frame.data.chunks_exact(4)) {
                *dst = luma(px[0], px[1], px[2]);
            }
        }
    }
    Ok(())
}

pub fn to_grayscale(frame: &Frame) -> Result<GrayPlane, DetectorError> {
    let mut out = GrayPlane::default();
    to_grayscale_into(frame, &mut out)?;
    Ok(out)
}
