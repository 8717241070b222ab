//! Frame Value Object
//!
//! A decoded video frame: raw pixel matrix plus the metadata the pipeline
//! needs to reason about it. Immutable once produced; never persisted.

use chrono::{DateTime, Utc};

/// Pixel layout of `Frame::data`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Rgb8,
}

/// A single decoded frame from an active source.
#[derive(Debug, Clone)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub data: Vec<u8>,
    pub timestamp: DateTime<Utc>,
    pub source_tag: String,
}

impl Frame {
    pub fn new(width: u32, height: u32, format: PixelFormat, data: Vec<u8>, source_tag: String) -> Self {
        Self {
            width,
            height,
            format,
            data,
            timestamp: Utc::now(),
            source_tag,
        }
    }

    /// Decodes this frame into an `image::DynamicImage` for downstream
    /// processing (detection, cropping, encoding).
    pub fn to_dynamic_image(&self) -> Option<image::DynamicImage> {
        match self.format {
            PixelFormat::Rgb8 => {
                let buf = image::ImageBuffer::<image::Rgb<u8>, _>::from_raw(
                    self.width,
                    self.height,
                    self.data.clone(),
                )?;
                Some(image::DynamicImage::ImageRgb8(buf))
            }
        }
    }
}
