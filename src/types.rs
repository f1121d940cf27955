use glam::IVec2;
use image::{DynamicImage, GrayImage, RgbImage, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::error::{LogoError, LogoResult};

/// OpenCV-compatible pixel type tags.
///
/// The tag packs the channel depth in the low three bits and `channels - 1`
/// above them, so tags agreed with an OpenCV producer keep their meaning.
pub mod pixel_type {
    pub const CV_8UC1: i32 = 0;
    pub const CV_32FC1: i32 = 5;
    pub const CV_8UC3: i32 = 16;
    pub const CV_8UC4: i32 = 24;

    pub fn channels(pixel_type: i32) -> usize {
        (((pixel_type >> 3) & 511) + 1) as usize
    }

    pub fn depth_bytes(pixel_type: i32) -> usize {
        match pixel_type & 7 {
            0 | 1 => 1,
            2 | 3 | 7 => 2,
            4 | 5 => 4,
            _ => 8,
        }
    }

    /// Bytes per pixel.
    pub fn elem_size(pixel_type: i32) -> usize {
        channels(pixel_type) * depth_bytes(pixel_type)
    }
}

/// Integer axis-aligned rectangle.
///
/// The coordinate frame (template-local, patch-local or frame-absolute) is not
/// stored; every function returning a `Rect` documents which one it uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Rect {
        Rect {
            x,
            y,
            width,
            height,
        }
    }

    /// Saturates at `i32::MAX`; rectangles come off the wire unchecked.
    pub fn right(&self) -> i32 {
        self.x.saturating_add(self.width)
    }

    pub fn bottom(&self) -> i32 {
        self.y.saturating_add(self.height)
    }

    pub fn area(&self) -> i64 {
        self.width.max(0) as i64 * self.height.max(0) as i64
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// Intersection with `[0, width) x [0, height)`.
    ///
    /// An in-bounds rectangle is returned unchanged. A rectangle with no
    /// overlap collapses to zero width or height.
    pub fn clamp(&self, width: i32, height: i32) -> Rect {
        let x0 = self.x.clamp(0, width.max(0));
        let y0 = self.y.clamp(0, height.max(0));
        let x1 = self.right().clamp(x0, width.max(x0));
        let y1 = self.bottom().clamp(y0, height.max(y0));
        Rect::new(x0, y0, x1 - x0, y1 - y0)
    }

    pub fn translate(&self, offset: IVec2) -> Rect {
        Rect::new(
            self.x.saturating_add(offset.x),
            self.y.saturating_add(offset.y),
            self.width,
            self.height,
        )
    }

    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }
}

/// Raw row-major pixel buffer tagged with an OpenCV pixel type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageMat {
    pub rows: i32,
    pub cols: i32,
    pub pixel_type: i32,
    pub data: Vec<u8>,
}

impl ImageMat {
    /// Creates an image, checking that `data` holds exactly `rows * cols` pixels.
    pub fn new(rows: i32, cols: i32, pixel_type: i32, data: Vec<u8>) -> LogoResult<ImageMat> {
        let expected = Self::expected_len(rows, cols, pixel_type);
        if data.len() != expected {
            return Err(LogoError::PixelBufferSize {
                rows,
                cols,
                pixel_type,
                expected,
                got: data.len(),
            });
        }
        Ok(ImageMat {
            rows,
            cols,
            pixel_type,
            data,
        })
    }

    pub fn zeros(rows: i32, cols: i32, pixel_type: i32) -> ImageMat {
        ImageMat {
            rows,
            cols,
            pixel_type,
            data: vec![0; Self::expected_len(rows, cols, pixel_type)],
        }
    }

    fn expected_len(rows: i32, cols: i32, pixel_type: i32) -> usize {
        rows.max(0) as usize * cols.max(0) as usize * pixel_type::elem_size(pixel_type)
    }

    pub fn channels(&self) -> usize {
        pixel_type::channels(self.pixel_type)
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(0, 0, self.cols, self.rows)
    }

    /// Copies the pixels under `roi` (image-local) into a new image.
    ///
    /// The roi is clamped to the image first. Returns `None` when nothing is
    /// left or the buffer is shorter than its header claims.
    pub fn crop(&self, roi: &Rect) -> Option<ImageMat> {
        let roi = roi.clamp(self.cols, self.rows);
        if roi.is_empty() {
            return None;
        }
        let elem = pixel_type::elem_size(self.pixel_type);
        let stride = self.cols as usize * elem;
        let row_len = roi.width as usize * elem;
        let mut data = Vec::with_capacity(row_len * roi.height as usize);
        for r in roi.y..roi.bottom() {
            let start = r as usize * stride + roi.x as usize * elem;
            data.extend_from_slice(self.data.get(start..start + row_len)?);
        }
        Some(ImageMat {
            rows: roi.height,
            cols: roi.width,
            pixel_type: self.pixel_type,
            data,
        })
    }

    pub fn to_dynamic_image(&self) -> LogoResult<DynamicImage> {
        let (w, h) = (self.cols.max(0) as u32, self.rows.max(0) as u32);
        let size_err = || LogoError::PixelBufferSize {
            rows: self.rows,
            cols: self.cols,
            pixel_type: self.pixel_type,
            expected: Self::expected_len(self.rows, self.cols, self.pixel_type),
            got: self.data.len(),
        };
        match self.pixel_type {
            pixel_type::CV_8UC1 => GrayImage::from_raw(w, h, self.data.clone())
                .map(DynamicImage::ImageLuma8)
                .ok_or_else(size_err),
            pixel_type::CV_8UC3 => RgbImage::from_raw(w, h, self.data.clone())
                .map(DynamicImage::ImageRgb8)
                .ok_or_else(size_err),
            pixel_type::CV_8UC4 => RgbaImage::from_raw(w, h, self.data.clone())
                .map(DynamicImage::ImageRgba8)
                .ok_or_else(size_err),
            other => Err(LogoError::UnsupportedPixelType { pixel_type: other }),
        }
    }
}

impl From<&GrayImage> for ImageMat {
    fn from(img: &GrayImage) -> Self {
        ImageMat {
            rows: img.height() as i32,
            cols: img.width() as i32,
            pixel_type: pixel_type::CV_8UC1,
            data: img.as_raw().clone(),
        }
    }
}

impl From<&RgbImage> for ImageMat {
    fn from(img: &RgbImage) -> Self {
        ImageMat {
            rows: img.height() as i32,
            cols: img.width() as i32,
            pixel_type: pixel_type::CV_8UC3,
            data: img.as_raw().clone(),
        }
    }
}

impl From<&DynamicImage> for ImageMat {
    /// Single-channel images stay gray, everything else becomes 8-bit RGB.
    fn from(img: &DynamicImage) -> Self {
        if img.color().channel_count() == 1 {
            ImageMat::from(&img.to_luma8())
        } else {
            ImageMat::from(&img.to_rgb8())
        }
    }
}
