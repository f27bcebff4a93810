use serde::{Deserialize, Serialize};

/// Pixel layouts a frame buffer may use.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelFormat {
    #[default]
    Luminance8,
    Rgb888,
    Bgr888,
    Rgba8888,
    Bgra8888,
    Abgr8888,
    Rgb565,
}

impl PixelFormat {
    #[inline]
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Luminance8 => 1,
            PixelFormat::Rgb565 => 2,
            PixelFormat::Rgb888 | PixelFormat::Bgr888 => 3,
            PixelFormat::Rgba8888 | PixelFormat::Bgra8888 | PixelFormat::Abgr8888 => 4,
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("frame buffer has {got} bytes, expected {expected} for {width}x{height} {format:?}")]
    BufferSize {
        width: usize,
        height: usize,
        format: PixelFormat,
        expected: usize,
        got: usize,
    },
    #[error("frame dimensions {width}x{height} overflow")]
    Dimensions { width: usize, height: usize },
}

/// Borrowed, read-only raster frame (row-major, tightly packed).
#[derive(Clone, Copy, Debug)]
pub struct FrameView<'a> {
    pub width: usize,
    pub height: usize,
    pub format: PixelFormat,
    pub data: &'a [u8],
}

impl<'a> FrameView<'a> {
    /// Wrap a buffer after checking that its length matches the dimensions.
    pub fn new(
        width: usize,
        height: usize,
        format: PixelFormat,
        data: &'a [u8],
    ) -> Result<Self, FrameError> {
        let expected = width
            .checked_mul(height)
            .and_then(|n| n.checked_mul(format.bytes_per_pixel()))
            .ok_or(FrameError::Dimensions { width, height })?;
        if data.len() != expected {
            return Err(FrameError::BufferSize {
                width,
                height,
                format,
                expected,
                got: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            format,
            data,
        })
    }

    pub fn gray(width: usize, height: usize, data: &'a [u8]) -> Result<Self, FrameError> {
        Self::new(width, height, PixelFormat::Luminance8, data)
    }

    /// A frame without pixel data; detection is never attempted on it.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn stride(&self) -> usize {
        self.width * self.format.bytes_per_pixel()
    }
}
