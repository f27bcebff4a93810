//! Adapters from `image` buffers to [`FrameView`].

use marker_tracker_core::{FrameView, PixelFormat};

/// Borrow an `image::GrayImage` as a luminance frame.
pub fn frame_from_gray(img: &::image::GrayImage) -> FrameView<'_> {
    FrameView {
        width: img.width() as usize,
        height: img.height() as usize,
        format: PixelFormat::Luminance8,
        data: img.as_raw(),
    }
}

/// Borrow an `image::RgbImage` as an RGB888 frame.
pub fn frame_from_rgb(img: &::image::RgbImage) -> FrameView<'_> {
    FrameView {
        width: img.width() as usize,
        height: img.height() as usize,
        format: PixelFormat::Rgb888,
        data: img.as_raw(),
    }
}
