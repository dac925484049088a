// Raw decoded frames as producers hand them over, before colour conversion.
// Producers store these untouched; conversion and rescaling happen on the reader's
// snapshot so the producer thread never does more work than the decode itself.

use image::imageops::{self, FilterType};

use crate::blend::premultiply_in_place;
use crate::error::{Error, Result};
use crate::types::Frame;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PixelLayout {
    Rgb8,
    Bgr8,
    /// Straight (non-premultiplied) alpha.
    Rgba8,
}

impl PixelLayout {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelLayout::Rgb8 | PixelLayout::Bgr8 => 3,
            PixelLayout::Rgba8 => 4,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedFrame {
    width: u32,
    height: u32,
    layout: PixelLayout,
    data: Vec<u8>,
}

impl DecodedFrame {
    pub fn new(width: u32, height: u32, layout: PixelLayout, data: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * layout.bytes_per_pixel();
        if expected == 0 || data.len() != expected {
            return Err(Error::stream_read(format!(
                "{width}x{height} {layout:?} frame needs {expected} bytes, got {}",
                data.len()
            )));
        }
        Ok(Self { width, height, layout, data })
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Premultiplied RGBA at the native resolution.
    pub fn to_rgba(&self) -> Frame {
        let mut out = Frame::new(self.width, self.height);
        let bpp = self.layout.bytes_per_pixel();
        for (dst, src) in out.pixels_mut().zip(self.data.chunks_exact(bpp)) {
            dst.0 = match self.layout {
                PixelLayout::Rgb8 => [src[0], src[1], src[2], 255],
                PixelLayout::Bgr8 => [src[2], src[1], src[0], 255],
                PixelLayout::Rgba8 => [src[0], src[1], src[2], src[3]],
            };
        }
        if self.layout == PixelLayout::Rgba8 {
            premultiply_in_place(&mut out);
        }
        out
    }

    /// Convert and rescale to `target` with linear interpolation.
    pub fn to_target(&self, target: (u32, u32)) -> Frame {
        rescale_linear(self.to_rgba(), target)
    }
}

/// Linear (triangle filter) rescale; returns the input untouched when sizes already match.
pub fn rescale_linear(frame: Frame, target: (u32, u32)) -> Frame {
    if frame.dimensions() == target {
        return frame;
    }
    imageops::resize(&frame, target.0, target.1, FilterType::Triangle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_short_buffers() {
        assert!(DecodedFrame::new(2, 2, PixelLayout::Rgb8, vec![0; 11]).is_err());
        assert!(DecodedFrame::new(0, 2, PixelLayout::Rgb8, vec![]).is_err());
        assert!(DecodedFrame::new(2, 2, PixelLayout::Rgba8, vec![0; 16]).is_ok());
    }

    #[test]
    fn bgr_is_swizzled_to_rgba() {
        let f = DecodedFrame::new(1, 1, PixelLayout::Bgr8, vec![10, 20, 30]).unwrap();
        assert_eq!(f.to_rgba().get_pixel(0, 0).0, [30, 20, 10, 255]);
    }

    #[test]
    fn straight_alpha_is_premultiplied() {
        let f = DecodedFrame::new(1, 1, PixelLayout::Rgba8, vec![200, 100, 0, 128]).unwrap();
        assert_eq!(f.to_rgba().get_pixel(0, 0).0, [100, 50, 0, 128]);
    }

    #[test]
    fn rescale_hits_target_and_keeps_flat_colour() {
        let f = DecodedFrame::new(4, 3, PixelLayout::Rgb8, [7u8, 8, 9].repeat(12)).unwrap();
        let out = f.to_target((10, 10));
        assert_eq!(out.dimensions(), (10, 10));
        assert!(out.pixels().all(|p| p.0 == [7, 8, 9, 255]));
    }
}
