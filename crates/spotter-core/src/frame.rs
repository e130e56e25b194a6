//! Captured frames.
//!
//! Capture strategies read a 4-channel BGRA surface; the matcher works
//! on 3-channel RGB. [`frame_from_bgra`] performs that conversion and
//! drops alpha.

use image::RgbImage;

use crate::{Error, WindowResult};

/// A single captured snapshot of the target window, 3 channels.
pub type Frame = RgbImage;

/// Converts a top-down BGRA buffer into an RGB frame.
///
/// `stride` is the number of bytes per row (at least `width * 4`).
pub fn frame_from_bgra(width: u32, height: u32, stride: usize, bgra: &[u8]) -> WindowResult<Frame> {
    let row_bytes = width as usize * 4;
    if width == 0 || height == 0 {
        return Err(Error::InvalidImage("empty capture surface".into()));
    }
    if stride < row_bytes || bgra.len() < stride * (height as usize - 1) + row_bytes {
        return Err(Error::InvalidImage(format!(
            "surface buffer too small for {width}x{height}"
        )));
    }

    let mut rgb = Vec::with_capacity(width as usize * height as usize * 3);
    for row in bgra.chunks(stride).take(height as usize) {
        for px in row[..row_bytes].chunks_exact(4) {
            rgb.extend_from_slice(&[px[2], px[1], px[0]]);
        }
    }

    RgbImage::from_raw(width, height, rgb)
        .ok_or_else(|| Error::InvalidImage("frame buffer size mismatch".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bgra_is_swizzled_and_alpha_dropped() {
        // Arrange: 2x1 pixels: pure blue, pure red (BGRA order)
        let bgra = [255, 0, 0, 255, 0, 0, 255, 128];

        // Act
        let frame = frame_from_bgra(2, 1, 8, &bgra).unwrap();

        // Assert
        assert_eq!(frame.get_pixel(0, 0).0, [0, 0, 255]);
        assert_eq!(frame.get_pixel(1, 0).0, [255, 0, 0]);
    }

    #[test]
    fn row_padding_is_skipped() {
        // Arrange: 1x2 pixels with 4 bytes of padding per row
        let bgra = [10, 20, 30, 0, 9, 9, 9, 9, 40, 50, 60, 0, 9, 9, 9, 9];

        // Act
        let frame = frame_from_bgra(1, 2, 8, &bgra).unwrap();

        // Assert
        assert_eq!(frame.get_pixel(0, 0).0, [30, 20, 10]);
        assert_eq!(frame.get_pixel(0, 1).0, [60, 50, 40]);
    }

    #[test]
    fn short_buffer_is_rejected() {
        // Act
        let result = frame_from_bgra(4, 4, 16, &[0; 20]);

        // Assert
        assert!(result.is_err());
    }
}
