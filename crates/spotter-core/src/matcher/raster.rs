use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, RgbImage};

/// An 8-bit image in one of the two layouts the matcher works with.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Raster {
    Gray(GrayImage),
    Color(RgbImage),
}

impl Raster {
    /// Grayscale sources stay single-channel; everything else becomes RGB.
    pub(crate) fn from_dynamic(image: &DynamicImage) -> Self {
        match image {
            DynamicImage::ImageLuma8(_)
            | DynamicImage::ImageLumaA8(_)
            | DynamicImage::ImageLuma16(_)
            | DynamicImage::ImageLumaA16(_) => Self::Gray(image.to_luma8()),
            _ => Self::Color(image.to_rgb8()),
        }
    }

    pub(crate) fn dimensions(&self) -> (u32, u32) {
        match self {
            Self::Gray(img) => img.dimensions(),
            Self::Color(img) => img.dimensions(),
        }
    }

    pub(crate) fn width(&self) -> u32 {
        self.dimensions().0
    }

    pub(crate) fn height(&self) -> u32 {
        self.dimensions().1
    }

    pub(crate) fn channels(&self) -> usize {
        match self {
            Self::Gray(_) => 1,
            Self::Color(_) => 3,
        }
    }

    pub(crate) fn is_gray(&self) -> bool {
        matches!(self, Self::Gray(_))
    }

    /// Row-major interleaved samples.
    pub(crate) fn samples(&self) -> &[u8] {
        match self {
            Self::Gray(img) => img.as_raw(),
            Self::Color(img) => img.as_raw(),
        }
    }

    pub(crate) fn to_gray(&self) -> GrayImage {
        match self {
            Self::Gray(img) => img.clone(),
            Self::Color(img) => imageops::grayscale(img),
        }
    }

    /// Resizes by `scale` with bilinear filtering.
    ///
    /// Returns `None` if either side would round to zero pixels.
    pub(crate) fn resized(&self, scale: f32) -> Option<Self> {
        let (w, h) = self.dimensions();
        let nw = (w as f32 * scale).round() as u32;
        let nh = (h as f32 * scale).round() as u32;
        if nw == 0 || nh == 0 {
            return None;
        }
        if (nw, nh) == (w, h) {
            return Some(self.clone());
        }
        Some(match self {
            Self::Gray(img) => Self::Gray(imageops::resize(img, nw, nh, FilterType::Triangle)),
            Self::Color(img) => Self::Color(imageops::resize(img, nw, nh, FilterType::Triangle)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn luma_sources_stay_single_channel() {
        // Arrange
        let gray = DynamicImage::ImageLuma8(GrayImage::new(4, 3));
        let rgba = DynamicImage::ImageRgba8(image::RgbaImage::new(4, 3));

        // Act / Assert
        assert_eq!(Raster::from_dynamic(&gray).channels(), 1);
        assert_eq!(Raster::from_dynamic(&rgba).channels(), 3);
    }

    #[test]
    fn unit_scale_is_an_exact_copy() {
        // Arrange
        let img = GrayImage::from_fn(7, 5, |x, y| image::Luma([(x * 30 + y) as u8]));
        let raster = Raster::Gray(img);

        // Act
        let resized = raster.resized(1.0).unwrap();

        // Assert
        assert_eq!(resized, raster);
    }

    #[test]
    fn scale_rounds_dimensions() {
        // Arrange
        let raster = Raster::Color(RgbImage::new(20, 10));

        // Act / Assert
        assert_eq!(raster.resized(1.25).unwrap().dimensions(), (25, 13));
        assert!(raster.resized(0.01).is_none());
    }
}
