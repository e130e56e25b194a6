//! Zero-mean normalized cross-correlation over every template placement.
//!
//! The numerator is computed in the frequency domain (Lewis, "Fast
//! Normalized Cross-Correlation"); window energies come from integral
//! tables.

use std::sync::Arc;

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

use crate::error::{Error, WindowResult};

use super::raster::Raster;

/// Best-scoring placement of a template inside an image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Peak {
    pub value: f64,
    pub x: u32,
    pub y: u32,
}

/// Per-channel running sums over an image, one `(sum, sum of squares)`
/// table per channel, each `(w + 1) * (h + 1)` wide.
struct Integral {
    stride: usize,
    sums: Vec<Vec<u64>>,
    squares: Vec<Vec<u64>>,
}

impl Integral {
    fn new(samples: &[u8], width: usize, height: usize, channels: usize) -> Self {
        let stride = width + 1;
        let mut sums = vec![vec![0u64; stride * (height + 1)]; channels];
        let mut squares = vec![vec![0u64; stride * (height + 1)]; channels];
        for ch in 0..channels {
            let (sum, sq) = (&mut sums[ch], &mut squares[ch]);
            for y in 0..height {
                let mut row_sum = 0u64;
                let mut row_sq = 0u64;
                for x in 0..width {
                    let v = samples[(y * width + x) * channels + ch] as u64;
                    row_sum += v;
                    row_sq += v * v;
                    sum[(y + 1) * stride + x + 1] = sum[y * stride + x + 1] + row_sum;
                    sq[(y + 1) * stride + x + 1] = sq[y * stride + x + 1] + row_sq;
                }
            }
        }
        Self {
            stride,
            sums,
            squares,
        }
    }

    fn window(table: &[u64], stride: usize, x: usize, y: usize, w: usize, h: usize) -> u64 {
        table[(y + h) * stride + x + w] + table[y * stride + x]
            - table[y * stride + x + w]
            - table[(y + h) * stride + x]
    }

    /// Sum over channels of the window's centered sum of squares.
    fn centered_energy(&self, x: usize, y: usize, w: usize, h: usize) -> f64 {
        let n = (w * h) as f64;
        self.sums
            .iter()
            .zip(&self.squares)
            .map(|(s/// Slides `template` over `image` and returns the highest correlation
/// score and its top-left corner.
///
/// Scores lie in `[-1, 1]`; placements where either side has zero
/// variance score 0. Ties keep the first placement in row-major order.
pub(crate) fn best_match(image: &Raster, template: &Raster) -> WindowResult<Peak> {
    check_fit(image, template)?;
    Correlator::new(image)?.best_match(template)
}

fn check_fit(image: &Raster, template: &Raster) -> WindowResult<()> {
    let (iw, ih) = image.dimensions();
    let (tw, th) = template.dimensions();
    if image.channels() != template.channels() {
        return Err(Error::InvalidImage(format!(
            "channel mismatch: image has {}, template has {}",
            image.channels(),
            template.channels()
        )));
    }
    if tw == 0 || th == 0 || tw > iw || th > ih {
        return Err(Error::InvalidImage(format!(
            "template {tw}x{th} does not fit image {iw}x{ih}"
        )));
    }
    Ok(())
}

/// An image prepared for repeated correlation against templates of any
/// size: per-channel spectra plus integral tables.
///
/// The transform size equals the image size. Circular correlation only
/// wraps for placements that leave the image, which are never read.
pub(crate) struct Correlator {
    width: usize,
    height: usize,
    channels: usize,
    integral: Integral,
    spectra: Vec<Vec<Complex<f64>>>,
    plans: Plans,
}

struct Plans {
    row_forward: Arc<dyn Fft<f64>>,
    col_forward: Arc<dyn Fft<f64>>,
    row_inverse: Arc<dyn Fft<f64>>,
    col_inverse: Arc<dyn Fft<f64>>,
}

impl Correlator {
    pub(crate) fn new(image: &Raster) -> WindowResult<Self> {
        let (w, h) = image.dimensions();
        if w == 0 || h == 0 {
            return Err(Error::InvalidImage("cannot correlate an empty image".into()));
        }
        let (width, height, channels) = (w as usize, h as usize, image.channels());

        let mut planner = FftPlanner::<f64>::new();
        let plans = Plans {
            row_forward: planner.plan_fft_forward(width),
            col_forward: planner.plan_fft_forward(height),
            row_inverse: planner.plan_fft_inverse(width),
            col_inverse: planner.plan_fft_inverse(height),
        };

        let samples = image.samples();
        let len = width * height;
        let spectra = (0..channels)
            .map(|ch| {
                // Removing the channel mean leaves the dot product with a
                // zero-mean template unchanged and keeps magnitudes small.
                let mean = (0..len)
                    .map(|i| samples[i * channels + ch] as f64)
                    .sum::<f64>()
                    / len as f64;
                let mut buf: Vec<Complex<f64>> = (0..len)
                    .map(|i| Complex::new(samples[i * channels + ch] as f64 - mean, 0.0))
                    .collect();
                transform(&mut buf, width, height, &plans.row_forward, &plans.col_forward);
                buf
            })
            .collect();

        Ok(Self {
            width,
            height,
            channels,
            integral: Integral::new(samples, width, height, channels),
            spectra,
            plans,
        })
    }

    /// Best placement of `template` in the prepared image.
    pub(crate) fn best_match(&self, template: &Raster) -> WindowResult<Peak> {
        let (tw, th) = template.dimensions();
        if template.channels() != self.channels {
            return Err(Error::InvalidImage(format!(
                "channel mismatch: image has {}, template has {}",
                self.channels,
                template.channels()
            )));
        }
        let (tw, th) = (tw as usize, th as usize);
        if tw == 0 || th == 0 || tw > self.width || th > self.height {
            return Err(Error::InvalidImage(format!(
                "template {tw}x{th} does not fit image {}x{}",
                self.width, self.height
            )));
        }

        let (w, h, c) = (self.width, self.height, self.channels);
        let n = (tw * th) as f64;
        let tpl = template.samples();

        let mut product = vec![Complex::new(0.0, 0.0); w * h];
        let mut template_energy = 0.0;
        for (ch, spectrum) in self.spectra.iter().enumerate() {
            let mean = tpl.iter().skip(ch).step_by(c).map(|v| *v as f64).sum::<f64>() / n;
            let mut buf = vec![Complex::new(0.0, 0.0); w * h];
            for j in 0..th {
                for i in 0..tw {
                    let v = tpl[(j * tw + i) * c + ch] as f64 - mean;
                    template_energy += v * v;
                    buf[j * w + i] = Complex::new(v, 0.0);
                }
            }
            transform(&mut buf, w, h, &self.plans.row_forward, &self.plans.col_forward);
            for ((acc, img), t) in product.iter_mut().zip(spectrum).zip(&buf) {
                *acc += img * t.conj();
            }
        }
        transform(&mut product, w, h, &self.plans.row_inverse, &self.plans.col_inverse);
        let scale = (w * h) as f64;

        let mut best = Peak {
            value: f64::NEG_INFINITY,
            x: 0,
            y: 0,
        };
        for y in 0..=(h - th) {
            for x in 0..=(w - tw) {
                let dot = product[y * w + x].re / scale;
                let energy = self.integral.centered_energy(x, y, tw, th);
                let denom = (template_energy * energy).sqrt();
                let value = if denom > 1e-6 {
                    (dot / denom).clamp(-1.0, 1.0)
                } else {
                    0.0
                };
                if value > best.value {
                    best = Peak {
                        value,
                        x: x as u32,
                        y: y as u32,
                    };
                }
            }
        }

        Ok(best)
    }
}

/// In-place 2-D transform of a row-major `width * height` buffer: rows
/// first, then columns through a transposed copy.
fn transform(
    buf: &mut [Complex<f64>],
    width: usize,
    height: usize,
    rows: &Arc<dyn Fft<f64>>,
    cols: &Arc<dyn Fft<f64>>,
) {
    rows.process(buf);
    let mut columns = vec![Complex::new(0.0, 0.0); width * height];
    for y in 0..height {
        for x in 0..width {
            columns[x * height + y] = buf[y * width + x];
        }
    }
    cols.process(&mut columns);
    for x in 0..width {
        for y in 0..height {
            buf[y * width + x] = columns[x * height + y];
        }
    }
}

om } else { 0.0 };
            if value > best.value {
                best = Peak {
                    value,
                    x: x as u32,
                    y: y as u32,
                };
            }
        }
    }

    Ok(best)
}

#[cfg(test)]
mod tests {
    use image::{GrayImage, Luma, Rgb, RgbImage};

    use super::*;

    fn noise(w: u32, h: u32, seed: u32) -> GrayImage {
        let mut state = seed;
        GrayImage::from_fn(w, h, |_, _| {
            state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            Luma([(state >> 24) as u8])
        })
    }

    #[test]
    fn exact_copy_scores_one_at_its_offset() {
        // Arrange
        let image = noise(40, 30, 7);
        let template = image::imageops::crop_imm(&image, 12, 9, 10, 8).to_image();

        // Act
        let peak = best_match(&Raster::Gray(image), &Raster::Gray(template)).unwrap();

        // Assert
        assert!((peak.value - 1.0).abs() < 1e-6);
        assert_eq!((peak.x, peak.y), (12, 9));
    }

    #[test]
    fn color_copy_scores_one() {
        // Arrange
        let image = RgbImage::from_fn(30, 20, |x, y| Rgb([(x * 8) as u8, (y * 11) as u8, ((x * y) % 251) as u8]));
        let template = image::imageops::crop_imm(&image, 5, 4, 8, 6).to_image();

        // Act
        let peak = best_match(&Raster::Color(image), &Raster::Color(template)).unwrap();

        // Assert
        assert!((peak.value - 1.0).abs() < 1e-6);
        assert_eq!((peak.x, peak.y), (5, 4));
    }

    #[test]
    fn brightness_offset_does_not_change_score() {
        // Arrange
        let image = noise(30, 30, 3);
        let template = image::imageops::crop_imm(&image, 4, 4, 8, 8).to_image();
        let shifted = GrayImage::from_fn(30, 30, |x, y| Luma([image.get_pixel(x, y)[0] / 2 + 60]));
        let template = GrayImage::from_fn(8, 8, |x, y| Luma([template.get_pixel(x, y)[0] / 2]));

        // Act
        let peak = best_match(&Raster::Gray(shifted), &Raster::Gray(template)).unwrap();

        // Assert
        assert!(peak.value > 0.99);
        assert_eq!((peak.x, peak.y), (4, 4));
    }

    #[test]
    fn flat_regions_score_zero() {
        // Arrange
        let image = GrayImage::from_pixel(20, 20, Luma([90]));
        let template = noise(5, 5, 11);

        // Act
        let peak = best_match(&Raster::Gray(image), &Raster::Gray(template)).unwrap();

        // Assert
        assert_eq!(peak.value, 0.0);
        assert_eq!((peak.x, peak.y), (0, 0));
    }

    #[test]
    fn rejects_oversized_template_and_channel_mismatch() {
        // Arrange
        let small = Raster::Gray(GrayImage::new(4, 4));
        let big = Raster::Gray(GrayImage::new(5, 4));
        let color = Raster::Color(RgbImage::new(2, 2));

        // Act / Assert
        assert!(best_match(&small, &big).is_err());
        assert!(best_match(&small, &color).is_err());
    }

    /// Direct evaluation of the score at one placement.
    fn direct_score(image: &GrayImage, template: &GrayImage, x: u32, y: u32) -> f64 {
        let (tw, th) = template.dimensions();
        let n = (tw * th) as f64;
        let t_mean = template.pixels().map(|p| p[0] as f64).sum::<f64>() / n;
        let w_mean = (0..th)
            .flat_map(|j| (0..tw).map(move |i| (i, j)))
            .map(|(i, j)| image.get_pixel(x + i, y + j)[0] as f64)
            .sum::<f64>()
            / n;
        let (mut dot, mut te, mut we) = (0.0, 0.0, 0.0);
        for j in 0..th {
            for i in 0..tw {
                let t = template.get_pixel(i, j)[0] as f64 - t_mean;
                let v = image.get_pixel(x + i, y + j)[0] as f64 - w_mean;
                dot += t * v;
                te += t * t;
                we += v * v;
            }
        }
        dot / (te * we).sqrt()
    }

    #[test]
    fn scores_agree_with_direct_evaluation() {
        // Arrange
        let image = noise(23, 17, 5);
        let template = noise(7, 5, 9);

        // Act
        let peak = best_match(&Raster::Gray(image.clone()), &Raster::Gray(template.clone())).unwrap();

        // Assert
        let mut expected = (f64::NEG_INFINITY, 0, 0);
        for y in 0..=(17 - 5) {
            for x in 0..=(23 - 7) {
                let score = direct_score(&image, &template, x, y);
                if score > expected.0 {
                    expected = (score, x, y);
                }
            }
        }
        assert!((peak.value - expected.0).abs() < 1e-9);
        assert_eq!((peak.x, peak.y), (expected.1, expected.2));
    }

    #[test]
    fn correlator_is_reused_across_template_sizes() {
        // Arrange
        let image = noise(64, 48, 21);
        let small = image::imageops::crop_imm(&image, 30, 20, 10, 10).to_image();
        let large = image::imageops::crop_imm(&image, 3, 7, 33, 25).to_image();
        let correlator = Correlator::new(&Raster::Gray(image)).unwrap();

        // Act
        let a = correlator.best_match(&Raster::Gray(small)).unwrap();
        let b = correlator.best_match(&Raster::Gray(large)).unwrap();

        // Assert
        assert_eq!((a.x, a.y), (30, 20));
        assert_eq!((b.x, b.y), (3, 7));
        assert!(a.value > 0.999 && b.value > 0.999);
    }

    #[test]
    fn large_frame_with_large_template_is_located() {
        // Arrange
        let image = noise(800, 600, 13);
        let template = image::imageops::crop_imm(&image, 412, 287, 100, 100).to_image();

        // Act
        let peak = best_match(&Raster::Gray(image), &Raster::Gray(template)).unwrap();

        // Assert
        assert_eq!((peak.x, peak.y), (412, 287));
        assert!(peak.value > 0.999);
    }
}
