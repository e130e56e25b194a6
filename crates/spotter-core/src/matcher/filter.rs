//! Frame filters: Gaussian blur and Canny edge detection.

use std::collections::VecDeque;

use image::{GrayImage, ImageBuffer, Luma, Pixel};

use super::raster::Raster;

/// Canny hysteresis thresholds applied to the L1 gradient magnitude.
pub(crate) const CANNY_LOW: i32 = 50;
pub(crate) const CANNY_HIGH: i32 = 150;

/// Sigma used when the caller passes 0: derived from the kernel size.
fn auto_sigma(kernel: u32) -> f64 {
    0.3 * ((kernel as f64 - 1.0) * 0.5 - 1.0) + 0.8
}

fn gaussian_kernel(size: u32, sigma: f64) -> Vec<f32> {
    let sigma = if sigma > 0.0 { sigma } else { auto_sigma(size) };
    let radius = (size / 2) as i32;
    let weights: Vec<f64> = (-radius..=radius)
        .map(|i| (-(i * i) as f64 / (2.0 * sigma * sigma)).exp())
        .collect();
    let total: f64 = weights.iter().sum();
    weights.iter().map(|w| (w / total) as f32).collect()
}

/// Separable Gaussian blur with replicated borders.
///
/// `kernel` must be odd; a kernel of 1 or less returns the input.
pub(crate) fn gaussian_blur(raster: &Raster, kernel: u32, sigma: f64) -> Raster {
    if kernel <= 1 {
        return raster.clone();
    }
    let weights = gaussian_kernel(kernel, sigma);
    match raster {
        Raster::Gray(img) => Raster::Gray(blur_buffer(img, &weights)),
        Raster::Color(img) => Raster::Color(blur_buffer(img, &weights)),
    }
}

fn blur_buffer<P>(img: &ImageBuffer<P, Vec<u8>>, weights: &[f32]) -> ImageBuffer<P, Vec<u8>>
where
    P: Pixel<Subpixel = u8>,
{
    let (w, h) = img.dimensions();
    let c = P::CHANNEL_COUNT as usize;
    let (w, h) = (w as usize, h as usize);
    let radius = (weights.len() / 2) as isize;
    let src = img.as_raw();

    let mut horizontal = vec![0f32; src.len()];
    for y in 0..h {
        for x in 0..w {
            for ch in 0..c {
                let mut acc = 0.0;
                for (k, weight) in weights.iter().enumerate() {
                    let sx = (x as isize + k as isize - radius).clamp(0, w as isize - 1) as usize;
                    acc += weight * src[(y * w + sx) * c + ch] as f32;
                }
                horizontal[(y * w + x) * c + ch] = acc;
            }
        }
    }

    let mut out = vec![0u8; src.len()];
    for y in 0..h {
        for x in 0..w {
            for ch in 0..c {
                let mut acc = 0.0;
                for (k, weight) in weights.iter().enumerate() {
                    let sy = (y as isize + k as isize - radius).clamp(0, h as isize - 1) as usize;
                    acc += weight * horizontal[(sy * w + x) * c + ch];
                }
                out[(y * w + x) * c + ch] = acc.round().clamp(0.0, 255.0) as u8;
            }
        }
    }

    ImageBuffer::from_raw(w as u32, h as u32, out).unwrap_or_else(|| img.clone())
}

/// 3x3 Sobel derivatives with replicated borders.
pub(crate) fn sobel(gray: &GrayImage) -> (Vec<i32>, Vec<i32>) {
    let (w, h) = gray.dimensions();
    let (w, h) = (w as i64, h as i64);
    let px = |x: i64, y: i64| -> i32 {
        let x = x.clamp(0, w - 1) as u32;
        let y = y.clamp(0, h - 1) as u32;
        gray.get_pixel(x, y)[0] as i32
    };

    let mut gx = vec![0i32; (w * h) as usize];
    let mut gy = vec![0i32; (w * h) as usize];
    for y in 0..h {
        for x in 0..w {
            let i = (y * w + x) as usize;
            gx[i] = (px(x + 1, y - 1) + 2 * px(x + 1, y) + px(x + 1, y + 1))
                - (px(x - 1, y - 1) + 2 * px(x - 1, y) + px(x - 1, y + 1));
            gy[i] = (px(x - 1, y + 1) + 2 * px(x, y + 1) + px(x + 1, y + 1))
                - (px(x - 1, y - 1) + 2 * px(x, y - 1) + px(x + 1, y - 1));
        }
    }
    (gx, gy)
}

/// Canny edge map (255 = edge) with the fixed 50/150 thresholds.
pub(crate) fn canny(gray: &GrayImage) -> GrayImage {
    let (w, h) = gray.dimensions();
    let (wi, hi) = (w as i64, h as i64);
    let (gx, gy) = sobel(gray);
    let magnitude: Vec<i32> = gx.iter().zip(&gy).map(|(x, y)| x.abs() + y.abs()).collect();

    let mag_at = |x: i64, y: i64| -> i32 {
        if x < 0 || y < 0 || x >= wi || y >= hi {
            0
        } else {
            magnitude[(y * wi + x) as usize]
        }
    };

    // tan(22.5°) and tan(67.5°) in 15-bit fixed point.
    const TG22: i64 = 13573;
    const TG67: i64 = 79109;

    // 0 = suppressed, 1 = weak, 2 = strong
    let mut class = vec![0u8; (w * h) as usize];
    for y in 0..hi {
        for x in 0..wi {
            let i = (y * wi + x) as usize;
            let m = magnitude[i];
            if m <= CANNY_LOW {
                continue;
            }
            let ax = (gx[i] as i64).abs();
            let ay15 = (gy[i] as i64).abs() << 15;
            let (a, b) = if ay15 < ax * TG22 {
                (mag_at(x - 1, y), mag_at(x + 1, y))
            } else if ay15 > ax * TG67 {
                (mag_at(x, y - 1), mag_at(x, y + 1))
            } else if (gx[i] < 0) != (gy[i] < 0) {
                (mag_at(x + 1, y - 1), mag_at(x - 1, y + 1))
            } else {
                (mag_at(x - 1, y - 1), mag_at(x + 1, y + 1))
            };
            if m > a && m >= b {
                class[i] = if m > CANNY_HIGH { 2 } else { 1 };
            }
        }
    }

    let mut out = GrayImage::new(w, h);
    let mut queue: VecDeque<(i64, i64)> = VecDeque::new();
    for y in 0..hi {
        for x in 0..wi {
            if class[(y * wi + x) as usize] == 2 {
                queue.push_back((x, y));
                out.put_pixel(x as u32, y as u32, Luma([255]));
            }
        }
    }

    while let Some((x, y)) = queue.pop_front() {
        for dy in -1..=1 {
            for dx in -1..=1 {
                let (nx, ny) = (x + dx, y + dy);
                if nx < 0 || ny < 0 || nx >= wi || ny >= hi {
                    continue;
                }
                let ni = (ny * wi + nx) as usize;
                if class[ni] == 1 {
                    class[ni] = 2;
                    out.put_pixel(nx as u32, ny as u32, Luma([255]));
                    queue.push_back((nx, ny));
                }
            }
        }
    }

    out
}
