//! Corner keypoints with gradient-histogram descriptors, matched by
//! brute-force nearest neighbour and a ratio test.

use image::GrayImage;

use super::filter::sobel;

/// Descriptor length: 4x4 cells of 8 orientation bins.
pub(crate) const DESCRIPTOR_LEN: usize = 128;
/// Lowe's ratio between the best and second-best match distance.
pub(crate) const RATIO: f32 = 0.7;
/// Fewer good matches than this is reported as not found.
pub(crate) const MIN_GOOD_MATCHES: usize = 10;

const MAX_KEYPOINTS: usize = 1000;
const MIN_RESPONSE: f32 = 1.0e4;
const WINDOW_RADIUS: i64 = 2;
const PATCH_HALF: i64 = 8;
const BORDER: u32 = PATCH_HALF as u32 + 1;
const CLIP: f32 = 0.2;

pub(crate) type Descriptor = [f32; DESCRIPTOR_LEN];

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Keypoint {
    pub x: f32,
    pub y: f32,
    pub response: f32,
}

/// Keypoints and their descriptors, index-aligned.
#[derive(Debug, Clone, Default)]
pub(crate) struct FeatureSet {
    pub keypoints: Vec<Keypoint>,
    pub descriptors: Vec<Descriptor>,
}

impl FeatureSet {
    pub(crate) fn len(&self) -> usize {
        self.keypoints.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.keypoints.is_empty()
    }
}

/// Detects corners and describes the patch around each one.
pub(crate) fn extract(gray: &GrayImage) -> FeatureSet {
    let keypoints = detect(gray);
    let descriptors = keypoints.iter().map(|kp| describe(gray, kp)).collect();
    FeatureSet {
        keypoints,
        descriptors,
    }
}

/// Minimum-eigenvalue (Shi-Tomasi) corner response.
fn corner_response(gray: &GrayImage) -> Vec<f32> {
    let (w, h) = gray.dimensions();
    let (w, h) = (w as i64, h as i64);
    let (gx, gy) = sobel(gray);

    let mut response = vec![0f32; (w * h) as usize];
    for y in WINDOW_RADIUS..h - WINDOW_RADIUS {
        for x in WINDOW_RADIUS..w - WINDOW_RADIUS {
            let (mut a, mut b, mut c) = (0f64, 0f64, 0f64);
            for dy in -WINDOW_RADIUS..=WINDOW_RADIUS {
                for dx in -WINDOW_RADIUS..=WINDOW_RADIUS {
                    let i = ((y + dy) * w + x + dx) as usize;
                    let (ix, iy) = (gx[i] as f64, gy[i] as f64);
                    a += ix * ix;
                    b += ix * iy;
                    c += iy * iy;
                }
            }
            let half_trace = (a + c) * 0.5;
            let spread = (((a - c) * 0.5).powi(2) + b * b).sqrt();
            response[(y * w + x) as usize] = (half_trace - spread) as f32;
        }
    }
    response
}

fn detect(gray: &GrayImage) -> Vec<Keypoint> {
    let (w, h) = gray.dimensions();
    if w <= 2 * BORDER || h <= 2 * BORDER {
        return Vec::new();
    }
    let response = corner_response(gray);
    let at = |x: u32, y: u32| response[(y * w + x) as usize];

    let mut keypoints = Vec::new();
    for y in BORDER..h - BORDER {
        for x in BORDER..w - BORDER {
            let r = at(x, y);
            if r < MIN_RESPONSE {
                continue;
            }
            // Plateaus keep their first pixel in scan order.
            let is_peak = (-1i32..=1).all(|dy| {
                (-1i32..=1).all(|dx| {
                    if dx == 0 && dy == 0 {
                        return true;
                    }
                    let n = at((x as i32 + dx) as u32, (y as i32 + dy) as u32);
                    if dy < 0 || (dy == 0 && dx < 0) { r > n } else { r >= n }
                })
            });
            if is_peak {
                keypoints.push(Keypoint {
                    x: x as f32,
                    y: y as f32,
                    response: r,
                });
            }
        }
    }

    if keypoints.len() > MAX_KEYPOINTS {
        keypoints.sort_by(|a, b| b.response.total_cmp(&a.response));
        keypoints.truncate(MAX_KEYPOINTS);
    }
    keypoints
}

fn describe(gray: &GrayImage, kp: &Keypoint) -> Descriptor {
    let (cx, cy) = (kp.x as i64, kp.y as i64);
    let px = |x: i64, y: i64| gray.get_pixel(x as u32, y as u32)[0] as f32;
    let sigma = PATCH_HALF as f32;

    let mut desc = [0f32; DESCRIPTOR_LEN];
    for py in -PATCH_HALF..PATCH_HALF {
        for px_off in -PATCH_HALF..PATCH_HALF {
            let (x, y) = (cx + px_off, cy + py);
            let dx = px(x + 1, y) - px(x - 1, y);
            let dy = px(x, y + 1) - px(x, y - 1);
            let magnitude = (dx * dx + dy * dy).sqrt();
            if magnitude == 0.0 {
                continue;
            }
            let dist2 = (px_off * px_off + py * py) as f32;
            let weight = (-dist2 / (2.0 * sigma * sigma)).exp();

            let angle = dy.atan2(dx).rem_euclid(std::f32::consts::TAU);
            let bin = ((angle / std::f32::consts::TAU * 8.0) as usize).min(7);
            let cell_x = ((px_off + PATCH_HALF) / 4) as usize;
            let cell_y = ((py + PATCH_HALF) / 4) as usize;
            desc[(cell_y * 4 + cell_x) * 8 + bin] += magnitude * weight;
        }
    }

    normalize(&mut desc);
    for v in &mut desc {
        *v = v.min(CLIP);
    }
    normalize(&mut desc);
    desc
}

fn normalize(desc: &mut Descriptor) {
    let norm = desc.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for v in desc.iter_mut() {
            *v /= norm;
        }
    }
}

fn distance(a: &Descriptor, b: &Descriptor) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

/// For each template descriptor, finds its two nearest frame descriptors
/// and keeps the pair `(template_index, frame_index)` when the nearest is
/// closer than `ratio` times the second.
pub(crate) fn ratio_matches(template: &FeatureSet, frame: &FeatureSet, ratio: f32) -> Vec<(usize, usize)> {
    if frame.descriptors.len() < 2 {
        return Vec::new();
    }

    template
        .descriptors
        .iter()
        .enumerate()
        .filter_map(|(ti, td)| {
            let mut best = (f32::INFINITY, 0usize);
            let mut second = f32::INFINITY;
            for (fi, fd) in frame.descriptors.iter().enumerate() {
                let d = distance(td, fd);
                if d < best.0 {
                    second = best.0;
                    best = (d, fi);
                } else if d < second {
                    second = d;
                }
            }
            (best.0 < ratio * second).then_some((ti, best.1))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use image::Luma;

    use super::*;

    /// Deterministic 6px blocks of pseudo-random intensity.
    fn blocky(w: u32, h: u32, seed: u32) -> GrayImage {
        GrayImage::from_fn(w, h, |x, y| {
            let cell = (x / 6) * 131 + (y / 6) * 7919 + seed;
            let v = cell.wrapping_mul(2_654_435_761) >> 24;
            Luma([v as u8])
        })
    }

    #[test]
    fn flat_image_has_no_keypoints() {
        // Arrange
        let img = GrayImage::from_pixel(64, 64, Luma([100]));

        // Act
        let set = extract(&img);

        // Assert
        assert!(set.is_empty());
    }

    #[test]
    fn tiny_image_has_no_keypoints() {
        // Act
        let set = extract(&blocky(18, 40, 1));

        // Assert
        assert!(set.is_empty());
    }

    #[test]
    fn textured_image_yields_bordered_keypoints() {
        // Arrange
        let img = blocky(60, 60, 5);

        // Act
        let set = extract(&img);

        // Assert
        assert!(set.len() >= MIN_GOOD_MATCHES);
        assert_eq!(set.keypoints.len(), set.descriptors.len());
        for kp in &set.keypoints {
            assert!(kp.x >= BORDER as f32 && kp.x < (60 - BORDER) as f32);
            assert!(kp.y >= BORDER as f32 && kp.y < (60 - BORDER) as f32);
        }
    }

    #[test]
    fn descriptors_are_unit_length() {
        // Arrange
        let set = extract(&blocky(60, 60, 9));

        // Act
        let norms: Vec<f32> = set
            .descriptors
            .iter()
            .map(|d| d.iter().map(|v| v * v).sum::<f32>().sqrt())
            .collect();

        // Assert
        assert!(!norms.is_empty());
        assert!(norms.iter().all(|n| (n - 1.0).abs() < 1e-3));
    }

    #[test]
    fn identical_images_match_themselves() {
        // Arrange
        let set = extract(&blocky(60, 60, 21));

        // Act
        let pairs = ratio_matches(&set, &set, RATIO);

        // Assert
        assert!(pairs.len() >= MIN_GOOD_MATCHES);
        assert!(pairs.iter().all(|(t, f)| t == f));
    }

    #[test]
    fn single_frame_descriptor_yields_no_pairs() {
        // Arrange
        let template = extract(&blocky(60, 60, 2));
        let frame = FeatureSet {
            keypoints: template.keypoints[..1].to_vec(),
            descriptors: template.descriptors[..1].to_vec(),
        };

        // Act / Assert
        assert!(ratio_matches(&template, &frame, RATIO).is_empty());
    }
}
