//! Locating a template image inside captured frames.

mod annotate;
mod correlation;
mod features;
mod filter;
mod raster;

use std::path::Path;
use std::time::{Duration, Instant};

use image::{DynamicImage, GrayImage, RgbImage};
use serde::{Deserialize, Serialize};

use crate::error::{Error, WindowResult};
use crate::frame::Frame;
use crate::rect::{Point, Rect};

use features::FeatureSet;
use raster::Raster;

/// Number of scales sampled between the minimum and maximum scale.
pub const SCALE_STEPS: u32 = 5;
/// Frames and templates with a shorter side below this are rejected.
pub const MIN_IMAGE_SIDE: u32 = 10;

const MIN_SCALE: f32 = 0.1;
const MAX_SCALE: f32 = 5.0;

/// Matching strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchMethod {
    /// Normalized cross-correlation at the template's native size.
    #[default]
    #[serde(rename = "template")]
    TemplateCorrelation,
    /// Keypoint descriptors with a nearest-neighbour ratio test.
    #[serde(rename = "feature")]
    FeatureMatching,
    /// Correlation repeated over a range of template scales.
    #[serde(rename = "multi_scale")]
    MultiScale,
}

impl MatchMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TemplateCorrelation => "template",
            Self::FeatureMatching => "feature",
            Self::MultiScale => "multi_scale",
        }
    }
}

impl std::str::FromStr for MatchMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "template" => Ok(Self::TemplateCorrelation),
            "feature" => Ok(Self::FeatureMatching),
            "multi_scale" | "multiscale" => Ok(Self::MultiScale),
            other => Err(format!(
                "unknown match method '{other}' (expected template, feature or multi_scale)"
            )),
        }
    }
}

/// Outcome of a single match call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MatchResult {
    pub found: bool,
    pub confidence: f32,
    pub center: Point,
    pub bounding_box: Rect,
    pub scale: f32,
    /// Always 0; rotation search is not performed.
    pub rotation: f32,
}

impl Default for MatchResult {
    fn default() -> Self {
        Self {
            found: false,
            confidence: 0.0,
            center: Point::default(),
            bounding_box: Rect::default(),
            scale: 1.0,
            rotation: 0.0,
        }
    }
}

/// Filters applied before matching.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preprocessing {
    pub grayscale: bool,
    pub edge_detection: bool,
    /// Gaussian kernel size; 0 disables blurring. Even sizes are bumped
    /// to the next odd size.
    pub blur_kernel: u32,
    /// 0 derives sigma from the kernel size.
    pub blur_sigma: f64,
}

impl Default for Preprocessing {
    fn default() -> Self {
        Self {
            grayscale: true,
            edge_detection: false,
            blur_kernel: 0,
            blur_sigma: 0.0,
        }
    }
}

/// A loaded template and the representations derived from it.
#[derive(Debug, Clone)]
struct Template {
    image: Raster,
    gray: GrayImage,
    edges: Option<GrayImage>,
    features: Option<FeatureSet>,
}

impl Template {
    fn size(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}

/// Finds a template inside frames using one of the [`MatchMethod`]s.
#[derive(Debug)]
pub struct ImageMatcher {
    template: Option<Template>,
    method: MatchMethod,
    min_scale: f32,
    max_scale: f32,
    rotation_tolerance: f32,
    max_matches: u32,
    preprocessing: Preprocessing,
    debug_image: Option<RgbImage>,
    all_matches: Vec<MatchResult>,
    last_processing_time: Duration,
}

impl Default for ImageMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageMatcher {
    pub fn new() -> Self {
        Self {
            template: None,
            method: MatchMethod::default(),
            min_scale: 0.8,
            max_scale: 1.2,
            rotation_tolerance: 5.0,
            max_matches: 1,
            preprocessing: Preprocessing::default(),
            debug_image: None,
            all_matches: Vec::new(),
            last_processing_time: Duration::ZERO,
        }
    }

    /// Replaces the current template. An empty image is rejected and the
    /// previous template is kept.
    pub fn load_template(&mut self, image: &DynamicImage) -> bool {
        if image.width() == 0 || image.height() == 0 {
            tracing::warn!("rejected empty template image");
            return false;
        }

        let raster = Raster::from_dynamic(image);
        let gray = raster.to_gray();
        let edges = self.preprocessing.edge_detection.then(|| filter::canny(&gray));
        let features = (self.method == MatchMethod::FeatureMatching).then(|| features::extract(&gray));
        if let Some(set) = &features {
            tracing::debug!(keypoints = set.len(), "template features extracted");
        }

        let (w, h) = raster.dimensions();
        self.template = Some(Template {
            image: raster,
            gray,
            edges,
            features,
        });
        tracing::info!(width = w, height = h, "template loaded");
        true
    }

    /// Loads a template from an image file.
    pub fn load_template_file(&mut self, path: &Path) -> bool {
        if path.as_os_str().is_empty() {
            tracing::warn!("template path is empty");
            return false;
        }
        match image::open(path) {
            Ok(image) => self.load_template(&image),
            Err(e) => {
                tracing::error!("failed to load template {}: {e}", path.display());
                false
            }
        }
    }

    pub fn is_template_loaded(&self) -> bool {
        self.template.is_some()
    }

    /// Template dimensions, or `(0, 0)` when none is loaded.
    pub fn template_dimensions(&self) -> (u32, u32) {
        self.template.as_ref().map_or((0, 0), Template::size)
    }

    /// Bytes held by the raw template image.
    pub fn template_size(&self) -> usize {
        self.template
            .as_ref()
            .map_or(0, |t| t.image.samples().len())
    }

    pub fn method(&self) -> MatchMethod {
        self.method
    }

    /// Switches strategy. Entering [`MatchMethod::FeatureMatching`] with a
    /// template loaded extracts its descriptors right away.
    pub fn set_method(&mut self, method: MatchMethod) {
        if self.method == method {
            return;
        }
        self.method = method;
        if method == MatchMethod::FeatureMatching
            && let Some(template) = &mut self.template
        {
            let set = features::extract(&template.gray);
            tracing::debug!(keypoints = set.len(), "template features extracted");
            template.features = Some(set);
        }
    }

    /// Sets the multi-scale search range. Both ends are clamped to
    /// `[0.1, 5.0]` and an inverted range is swapped.
    pub fn set_scale_range(&mut self, min_scale: f32, max_scale: f32) {
        let a = min_scale.clamp(MIN_SCALE, MAX_SCALE);
        let b = max_scale.clamp(MIN_SCALE, MAX_SCALE);
        (self.min_scale, self.max_scale) = if a <= b { (a, b) } else { (b, a) };
    }

    pub fn scale_range(&self) -> (f32, f32) {
        (self.min_scale, self.max_scale)
    }

    /// Stored for configuration round-trips; rotation is not searched.
    pub fn set_rotation_tolerance(&mut self, degrees: f32) {
        self.rotation_tolerance = degrees.clamp(0.0, 180.0);
    }

    pub fn rotation_tolerance(&self) -> f32 {
        self.rotation_tolerance
    }

    /// Stored for configuration round-trips; at most one match is reported.
    pub fn set_max_matches(&mut self, count: u32) {
        self.max_matches = count.max(1);
    }

    pub fn max_matches(&self) -> u32 {
        self.max_matches
    }

    pub fn preprocessing(&self) -> Preprocessing {
        self.preprocessing
    }

    /// Applies all preprocessing settings at once.
    pub fn set_preprocessing(&mut self, preprocessing: Preprocessing) {
        self.enable_grayscale_conversion(preprocessing.grayscale);
        self.enable_edge_detection(preprocessing.edge_detection);
        self.set_gaussian_blur(preprocessing.blur_kernel, preprocessing.blur_sigma);
    }

    pub fn enable_grayscale_conversion(&mut self, enabled: bool) {
        self.preprocessing.grayscale = enabled;
    }

    /// Turning edge detection on computes the template's edge map.
    pub fn enable_edge_detection(&mut self, enabled: bool) {
        if self.preprocessing.edge_detection == enabled {
            return;
        }
        self.preprocessing.edge_detection = enabled;
        if enabled && let Some(template) = &mut self.template {
            template.edges = Some(filter::canny(&template.gray));
        }
    }

    /// A kernel of 0 disables blurring; even kernels become odd.
    pub fn set_gaussian_blur(&mut self, kernel: u32, sigma: f64) {
        self.preprocessing.blur_kernel = if kernel > 0 { kernel | 1 } else { 0 };
        self.preprocessing.blur_sigma = sigma.max(0.0);
    }

    /// Duration of the most recent dispatched match call.
    pub fn last_processing_time(&self) -> Duration {
        self.last_processing_time
    }

    /// Results of the most recent match call; empty or a single hit.
    pub fn all_matches(&self) -> &[MatchResult] {
        &self.all_matches
    }

    /// The most recent frame with its match result drawn on it.
    pub fn debug_image(&self) -> Option<&RgbImage> {
        self.debug_image.as_ref()
    }

    /// Writes the debug image to `path`. Does nothing if no match has run.
    pub fn save_debug_image(&self, path: &Path) -> WindowResult<()> {
        let Some(image) = &self.debug_image else {
            return Ok(());
        };
        image.save(path).map_err(|source| Error::ImageFile {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Searches `frame` for the template.
    ///
    /// Returns a not-found result without touching the debug image when
    /// no template is loaded, the frame is empty, either image has a side
    /// shorter than [`MIN_IMAGE_SIDE`], or the template does not fit inside
    /// the frame. Strategy errors are logged and reported as not found.
    pub fn match_frame(&mut self, frame: &Frame, threshold: f32) -> MatchResult {
        let start = Instant::now();
        let Some(template) = &self.template else {
            return MatchResult::default();
        };
        let (fw, fh) = frame.dimensions();
        let (tw, th) = template.size();
        if fw == 0 || fh == 0 {
            return MatchResult::default();
        }
        if fw.min(fh) < MIN_IMAGE_SIDE || tw.min(th) < MIN_IMAGE_SIDE {
            tracing::debug!("image below {MIN_IMAGE_SIDE}px: frame {fw}x{fh}, template {tw}x{th}");
            return MatchResult::default();
        }
        if tw > fw || th > fh {
            tracing::debug!("template {tw}x{th} larger than frame {fw}x{fh}");
            return MatchResult::default();
        }

        let outcome = match self.method {
            MatchMethod::TemplateCorrelation => self.match_template(frame, threshold),
            MatchMethod::FeatureMatching => self.match_features(frame, threshold),
            MatchMethod::MultiScale => self.match_multi_scale(frame, threshold),
        };
        let result = outcome.unwrap_or_else(|e| {
            tracing::warn!("{} matching failed: {e}", self.method.as_str());
            MatchResult::default()
        });

        self.debug_image = Some(annotate::annotate(frame, &result));
        self.all_matches.clear();
        if result.found {
            self.all_matches.push(result);
        }
        self.last_processing_time = start.elapsed();
        result
    }

    /// Representation of the template that frames are compared against.
    fn template_raster(&self, template: &Template) -> WindowResult<Raster> {
        if self.preprocessing.edge_detection {
            return template
                .edges
                .clone()
                .map(Raster::Gray)
                .ok_or_else(|| Error::InvalidImage("template edge map missing".into()));
        }
        if self.preprocessing.grayscale {
            return Ok(Raster::Gray(template.gray.clone()));
        }
        Ok(template.image.clone())
    }

    /// Applies grayscale, blur and edge detection in that order. Edge
    /// detection implies grayscale, as does a single-channel template.
    fn preprocess_frame(&self, frame: &Frame, template: &Template) -> Raster {
        let p = &self.preprocessing;
        let mut raster = if p.grayscale || p.edge_detection || template.image.is_gray() {
            Raster::Gray(image::imageops::grayscale(frame))
        } else {
            Raster::Color(frame.clone())
        };
        if p.blur_kernel > 0 {
            raster = filter::gaussian_blur(&raster, p.blur_kernel, p.blur_sigma);
        }
        if p.edge_detection {
            raster = Raster::Gray(filter::canny(&raster.to_gray()));
        }
        raster
    }

    /// Single-channel frame that frame keypoints are detected on: the
    /// fully preprocessed frame, edge map included when enabled.
    fn feature_plane(&self, frame: &Frame, template: &Template) -> GrayImage {
        self.preprocess_frame(frame, template).to_gray()
    }

        fn loaded(&self) -> WindowResult<&Template> {
        self.template
            .as_ref()
            .ok_or_else(|| Error::InvalidImage("no template loaded".into()))
    }

    fn match_template(&self, frame: &Frame, threshold: f32) -> WindowResult<MatchResult> {
        let template = self.loaded()?;
        let image = self.preprocess_frame(frame, template);
        let needle = self.template_raster(template)?;
        let peak = correlation::best_match(&image, &needle)?;
        Ok(result_at(peak, needle.width(), needle.height(), 1.0, threshold))
    }

    fn match_multi_scale(&self, frame: &Frame, threshold: f32) -> WindowResult<MatchResult> {
        let template = self.loaded()?;
        let image = self.preprocess_frame(frame, template);
        let needle = self.template_raster(template)?;
        let (iw, ih) = image.dimensions();
        let correlator = correlation::Correlator::new(&image)?;

        let mut best: Option<(correlation::Peak, u32, u32, f32)> = None;
        for step in 0..SCALE_STEPS {
            let scale = self.min_scale
                + (self.max_scale - self.min_scale) * step as f32 / (SCALE_STEPS - 1) as f32;
            let Some(scaled) = needle.resized(scale) else {
                continue;
            };
            let (sw, sh) = scaled.dimensions();
            if sw > iw || sh > ih {
                continue;
            }
            let peak = correlator.best_match(&scaled)?;
            tracing::trace!(scale, confidence = peak.value, "scale evaluated");
            if best.is_none_or(|(b, ..)| peak.value > b.value) {
                best = Some((peak, sw, sh, scale));
            }
        }

        Ok(best.map_or_else(MatchResult::default, |(peak, w, h, scale)| {
            result_at(peak, w, h, scale, threshold)
        }))
    }

    fn match_features(&self, frame: &Frame, threshold: f32) -> WindowResult<MatchResult> {
        let template = self.loaded()?;
        let (tw, th) = template.size();
        let Some(needle) = template.features.as_ref().filter(|set| !set.is_empty()) else {
            tracing::debug!("template has no keypoints");
            return Ok(MatchResult::default());
        };

        let haystack = features::extract(&self.feature_plane(frame, template));
        if haystack.is_empty() {
            return Ok(MatchResult::default());
        }

        let pairs = features::ratio_matches(needle, &haystack, features::RATIO);
        if pairs.len() < features::MIN_GOOD_MATCHES {
            tracing::trace!(good = pairs.len(), "too few feature matches");
            return Ok(MatchResult::default());
        }

        let confidence = pairs.len() as f32 / needle.len() as f32;
        let (sx, sy) = pairs.iter().fold((0f32, 0f32), |(sx, sy), &(_, fi)| {
            let kp = haystack.keypoints[fi];
            (sx + kp.x, sy + kp.y)
        });
        let center = Point::new(sx / pairs.len() as f32, sy / pairs.len() as f32);

        Ok(MatchResult {
            found: confidence >= threshold,
            confidence,
            center,
            bounding_box: Rect::centered_on(center, tw as i32, th as i32),
            scale: 1.0,
            rotation: 0.0,
        })
    }
}

fn result_at(peak: correlation::Peak, width: u32, height: u32, scale: f32, threshold: f32) -> MatchResult {
    let confidence = peak.value as f32;
    MatchResult {
        found: confidence >= threshold,
        confidence,
        center: Point::new(
            peak.x as f32 + width as f32 / 2.0,
            peak.y as f32 + height as f32 / 2.0,
        ),
        bounding_box: Rect::new(peak.x as i32, peak.y as i32, width as i32, height as i32),
        scale,
        rotation: 0.0,
    }
}
