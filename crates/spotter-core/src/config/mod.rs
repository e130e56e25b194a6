mod loader;
pub mod template;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::log::LogConfig;
use crate::matcher::{MatchMethod, Preprocessing};
use crate::source::{CaptureArea, DEFAULT_MIN_WINDOW_SIZE};
use crate::trigger::DurationCap;

pub use loader::{config_dir, config_path, load, try_load, try_load_from};

/// Longest playback cap accepted, in seconds.
pub const MAX_DURATION_SECS: f32 = 300.0;
/// Longest cooldown accepted, in milliseconds.
pub const MAX_COOLDOWN_MS: u64 = 10_000;

/// Top-level configuration for Spotter.
///
/// Loaded from `~/.config/spotter/config.toml`. Missing sections
/// fall back to defaults thanks to `#[serde(default)]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Which process window to watch.
    pub target: TargetConfig,
    /// Template and matching strategy.
    pub matching: MatchingConfig,
    /// Filters applied before matching.
    pub preprocessing: Preprocessing,
    /// Trigger gating and the action consumer.
    pub trigger: TriggerConfig,
    /// Debug image output.
    pub debug: DebugConfig,
    /// File logging.
    pub logging: LogConfig,
}

/// Target window settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    /// Executable name, e.g. `"game.exe"`. Empty disables capture.
    pub process_name: String,
    /// Capture only the client area (`true`) or the whole window.
    pub client_area: bool,
    pub min_width: i32,
    pub min_height: i32,
}

/// Template matching settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// Path of the template image. Empty means no template.
    pub template: PathBuf,
    pub method: MatchMethod,
    /// Minimum confidence for a match (0.0 to 1.0).
    pub threshold: f32,
    pub min_scale: f32,
    pub max_scale: f32,
    pub rotation_tolerance: f32,
    pub max_matches: u32,
}

/// Trigger settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerConfig {
    pub enabled: bool,
    /// Minimum time between two triggers.
    pub cooldown_ms: u64,
    /// Interval between ticks.
    pub tick_ms: u64,
    /// Playback cap in seconds; zero or negative plays in full.
    pub duration: f32,
    /// Command run on every trigger. Empty only logs the trigger.
    pub command: Vec<String>,
}

/// Debug output settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    /// Verbose logging.
    pub enabled: bool,
    /// Where to write the annotated frame after every match.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub save_path: Option<PathBuf>,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            process_name: String::new(),
            client_area: true,
            min_width: DEFAULT_MIN_WINDOW_SIZE,
            min_height: DEFAULT_MIN_WINDOW_SIZE,
        }
    }
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            template: PathBuf::new(),
            method: MatchMethod::default(),
            threshold: 0.8,
            min_scale: 0.8,
            max_scale: 1.2,
            rotation_tolerance: 5.0,
            max_matches: 1,
        }
    }
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cooldown_ms: 1000,
            tick_ms: 100,
            duration: -1.0,
            command: Vec::new(),
        }
    }
}

impl TargetConfig {
    pub fn capture_area(&self) -> CaptureArea {
        if self.client_area {
            CaptureArea::Client
        } else {
            CaptureArea::Window
        }
    }
}

impl TriggerConfig {
    pub fn duration_cap(&self) -> DurationCap {
        DurationCap::from_seconds(self.duration)
    }
}

impl Config {
    /// Clamps values to the ranges the runtime accepts.
    pub fn validate(&mut self) {
        self.target.min_width = self.target.min_width.clamp(1, 8192);
        self.target.min_height = self.target.min_height.clamp(1, 8192);

        let m = &mut self.matching;
        m.threshold = m.threshold.clamp(0.0, 1.0);
        m.min_scale = m.min_scale.clamp(0.1, 5.0);
        m.max_scale = m.max_scale.clamp(0.1, 5.0);
        if m.min_scale > m.max_scale {
            std::mem::swap(&mut m.min_scale, &mut m.max_scale);
        }
        m.rotation_tolerance = m.rotation_tolerance.clamp(0.0, 180.0);
        m.max_matches = m.max_matches.max(1);

        self.preprocessing.blur_kernel = self.preprocessing.blur_kernel.min(31);
        self.preprocessing.blur_sigma = self.preprocessing.blur_sigma.clamp(0.0, 10.0);

        let t = &mut self.trigger;
        t.cooldown_ms = t.cooldown_ms.min(MAX_COOLDOWN_MS);
        t.tick_ms = t.tick_ms.clamp(10, 10_000);
        t.duration = if t.duration > 0.0 {
            t.duration.min(MAX_DURATION_SECS)
        } else {
            -1.0
        };
    }
}
