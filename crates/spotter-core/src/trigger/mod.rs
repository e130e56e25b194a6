//! Tick-driven trigger state machine.
//!
//! Each tick checks that the target process is alive (re-resolving it if
//! not), skips while a cooldown is active, captures a frame and runs the
//! matcher. A positive match records the trigger time and yields a
//! [`TriggerEvent`] for the playback consumer.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::matcher::{ImageMatcher, MatchResult};
use crate::source::{CaptureBackend, FrameSource};

/// How long a triggered playback may run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DurationCap {
    /// Play to the end.
    Full,
    /// Stop after this many seconds.
    Seconds(f32),
}

impl DurationCap {
    /// Positive values cap playback; anything else plays in full.
    pub fn from_seconds(seconds: f32) -> Self {
        if seconds > 0.0 {
            Self::Seconds(seconds)
        } else {
            Self::Full
        }
    }

    pub fn as_duration(self) -> Option<Duration> {
        match self {
            Self::Full => None,
            Self::Seconds(s) => Some(Duration::from_secs_f32(s)),
        }
    }
}

impl fmt::Display for DurationCap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => f.write_str("full"),
            Self::Seconds(s) => write!(f, "{s}"),
        }
    }
}

/// Emitted when a match passes every gate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriggerEvent {
    pub at: Instant,
    pub result: MatchResult,
    pub duration: DurationCap,
}

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    Disabled,
    ProcessNotRunning,
    NoTemplate,
    CoolingDown,
    NoFrame,
    NoMatch(MatchResult),
    Triggered(TriggerEvent),
}

impl TickOutcome {
    /// Whether the matcher ran during this tick.
    pub fn matched(&self) -> bool {
        matches!(self, Self::NoMatch(_) | Self::Triggered(_))
    }
}

/// Enable flag, cooldown and the time of the last trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerState {
    /// `None` until the first trigger, so the first match is never
    /// held back by the cooldown.
    pub last_trigger: Option<Instant>,
    pub cooldown: Duration,
    pub enabled: bool,
}

impl Default for TriggerState {
    fn default() -> Self {
        Self {
            last_trigger: None,
            cooldown: Duration::from_millis(1000),
            enabled: true,
        }
    }
}

impl TriggerState {
    pub fn is_cooling_down(&self, now: Instant) -> bool {
        if self.cooldown.is_zero() {
            return false;
        }
        self.last_trigger
            .is_some_and(|last| now.saturating_duration_since(last) < self.cooldown)
    }
}

/// Drives a [`FrameSource`] and an [`ImageMatcher`] from periodic ticks.
pub struct TriggerOrchestrator<B: CaptureBackend> {
    source: FrameSource<B>,
    matcher: ImageMatcher,
    state: TriggerState,
    threshold: f32,
    duration: DurationCap,
    template_path: PathBuf,
    process_running: bool,
    template_loaded: bool,
}

impl<B: CaptureBackend> TriggerOrchestrator<B> {
    pub fn new(source: FrameSource<B>, matcher: ImageMatcher) -> Self {
        let template_loaded = matcher.is_template_loaded();
        Self {
            source,
            matcher,
            state: TriggerState::default(),
            threshold: 0.8,
            duration: DurationCap::Full,
            template_path: PathBuf::new(),
            process_running: false,
            template_loaded,
        }
    }

    pub fn source(&self) -> &FrameSource<B> {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut FrameSource<B> {
        &mut self.source
    }

    pub fn matcher(&self) -> &ImageMatcher {
        &self.matcher
    }

    pub fn matcher_mut(&mut self) -> &mut ImageMatcher {
        &mut self.matcher
    }

    pub fn state(&self) -> &TriggerState {
        &self.state
    }

    /// Latched result of the last liveness check.
    pub fn process_running(&self) -> bool {
        self.process_running
    }

    /// Whether the last template load succeeded.
    pub fn template_loaded(&self) -> bool {
        self.template_loaded
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn set_threshold(&mut self, threshold: f32) {
        self.threshold = threshold.clamp(0.0, 1.0);
    }

    pub fn set_cooldown(&mut self, cooldown: Duration) {
        self.state.cooldown = cooldown;
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        if self.state.enabled != enabled {
            info!("trigger {}", if enabled { "enabled" } else { "disabled" });
        }
        self.state.enabled = enabled;
    }

    pub fn set_duration(&mut self, duration: DurationCap) {
        self.duration = duration;
    }

    /// Re-resolves the target window right away.
    pub fn set_process_name(&mut self, name: &str) {
        self.process_running = self.source.set_target(name);
    }

    /// Loads the template right away. On failure matching is skipped
    /// until a valid template loads.
    pub fn set_template_path(&mut self, path: &Path) {
        self.template_path = path.to_path_buf();
        if path.as_os_str().is_empty() {
            self.template_loaded = false;
            return;
        }
        self.template_loaded = self.matcher.load_template_file(path);
        if !self.template_loaded {
            warn!("matching paused until a valid template loads");
        }
    }

    pub fn template_path(&self) -> &Path {
        &self.template_path
    }

    /// Applies a configuration, re-resolving the target or reloading the
    /// template only when their settings changed.
    pub fn apply_config(&mut self, config: &Config) {
        let m = &config.matching;
        self.matcher.set_method(m.method);
        self.matcher.set_scale_range(m.min_scale, m.max_scale);
        self.matcher.set_rotation_tolerance(m.rotation_tolerance);
        self.matcher.set_max_matches(m.max_matches);
        self.matcher.set_preprocessing(config.preprocessing);
        self.set_threshold(m.threshold);

        let t = &config.trigger;
        self.set_cooldown(Duration::from_millis(t.cooldown_ms));
        self.set_enabled(t.enabled);
        self.set_duration(t.duration_cap());

        self.source.set_capture_area(config.target.capture_area());
        self.source
            .set_min_window_size(config.target.min_width, config.target.min_height);

        if config.target.process_name != self.source.process_name() {
            self.set_process_name(&config.target.process_name);
        }
        if m.template != self.template_path {
            self.set_template_path(&m.template);
        }
    }

    /// Runs one tick at the current time.
    pub fn tick(&mut self) -> TickOutcome {
        self.tick_at(Instant::now())
    }

    /// Runs one tick as if the clock read `now`.
    pub fn tick_at(&mut self, now: Instant) -> TickOutcome {
        if !self.state.enabled {
            return TickOutcome::Disabled;
        }

        let mut live = self.source.is_process_live();
        if !live {
            self.source.refresh();
            live = self.source.is_process_live();
        }
        if live != self.process_running {
            if live {
                info!("process '{}' is running", self.source.process_name());
            } else {
                info!("process '{}' is not running", self.source.process_name());
            }
        }
        self.process_running = live;

        if !live {
            return TickOutcome::ProcessNotRunning;
        }
        if !self.template_loaded {
            return TickOutcome::NoTemplate;
        }
        if self.state.is_cooling_down(now) {
            return TickOutcome::CoolingDown;
        }

        let Some(frame) = self.source.capture() else {
            return TickOutcome::NoFrame;
        };

        let result = self.matcher.match_frame(&frame, self.threshold);
        debug!(
            found = result.found,
            confidence = result.confidence,
            elapsed_ms = self.matcher.last_processing_time().as_secs_f64() * 1000.0,
            "match"
        );
        if !result.found {
            return TickOutcome::NoMatch(result);
        }

        self.state.last_trigger = Some(now);
        info!(
            "template matched with confidence {:.3} at ({:.0}, {:.0})",
            result.confidence, result.center.x, result.center.y
        );
        TickOutcome::Triggered(TriggerEvent {
            at: now,
            result,
            duration: self.duration,
        })
    }
}
