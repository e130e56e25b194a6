//! Frame source: resolves the target window and captures its pixels.
//!
//! Capture resources live in a [`CaptureContext`] keyed by the window and
//! the size of its bounds. When the window is resized the key no longer
//! matches, the old context is dropped (releasing its surface) and a new
//! one is built before the next capture.

mod backend;

pub use backend::{
    CaptureArea, CaptureBackend, CaptureStrategy, ContextKey, ProcessId, TargetWindow,
};

use backend::CaptureContext;
use tracing::{debug, info, warn};

use crate::{Frame, Rect};

/// Default minimum window size (width and height) accepted for capture.
pub const DEFAULT_MIN_WINDOW_SIZE: i32 = 100;

/// Produces frames of a named process's main window.
pub struct FrameSource<B: CaptureBackend> {
    backend: B,
    strategies: Vec<Box<dyn CaptureStrategy<B::Surface>>>,
    process_name: String,
    target: Option<TargetWindow<B::Handle>>,
    context: Option<CaptureContext<B::Handle, B::Surface>>,
    area: CaptureArea,
    min_width: i32,
    min_height: i32,
}

impl<B: CaptureBackend> FrameSource<B> {
    /// Creates a source with no target.
    ///
    /// `strategies` are tried in order on every capture.
    pub fn new(backend: B, strategies: Vec<Box<dyn CaptureStrategy<B::Surface>>>) -> Self {
        Self {
            backend,
            strategies,
            process_name: String::new(),
            target: None,
            context: None,
            area: CaptureArea::default(),
            min_width: DEFAULT_MIN_WINDOW_SIZE,
            min_height: DEFAULT_MIN_WINDOW_SIZE,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The process name last passed to [`set_target`](Self::set_target).
    pub fn process_name(&self) -> &str {
        &self.process_name
    }

    pub fn target(&self) -> Option<&TargetWindow<B::Handle>> {
        self.target.as_ref()
    }

    /// Whether a target is resolved and its capture context is built.
    pub fn is_ready(&self) -> bool {
        self.target.is_some() && self.context.is_some()
    }

    /// Selects client-area or full-window capture.
    ///
    /// Drops the current context; the next capture rebuilds it.
    pub fn set_capture_area(&mut self, area: CaptureArea) {
        if self.area != area {
            self.area = area;
            self.release_context();
        }
    }

    pub fn capture_area(&self) -> CaptureArea {
        self.area
    }

    /// Windows smaller than this (in either dimension) never yield frames.
    pub fn set_min_window_size(&mut self, width: i32, height: i32) {
        self.min_width = width.max(1);
        self.min_height = height.max(1);
    }

    pub fn min_window_size(&self) -> (i32, i32) {
        (self.min_width, self.min_height)
    }

    /// Resolves `process_name` to its main window and builds a capture
    /// context for it.
    ///
    /// Any previous target and context are released first. Returns
    /// `false` (with nothing retained) if the process or window cannot be
    /// found or the context cannot be built.
    pub fn set_target(&mut self, process_name: &str) -> bool {
        self.release_context();
        self.target = None;

        if process_name.is_empty() {
            warn!("empty process name provided");
            self.process_name.clear();
            return false;
        }
        self.process_name = process_name.to_string();

        let Some(pid) = self.backend.find_process_id(process_name) else {
            debug!("process '{process_name}' not currently running");
            return false;
        };

        let Some(window) = self.backend.find_main_window(pid) else {
            warn!("could not find main window for process '{process_name}' (PID {pid})");
            return false;
        };

        let bounds = match self.backend.bounds(window, self.area) {
            Ok(bounds) => bounds,
            Err(e) => {
                warn!("could not read bounds of {window:?}: {e}");
                return false;
            }
        };

        let surface = match self.backend.create_surface(window, bounds, self.area) {
            Ok(surface) => surface,
            Err(e) => {
                warn!("capture context setup failed for {window:?}: {e}");
                return false;
            }
        };

        self.context = Some(CaptureContext {
            key: ContextKey::new(window, bounds),
            surface,
        });
        self.target = Some(TargetWindow {
            process_name: process_name.to_string(),
            pid,
            window,
            bounds,
        });

        info!("initialized for process '{process_name}' (PID {pid})");
        if let Some(info) = self.describe() {
            debug!("{info}");
        }
        true
    }

    /// Whether the resolved process is still running.
    ///
    /// Only the PID is checked; the window is not revalidated here.
    pub fn is_process_live(&self) -> bool {
        self.target
            .as_ref()
            .is_some_and(|t| self.backend.is_process_alive(t.pid))
    }

    /// Re-resolves the previously configured process name.
    ///
    /// Used to recover after the process restarts with a new PID.
    pub fn refresh(&mut self) -> bool {
        if self.process_name.is_empty() {
            return false;
        }
        let name = self.process_name.clone();
        self.set_target(&name)
    }

    /// Captures the target window.
    ///
    /// Returns `None` when there is no target, the window is minimized,
    /// hidden or below the minimum size, or every strategy fails.
    pub fn capture(&mut self) -> Option<Frame> {
        let window = self.target.as_ref()?.window;

        if self.backend.is_minimized(window) || !self.backend.is_visible(window) {
            return None;
        }

        let bounds = match self.backend.bounds(window, self.area) {
            Ok(bounds) => bounds,
            Err(e) => {
                warn!("failed to read window bounds: {e}");
                return None;
            }
        };

        if !bounds.fits_at_least(self.min_width, self.min_height) {
            return None;
        }

        if !self.ensure_context(window, bounds) {
            return None;
        }
        let context = self.context.as_mut()?;

        for strategy in &self.strategies {
            match strategy.capture(&mut context.surface) {
                Ok(frame) => return Some(frame),
                Err(e) => debug!("{} capture failed: {e}", strategy.name()),
            }
        }

        warn!("all capture strategies failed for {window:?}");
        None
    }

    /// Current bounds of the target window's capture area.
    pub fn window_rect(&self) -> Option<Rect> {
        let target = self.target.as_ref()?;
        self.backend.bounds(target.window, self.area).ok()
    }

    /// Title of the target window.
    pub fn window_title(&self) -> Option<String> {
        let target = self.target.as_ref()?;
        self.backend.window_title(target.window).ok()
    }

    /// A one-line description of the target for logs and diagnostics.
    pub fn describe(&self) -> Option<String> {
        let target = self.target.as_ref()?;
        let title = self.window_title().unwrap_or_default();
        let rect = self.window_rect().unwrap_or(target.bounds);
        Some(format!(
            "process '{}' (PID {}) window {:?} '{}' at ({},{}) {}x{}",
            target.process_name,
            target.pid,
            target.window,
            title,
            rect.x,
            rect.y,
            rect.width,
            rect.height
        ))
    }

    /// Makes sure the context matches the window and the size of
    /// `bounds`, rebuilding it on a mismatch. The stale context is
    /// released before allocating.
    fn ensure_context(&mut self, window: B::Handle, bounds: Rect) -> bool {
        let key = ContextKey::new(window, bounds);
        if self.context.as_ref().is_some_and(|c| c.key == key) {
            if let Some(target) = self.target.as_mut() {
                target.bounds = bounds;
            }
            return true;
        }

        self.release_context();
        match self.backend.create_surface(window, bounds, self.area) {
            Ok(surface) => {
                debug!(
                    "capture context rebuilt for {window:?} at {}x{}",
                    bounds.width, bounds.height
                );
                self.context = Some(CaptureContext { key, surface });
                if let Some(target) = self.target.as_mut() {
                    target.bounds = bounds;
                }
                true
            }
            Err(e) => {
                warn!("failed to rebuild capture context: {e}");
                false
            }
        }
    }

    fn release_context(&mut self) {
        // Dropping the surface releases its OS resources.
        self.context = None;
    }
}

#[cfg(test)]
mod tests;
