use std::fmt;

use crate::{Frame, Rect, WindowResult};

/// OS process identifier.
pub type ProcessId = u32;

/// Which part of the window is captured and size-checked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CaptureArea {
    /// Only the client area (no title bar or borders).
    #[default]
    Client,
    /// The full window rectangle including non-client decorations.
    Window,
}

/// Platform seam for process/window discovery and capture surfaces.
///
/// Each platform crate (e.g. `spotter-windows`) provides its own
/// implementation. Tests use in-memory fakes.
pub trait CaptureBackend {
    /// Opaque window handle, e.g. a Win32 `HWND`.
    type Handle: Copy + PartialEq + fmt::Debug;

    /// Capture-context resources sized to one `(window, bounds)` pair.
    ///
    /// Dropping a surface must release every resource it holds.
    type Surface;

    /// Returns the PID of the first running process with this executable
    /// name (case-insensitive), if any.
    fn find_process_id(&self, name: &str) -> Option<ProcessId>;

    /// Returns the first visible, titled, parentless top-level window
    /// owned by `pid`.
    fn find_main_window(&self, pid: ProcessId) -> Option<Self::Handle>;

    /// Whether `pid` still maps to a running process.
    fn is_process_alive(&self, pid: ProcessId) -> bool;

    /// Whether the window is minimized.
    fn is_minimized(&self, window: Self::Handle) -> bool;

    /// Whether the window is visible.
    fn is_visible(&self, window: Self::Handle) -> bool;

    /// Current bounds of the requested area.
    fn bounds(&self, window: Self::Handle, area: CaptureArea) -> WindowResult<Rect>;

    /// Window title, for diagnostics.
    fn window_title(&self, window: Self::Handle) -> WindowResult<String>;

    /// Allocates a capture surface matching `bounds`.
    fn create_surface(
        &self,
        window: Self::Handle,
        bounds: Rect,
        area: CaptureArea,
    ) -> WindowResult<Self::Surface>;

    /// Names of all running processes, for diagnostics.
    fn running_processes(&self) -> WindowResult<Vec<String>>;
}

/// One way of filling a capture surface with the window's pixels.
///
/// Strategies are tried in order; the first `Ok` wins.
pub trait CaptureStrategy<S> {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Captures the window into `surface` and returns the resulting frame.
    fn capture(&self, surface: &mut S) -> WindowResult<Frame>;
}

/// The resolved capture target.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetWindow<H> {
    pub process_name: String,
    pub pid: ProcessId,
    pub window: H,
    /// Bounds observed when the current capture context was built.
    pub bounds: Rect,
}

/// Identity of a capture context. Any change forces a rebuild.
///
/// Surfaces are window-relative, so only the size of the bounds is part
/// of the key; moving the window keeps its context.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContextKey<H> {
    pub window: H,
    pub width: i32,
    pub height: i32,
}

impl<H> ContextKey<H> {
    pub fn new(window: H, bounds: Rect) -> Self {
        Self {
            window,
            width: bounds.width,
            height: bounds.height,
        }
    }
}

/// Capture resources plus the key they were built for.
pub(crate) struct CaptureContext<H, S> {
    pub(crate) key: ContextKey<H>,
    pub(crate) surface: S,
}
