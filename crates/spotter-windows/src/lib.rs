//! Win32 implementation of Spotter's capture backend and the watcher
//! process built on it. Everything here is Windows-only.

/// Capture backend wiring process, window and surface queries together.
#[cfg(windows)]
pub mod backend;

/// Config file watcher.
#[cfg(windows)]
pub mod config_watcher;

/// Ctrl+C handling.
#[cfg(windows)]
pub mod ctrl_c;

/// Watcher main loop.
#[cfg(windows)]
pub mod daemon;

/// DPI awareness.
#[cfg(windows)]
pub mod dpi;

/// Main window lookup via `EnumWindows`.
#[cfg(windows)]
pub mod enumerate;

/// Process lookup and liveness checks.
#[cfg(windows)]
pub mod process;

/// `PrintWindow` and `BitBlt` capture strategies.
#[cfg(windows)]
pub mod strategy;

/// GDI capture surface.
#[cfg(windows)]
pub mod surface;

/// Window type wrapping a Win32 `HWND`.
#[cfg(windows)]
pub mod window;

#[cfg(windows)]
pub use backend::Win32Backend;
#[cfg(windows)]
pub use window::Window;
