use spotter_core::{Error, Rect, WindowResult};

use windows::Win32::Foundation::{HWND, POINT, RECT};
use windows::Win32::Graphics::Gdi::ClientToScreen;
use windows::Win32::UI::WindowsAndMessaging::{
    GetClientRect, GetParent, GetWindowRect, GetWindowTextLengthW, GetWindowTextW,
    GetWindowThreadProcessId, IsIconic, IsWindowVisible,
};

/// A window on the Windows platform, wrapping a Win32 `HWND`.
///
/// `HWND` is an opaque handle: a number that identifies a window to the OS.
/// This struct holds that handle and queries the OS lazily for metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    hwnd: HWND,
}

impl Window {
    /// Creates a new `Window` from a raw `HWND`.
    pub fn new(hwnd: HWND) -> Self {
        Self { hwnd }
    }

    /// Returns the raw window handle.
    pub fn hwnd(&self) -> HWND {
        self.hwnd
    }

    /// Window title, empty if it has none.
    pub fn title(&self) -> WindowResult<String> {
        // SAFETY: GetWindowTextLengthW and GetWindowTextW only read the
        // window text of a valid HWND.
        unsafe {
            let length = GetWindowTextLengthW(self.hwnd);
            if length == 0 {
                return Ok(String::new());
            }

            // +1 for the null terminator that Windows requires
            let mut buffer = vec![0u16; (length + 1) as usize];
            let copied = GetWindowTextW(self.hwnd, &mut buffer);
            Ok(String::from_utf16_lossy(&buffer[..copied as usize]))
        }
    }

    /// PID of the process that created the window.
    pub fn process_id(&self) -> u32 {
        let mut pid = 0u32;
        // SAFETY: the out pointer refers to a live local.
        unsafe { GetWindowThreadProcessId(self.hwnd, Some(&mut pid)) };
        pid
    }

    pub fn is_visible(&self) -> bool {
        // SAFETY: read-only query on a window handle.
        unsafe { IsWindowVisible(self.hwnd).as_bool() }
    }

    pub fn is_minimized(&self) -> bool {
        // SAFETY: read-only query on a window handle.
        unsafe { IsIconic(self.hwnd).as_bool() }
    }

    /// Whether the window is a child or owned popup of another window.
    pub fn has_parent(&self) -> bool {
        // SAFETY: GetParent fails (returns an error) for top-level
        // windows without an owner.
        unsafe { GetParent(self.hwnd) }.is_ok_and(|parent| !parent.is_invalid())
    }

    /// Client area in screen coordinates.
    pub fn client_rect(&self) -> WindowResult<Rect> {
        let mut rect = RECT::default();
        let mut origin = POINT::default();
        // SAFETY: both out parameters are live locals.
        unsafe {
            GetClientRect(self.hwnd, &mut rect).map_err(|e| Error::platform("GetClientRect", e))?;
            if !ClientToScreen(self.hwnd, &mut origin).as_bool() {
                return Err(Error::platform("ClientToScreen", windows::core::Error::from_win32()));
            }
        }
        Ok(Rect::new(
            origin.x,
            origin.y,
            rect.right - rect.left,
            rect.bottom - rect.top,
        ))
    }

    /// Full window rectangle, including borders and title bar.
    pub fn window_rect(&self) -> WindowResult<Rect> {
        let mut rect = RECT::default();
        // SAFETY: the out parameter is a live local.
        unsafe { GetWindowRect(self.hwnd, &mut rect) }
            .map_err(|e| Error::platform("GetWindowRect", e))?;
        Ok(Rect::from_edges(rect.left, rect.top, rect.right, rect.bottom))
    }
}
