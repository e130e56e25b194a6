use spotter_core::ProcessId;

use windows::Win32::Foundation::{HWND, LPARAM};
use windows::Win32::UI::WindowsAndMessaging::EnumWindows;
use windows::core::BOOL;

use crate::window::Window;

/// Search state handed to the `EnumWindows` callback.
struct MainWindowSearch {
    pid: ProcessId,
    found: Option<Window>,
}

/// Returns the first visible, titled, parentless top-level window owned
/// by `pid`.
pub fn find_main_window(pid: ProcessId) -> Option<Window> {
    let mut search = MainWindowSearch { pid, found: None };

    // SAFETY: EnumWindows calls our callback for each top-level window.
    // We pass a pointer to `search` as LPARAM. The callback casts it back
    // to fill in the result. EnumWindows runs synchronously, so `search`
    // outlives the call. Stopping early makes EnumWindows return an
    // error, which is expected and ignored.
    unsafe {
        let _ = EnumWindows(
            Some(enum_window_callback),
            LPARAM(&mut search as *mut _ as isize),
        );
    }

    search.found
}

/// Callback invoked by `EnumWindows` for each top-level window.
///
/// Returns `TRUE` to continue enumeration, `FALSE` to stop.
unsafe extern "system" fn enum_window_callback(hwnd: HWND, lparam: LPARAM) -> BOOL {
    // SAFETY: lparam is a pointer to the MainWindowSearch in find_main_window().
    let search = unsafe { &mut *(lparam.0 as *mut MainWindowSearch) };

    let window = Window::new(hwnd);
    if window.process_id() == search.pid && is_main_window(&window) {
        search.found = Some(window);
        return BOOL(0);
    }

    BOOL(1)
}

fn is_main_window(window: &Window) -> bool {
    window.is_visible()
        && !window.has_parent()
        && window.title().is_ok_and(|title| !title.is_empty())
}
