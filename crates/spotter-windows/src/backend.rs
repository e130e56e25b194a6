use spotter_core::{CaptureArea, CaptureBackend, ProcessId, Rect, WindowResult};

use crate::enumerate;
use crate::process;
use crate::surface::GdiSurface;
use crate::window::Window;

/// Win32 implementation of the capture backend.
#[derive(Debug, Default, Clone, Copy)]
pub struct Win32Backend;

impl CaptureBackend for Win32Backend {
    type Handle = Window;
    type Surface = GdiSurface;

    fn find_process_id(&self, name: &str) -> Option<ProcessId> {
        process::find_process_id(name)
    }

    fn find_main_window(&self, pid: ProcessId) -> Option<Window> {
        enumerate::find_main_window(pid)
    }

    fn is_process_alive(&self, pid: ProcessId) -> bool {
        process::is_process_alive(pid)
    }

    fn is_minimized(&self, window: Window) -> bool {
        window.is_minimized()
    }

    fn is_visible(&self, window: Window) -> bool {
        window.is_visible()
    }

    fn bounds(&self, window: Window, area: CaptureArea) -> WindowResult<Rect> {
        match area {
            CaptureArea::Client => window.client_rect(),
            CaptureArea::Window => window.window_rect(),
        }
    }

    fn window_title(&self, window: Window) -> WindowResult<String> {
        window.title()
    }

    fn create_surface(
        &self,
        window: Window,
        bounds: Rect,
        area: CaptureArea,
    ) -> WindowResult<GdiSurface> {
        GdiSurface::new(window, bounds, area)
    }

    fn running_processes(&self) -> WindowResult<Vec<String>> {
        Ok(process::running_processes()?
            .into_iter()
            .map(|p| p.exe_name)
            .collect())
    }
}
