use spotter_core::{CaptureArea, CaptureStrategy, Error, Frame, WindowResult};

use windows::Win32::Graphics::Gdi::{BitBlt, GdiFlush, SRCCOPY};
use windows::Win32::Storage::Xps::{PRINT_WINDOW_FLAGS, PW_CLIENTONLY, PrintWindow};

use crate::surface::GdiSurface;

/// Asks DWM to render the full window content, including windows drawn
/// with DirectX. Not exported by the `windows` crate.
const PW_RENDERFULLCONTENT: u32 = 0x0000_0002;

/// Captures through `PrintWindow`, which works for occluded windows.
#[derive(Debug, Default, Clone, Copy)]
pub struct PrintWindowStrategy;

impl CaptureStrategy<GdiSurface> for PrintWindowStrategy {
    fn name(&self) -> &'static str {
        "PrintWindow"
    }

    fn capture(&self, surface: &mut GdiSurface) -> WindowResult<Frame> {
        let flags = match surface.area() {
            CaptureArea::Client => PRINT_WINDOW_FLAGS(PW_RENDERFULLCONTENT | PW_CLIENTONLY.0),
            CaptureArea::Window => PRINT_WINDOW_FLAGS(PW_RENDERFULLCONTENT),
        };

        // SAFETY: the window handle and memory DC are owned by `surface`.
        let ok = unsafe { PrintWindow(surface.hwnd(), surface.mem_dc(), flags) };
        if !ok.as_bool() {
            return Err(Error::platform("PrintWindow", windows::core::Error::from_win32()));
        }

        flush();
        surface.to_frame()
    }
}

/// Copies the on-screen pixels with `BitBlt`. Only correct when the
/// window is not covered by other windows.
#[derive(Debug, Default, Clone, Copy)]
pub struct BitBltStrategy;

impl CaptureStrategy<GdiSurface> for BitBltStrategy {
    fn name(&self) -> &'static str {
        "BitBlt"
    }

    fn capture(&self, surface: &mut GdiSurface) -> WindowResult<Frame> {
        // SAFETY: both DCs are owned by `surface` and the copy stays
        // within the DIB dimensions.
        unsafe {
            BitBlt(
                surface.mem_dc(),
                0,
                0,
                surface.width(),
                surface.height(),
                Some(surface.window_dc()),
                0,
                0,
                SRCCOPY,
            )
        }
        .map_err(|e| Error::platform("BitBlt", e))?;

        flush();
        surface.to_frame()
    }
}

/// The default strategy chain: `PrintWindow` first, `BitBlt` as fallback.
pub fn default_strategies() -> Vec<Box<dyn CaptureStrategy<GdiSurface>>> {
    vec![Box::new(PrintWindowStrategy), Box::new(BitBltStrategy)]
}

fn flush() {
    // SAFETY: GdiFlush takes no arguments and only drains the calling
    // thread's GDI batch so the DIB bits are up to date.
    unsafe {
        let _ = GdiFlush();
    }
}
