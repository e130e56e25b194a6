use std::ffi::c_void;
use std::{mem, slice};

use spotter_core::{CaptureArea, Error, Frame, Rect, WindowResult, frame_from_bgra};

use windows::Win32::Foundation::HWND;
use windows::Win32::Graphics::Gdi::{
    BI_RGB, BITMAPINFO, BITMAPINFOHEADER, CreateCompatibleDC, CreateDIBSection, DIB_RGB_COLORS,
    DeleteDC, DeleteObject, GetDC, GetWindowDC, HBITMAP, HDC, HGDIOBJ, ReleaseDC, SelectObject,
};

use crate::window::Window;

/// GDI resources for capturing one window at one size.
///
/// Holds the window's device context, a compatible memory DC and a
/// top-down 32bpp DIB section selected into it. The pixels of the DIB are
/// readable directly after a capture call draws into the memory DC.
pub struct GdiSurface {
    hwnd: HWND,
    area: CaptureArea,
    window_dc: HDC,
    mem_dc: HDC,
    bitmap: HBITMAP,
    previous: HGDIOBJ,
    bits: *mut c_void,
    width: i32,
    height: i32,
}

impl GdiSurface {
    /// Allocates a surface for `window` sized to `bounds`.
    pub fn new(window: Window, bounds: Rect, area: CaptureArea) -> WindowResult<Self> {
        if bounds.is_empty() {
            return Err(Error::Capture(format!(
                "cannot allocate a {}x{} surface",
                bounds.width, bounds.height
            )));
        }
        let hwnd = window.hwnd();

        // SAFETY: every handle created here is either stored in the
        // returned surface (and released by Drop) or released on the
        // failure path before returning.
        unsafe {
            let window_dc = match area {
                CaptureArea::Client => GetDC(Some(hwnd)),
                CaptureArea::Window => GetWindowDC(Some(hwnd)),
            };
            if window_dc.is_invalid() {
                return Err(Error::Capture("could not get the window device context".into()));
            }

            let mem_dc = CreateCompatibleDC(Some(window_dc));
            if mem_dc.is_invalid() {
                let _ = ReleaseDC(Some(hwnd), window_dc);
                return Err(Error::Capture("could not create a memory device context".into()));
            }

            let bmi = BITMAPINFO {
                bmiHeader: BITMAPINFOHEADER {
                    biSize: mem::size_of::<BITMAPINFOHEADER>() as u32,
                    biWidth: bounds.width,
                    // Negative height = top-down DIB (row 0 is the top).
                    biHeight: -bounds.height,
                    biPlanes: 1,
                    biBitCount: 32,
                    biCompression: BI_RGB.0,
                    ..Default::default()
                },
                ..Default::default()
            };

            let mut bits: *mut c_void = std::ptr::null_mut();
            let bitmap = match CreateDIBSection(Some(mem_dc), &bmi, DIB_RGB_COLORS, &mut bits, None, 0)
            {
                Ok(bitmap) if !bits.is_null() => bitmap,
                Ok(bitmap) => {
                    let _ = DeleteObject(bitmap.into());
                    let _ = DeleteDC(mem_dc);
                    let _ = ReleaseDC(Some(hwnd), window_dc);
                    return Err(Error::Capture("DIB section has no pixel buffer".into()));
                }
                Err(e) => {
                    let _ = DeleteDC(mem_dc);
                    let _ = ReleaseDC(Some(hwnd), window_dc);
                    return Err(Error::platform("CreateDIBSection", e));
                }
            };

            let previous = SelectObject(mem_dc, bitmap.into());

            Ok(Self {
                hwnd,
                area,
                window_dc,
                mem_dc,
                bitmap,
                previous,
                bits,
                width: bounds.width,
                height: bounds.height,
            })
        }
    }

    pub fn hwnd(&self) -> HWND {
        self.hwnd
    }

    pub fn area(&self) -> CaptureArea {
        self.area
    }

    pub fn window_dc(&self) -> HDC {
        self.window_dc
    }

    pub fn mem_dc(&self) -> HDC {
        self.mem_dc
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    /// Converts the current DIB contents into an RGB frame.
    pub fn to_frame(&self) -> WindowResult<Frame> {
        let stride = self.width as usize * 4;
        let len = stride * self.height as usize;
        // SAFETY: `bits` points to the `width * height` 32bpp pixels
        // allocated by CreateDIBSection, alive until Drop. 32bpp rows are
        // always DWORD-aligned so the stride has no padding.
        let bgra = unsafe { slice::from_raw_parts(self.bits as *const u8, len) };
        frame_from_bgra(self.width as u32, self.height as u32, stride, bgra)
    }
}

impl Drop for GdiSurface {
    fn drop(&mut self) {
        // SAFETY: these handles were created in `new` and are released
        // exactly once here, in reverse order of creation.
        unsafe {
            SelectObject(self.mem_dc, self.previous);
            let _ = DeleteObject(self.bitmap.into());
            let _ = DeleteDC(self.mem_dc);
            let _ = ReleaseDC(Some(self.hwnd), self.window_dc);
        }
    }
}
