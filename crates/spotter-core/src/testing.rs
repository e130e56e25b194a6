//! Test doubles shared by the unit tests.

use std::cell::{RefCell, RefMut};
use std::rc::Rc;

use image::{DynamicImage, Rgb, RgbImage};

use crate::source::{CaptureArea, CaptureBackend, CaptureStrategy, ProcessId};
use crate::{Frame, Rect, WindowResult};

/// A fake desktop: at most one process whose window shows `screen`.
pub(crate) struct Desktop {
    pub(crate) process: Option<(String, ProcessId)>,
    pub(crate) screen: RgbImage,
    pub(crate) minimized: bool,
    pub(crate) captures: u32,
}

impl Default for Desktop {
    fn default() -> Self {
        Self {
            process: None,
            screen: RgbImage::new(0, 0),
            minimized: false,
            captures: 0,
        }
    }
}

#[derive(Clone, Default)]
pub(crate) struct DesktopBackend(Rc<RefCell<Desktop>>);

impl DesktopBackend {
    pub(crate) fn launch(&self, name: &str, pid: ProcessId, screen: RgbImage) {
        let mut d = self.0.borrow_mut();
        d.process = Some((name.to_string(), pid));
        d.screen = screen;
    }

    pub(crate) fn exit(&self) {
        self.0.borrow_mut().process = None;
    }

    pub(crate) fn captures(&self) -> u32 {
        self.0.borrow().captures
    }

    pub(crate) fn desktop(&self) -> RefMut<'_, Desktop> {
        self.0.borrow_mut()
    }
}

impl CaptureBackend for DesktopBackend {
    type Handle = ProcessId;
    type Surface = Rc<RefCell<Desktop>>;

    fn find_process_id(&self, name: &str) -> Option<ProcessId> {
        let d = self.0.borrow();
        d.process
            .as_ref()
            .filter(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, pid)| *pid)
    }

    fn find_main_window(&self, pid: ProcessId) -> Option<ProcessId> {
        Some(pid)
    }

    fn is_process_alive(&self, pid: ProcessId) -> bool {
        self.0.borrow().process.as_ref().is_some_and(|(_, p)| *p == pid)
    }

    fn is_minimized(&self, _window: ProcessId) -> bool {
        self.0.borrow().minimized
    }

    fn is_visible(&self, _window: ProcessId) -> bool {
        true
    }

    fn bounds(&self, _window: ProcessId, _area: CaptureArea) -> WindowResult<Rect> {
        let (w, h) = self.0.borrow().screen.dimensions();
        Ok(Rect::new(0, 0, w as i32, h as i32))
    }

    fn window_title(&self, window: ProcessId) -> WindowResult<String> {
        Ok(format!("window of {window}"))
    }

    fn create_surface(
        &self,
        _window: ProcessId,
        _bounds: Rect,
        _area: CaptureArea,
    ) -> WindowResult<Self::Surface> {
        Ok(self.0.clone())
    }

    fn running_processes(&self) -> WindowResult<Vec<String>> {
        Ok(self.0.borrow().process.iter().map(|(n, _)| n.clone()).collect())
    }
}

pub(crate) struct Screenshot;

impl CaptureStrategy<Rc<RefCell<Desktop>>> for Screenshot {
    fn name(&self) -> &'static str {
        "screenshot"
    }

    fn capture(&self, surface: &mut Rc<RefCell<Desktop>>) -> WindowResult<Frame> {
        let mut d = surface.borrow_mut();
        d.captures += 1;
        Ok(d.screen.clone())
    }
}

pub(crate) fn noise(w: u32, h: u32, seed: u32) -> RgbImage {
    let mut state = seed;
    let mut next = move || {
        state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        (state >> 24) as u8
    };
    RgbImage::from_fn(w, h, |_, _| Rgb([next(), next(), next()]))
}

pub(crate) fn crop(image: &RgbImage, x: u32, y: u32, w: u32, h: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(image::imageops::crop_imm(image, x, y, w, h).to_image())
}
