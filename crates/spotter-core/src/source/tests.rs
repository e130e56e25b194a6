use std::cell::RefCell;
use std::rc::Rc;

use image::RgbImage;

use super::*;
use crate::{Error, WindowResult};

#[derive(Default)]
struct FakeState {
    processes: Vec<(String, ProcessId)>,
    alive: Vec<ProcessId>,
    windows: Vec<(ProcessId, u32)>,
    minimized: bool,
    hidden: bool,
    bounds: Rect,
    fail_surface: bool,
    live_surfaces: i32,
    max_live_surfaces: i32,
    surfaces_created: u32,
    calls: Vec<&'static str>,
}

#[derive(Clone, Default)]
struct FakeBackend(Rc<RefCell<FakeState>>);

struct FakeSurface {
    state: Rc<RefCell<FakeState>>,
    bounds: Rect,
}

impl Drop for FakeSurface {
    fn drop(&mut self) {
        self.state.borrow_mut().live_surfaces -= 1;
    }
}

impl FakeBackend {
    fn with_running(name: &str, pid: ProcessId, hwnd: u32, bounds: Rect) -> Self {
        let backend = Self::default();
        backend.start(name, pid, hwnd, bounds);
        backend
    }

    fn start(&self, name: &str, pid: ProcessId, hwnd: u32, bounds: Rect) {
        let mut s = self.0.borrow_mut();
        s.processes.push((name.to_string(), pid));
        s.alive.push(pid);
        s.windows.push((pid, hwnd));
        s.bounds = bounds;
    }

    fn kill(&self, pid: ProcessId) {
        let mut s = self.0.borrow_mut();
        s.processes.retain(|(_, p)| *p != pid);
        s.alive.retain(|p| *p != pid);
        s.windows.retain(|(p, _)| *p != pid);
    }

    fn state(&self) -> std::cell::RefMut<'_, FakeState> {
        self.0.borrow_mut()
    }
}

impl CaptureBackend for FakeBackend {
    type Handle = u32;
    type Surface = FakeSurface;

    fn find_process_id(&self, name: &str) -> Option<ProcessId> {
        let s = self.0.borrow();
        s.processes
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, pid)| *pid)
    }

    fn find_main_window(&self, pid: ProcessId) -> Option<u32> {
        let s = self.0.borrow();
        s.windows.iter().find(|(p, _)| *p == pid).map(|(_, w)| *w)
    }

    fn is_process_alive(&self, pid: ProcessId) -> bool {
        self.0.borrow().alive.contains(&pid)
    }

    fn is_minimized(&self, _window: u32) -> bool {
        self.0.borrow().minimized
    }

    fn is_visible(&self, _window: u32) -> bool {
        !self.0.borrow().hidden
    }

    fn bounds(&self, _window: u32, _area: CaptureArea) -> WindowResult<Rect> {
        Ok(self.0.borrow().bounds)
    }

    fn window_title(&self, window: u32) -> WindowResult<String> {
        Ok(format!("Window {window}"))
    }

    fn create_surface(
        &self,
        _window: u32,
        bounds: Rect,
        _area: CaptureArea,
    ) -> WindowResult<FakeSurface> {
        let mut s = self.0.borrow_mut();
        if s.fail_surface {
            return Err(Error::Capture("no surface".into()));
        }
        s.live_surfaces += 1;
        s.max_live_surfaces = s.max_live_surfaces.max(s.live_surfaces);
        s.surfaces_created += 1;
        Ok(FakeSurface {
            state: self.0.clone(),
            bounds,
        })
    }

    fn running_processes(&self) -> WindowResult<Vec<String>> {
        Ok(self
            .0
            .borrow()
            .processes
            .iter()
            .map(|(n, _)| n.clone())
            .collect())
    }
}

struct FailingStrategy;

impl CaptureStrategy<FakeSurface> for FailingStrategy {
    fn name(&self) -> &'static str {
        "failing"
    }

    fn capture(&self, surface: &mut FakeSurface) -> WindowResult<Frame> {
        surface.state.borrow_mut().calls.push("failing");
        Err(Error::Capture("refused".into()))
    }
}

struct SolidStrategy;

impl CaptureStrategy<FakeSurface> for SolidStrategy {
    fn name(&self) -> &'static str {
        "solid"
    }

    fn capture(&self, surface: &mut FakeSurface) -> WindowResult<Frame> {
        surface.state.borrow_mut().calls.push("solid");
        Ok(RgbImage::from_pixel(
            surface.bounds.width as u32,
            surface.bounds.height as u32,
            image::Rgb([1, 2, 3]),
        ))
    }
}

fn source_with(
    backend: &FakeBackend,
    strategies: Vec<Box<dyn CaptureStrategy<FakeSurface>>>,
) -> FrameSource<FakeBackend> {
    FrameSource::new(backend.clone(), strategies)
}

#[test]
fn set_target_fails_when_process_missing() {
    // Arrange
    let backend = FakeBackend::default();
    let mut source = source_with(&backend, vec![Box::new(SolidStrategy)]);

    // Act
    let ok = source.set_target("notepad.exe");

    // Assert
    assert!(!ok);
    assert!(source.target().is_none());
    assert!(!source.is_process_live());
    assert!(source.capture().is_none());
}

#[test]
fn set_target_fails_without_main_window_and_keeps_nothing() {
    // Arrange
    let backend = FakeBackend::default();
    backend.state().processes.push(("game.exe".into(), 7));
    backend.state().alive.push(7);
    let mut source = source_with(&backend, vec![Box::new(SolidStrategy)]);

    // Act
    let ok = source.set_target("game.exe");

    // Assert
    assert!(!ok);
    assert!(source.target().is_none());
    assert_eq!(backend.state().live_surfaces, 0);
}

#[test]
fn set_target_builds_context_for_running_process() {
    // Arrange
    let backend = FakeBackend::with_running("game.exe", 42, 0xAB, Rect::new(0, 0, 800, 600));
    let mut source = source_with(&backend, vec![Box::new(SolidStrategy)]);

    // Act
    let ok = source.set_target("GAME.EXE");

    // Assert
    assert!(ok);
    assert!(source.is_ready());
    let target = source.target().unwrap();
    assert_eq!(target.pid, 42);
    assert_eq!(target.window, 0xAB);
    assert_eq!(backend.state().live_surfaces, 1);
}

#[test]
fn set_target_reports_context_failure() {
    // Arrange
    let backend = FakeBackend::with_running("game.exe", 42, 1, Rect::new(0, 0, 800, 600));
    backend.state().fail_surface = true;
    let mut source = source_with(&backend, vec![Box::new(SolidStrategy)]);

    // Act / Assert
    assert!(!source.set_target("game.exe"));
    assert!(source.target().is_none());
}

#[test]
fn capture_returns_frame_of_window_size() {
    // Arrange
    let backend = FakeBackend::with_running("game.exe", 42, 1, Rect::new(0, 0, 800, 600));
    let mut source = source_with(&backend, vec![Box::new(SolidStrategy)]);
    source.set_target("game.exe");

    // Act
    let frame = source.capture().unwrap();

    // Assert
    assert_eq!(frame.dimensions(), (800, 600));
}

#[test]
fn small_window_never_yields_a_frame() {
    // Arrange
    let backend = FakeBackend::with_running("game.exe", 42, 1, Rect::new(0, 0, 50, 50));
    let mut source = source_with(&backend, vec![Box::new(SolidStrategy)]);
    source.set_min_window_size(100, 100);
    assert!(source.set_target("game.exe"));

    // Act / Assert
    assert!(source.capture().is_none());
    assert!(backend.state().calls.is_empty());
}

#[test]
fn minimized_or_hidden_window_yields_no_frame() {
    // Arrange
    let backend = FakeBackend::with_running("game.exe", 42, 1, Rect::new(0, 0, 800, 600));
    let mut source = source_with(&backend, vec![Box::new(SolidStrategy)]);
    source.set_target("game.exe");

    // Act / Assert
    backend.state().minimized = true;
    assert!(source.capture().is_none());

    backend.state().minimized = false;
    backend.state().hidden = true;
    assert!(source.capture().is_none());

    backend.state().hidden = false;
    assert!(source.capture().is_some());
}

#[test]
fn fallback_strategy_runs_only_after_primary_fails() {
    // Arrange
    let backend = FakeBackend::with_running("game.exe", 42, 1, Rect::new(0, 0, 200, 200));
    let mut source = source_with(
        &backend,
        vec![Box::new(FailingStrategy), Box::new(SolidStrategy)],
    );
    source.set_target("game.exe");

    // Act
    let frame = source.capture();

    // Assert
    assert!(frame.is_some());
    assert_eq!(backend.state().calls, vec!["failing", "solid"]);
}

#[test]
fn primary_success_skips_fallback() {
    // Arrange
    let backend = FakeBackend::with_running("game.exe", 42, 1, Rect::new(0, 0, 200, 200));
    let mut source = source_with(
        &backend,
        vec![Box::new(SolidStrategy), Box::new(FailingStrategy)],
    );
    source.set_target("game.exe");

    // Act
    source.capture();

    // Assert
    assert_eq!(backend.state().calls, vec!["solid"]);
}

#[test]
fn all_strategies_failing_yields_no_frame() {
    // Arrange
    let backend = FakeBackend::with_running("game.exe", 42, 1, Rect::new(0, 0, 200, 200));
    let mut source = source_with(&backend, vec![Box::new(FailingStrategy)]);
    source.set_target("game.exe");

    // Act / Assert
    assert!(source.capture().is_none());
}

#[test]
fn bounds_change_rebuilds_context_without_overlap() {
    // Arrange
    let backend = FakeBackend::with_running("game.exe", 42, 1, Rect::new(0, 0, 800, 600));
    let mut source = source_with(&backend, vec![Box::new(SolidStrategy)]);
    source.set_target("game.exe");
    source.capture();
    assert_eq!(backend.state().surfaces_created, 1);

    // Act: resize the window
    backend.state().bounds = Rect::new(0, 0, 1024, 768);
    let frame = source.capture().unwrap();

    // Assert
    assert_eq!(frame.dimensions(), (1024, 768));
    assert_eq!(backend.state().surfaces_created, 2);
    assert_eq!(backend.state().live_surfaces, 1);
    assert_eq!(backend.state().max_live_surfaces, 1);
    assert_eq!(source.target().unwrap().bounds, Rect::new(0, 0, 1024, 768));
}

#[test]
fn unchanged_bounds_reuse_context() {
    // Arrange
    let backend = FakeBackend::with_running("game.exe", 42, 1, Rect::new(0, 0, 800, 600));
    let mut source = source_with(&backend, vec![Box::new(SolidStrategy)]);
    source.set_target("game.exe");

    // Act
    for _ in 0..5 {
        source.capture();
    }

    // Assert
    assert_eq!(backend.state().surfaces_created, 1);
}

#[test]
fn moving_window_keeps_context() {
    // Arrange
    let backend = FakeBackend::with_running("game.exe", 42, 1, Rect::new(0, 0, 800, 600));
    let mut source = source_with(&backend, vec![Box::new(SolidStrategy)]);
    source.set_target("game.exe");
    source.capture();

    // Act
    backend.state().bounds = Rect::new(250, 140, 800, 600);
    let frame = source.capture().unwrap();

    // Assert
    assert_eq!(frame.dimensions(), (800, 600));
    assert_eq!(backend.state().surfaces_created, 1);
    assert_eq!(backend.state().live_surfaces, 1);
    assert_eq!(source.target().unwrap().bounds, Rect::new(250, 140, 800, 600));
}

#[test]
fn failed_rebuild_leaves_nothing_allocated() {
    // Arrange
    let backend = FakeBackend::with_running("game.exe", 42, 1, Rect::new(0, 0, 800, 600));
    let mut source = source_with(&backend, vec![Box::new(SolidStrategy)]);
    source.set_target("game.exe");

    // Act
    {
        let mut s = backend.state();
        s.bounds = Rect::new(0, 0, 640, 480);
        s.fail_surface = true;
    }
    let frame = source.capture();

    // Assert
    assert!(frame.is_none());
    assert_eq!(backend.state().live_surfaces, 0);
}

#[test]
fn refresh_recovers_after_restart_with_new_pid() {
    // Arrange
    let backend = FakeBackend::with_running("game.exe", 42, 1, Rect::new(0, 0, 800, 600));
    let mut source = source_with(&backend, vec![Box::new(SolidStrategy)]);
    source.set_target("game.exe");
    backend.kill(42);
    assert!(!source.is_process_live());

    // Act
    backend.start("game.exe", 99, 2, Rect::new(0, 0, 800, 600));
    let ok = source.refresh();

    // Assert
    assert!(ok);
    assert!(source.is_process_live());
    assert_eq!(source.target().unwrap().pid, 99);
    assert_eq!(backend.state().live_surfaces, 1);
}

#[test]
fn refresh_without_name_fails() {
    // Arrange
    let backend = FakeBackend::default();
    let mut source = source_with(&backend, vec![Box::new(SolidStrategy)]);

    // Act / Assert
    assert!(!source.refresh());
}

#[test]
fn dropping_source_releases_context() {
    // Arrange
    let backend = FakeBackend::with_running("game.exe", 42, 1, Rect::new(0, 0, 800, 600));
    let mut source = source_with(&backend, vec![Box::new(SolidStrategy)]);
    source.set_target("game.exe");

    // Act
    drop(source);

    // Assert
    assert_eq!(backend.state().live_surfaces, 0);
}

#[test]
fn changing_target_releases_previous_context() {
    // Arrange
    let backend = FakeBackend::with_running("game.exe", 42, 1, Rect::new(0, 0, 800, 600));
    let mut source = source_with(&backend, vec![Box::new(SolidStrategy)]);
    source.set_target("game.exe");

    // Act
    let ok = source.set_target("other.exe");

    // Assert
    assert!(!ok);
    assert_eq!(backend.state().live_surfaces, 0);
    assert_eq!(source.process_name(), "other.exe");
}

#[test]
fn describe_mentions_process_and_size() {
    // Arrange
    let backend = FakeBackend::with_running("game.exe", 42, 1, Rect::new(0, 0, 800, 600));
    let mut source = source_with(&backend, vec![Box::new(SolidStrategy)]);
    source.set_target("game.exe");

    // Act
    let info = source.describe().unwrap();

    // Assert
    assert!(info.contains("game.exe"));
    assert!(info.contains("PID 42"));
    assert!(info.contains("800x600"));
}
