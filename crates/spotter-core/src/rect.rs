use serde::Serialize;

/// A rectangle in pixel coordinates.
///
/// Used both for window bounds reported by the OS and for match
/// bounding boxes inside a captured frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Builds a rectangle from Win32-style edges (`left, top, right, bottom`).
    pub fn from_edges(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self::new(left, top, right - left, bottom - top)
    }

    /// A rectangle of the given size centered on `center`.
    ///
    /// Integer halves round toward zero, so odd sizes sit one pixel
    /// further right/down of the exact center.
    pub fn centered_on(center: Point, width: i32, height: i32) -> Self {
        Self::new(
            center.x as i32 - width / 2,
            center.y as i32 - height / 2,
            width,
            height,
        )
    }

    /// Horizontal center of the rectangle.
    pub fn center_x(&self) -> i32 {
        self.x + self.width / 2
    }

    /// Vertical center of the rectangle.
    pub fn center_y(&self) -> i32 {
        self.y + self.height / 2
    }

    /// Right edge (exclusive).
    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    /// Bottom edge (exclusive).
    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    /// Whether both dimensions reach at least the given minimum.
    pub fn fits_at_least(&self, min_width: i32, min_height: i32) -> bool {
        self.width >= min_width && self.height >= min_height
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }
}

/// A sub-pixel position, e.g. the center of a match.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}
