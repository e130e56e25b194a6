//! Draws a match result onto a copy of the frame.

use image::{Rgb, RgbImage};

use crate::rect::Rect;

use super::MatchResult;

const BOX_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const CENTER_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
const BOX_THICKNESS: i32 = 2;
const CENTER_RADIUS: i32 = 5;
const LABEL_SCALE: i32 = 2;
const GLYPH_WIDTH: i32 = 3;
const GLYPH_HEIGHT: i32 = 5;

/// Returns the frame with the bounding box, center dot and confidence
/// label drawn on it when the result is a hit, or an unmodified copy.
pub(crate) fn annotate(frame: &RgbImage, result: &MatchResult) -> RgbImage {
    let mut canvas = frame.clone();
    if !result.found {
        return canvas;
    }

    outline(&mut canvas, &result.bounding_box, BOX_THICKNESS, BOX_COLOR);
    disc(
        &mut canvas,
        result.center.x.round() as i32,
        result.center.y.round() as i32,
        CENTER_RADIUS,
        CENTER_COLOR,
    );
    let label = format!("{:.3}", result.confidence);
    text(
        &mut canvas,
        result.bounding_box.x,
        result.bounding_box.y - 10 - GLYPH_HEIGHT * LABEL_SCALE / 2,
        &label,
        BOX_COLOR,
    );
    canvas
}

fn put(canvas: &mut RgbImage, x: i32, y: i32, color: Rgb<u8>) {
    if x >= 0 && y >= 0 && (x as u32) < canvas.width() && (y as u32) < canvas.height() {
        canvas.put_pixel(x as u32, y as u32, color);
    }
}

fn fill(canvas: &mut RgbImage, x: i32, y: i32, w: i32, h: i32, color: Rgb<u8>) {
    for yy in y..y + h {
        for xx in x..x + w {
            put(canvas, xx, yy, color);
        }
    }
}

fn outline(canvas: &mut RgbImage, rect: &Rect, thickness: i32, color: Rgb<u8>) {
    let (l, t, r, b) = (rect.x, rect.y, rect.right(), rect.bottom());
    fill(canvas, l, t, rect.width, thickness, color);
    fill(canvas, l, b - thickness, rect.width, thickness, color);
    fill(canvas, l, t, thickness, rect.height, color);
    fill(canvas, r - thickness, t, thickness, rect.height, color);
}

fn disc(canvas: &mut RgbImage, cx: i32, cy: i32, radius: i32, color: Rgb<u8>) {
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy <= radius * radius {
                put(canvas, cx + dx, cy + dy, color);
            }
        }
    }
}

/// 3x5 bitmaps, one row per byte, low three bits used.
fn glyph(c: char) -> Option<[u8; 5]> {
    Some(match c {
        '0' => [0b111, 0b101, 0b101, 0b101, 0b111],
        '1' => [0b010, 0b110, 0b010, 0b010, 0b111],
        '2' => [0b111, 0b001, 0b111, 0b100, 0b111],
        '3' => [0b111, 0b001, 0b111, 0b001, 0b111],
        '4' => [0b101, 0b101, 0b111, 0b001, 0b001],
        '5' => [0b111, 0b100, 0b111, 0b001, 0b111],
        '6' => [0b111, 0b100, 0b111, 0b101, 0b111],
        '7' => [0b111, 0b001, 0b010, 0b010, 0b010],
        '8' => [0b111, 0b101, 0b111, 0b101, 0b111],
        '9' => [0b111, 0b101, 0b111, 0b001, 0b111],
        '.' => [0b000, 0b000, 0b000, 0b000, 0b010],
        '-' => [0b000, 0b000, 0b111, 0b000, 0b000],
        _ => return None,
    })
}

fn text(canvas: &mut RgbImage, x: i32, y: i32, label: &str, color: Rgb<u8>) {
    let advance = (GLYPH_WIDTH + 1) * LABEL_SCALE;
    for (i, c) in label.chars().enumerate() {
        let Some(rows) = glyph(c) else { continue };
        let gx = x + i as i32 * advance;
        for (row, bits) in rows.iter().enumerate() {
            for col in 0..GLYPH_WIDTH {
                if bits & (1 << (GLYPH_WIDTH - 1 - col)) != 0 {
                    fill(
                        canvas,
                        gx + col * LABEL_SCALE,
                        y + row as i32 * LABEL_SCALE,
                        LABEL_SCALE,
                        LABEL_SCALE,
                        color,
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rect::Point;

    fn hit(bbox: Rect) -> MatchResult {
        MatchResult {
            found: true,
            confidence: 0.875,
            center: Point::new(
                bbox.x as f32 + bbox.width as f32 / 2.0,
                bbox.y as f32 + bbox.height as f32 / 2.0,
            ),
            bounding_box: bbox,
            scale: 1.0,
            rotation: 0.0,
        }
    }

    #[test]
    fn miss_leaves_frame_untouched() {
        // Arrange
        let frame = RgbImage::from_pixel(50, 40, Rgb([9, 9, 9]));

        // Act
        let out = annotate(&frame, &MatchResult::default());

        // Assert
        assert_eq!(out, frame);
    }

    #[test]
    fn hit_draws_box_and_center() {
        // Arrange
        let frame = RgbImage::new(100, 80);
        let result = hit(Rect::new(20, 30, 40, 30));

        // Act
        let out = annotate(&frame, &result);

        // Assert
        assert_eq!(*out.get_pixel(20, 30), BOX_COLOR);
        assert_eq!(*out.get_pixel(21, 45), BOX_COLOR);
        assert_eq!(*out.get_pixel(59, 59), BOX_COLOR);
        assert_eq!(*out.get_pixel(40, 45), CENTER_COLOR);
        assert_eq!(*out.get_pixel(30, 40), Rgb([0, 0, 0]));
    }

    #[test]
    fn drawing_near_edges_is_clipped() {
        // Arrange
        let frame = RgbImage::new(30, 30);
        let result = hit(Rect::new(-10, -10, 25, 25));

        // Act
        let out = annotate(&frame, &result);

        // Assert
        assert_eq!(out.dimensions(), (30, 30));
        assert_eq!(*out.get_pixel(14, 0), BOX_COLOR);
    }
}
