//! Coordinate transformation from client (CSS pixel) space to canvas backing-store space

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f32 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// An element's bounding client rect, in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElementRect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

/// Convert a pointer or touch sample to canvas pixels.
///
/// The backing store is usually `css size * devicePixelRatio`, so scaling by
/// the backing/CSS ratio on each axis covers both DPR and any CSS stretching.
/// Samples outside the element are clamped onto its edge.
pub fn to_canvas_space(
    client_x: f32,
    client_y: f32,
    rect: &ElementRect,
    canvas_width: u32,
    canvas_height: u32,
) -> Point {
    if rect.width <= 0.0 || rect.height <= 0.0 {
        return Point::default();
    }
    let scale_x = canvas_width as f32 / rect.width;
    let scale_y = canvas_height as f32 / rect.height;

    let x = ((client_x - rect.left) * scale_x).clamp(0.0, canvas_width as f32);
    let y = ((client_y - rect.top) * scale_y).clamp(0.0, canvas_height as f32);
    Point { x, y }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECT: ElementRect = ElementRect {
        left: 100.0,
        top: 50.0,
        width: 300.0,
        height: 100.0,
    };

    #[test]
    fn test_dpr_scaling() {
        // devicePixelRatio 2: backing store 600x200
        let p = to_canvas_space(250.0, 100.0, &RECT, 600, 200);
        assert!((p.x - 300.0).abs() < 1e-4);
        assert!((p.y - 100.0).abs() < 1e-4);
    }

    #[test]
    fn test_corners() {
        let top_left = to_canvas_space(100.0, 50.0, &RECT, 300, 100);
        assert_eq!(top_left, Point::new(0.0, 0.0));
        let bottom_right = to_canvas_space(400.0, 150.0, &RECT, 300, 100);
        assert_eq!(bottom_right, Point::new(300.0, 100.0));
    }

    #[test]
    fn test_outside_samples_clamped() {
        let p = to_canvas_space(0.0, 1000.0, &RECT, 300, 100);
        assert_eq!(p, Point::new(0.0, 100.0));
    }

    #[test]
    fn test_degenerate_rect() {
        let rect = ElementRect {
            width: 0.0,
            ..RECT
        };
        assert_eq!(to_canvas_space(10.0, 10.0, &rect, 300, 100), Point::default());
    }
}
