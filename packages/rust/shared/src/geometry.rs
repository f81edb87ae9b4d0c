//! Page-space geometry and the page <-> device transform.
//!
//! All coordinates handled by the pipeline are PDF page-space points:
//! origin at the bottom-left corner, y increasing upward, 72 points per inch.
//! Device space (pixels on a rendered page) is only ever reached through
//! [`PageTransform`].

use serde::{Deserialize, Serialize};

/// Points per inch in PDF page space.
pub const POINTS_PER_INCH: f64 = 72.0;

// ---------------------------------------------------------------------------
// Point
// ---------------------------------------------------------------------------

/// A position in page space. Serialized as `[x, y]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

impl From<[f64; 2]> for Point {
    fn from([x, y]: [f64; 2]) -> Self {
        Self { x, y }
    }
}

impl From<Point> for [f64; 2] {
    fn from(p: Point) -> Self {
        [p.x, p.y]
    }
}

// ---------------------------------------------------------------------------
// BBox
// ---------------------------------------------------------------------------

/// Axis-aligned rectangle in page space. Serialized as `[x0, y0, x1, y1]`.
///
/// `(x0, y0)` is the bottom-left corner and `(x1, y1)` the top-right one.
/// Constructors normalize swapped corners.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct BBox {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl BBox {
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self {
            x0: x0.min(x1),
            y0: y0.min(y1),
            x1: x0.max(x1),
            y1: y0.max(y1),
        }
    }

    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }

    pub fn center(&self) -> Point {
        Point::new((self.x0 + self.x1) / 2.0, (self.y0 + self.y1) / 2.0)
    }

    pub fn contains(&self, p: &Point) -> bool {
        p.x >= self.x0 && p.x <= self.x1 && p.y >= self.y0 && p.y <= self.y1
    }

    /// Whether every coordinate is a finite number.
    pub fn is_finite(&self) -> bool {
        self.x0.is_finite() && self.y0.is_finite() && self.x1.is_finite() && self.y1.is_finite()
    }
}

impl From<[f64; 4]> for BBox {
    fn from([x0, y0, x1, y1]: [f64; 4]) -> Self {
        Self::new(x0, y0, x1, y1)
    }
}

impl From<BBox> for [f64; 4] {
    fn from(b: BBox) -> Self {
        [b.x0, b.y0, b.x1, b.y1]
    }
}

// ---------------------------------------------------------------------------
// PageTransform
// ---------------------------------------------------------------------------

/// The one mapping between page space and device space.
///
/// Device space has its origin at the top-left corner of the rendered page
/// and y increasing downward. `scale` converts points to device pixels and is
/// always `zoom * dpi / 72`; every consumer goes through this type instead of
/// carrying its own scale constant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageTransform {
    page_height: f64,
    scale: f64,
}

impl PageTransform {
    /// Build a transform for a page of `page_height` points rendered at
    /// `dpi` with an extra `zoom` factor.
    pub fn new(page_height: f64, dpi: f64, zoom: f64) -> Self {
        Self {
            page_height,
            scale: zoom * dpi / POINTS_PER_INCH,
        }
    }

    /// Points-to-pixels factor.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn page_to_device(&self, p: Point) -> Point {
        Point::new(p.x * self.scale, (self.page_height - p.y) * self.scale)
    }

    pub fn device_to_page(&self, p: Point) -> Point {
        if self.scale == 0.0 {
            return Point::new(0.0, self.page_height);
        }
        Point::new(p.x / self.scale, self.page_height - p.y / self.scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bbox_normalizes_corners() {
        let b = BBox::new(10.0, 20.0, 0.0, 5.0);
        assert_eq!(b, BBox::new(0.0, 5.0, 10.0, 20.0));
        assert_eq!(b.width(), 10.0);
        assert_eq!(b.height(), 15.0);
        assert_eq!(b.center(), Point::new(5.0, 12.5));
    }

    #[test]
    fn bbox_serializes_as_array() {
        let b = BBox::new(1.0, 2.0, 3.0, 4.0);
        let json = serde_json::to_string(&b).expect("serialize");
        assert_eq!(json, "[1.0,2.0,3.0,4.0]");
        let parsed: BBox = serde_json::from_str("[3.0,4.0,1.0,2.0]").expect("deserialize");
        assert_eq!(parsed, b);
    }

    #[test]
    fn transform_at_72_dpi_only_flips_y() {
        let t = PageTransform::new(842.0, 72.0, 1.0);
        assert_eq!(t.scale(), 1.0);
        assert_eq!(t.page_to_device(Point::new(10.0, 842.0)), Point::new(10.0, 0.0));
        assert_eq!(t.page_to_device(Point::new(10.0, 0.0)), Point::new(10.0, 842.0));
    }

    #[test]
    fn transform_roundtrips_with_zoom() {
        let t = PageTransform::new(595.0, 150.0, 2.0);
        let p = Point::new(123.5, 456.25);
        let back = t.device_to_page(t.page_to_device(p));
        assert!((back.x - p.x).abs() < 1e-9);
        assert!((back.y - p.y).abs() < 1e-9);
        assert!((t.scale() - 2.0 * 150.0 / 72.0).abs() < 1e-12);
    }
}
