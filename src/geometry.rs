//! Geometric primitives: intersection over union and box clipping.

use serde::Deserialize;

use crate::types::BoundingBox;

/// Valid coordinate ranges of an image frame, used to clip truncated boxes.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ImageBounds {
    /// Minimum and maximum x-coordinate.
    pub x: (f64, f64),
    /// Minimum and maximum y-coordinate.
    pub y: (f64, f64),
}

impl ImageBounds {
    pub fn new(x: (f64, f64), y: (f64, f64)) -> Self {
        Self { x, y }
    }
}

impl Default for ImageBounds {
    /// Full-HD-ish frame used by the synthetic camera data this tool was
    /// built around.
    fn default() -> Self {
        Self {
            x: (0.0, 1920.0),
            y: (0.0, 1280.0),
        }
    }
}

/// Calculate the intersection over union (IoU) of two bounding boxes.
///
/// Returns a value in [0.0, 1.0]; `0.0` when the boxes do not overlap or
/// when the union area is zero. Symmetric in its arguments.
///
/// # Example
///
/// ```
/// use det_eval::geometry::iou;
/// use det_eval::types::BoundingBox;
///
/// let a = BoundingBox::new((5.0, 5.0), (10.0, 10.0));
/// let b = BoundingBox::new((10.0, 10.0), (10.0, 10.0));
/// let value = iou(&a, &b);
/// assert!(value > 0.0 && value < 1.0);
/// ```
pub fn iou(a: &BoundingBox, b: &BoundingBox) -> f64 {
    let x_min = a.x_min().max(b.x_min());
    let y_min = a.y_min().max(b.y_min());
    let x_max = a.x_max().min(b.x_max());
    let y_max = a.y_max().min(b.y_max());

    let intersection = (x_max - x_min).max(0.0) * (y_max - y_min).max(0.0);
    let union = a.area() + b.area() - intersection;

    if union <= 0.0 {
        return 0.0;
    }

    intersection / union
}

/// Clamp a bounding box to the image frame.
///
/// A box completely outside the frame collapses onto the frame border with
/// zero area. Clipping an already-clipped box is a no-op.
pub fn clip_to_bounds(bbox: &BoundingBox, bounds: &ImageBounds) -> BoundingBox {
    let x_min = bbox.x_min().clamp(bounds.x.0, bounds.x.1);
    let x_max = bbox.x_max().clamp(bounds.x.0, bounds.x.1);
    let y_min = bbox.y_min().clamp(bounds.y.0, bounds.y.1);
    let y_max = bbox.y_max().clamp(bounds.y.0, bounds.y.1);

    BoundingBox::from_corners(x_min, y_min, x_max, y_max)
}
