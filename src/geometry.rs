//! Page-space to raster-space mapping for citation highlights.
//!
//! Page-native coordinates have their origin at the bottom-left with y
//! growing upward, in points. Raster coordinates have their origin at the
//! top-left with y growing downward, in device pixels at the render scale.
//!
//! [`overlay_rect`] flips y exactly once, itself, and then applies the
//! diagonal scale and translation of a top-left-origin transform. Rasterizers
//! such as PDF.js hand out a transform that already contains the flip
//! (`[s, 0, 0, -s, 0, s * H]`); [`PageViewport::new`] normalises those so the
//! flip is never applied twice.

use serde::{Deserialize, Serialize};

use crate::models::BBox;

/// Affine coefficients `[a, b, c, d, e, f]`: `(x, y)` maps to
/// `(a·x + c·y + e, b·x + d·y + f)`.
pub type Transform = [f64; 6];

/// Geometry of one rendered page. Valid only for the scale it was built at.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageViewport {
    pub scale: f64,
    /// Top-left-origin transform (`d > 0`).
    pub transform: Transform,
    pub page_height_pts: f64,
}

impl PageViewport {
    /// Build from the transform a rasterizer reports for the page.
    pub fn new(scale: f64, transform: Transform, page_height_pts: f64) -> Self {
        Self { scale, transform: normalize_transform(transform, page_height_pts), page_height_pts }
    }

    /// Unrotated page rendered at `scale`, as PDF.js would report it.
    pub fn unrotated(scale: f64, page_height_pts: f64) -> Self {
        Self::new(scale, [scale, 0.0, 0.0, -scale, 0.0, scale * page_height_pts], page_height_pts)
    }

    /// Pixel size of the raster for a page `page_width_pts` wide.
    pub fn raster_size(&self, page_width_pts: f64) -> (f64, f64) {
        let [a, _, _, d, _, _] = self.transform;
        (a * page_width_pts, d * self.page_height_pts)
    }

    pub fn overlay_for(&self, bbox: Option<BBox>) -> Option<OverlayRect> {
        overlay_rect(bbox, &self.transform, self.page_height_pts)
    }
}

/// Rewrite a y-flipping transform into the top-left-origin form consumed by
/// [`overlay_rect`]. Transforms with `d >= 0` are returned unchanged.
pub fn normalize_transform(transform: Transform, page_height_pts: f64) -> Transform {
    let [a, b, c, d, e, f] = transform;
    if d < 0.0 {
        [a, b, c, -d, e, f + d * page_height_pts]
    } else {
        transform
    }
}

/// Placement of a highlight over the raster, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OverlayRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl OverlayRect {
    /// Inline CSS positioning the overlay element.
    pub fn to_css(&self) -> String {
        format!(
            "left:{}px;top:{}px;width:{}px;height:{}px;",
            self.left, self.top, self.width, self.height
        )
    }
}

/// Map `bbox` onto the raster. Returns `None` (overlay stays hidden) when the
/// box is absent, invalid, or collapses to zero or negative size.
///
/// Only the diagonal terms `a`, `d` and the translation `e`, `f` are used:
/// rendered citation pages are axis-aligned.
pub fn overlay_rect(
    bbox: Option<BBox>,
    transform: &Transform,
    page_height_pts: f64,
) -> Option<OverlayRect> {
    let bbox = bbox.filter(BBox::is_valid)?;
    let [a, _, _, d, e, f] = *transform;

    let top_y = page_height_pts - bbox.y1;
    let rect = OverlayRect {
        left: a * bbox.x0 + e,
        top: d * top_y + f,
        width: a * bbox.width(),
        height: d * bbox.height(),
    };

    if !(rect.width > 0.0 && rect.height > 0.0) {
        return None;
    }
    Some(rect)
}
