//! Canonical bounding box in absolute-pixel XYWH form.
//!
//! Every annotation format parses into this representation, and the wire
//! payload is built from it. Conversions are permissive: out-of-range
//! normalized inputs are accepted without clamping, and float results are
//! truncated (not rounded) to integer pixels.

/// An axis-aligned bounding box as `(left, top, width, height)` in absolute
/// pixel units, relative to a declared or measured image size.
///
/// Width and height are expected to be non-negative but this is not
/// enforced; malformed boxes are representable on purpose so that permissive
/// readers never have to reject input.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BBoxXYWH {
    pub left: i32,
    pub top: i32,
    pub width: i32,
    pub height: i32,
}

impl BBoxXYWH {
    /// Creates a box from explicit left/top/width/height values.
    #[inline]
    pub fn new(left: i32, top: i32, width: i32, height: i32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Converts from corner form `(xmin, ymin, xmax, ymax)`, the Pascal VOC
    /// encoding.
    #[inline]
    pub fn from_corners(xmin: i32, ymin: i32, xmax: i32, ymax: i32) -> Self {
        Self {
            left: xmin,
            top: ymin,
            width: xmax - xmin,
            height: ymax - ymin,
        }
    }

    /// Converts from normalized center/size form `(cx, cy, w, h)` in `[0, 1]`,
    /// the YOLO encoding, scaled by `image_size` (width, height).
    ///
    /// Inputs outside `[0, 1]` are accepted as-is; results truncate toward
    /// zero.
    pub fn from_center_normalized(cx: f64, cy: f64, w: f64, h: f64, image_size: (u32, u32)) -> Self {
        let (img_w, img_h) = (image_size.0 as f64, image_size.1 as f64);
        let box_w = w * img_w;
        let box_h = h * img_h;
        let left = cx * img_w - box_w / 2.0;
        let top = cy * img_h - box_h / 2.0;
        Self {
            left: left as i32,
            top: top as i32,
            width: box_w as i32,
            height: box_h as i32,
        }
    }

    /// Re-projects the box from one image size into another, multiplying each
    /// coordinate by the per-axis ratio and truncating to integer pixels.
    ///
    /// When `from_size == to_size` the box is returned untouched rather than
    /// multiplied by 1.0, so integer outputs never drift.
    pub fn rescale(self, from_size: (u32, u32), to_size: (u32, u32)) -> Self {
        if from_size == to_size {
            return self;
        }
        let scale_x = to_size.0 as f64 / from_size.0 as f64;
        let scale_y = to_size.1 as f64 / from_size.1 as f64;
        Self {
            left: (self.left as f64 * scale_x) as i32,
            top: (self.top as f64 * scale_y) as i32,
            width: (self.width as f64 * scale_x) as i32,
            height: (self.height as f64 * scale_y) as i32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_corners_matches_voc_layout() {
        let bbox = BBoxXYWH::from_corners(179, 85, 231, 144);
        assert_eq!(bbox, BBoxXYWH::new(179, 85, 52, 59));
    }

    #[test]
    fn from_center_normalized_scales_and_truncates() {
        let bbox = BBoxXYWH::from_center_normalized(0.5, 0.5, 0.5, 0.5, (100, 200));
        assert_eq!(bbox, BBoxXYWH::new(25, 50, 50, 100));
    }

    #[test]
    fn from_center_normalized_does_not_clamp() {
        let bbox = BBoxXYWH::from_center_normalized(1.2, 0.5, 0.4, 0.4, (100, 100));
        assert_eq!(bbox.left, 100);
    }

    #[test]
    fn rescale_is_exact_identity_for_equal_sizes() {
        let bbox = BBoxXYWH::new(7, 13, 333, 99);
        assert_eq!(bbox.rescale((641, 479), (641, 479)), bbox);
    }

    #[test]
    fn rescale_halves_each_coordinate() {
        let bbox = BBoxXYWH::new(178, 84, 52, 58);
        assert_eq!(
            bbox.rescale((2048, 1024), (1024, 512)),
            BBoxXYWH::new(89, 42, 26, 29)
        );
    }

    #[test]
    fn rescale_truncates_toward_zero() {
        let bbox = BBoxXYWH::new(3, 3, 3, 3);
        // 3 * (2/3) = 1.999... truncates to 1
        assert_eq!(bbox.rescale((3, 3), (2, 2)), BBoxXYWH::new(1, 1, 1, 1));
    }
}
