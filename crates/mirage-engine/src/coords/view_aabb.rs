use super::{Rect, Vec2};

/// Visible region of the framebuffer snapshot, in normalized texture space.
///
/// Coordinates live in `[0, 1]` with the origin at the top-left of the
/// snapshot. The region is stored as center + half-extents (radius), matching
/// how the refraction shader mirrors and clamps its framebuffer samples.
///
/// `Default` is the full snapshot: center `(0.5, 0.5)`, radius `(0.5, 0.5)`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ViewAabb {
    pub center: Vec2,
    pub radius: Vec2,
}

impl Default for ViewAabb {
    #[inline]
    fn default() -> Self {
        Self {
            center: Vec2::splat(0.5),
            radius: Vec2::splat(0.5),
        }
    }
}

impl ViewAabb {
    #[inline]
    pub const fn new(cx: f32, cy: f32, rx: f32, ry: f32) -> Self {
        Self {
            center: Vec2::new(cx, cy),
            radius: Vec2::new(rx, ry),
        }
    }

    #[inline]
    pub fn from_rect(rect: Rect) -> Self {
        let r = rect.normalized();
        Self {
            center: r.center(),
            radius: r.half_extents(),
        }
    }

    #[inline]
    pub fn to_rect(self) -> Rect {
        Rect::from_center_half_extents(self.center, self.radius)
    }

    #[inline]
    pub fn min(self) -> Vec2 {
        self.center - self.radius
    }

    #[inline]
    pub fn max(self) -> Vec2 {
        self.center + self.radius
    }

    /// Restricts the region to the unit square.
    ///
    /// A region entirely outside `[0, 1]²` collapses to a zero-radius point on
    /// the nearest edge; sampling it yields a single clamped texel rather than
    /// reads outside the snapshot.
    pub fn clamped_to_unit(self) -> Self {
        const UNIT: Rect = Rect::new(0.0, 0.0, 1.0, 1.0);
        match self.to_rect().intersect(UNIT) {
            Some(r) => Self::from_rect(r),
            None => Self {
                center: Vec2::new(self.center.x.clamp(0.0, 1.0), self.center.y.clamp(0.0, 1.0)),
                radius: Vec2::zero(),
            },
        }
    }

    /// `[center.x, center.y, radius.x, radius.y]`, the uniform-buffer layout.
    #[inline]
    pub const fn to_array(self) -> [f32; 4] {
        [self.center.x, self.center.y, self.radius.x, self.radius.y]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_full_snapshot() {
        let aabb = ViewAabb::default();
        assert_eq!(aabb.min(), Vec2::zero());
        assert_eq!(aabb.max(), Vec2::splat(1.0));
        assert_eq!(aabb.to_array(), [0.5, 0.5, 0.5, 0.5]);
    }

    #[test]
    fn rect_round_trip() {
        let aabb = ViewAabb::new(0.25, 0.5, 0.25, 0.5);
        assert_eq!(ViewAabb::from_rect(aabb.to_rect()), aabb);
        assert_eq!(aabb.to_rect(), Rect::new(0.0, 0.0, 0.5, 1.0));
    }

    #[test]
    fn clamp_inside_is_identity() {
        let aabb = ViewAabb::new(0.5, 0.5, 0.25, 0.25);
        assert_eq!(aabb.clamped_to_unit(), aabb);
    }

    #[test]
    fn clamp_overhanging_edge() {
        // Region pokes past the right edge; clamp trims it back.
        let aabb = ViewAabb::new(0.9, 0.5, 0.2, 0.2);
        let c = aabb.clamped_to_unit();
        assert!((c.max().x - 1.0).abs() < 1e-6);
        assert!((c.min().x - 0.7).abs() < 1e-6);
        assert_eq!(c.min().y, aabb.min().y);
    }

    #[test]
    fn clamp_fully_outside_collapses() {
        let aabb = ViewAabb::new(2.0, 0.5, 0.1, 0.1);
        let c = aabb.clamped_to_unit();
        assert_eq!(c.radius, Vec2::zero());
        assert_eq!(c.center, Vec2::new(1.0, 0.5));
    }
}
