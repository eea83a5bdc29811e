use crate::coords::{ColorRgba, Rect, Vec2};

/// A single sprite in a refraction batch.
///
/// Plain caller-owned value; edits become visible on screen only after the
/// owning batch re-encodes the rect via `update`/`update_sub`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RectSprite {
    /// World-space center position (logical px, +Y down).
    pub center: Vec2,
    /// Half width/height; non-negative.
    pub half_extents: Vec2,
    /// Rotation around `center` in radians.
    pub rotation: f32,
    /// Top-left of the main-texture UV rect.
    pub uv_origin: Vec2,
    /// UV rect extents; non-negative.
    pub uv_extents: Vec2,
    /// Straight-alpha color modulation.
    pub color: ColorRgba,
}

impl Default for RectSprite {
    /// Zero-sized rect at the origin with the full unit UV rect and white color.
    fn default() -> Self {
        Self {
            center: Vec2::zero(),
            half_extents: Vec2::zero(),
            rotation: 0.0,
            uv_origin: Vec2::zero(),
            uv_extents: Vec2::splat(1.0),
            color: ColorRgba::white(),
        }
    }
}

impl RectSprite {
    /// The UV rect as a [`Rect`] value.
    #[inline]
    pub fn uv_rect(&self) -> Rect {
        Rect::from_origin_size(self.uv_origin, self.uv_extents)
    }

    /// Sets the UV rect, normalizing negative extents.
    #[inline]
    pub fn set_uv_rect(&mut self, rect: Rect) {
        let r = rect.normalized();
        self.uv_origin = r.origin;
        self.uv_extents = r.size;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_invisible_white_unit_uv() {
        let r = RectSprite::default();
        assert_eq!(r.half_extents, Vec2::zero());
        assert_eq!(r.uv_origin, Vec2::zero());
        assert_eq!(r.uv_extents, Vec2::splat(1.0));
        assert_eq!(r.color, ColorRgba::white());
        assert_eq!(r.rotation, 0.0);
    }

    #[test]
    fn uv_rect_round_trip() {
        let mut r = RectSprite::default();
        r.set_uv_rect(Rect::new(0.25, 0.5, 0.5, 0.25));
        assert_eq!(r.uv_rect(), Rect::new(0.25, 0.5, 0.5, 0.25));
    }

    #[test]
    fn set_uv_rect_normalizes() {
        let mut r = RectSprite::default();
        r.set_uv_rect(Rect::new(1.0, 1.0, -1.0, -1.0));
        assert_eq!(r.uv_origin, Vec2::zero());
        assert_eq!(r.uv_extents, Vec2::splat(1.0));
    }
}
