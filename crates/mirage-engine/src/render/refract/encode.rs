//! CPU-side vertex encoding for refraction batches.
//!
//! Each rect becomes 4 vertices (TL, TR, BR, BL in y-down space) addressed by
//! a static index buffer with 6 indices per rect. Vertices for rect `i`
//! occupy `staging[i*4 .. i*4+4]`, so a contiguous rect range maps onto a
//! contiguous byte range of the GPU vertex buffer.

use bytemuck::{Pod, Zeroable};

use crate::coords::Vec2;

use super::descriptor::RectSprite;

pub(super) const VERTICES_PER_RECT: usize = 4;
pub(super) const INDICES_PER_RECT: usize = 6;

/// GPU vertex for one rect corner.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct RectVertex {
    pub pos: [f32; 2],
    pub uv: [f32; 2],
    pub color: [f32; 4],
}

impl RectVertex {
    const ATTRS: [wgpu::VertexAttribute; 3] = wgpu::vertex_attr_array![
        0 => Float32x2, // pos
        1 => Float32x2, // uv
        2 => Float32x4  // color
    ];

    pub(super) fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<RectVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

/// Encodes `rects[offset .. offset+size]` into the matching staging range.
///
/// Callers validate the range; `staging` must hold 4 vertices per rect.
pub(super) fn encode_range(
    rects: &[RectSprite],
    staging: &mut [RectVertex],
    offset: usize,
    size: usize,
) {
    debug_assert!(offset + size <= rects.len());
    debug_assert_eq!(staging.len(), rects.len() * VERTICES_PER_RECT);

    for (i, rect) in rects.iter().enumerate().skip(offset).take(size) {
        let (sin, cos) = rect.rotation.sin_cos();
        let color = rect.color.to_array();

        let u0 = rect.uv_origin.x;
        let v0 = rect.uv_origin.y;
        let u1 = u0 + rect.uv_extents.x;
        let v1 = v0 + rect.uv_extents.y;

        let hw = rect.half_extents.x;
        let hh = rect.half_extents.y;

        let corners = [
            (Vec2::new(-hw, -hh), [u0, v0]), // TL
            (Vec2::new(hw, -hh), [u1, v0]),  // TR
            (Vec2::new(hw, hh), [u1, v1]),   // BR
            (Vec2::new(-hw, hh), [u0, v1]),  // BL
        ];

        for (k, (corner, uv)) in corners.into_iter().enumerate() {
            let p = rect.center + corner.rotated(sin, cos);
            staging[i * VERTICES_PER_RECT + k] = RectVertex {
                pos: [p.x, p.y],
                uv,
                color,
            };
        }
    }
}

/// Builds the static index list for `num` quads.
///
/// Rect `i` draws triangles `(4i, 4i+1, 4i+2)` and `(4i+2, 4i+3, 4i)`.
pub(super) fn quad_indices(num: usize) -> Vec<u32> {
    let mut indices = Vec::with_capacity(num * INDICES_PER_RECT);
    for i in 0..num as u32 {
        let base = i * VERTICES_PER_RECT as u32;
        indices.extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
    }
    indices
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::ColorRgba;

    fn staging_for(rects: &[RectSprite]) -> Vec<RectVertex> {
        vec![RectVertex::zeroed(); rects.len() * VERTICES_PER_RECT]
    }

    // ── geometry ──────────────────────────────────────────────────────────

    #[test]
    fn unrotated_corners() {
        let rects = [RectSprite {
            center: Vec2::new(10.0, 20.0),
            half_extents: Vec2::new(3.0, 2.0),
            ..Default::default()
        }];
        let mut staging = staging_for(&rects);
        encode_range(&rects, &mut staging, 0, 1);

        assert_eq!(staging[0].pos, [7.0, 18.0]); // TL
        assert_eq!(staging[1].pos, [13.0, 18.0]); // TR
        assert_eq!(staging[2].pos, [13.0, 22.0]); // BR
        assert_eq!(staging[3].pos, [7.0, 22.0]); // BL
    }

    #[test]
    fn quarter_turn_swaps_extents() {
        let rects = [RectSprite {
            center: Vec2::zero(),
            half_extents: Vec2::new(4.0, 1.0),
            rotation: std::f32::consts::FRAC_PI_2,
            ..Default::default()
        }];
        let mut staging = staging_for(&rects);
        encode_range(&rects, &mut staging, 0, 1);

        // TL (-4, -1) rotates to (1, -4).
        assert!((staging[0].pos[0] - 1.0).abs() < 1e-5);
        assert!((staging[0].pos[1] + 4.0).abs() < 1e-5);
    }

    #[test]
    fn uv_corners_and_color() {
        let rects = [RectSprite {
            uv_origin: Vec2::new(0.25, 0.5),
            uv_extents: Vec2::new(0.5, 0.25),
            color: ColorRgba::new(1.0, 0.5, 0.25, 0.75),
            ..Default::default()
        }];
        let mut staging = staging_for(&rects);
        encode_range(&rects, &mut staging, 0, 1);

        assert_eq!(staging[0].uv, [0.25, 0.5]); // TL
        assert_eq!(staging[2].uv, [0.75, 0.75]); // BR
        for v in &staging {
            assert_eq!(v.color, [1.0, 0.5, 0.25, 0.75]);
        }
    }

    // ── range discipline ──────────────────────────────────────────────────

    #[test]
    fn sub_range_leaves_other_vertices_untouched() {
        let mut rects = [RectSprite::default(); 4];
        for (i, r) in rects.iter_mut().enumerate() {
            r.center = Vec2::splat(i as f32 + 1.0);
            r.half_extents = Vec2::splat(1.0);
        }
        let mut staging = staging_for(&rects);
        encode_range(&rects, &mut staging, 1, 2);

        for v in &staging[0..VERTICES_PER_RECT] {
            assert_eq!(*v, RectVertex::zeroed());
        }
        for v in &staging[3 * VERTICES_PER_RECT..] {
            assert_eq!(*v, RectVertex::zeroed());
        }
        assert_ne!(staging[VERTICES_PER_RECT], RectVertex::zeroed());
        assert_ne!(staging[2 * VERTICES_PER_RECT], RectVertex::zeroed());
    }

    #[test]
    fn zero_size_is_a_no_op() {
        let rects = [RectSprite {
            half_extents: Vec2::splat(1.0),
            ..Default::default()
        }];
        let mut staging = staging_for(&rects);
        encode_range(&rects, &mut staging, 0, 0);
        assert!(staging.iter().all(|v| *v == RectVertex::zeroed()));
    }

    // ── indices ───────────────────────────────────────────────────────────

    #[test]
    fn quad_indices_pattern() {
        assert_eq!(quad_indices(2), vec![0, 1, 2, 2, 3, 0, 4, 5, 6, 6, 7, 4]);
    }

    #[test]
    fn quad_indices_count() {
        assert_eq!(quad_indices(100).len(), 600);
    }
}
