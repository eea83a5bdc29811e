use std::ops::{Index, IndexMut};
use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use thiserror::Error;
use wgpu::util::DeviceExt;

use crate::coords::ViewAabb;
use crate::render::texture::{Texture, TextureSink};
use crate::render::{RenderCtx, RenderTarget};

use super::descriptor::RectSprite;
use super::encode::{encode_range, quad_indices, RectVertex, INDICES_PER_RECT, VERTICES_PER_RECT};

/// Violations of the batch API contract.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Error)]
pub enum BatchError {
    /// A rect range exceeded the fixed capacity. Ranges are never clamped.
    #[error("rect range at offset {offset} with size {size} exceeds batch capacity {num}")]
    OutOfRange {
        offset: usize,
        size: usize,
        num: usize,
    },
    /// Capacity is fixed at construction; an empty batch can never draw.
    #[error("batch capacity must be greater than zero")]
    ZeroCapacity,
}

/// Camera state consumed by a single render call.
///
/// Passed by value on every `render`/`render_sub` so the batch never holds
/// references into camera storage.
#[derive(Debug, Copy, Clone)]
pub struct FrameInputs {
    /// World-to-clip transform.
    pub view_proj: Mat4,
    /// Camera scale; multiplies the refraction-map pixel offsets.
    pub scale: f32,
    /// Visible region of the framebuffer snapshot. Clamped to the unit square
    /// at upload.
    pub view_aabb: ViewAabb,
}

impl Default for FrameInputs {
    fn default() -> Self {
        Self {
            view_proj: Mat4::IDENTITY,
            scale: 1.0,
            view_aabb: ViewAabb::default(),
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct BatchUniform {
    view_proj: [[f32; 4]; 4],
    view_aabb: [f32; 4], // center.xy, radius.xy
    fb_texel: [f32; 2],
    scale: f32,
    _pad: f32, // 16-byte alignment
}

/// Batched refraction sprite renderer.
///
/// Owns a fixed-capacity rect buffer, a CPU staging mirror of the GPU vertex
/// buffer, and all GPU resources needed to draw the whole batch in one
/// indexed call. Capacity never changes after construction.
///
/// Lifecycle: construct → edit rects → `update`/`update_sub` → `render`/
/// `render_sub` → drop. Edits are invisible until the covering update runs;
/// never-updated rects draw as degenerate (invisible) quads.
pub struct RefractBatch {
    rects: Vec<RectSprite>,
    staging: Vec<RectVertex>,
    num: usize,

    vbo: wgpu::Buffer,
    ibo: wgpu::Buffer,
    ubo: wgpu::Buffer,
    pipeline: wgpu::RenderPipeline,

    uniform_bind_group: wgpu::BindGroup,
    texture_bgl: wgpu::BindGroupLayout,
    main_bind_group: wgpu::BindGroup,
    refraction_bind_group: wgpu::BindGroup,
    framebuffer_bind_group: wgpu::BindGroup,

    tex_main: TextureSink,
    tex_refraction: TextureSink,
    tex_framebuffer: Arc<Texture>,
}

impl RefractBatch {
    /// Creates a batch with room for `num` rects.
    ///
    /// `tex_main` and `tex_refraction` declare their ownership via the sink
    /// variant; `framebuffer` is the externally refreshed snapshot and is
    /// never destroyed by the batch. All rects start at `RectSprite::default()`
    /// and both the staging mirror and the GPU vertex buffer start zeroed.
    pub fn new(
        ctx: &RenderCtx<'_>,
        num: usize,
        tex_main: TextureSink,
        tex_refraction: TextureSink,
        framebuffer: Arc<Texture>,
    ) -> Result<Self, BatchError> {
        if num == 0 {
            return Err(BatchError::ZeroCapacity);
        }

        let vbo = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("mirage refract vbo"),
            size: (num * VERTICES_PER_RECT * std::mem::size_of::<RectVertex>()) as u64,
            usage: wgpu::BufferUsages::VERTEX
                | wgpu::BufferUsages::COPY_DST
                | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });

        let ibo = ctx
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("mirage refract ibo"),
                contents: bytemuck::cast_slice(&quad_indices(num)),
                usage: wgpu::BufferUsages::INDEX,
            });

        let ubo = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("mirage refract ubo"),
            size: std::mem::size_of::<BatchUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let shader = ctx
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("mirage refract shader"),
                source: wgpu::ShaderSource::Wgsl(include_str!("shaders/refract.wgsl").into()),
            });

        let uniform_bgl = ctx
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("mirage refract uniform bgl"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: Some(uniform_min_binding_size()),
                    },
                    count: None,
                }],
            });

        let texture_bgl = ctx
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("mirage refract texture bgl"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                            view_dimension: wgpu::TextureViewDimension::D2,
                            multisampled: false,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                ],
            });

        let pipeline_layout = ctx
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("mirage refract pipeline layout"),
                bind_group_layouts: &[&uniform_bgl, &texture_bgl, &texture_bgl, &texture_bgl],
                immediate_size: 0,
            });

        let pipeline = ctx
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("mirage refract pipeline"),
                layout: Some(&pipeline_layout),

                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_main"),
                    compilation_options: Default::default(),
                    buffers: &[RectVertex::layout()],
                },

                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some("fs_main"),
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: ctx.surface_format,
                        blend: Some(straight_alpha_blend()),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),

                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },

                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),

                multiview_mask: None,
                cache: None,
            });

        let uniform_bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("mirage refract uniform bind group"),
            layout: &uniform_bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: ubo.as_entire_binding(),
            }],
        });

        let main_bind_group =
            texture_bind_group(ctx.device, &texture_bgl, tex_main.texture(), "main");
        let refraction_bind_group = texture_bind_group(
            ctx.device,
            &texture_bgl,
            tex_refraction.texture(),
            "refraction",
        );
        let framebuffer_bind_group =
            texture_bind_group(ctx.device, &texture_bgl, &framebuffer, "framebuffer");

        log::debug!("refract batch created: capacity {num}");

        Ok(Self {
            rects: vec![RectSprite::default(); num],
            staging: vec![RectVertex::zeroed(); num * VERTICES_PER_RECT],
            num,
            vbo,
            ibo,
            ubo,
            pipeline,
            uniform_bind_group,
            texture_bgl,
            main_bind_group,
            refraction_bind_group,
            framebuffer_bind_group,
            tex_main,
            tex_refraction,
            tex_framebuffer: framebuffer,
        })
    }

    /// Batch capacity.
    #[inline]
    pub fn num(&self) -> usize {
        self.num
    }

    /// The rect buffer. Index order is draw order: later rects paint over
    /// earlier ones.
    #[inline]
    pub fn rects(&self) -> &[RectSprite] {
        &self.rects
    }

    /// Mutable access to the rect buffer.
    ///
    /// Edits take effect on screen only after an `update`/`update_sub` call
    /// covering the edited indices.
    #[inline]
    pub fn rects_mut(&mut self) -> &mut [RectSprite] {
        &mut self.rects
    }

    /// The CPU staging mirror of the GPU vertex buffer.
    #[inline]
    pub fn staging(&self) -> &[RectVertex] {
        &self.staging
    }

    /// The GPU vertex buffer. Carries `COPY_SRC` so its contents can be read
    /// back by tools.
    #[inline]
    pub fn vertex_buffer(&self) -> &wgpu::Buffer {
        &self.vbo
    }

    /// Re-encodes all rects and uploads the whole vertex buffer.
    pub fn update(&mut self, ctx: &RenderCtx<'_>) -> Result<(), BatchError> {
        self.update_sub(ctx, 0, self.num)
    }

    /// Re-encodes `rects[offset .. offset+size]` and uploads exactly that
    /// byte range of the vertex buffer.
    ///
    /// Cost is proportional to `size`, never to the capacity. `size == 0` is
    /// a no-op; a range reaching past the capacity is rejected, not clamped.
    pub fn update_sub(
        &mut self,
        ctx: &RenderCtx<'_>,
        offset: usize,
        size: usize,
    ) -> Result<(), BatchError> {
        check_range(offset, size, self.num)?;
        if size == 0 {
            return Ok(());
        }

        encode_range(&self.rects, &mut self.staging, offset, size);

        let first = offset * VERTICES_PER_RECT;
        let last = (offset + size) * VERTICES_PER_RECT;
        let byte_offset = (first * std::mem::size_of::<RectVertex>()) as u64;
        ctx.queue.write_buffer(
            &self.vbo,
            byte_offset,
            bytemuck::cast_slice(&self.staging[first..last]),
        );

        Ok(())
    }

    /// Draws the whole batch.
    pub fn render(
        &self,
        ctx: &RenderCtx<'_>,
        target: &mut RenderTarget<'_>,
        inputs: &FrameInputs,
    ) -> Result<(), BatchError> {
        self.render_sub(ctx, target, inputs, self.num)
    }

    /// Draws the first `count` rects in one indexed call.
    ///
    /// Uploads the per-draw uniform block, then records a single render pass
    /// loading the existing target contents. Rect data and staging are not
    /// touched; rendering a range that was never updated is memory-safe but
    /// draws nothing visible.
    pub fn render_sub(
        &self,
        ctx: &RenderCtx<'_>,
        target: &mut RenderTarget<'_>,
        inputs: &FrameInputs,
        count: usize,
    ) -> Result<(), BatchError> {
        if count > self.num {
            return Err(BatchError::OutOfRange {
                offset: 0,
                size: count,
                num: self.num,
            });
        }
        if count == 0 {
            return Ok(());
        }

        let fb = self.tex_framebuffer.as_ref();
        let uniform = BatchUniform {
            view_proj: inputs.view_proj.to_cols_array_2d(),
            view_aabb: inputs.view_aabb.clamped_to_unit().to_array(),
            fb_texel: [1.0 / fb.width() as f32, 1.0 / fb.height() as f32],
            scale: inputs.scale,
            _pad: 0.0,
        };
        ctx.queue.write_buffer(&self.ubo, 0, bytemuck::bytes_of(&uniform));

        let mut rpass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("mirage refract pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target.color_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        rpass.set_pipeline(&self.pipeline);
        rpass.set_bind_group(0, &self.uniform_bind_group, &[]);
        rpass.set_bind_group(1, &self.main_bind_group, &[]);
        rpass.set_bind_group(2, &self.refraction_bind_group, &[]);
        rpass.set_bind_group(3, &self.framebuffer_bind_group, &[]);
        rpass.set_vertex_buffer(0, self.vbo.slice(..));
        rpass.set_index_buffer(self.ibo.slice(..), wgpu::IndexFormat::Uint32);
        rpass.draw_indexed(0..(count * INDICES_PER_RECT) as u32, 0, 0..1);

        Ok(())
    }

    /// Replaces the main texture.
    ///
    /// The previous sink is dropped: an `Owned` texture is destroyed, a
    /// `Shared` one merely releases its reference.
    pub fn set_texture_main(&mut self, ctx: &RenderCtx<'_>, sink: TextureSink) {
        self.main_bind_group = texture_bind_group(ctx.device, &self.texture_bgl, sink.texture(), "main");
        self.tex_main = sink;
    }

    /// Replaces the refraction map. Same drop semantics as
    /// [`set_texture_main`](Self::set_texture_main).
    pub fn set_texture_refraction(&mut self, ctx: &RenderCtx<'_>, sink: TextureSink) {
        self.refraction_bind_group =
            texture_bind_group(ctx.device, &self.texture_bgl, sink.texture(), "refraction");
        self.tex_refraction = sink;
    }

    /// Re-points the batch at a (new) framebuffer snapshot, e.g. after a
    /// resize. The previous reference is released, never destroyed.
    pub fn set_framebuffer(&mut self, ctx: &RenderCtx<'_>, framebuffer: Arc<Texture>) {
        self.framebuffer_bind_group =
            texture_bind_group(ctx.device, &self.texture_bgl, &framebuffer, "framebuffer");
        self.tex_framebuffer = framebuffer;
    }

    /// The main texture currently bound.
    #[inline]
    pub fn texture_main(&self) -> &Texture {
        self.tex_main.texture()
    }

    /// The refraction map currently bound.
    #[inline]
    pub fn texture_refraction(&self) -> &Texture {
        self.tex_refraction.texture()
    }
}

impl Index<usize> for RefractBatch {
    type Output = RectSprite;

    #[inline]
    fn index(&self, i: usize) -> &RectSprite {
        &self.rects[i]
    }
}

impl IndexMut<usize> for RefractBatch {
    #[inline]
    fn index_mut(&mut self, i: usize) -> &mut RectSprite {
        &mut self.rects[i]
    }
}

fn check_range(offset: usize, size: usize, num: usize) -> Result<(), BatchError> {
    match offset.checked_add(size) {
        Some(end) if end <= num => Ok(()),
        _ => Err(BatchError::OutOfRange { offset, size, num }),
    }
}

fn texture_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    texture: &Texture,
    slot: &str,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(&format!("mirage refract {slot} bind group")),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(texture.view()),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(texture.sampler()),
            },
        ],
    })
}

fn straight_alpha_blend() -> wgpu::BlendState {
    wgpu::BlendState {
        color: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::SrcAlpha,
            dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
            operation: wgpu::BlendOperation::Add,
        },
        alpha: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::One,
            dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
            operation: wgpu::BlendOperation::Add,
        },
    }
}

/// Returns the `wgpu` minimum binding size for the batch uniform buffer.
///
/// `BatchUniform` is 96 bytes by construction, so the size is always
/// non-zero.
fn uniform_min_binding_size() -> std::num::NonZeroU64 {
    std::num::NonZeroU64::new(std::mem::size_of::<BatchUniform>() as u64)
        .expect("BatchUniform has non-zero size by construction")
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── range contract ────────────────────────────────────────────────────

    #[test]
    fn check_range_accepts_full_span() {
        assert_eq!(check_range(0, 8, 8), Ok(()));
    }

    #[test]
    fn check_range_accepts_empty_at_end() {
        assert_eq!(check_range(8, 0, 8), Ok(()));
        assert_eq!(check_range(0, 0, 8), Ok(()));
    }

    #[test]
    fn check_range_rejects_overflow_past_capacity() {
        assert_eq!(
            check_range(0, 9, 8),
            Err(BatchError::OutOfRange {
                offset: 0,
                size: 9,
                num: 8
            })
        );
        assert_eq!(
            check_range(8, 1, 8),
            Err(BatchError::OutOfRange {
                offset: 8,
                size: 1,
                num: 8
            })
        );
    }

    #[test]
    fn check_range_rejects_usize_overflow() {
        assert!(check_range(usize::MAX, 2, 8).is_err());
    }

    // ── uniform layout ────────────────────────────────────────────────────

    #[test]
    fn uniform_block_layout() {
        assert_eq!(std::mem::size_of::<BatchUniform>(), 96);
        assert_eq!(std::mem::size_of::<BatchUniform>() % 16, 0);
    }

    // ── frame inputs ──────────────────────────────────────────────────────

    #[test]
    fn frame_inputs_default_is_identity_full_view() {
        let inputs = FrameInputs::default();
        assert_eq!(inputs.view_proj, Mat4::IDENTITY);
        assert_eq!(inputs.scale, 1.0);
        assert_eq!(inputs.view_aabb.to_array(), [0.5, 0.5, 0.5, 0.5]);
    }
}
