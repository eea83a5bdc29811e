use std::sync::Arc;

use anyhow::Result;

use super::texture::Texture;

/// Per-frame snapshot of the rendered framebuffer.
///
/// Refraction batches sample the scene as it looked *before* they draw, so
/// something has to hold that picture. `FrameCapture` owns a snapshot texture
/// sized to the frame; the frame loop records a copy into it (via [`capture`])
/// after the opaque scene is rendered and before any refraction batch runs.
///
/// Batches hold the snapshot as `Arc<Texture>`. After a [`resize`] the `Arc`
/// is a new allocation; hand it to each batch again via `set_framebuffer`.
///
/// [`capture`]: FrameCapture::capture
/// [`resize`]: FrameCapture::resize
pub struct FrameCapture {
    texture: Arc<Texture>,
    warned_size_mismatch: bool,
}

impl FrameCapture {
    pub fn new(device: &wgpu::Device, width: u32, height: u32) -> Result<Self> {
        let texture = Texture::snapshot(device, width, height, "mirage frame capture")?;
        Ok(Self {
            texture: Arc::new(texture),
            warned_size_mismatch: false,
        })
    }

    /// Recreates the snapshot texture when the frame size changes.
    ///
    /// No-op if the size already matches. Returns `true` when the texture was
    /// replaced (batches must be re-pointed at [`FrameCapture::texture`]).
    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) -> Result<bool> {
        if self.texture.width() == width && self.texture.height() == height {
            return Ok(false);
        }
        let texture = Texture::snapshot(device, width, height, "mirage frame capture")?;
        self.texture = Arc::new(texture);
        self.warned_size_mismatch = false;
        Ok(true)
    }

    /// Shared handle to the snapshot texture.
    #[inline]
    pub fn texture(&self) -> Arc<Texture> {
        Arc::clone(&self.texture)
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.texture.width()
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.texture.height()
    }

    /// Records a copy of `source` into the snapshot.
    ///
    /// `source` must carry `COPY_SRC` usage and should match the snapshot
    /// size; on mismatch the overlapping region is copied (one-time warning).
    pub fn capture(&mut self, encoder: &mut wgpu::CommandEncoder, source: &wgpu::Texture) {
        let width = source.width().min(self.texture.width());
        let height = source.height().min(self.texture.height());

        if (source.width() != self.texture.width() || source.height() != self.texture.height())
            && !self.warned_size_mismatch
        {
            log::warn!(
                "frame capture size mismatch: source {}x{}, snapshot {}x{}",
                source.width(),
                source.height(),
                self.texture.width(),
                self.texture.height()
            );
            self.warned_size_mismatch = true;
        }

        encoder.copy_texture_to_texture(
            wgpu::TexelCopyTextureInfo {
                texture: source,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyTextureInfo {
                texture: self.texture.texture(),
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
    }
}
