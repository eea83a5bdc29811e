use std::sync::Arc;

use anyhow::{Context, Result};

/// 2D RGBA8 texture with its default view and sampler.
///
/// The format is always `Rgba8Unorm` (linear, byte-exact sampling). Refraction
/// maps depend on exact byte values surviving the sample, so no sRGB variant
/// is offered. Image-format decoding is out of scope; callers hand in raw
/// RGBA bytes.
pub struct Texture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    sampler: wgpu::Sampler,
    width: u32,
    height: u32,
}

impl Texture {
    pub const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

    /// Creates a texture from tightly packed RGBA8 bytes (`width * height * 4`).
    pub fn from_rgba8(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        width: u32,
        height: u32,
        pixels: &[u8],
        label: &str,
    ) -> Result<Self> {
        anyhow::ensure!(width > 0 && height > 0, "texture has zero size");
        anyhow::ensure!(
            pixels.len() == (width as usize) * (height as usize) * 4,
            "pixel data length {} does not match {width}x{height} RGBA8",
            pixels.len()
        );

        let texture = Self::create_2d(
            device,
            width,
            height,
            wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            label,
        );

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(width * 4),
                rows_per_image: Some(height),
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );

        Ok(Self::finish(device, texture, width, height, label))
    }

    /// Creates an uninitialized texture that copies can land in.
    ///
    /// Used for framebuffer snapshots: `TEXTURE_BINDING | COPY_DST`, no
    /// initial contents.
    pub fn snapshot(device: &wgpu::Device, width: u32, height: u32, label: &str) -> Result<Self> {
        anyhow::ensure!(width > 0 && height > 0, "texture has zero size");

        let texture = Self::create_2d(
            device,
            width,
            height,
            wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            label,
        );
        Ok(Self::finish(device, texture, width, height, label))
    }

    fn create_2d(
        device: &wgpu::Device,
        width: u32,
        height: u32,
        usage: wgpu::TextureUsages,
        label: &str,
    ) -> wgpu::Texture {
        device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::FORMAT,
            usage,
            view_formats: &[],
        })
    }

    fn finish(
        device: &wgpu::Device,
        texture: wgpu::Texture,
        width: u32,
        height: u32,
        label: &str,
    ) -> Self {
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        // Clamp-to-edge keeps displaced framebuffer samples inside the
        // snapshot.
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(label),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
            ..Default::default()
        });

        Self {
            texture,
            view,
            sampler,
            width,
            height,
        }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn texture(&self) -> &wgpu::Texture {
        &self.texture
    }

    #[inline]
    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    #[inline]
    pub fn sampler(&self) -> &wgpu::Sampler {
        &self.sampler
    }
}

/// A texture slot that declares its ownership.
///
/// `Owned` transfers the texture into the slot: when the sink is dropped or
/// replaced, the GPU texture goes with it. `Shared` holds a reference-counted
/// handle; dropping the sink only releases the reference.
pub enum TextureSink {
    Owned(Texture),
    Shared(Arc<Texture>),
}

impl TextureSink {
    #[inline]
    pub fn texture(&self) -> &Texture {
        match self {
            TextureSink::Owned(t) => t,
            TextureSink::Shared(t) => t,
        }
    }
}

impl From<Texture> for TextureSink {
    #[inline]
    fn from(t: Texture) -> Self {
        TextureSink::Owned(t)
    }
}

impl From<Arc<Texture>> for TextureSink {
    #[inline]
    fn from(t: Arc<Texture>) -> Self {
        TextureSink::Shared(t)
    }
}
