use anyhow::{Context, Result};

/// Surface-less GPU context for offscreen rendering and CI.
///
/// Adapter selection skips surface compatibility entirely, so this works on
/// machines without a display server. Construction fails with an error (rather
/// than panicking) when no adapter exists; test harnesses treat that as a skip.
pub struct HeadlessGpu {
    device: wgpu::Device,
    queue: wgpu::Queue,
}

/// Offscreen color target: a texture that can be rendered into and copied out.
pub struct OffscreenTarget {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub format: wgpu::TextureFormat,
    pub width: u32,
    pub height: u32,
}

impl HeadlessGpu {
    /// Creates a headless context on any available adapter.
    pub async fn new() -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .context("no GPU adapter available")?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("mirage-engine headless device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_defaults(),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .context("failed to create wgpu device/queue")?;

        Ok(Self { device, queue })
    }

    /// Blocking wrapper around [`HeadlessGpu::new`].
    pub fn new_blocking() -> Result<Self> {
        pollster::block_on(Self::new())
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Creates an offscreen render target that can also serve as a copy source.
    pub fn create_target(
        &self,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
    ) -> OffscreenTarget {
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("mirage offscreen target"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        OffscreenTarget {
            texture,
            view,
            format,
            width,
            height,
        }
    }

    /// Copies `size` bytes out of `buffer` and blocks until they are mapped.
    ///
    /// `buffer` must carry `COPY_SRC` usage.
    pub fn read_buffer(&self, buffer: &wgpu::Buffer, size: u64) -> Result<Vec<u8>> {
        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("mirage readback staging"),
            size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("mirage readback encoder"),
            });
        encoder.copy_buffer_to_buffer(buffer, 0, &staging, 0, size);
        let submission_index = self.queue.submit(std::iter::once(encoder.finish()));

        // map_async must be registered before the wait; the callback fires
        // during poll().
        let slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.device
            .poll(wgpu::PollType::Wait {
                timeout: None,
                submission_index: Some(submission_index),
            })
            .ok();
        rx.recv()
            .context("map_async callback dropped")?
            .context("failed to map readback buffer")?;

        let data = slice.get_mapped_range().to_vec();
        staging.unmap();
        Ok(data)
    }

    /// Reads an offscreen target back as tightly packed rows of pixels.
    pub fn read_target(&self, target: &OffscreenTarget) -> Result<Vec<u8>> {
        let bpp = target
            .format
            .block_copy_size(None)
            .context("unsupported target format for readback")?;
        let unpadded_bytes_per_row = target.width * bpp;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded_bytes_per_row = unpadded_bytes_per_row.div_ceil(align) * align;

        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("mirage target readback staging"),
            size: u64::from(padded_bytes_per_row) * u64::from(target.height),
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("mirage target readback encoder"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &target.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &staging,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_bytes_per_row),
                    rows_per_image: Some(target.height),
                },
            },
            wgpu::Extent3d {
                width: target.width,
                height: target.height,
                depth_or_array_layers: 1,
            },
        );
        let submission_index = self.queue.submit(std::iter::once(encoder.finish()));

        let slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.device
            .poll(wgpu::PollType::Wait {
                timeout: None,
                submission_index: Some(submission_index),
            })
            .ok();
        rx.recv()
            .context("map_async callback dropped")?
            .context("failed to map readback buffer")?;

        let data = slice.get_mapped_range();
        let mut pixels =
            Vec::with_capacity((unpadded_bytes_per_row * target.height) as usize);
        for row in 0..target.height {
            let start = (row * padded_bytes_per_row) as usize;
            pixels.extend_from_slice(&data[start..start + unpadded_bytes_per_row as usize]);
        }
        drop(data);
        staging.unmap();
        Ok(pixels)
    }
}
