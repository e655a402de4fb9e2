//! GPU-resident state texture

use crate::error::PipelineError;
use crate::scope;
use particle_state::{StateError, StateImage, Texel, TEXEL_SIZE};

/// Storage format of every state texture: one `vec4<f32>` per particle.
pub const STATE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba32Float;

/// Sampled by shaders, rendered into by steps, copied for upload and readback.
pub const STATE_USAGES: wgpu::TextureUsages = wgpu::TextureUsages::TEXTURE_BINDING
    .union(wgpu::TextureUsages::RENDER_ATTACHMENT)
    .union(wgpu::TextureUsages::COPY_SRC)
    .union(wgpu::TextureUsages::COPY_DST);

/// Whether `adapter` allows every usage a state texture needs.
pub fn supports_state_format(adapter: &wgpu::Adapter) -> bool {
    adapter
        .get_texture_format_features(STATE_FORMAT)
        .allowed_usages
        .contains(STATE_USAGES)
}

/// An `Rgba32Float` texture holding one particle per texel.
pub struct GpuStateTexture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    width: u32,
    height: u32,
}

impl GpuStateTexture {
    /// Allocate a zero-initialized state texture.
    ///
    /// Fails with [`PipelineError::UnsupportedFormat`] when the device cannot
    /// create an `Rgba32Float` render target.
    pub fn create(
        device: &wgpu::Device,
        label: &str,
        width: u32,
        height: u32,
    ) -> Result<Self, PipelineError> {
        if width == 0 || height == 0 {
            return Err(StateError::EmptyGrid { width, height }.into());
        }

        let max = device.limits().max_texture_dimension_2d;
        if width > max || height > max {
            return Err(PipelineError::UnsupportedSize { width, height, max });
        }

        let (texture, view) = scope::capture_validation(device, || {
            let texture = device.create_texture(&wgpu::TextureDescriptor {
                label: Some(label),
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: STATE_FORMAT,
                usage: STATE_USAGES,
                view_formats: &[],
            });
            let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
            (texture, view)
        })
        .map_err(|reason| PipelineError::UnsupportedFormat {
            format: STATE_FORMAT,
            reason,
        })?;

        Ok(Self {
            texture,
            view,
            width,
            height,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn texel_count(&self) -> u32 {
        self.width * self.height
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    pub fn extent(&self) -> wgpu::Extent3d {
        wgpu::Extent3d {
            width: self.width,
            height: self.height,
            depth_or_array_layers: 1,
        }
    }

    /// Queue a full overwrite from a CPU image of the same size.
    pub fn upload(&self, queue: &wgpu::Queue, image: &StateImage) -> Result<(), PipelineError> {
        image.ensure_same_size(self.width, self.height)?;

        queue.write_texture(
            self.texture.as_image_copy(),
            image.as_bytes(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(self.width * TEXEL_SIZE),
                rows_per_image: Some(self.height),
            },
            self.extent(),
        );
        Ok(())
    }

    /// Copy the texture back to the CPU, blocking until the GPU is done.
    ///
    /// Rows are padded to `COPY_BYTES_PER_ROW_ALIGNMENT` in the staging buffer.
    pub fn read_back(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
    ) -> Result<StateImage, PipelineError> {
        let unpadded_row = self.width * TEXEL_SIZE;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded_row = unpadded_row.div_ceil(align) * align;

        let staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("State Readback Buffer"),
            size: padded_row as u64 * self.height as u64,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("State Readback Encoder"),
        });
        encoder.copy_texture_to_buffer(
            self.texture.as_image_copy(),
            wgpu::TexelCopyBufferInfo {
                buffer: &staging,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_row),
                    rows_per_image: Some(self.height),
                },
            },
            self.extent(),
        );
        queue.submit(std::iter::once(encoder.finish()));

        let slice = staging.slice(..);
        let (sender, receiver) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        device
            .poll(wgpu::PollType::Wait {
                submission_index: None,
                timeout: None,
            })
            .map_err(|err| PipelineError::Readback(err.to_string()))?;
        receiver
            .recv()
            .map_err(|err| PipelineError::Readback(err.to_string()))?
            .map_err(|err| PipelineError::Readback(err.to_string()))?;

        let mut image = StateImage::new(self.width, self.height)?;
        {
            let data = slice.get_mapped_range();
            for (v, row) in data.chunks(padded_row as usize).enumerate() {
                for (u, bytes) in row[..unpadded_row as usize]
                    .chunks_exact(TEXEL_SIZE as usize)
                    .enumerate()
                {
                    let texel: Texel = bytemuck::pod_read_unaligned(bytes);
                    image.set_texel(u as u32, v as u32, texel)?;
                }
            }
        }
        staging.unmap();

        Ok(image)
    }
}
