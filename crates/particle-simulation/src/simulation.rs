//! GPU ping-pong simulation
//!
//! Each step renders a fullscreen triangle into the write texture while the
//! read texture is bound as shader input, then swaps the pair. The update
//! shader is supplied by the host and only sees the bindings declared in the
//! update prelude (`state_read`, `sim`).

use crate::error::PipelineError;
use crate::scope;
use crate::shader::{self, FULLSCREEN_ENTRY_POINT, UPDATE_ENTRY_POINT};
use crate::stepper::StateStepper;
use crate::texture::{GpuStateTexture, STATE_FORMAT};
use particle_state::{PingPong, SimulationUniforms, StateImage};
use wgpu::util::DeviceExt;

/// GPU-resident particle state advanced by an external update shader.
pub struct GpuSimulation {
    device: wgpu::Device,
    queue: wgpu::Queue,

    textures: PingPong<GpuStateTexture>,
    // Indexed by read slot: bind_groups[i] samples textures slot i.
    bind_groups: [wgpu::BindGroup; 2],
    uniform_buffer: wgpu::Buffer,
    pipeline: wgpu::RenderPipeline,
}

impl GpuSimulation {
    /// Validate `update_source`, allocate the texture pair and seed it with `initial`.
    pub fn configure(
        device: wgpu::Device,
        queue: wgpu::Queue,
        update_source: &str,
        initial: &StateImage,
    ) -> Result<Self, PipelineError> {
        log::info!(
            "Initializing GpuSimulation ({}x{} state)...",
            initial.width(),
            initial.height()
        );

        let composed = shader::compile_update_shader(update_source)?;
        log::info!("Update shader validated");

        let (width, height) = (initial.width(), initial.height());
        let first = GpuStateTexture::create(&device, "State Texture A", width, height)?;
        let second = GpuStateTexture::create(&device, "State Texture B", width, height)?;

        // Seed both slots so texels the shader leaves untouched are never garbage.
        first.upload(&queue, initial)?;
        second.upload(&queue, initial)?;
        let textures = PingPong::new(first, second);
        log::info!("State textures created and seeded");

        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Simulation Uniform Buffer"),
            contents: bytemuck::bytes_of(
                &SimulationUniforms::default().with_resolution(width, height),
            ),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let (bind_groups, pipeline) = scope::capture_validation(&device, || {
            let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("Update Shader"),
                source: wgpu::ShaderSource::Wgsl(composed.into()),
            });

            let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Simulation Bind Group Layout"),
                entries: &[
                    // Read slot - Binding 0
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: false },
                            view_dimension: wgpu::TextureViewDimension::D2,
                            multisampled: false,
                        },
                        count: None,
                    },
                    // Uniforms - Binding 1
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    },
                ],
            });

            let bind_groups = [0usize, 1].map(|slot| {
                device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("Simulation Bind Group"),
                    layout: &bind_group_layout,
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: 0,
                            resource: wgpu::BindingResource::TextureView(
                                textures.slots()[slot].view(),
                            ),
                        },
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: uniform_buffer.as_entire_binding(),
                        },
                    ],
                })
            });

            let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Simulation Pipeline Layout"),
                bind_group_layouts: &[&bind_group_layout],
                push_constant_ranges: &[],
            });

            let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("Simulation Pipeline"),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &module,
                    entry_point: Some(FULLSCREEN_ENTRY_POINT),
                    buffers: &[],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &module,
                    entry_point: Some(UPDATE_ENTRY_POINT),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: STATE_FORMAT,
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState::default(),
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            });

            (bind_groups, pipeline)
        })
        .map_err(|reason| PipelineError::PipelineCreation {
            label: "update",
            reason,
        })?;
        log::info!("Simulation pipeline created");

        Ok(Self {
            device,
            queue,
            textures,
            bind_groups,
            uniform_buffer,
            pipeline,
        })
    }

    /// The texture the next step renders into. Never bound for reading while written.
    pub fn write_target(&self) -> &GpuStateTexture {
        self.textures.write()
    }

    pub fn read_index(&self) -> usize {
        self.textures.read_index()
    }

    pub fn width(&self) -> u32 {
        self.textures.read().width()
    }

    pub fn height(&self) -> u32 {
        self.textures.read().height()
    }

    /// Copy the current state back to the CPU (blocking).
    pub fn read_current(&self) -> Result<StateImage, PipelineError> {
        self.textures.read().read_back(&self.device, &self.queue)
    }

    fn encode_step(&self, encoder: &mut wgpu::CommandEncoder) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Simulation Step Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: self.textures.write().view(),
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.bind_groups[self.textures.read_index()], &[]);
        pass.draw(0..3, 0..1);
    }
}

impl StateStepper for GpuSimulation {
    type State = GpuStateTexture;

    fn current(&self) -> &GpuStateTexture {
        self.textures.read()
    }

    fn step(&mut self, uniforms: &SimulationUniforms) -> &GpuStateTexture {
        let uniforms = uniforms.with_resolution(self.width(), self.height());
        self.queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Simulation Encoder"),
            });
        self.encode_step(&mut encoder);

        // Queue order guarantees this pass finishes before any later submission
        // samples the texture, so the swap is safe immediately.
        self.queue.submit(std::iter::once(encoder.finish()));
        self.textures.swap();
        self.textures.read()
    }

    fn particle_count(&self) -> u32 {
        self.textures.read().texel_count()
    }

    fn steps(&self) -> u64 {
        self.textures.swaps()
    }
}
