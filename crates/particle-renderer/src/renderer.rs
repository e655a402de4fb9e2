//! Point rendering of the simulated particle field

use crate::camera::{Camera, CameraUniform};
use crate::draw::DrawPass;
use crate::scene::Scene;
use crate::viewport::ViewportConfig;
use particle_simulation::{scope, shader, GpuStateTexture, PipelineError};
use particle_state::{ParticleGeometry, ParticleVertex};
use wgpu::util::DeviceExt;

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Camera and state-texture bindings plus `sample_state`, prepended to host render shaders.
pub const RENDER_PRELUDE: &str = include_str!("shaders/render_prelude.wgsl");

/// `(group, binding)` pairs declared by [`RENDER_PRELUDE`].
pub const RENDER_BINDINGS: &[(u32, u32)] = &[(0, 0), (0, 1)];

/// Vertex attribute locations supplied by [`particle_vertex_layout`].
pub const VERTEX_LOCATIONS: [u32; 2] = [0, 1];

pub const VERTEX_ENTRY_POINT: &str = "vs_main";
pub const FRAGMENT_ENTRY_POINT: &str = "fs_main";

/// Vertex buffer layout of [`ParticleVertex`]: reference at 0, seed position at 1.
pub const fn particle_vertex_layout() -> wgpu::VertexBufferLayout<'static> {
    const ATTRIBUTES: &[wgpu::VertexAttribute] = &[
        wgpu::VertexAttribute {
            offset: 0,
            shader_location: 0,
            format: wgpu::VertexFormat::Float32x2,
        },
        wgpu::VertexAttribute {
            offset: std::mem::size_of::<[f32; 2]>() as wgpu::BufferAddress,
            shader_location: 1,
            format: wgpu::VertexFormat::Float32x3,
        },
    ];

    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<ParticleVertex>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: ATTRIBUTES,
    }
}

/// Compose a host render shader with [`RENDER_PRELUDE`] and check that it has
/// both entry points, reads exactly the two vertex attributes and binds
/// nothing beyond the prelude.
pub fn compile_render_shader(source: &str) -> Result<String, PipelineError> {
    const LABEL: &str = "render";

    let composed = shader::compose(RENDER_PRELUDE, source);
    let module = shader::validate(LABEL, &composed)?;
    shader::check_bindings(&module, LABEL, RENDER_BINDINGS)?;

    let vertex = shader::entry_point(&module, LABEL, VERTEX_ENTRY_POINT, naga::ShaderStage::Vertex)?;
    shader::entry_point(&module, LABEL, FRAGMENT_ENTRY_POINT, naga::ShaderStage::Fragment)?;

    let locations = shader::input_locations(&module, vertex);
    for location in VERTEX_LOCATIONS {
        if !locations.contains(&location) {
            return Err(PipelineError::MissingAttribute {
                name: VERTEX_ENTRY_POINT,
                location,
            });
        }
    }
    if let Some(&location) = locations
        .iter()
        .find(|location| !VERTEX_LOCATIONS.contains(location))
    {
        return Err(PipelineError::UnexpectedInput {
            name: VERTEX_ENTRY_POINT,
            location,
        });
    }

    Ok(composed)
}

/// Draws every particle as one point, positioned from the state texture.
pub struct PointRenderer {
    device: wgpu::Device,
    queue: wgpu::Queue,

    render_pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    camera_buffer: wgpu::Buffer,
    vertex_buffer: wgpu::Buffer,
    depth_texture: wgpu::TextureView,
    particle_count: u32,
    surface_size: (u32, u32),
}

impl PointRenderer {
    pub fn new(
        device: wgpu::Device,
        queue: wgpu::Queue,
        surface_format: wgpu::TextureFormat,
        viewport: &ViewportConfig,
        render_source: &str,
        geometry: &ParticleGeometry,
    ) -> Result<Self, PipelineError> {
        log::info!(
            "Initializing PointRenderer ({} particles)...",
            geometry.particle_count()
        );

        let composed = compile_render_shader(render_source)?;
        log::info!("Render shader validated");

        let camera_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Camera Buffer"),
            size: std::mem::size_of::<CameraUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        // Static attributes, uploaded once
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Particle Vertex Buffer"),
            contents: bytemuck::cast_slice(geometry.vertices()),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let surface_size = viewport.surface_size();
        let depth_texture = Self::create_depth_texture(&device, surface_size);

        let (bind_group_layout, render_pipeline) = scope::capture_validation(&device, || {
            let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("Point Shader"),
                source: wgpu::ShaderSource::Wgsl(composed.into()),
            });

            let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Point Bind Group Layout"),
                entries: &[
                    // Camera (Uniform) - Binding 0
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    },
                    // State texture - Binding 1
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::VERTEX,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: false },
                            view_dimension: wgpu::TextureViewDimension::D2,
                            multisampled: false,
                        },
                        count: None,
                    },
                ],
            });

            let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Point Pipeline Layout"),
                bind_group_layouts: &[&bind_group_layout],
                push_constant_ranges: &[],
            });

            let render_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("Point Render Pipeline"),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some(VERTEX_ENTRY_POINT),
                    buffers: &[particle_vertex_layout()],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some(FRAGMENT_ENTRY_POINT),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: surface_format,
                        blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::PointList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    unclipped_depth: false,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    conservative: false,
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: DEPTH_FORMAT,
                    depth_write_enabled: true,
                    depth_compare: wgpu::CompareFunction::Less,
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            });

            (bind_group_layout, render_pipeline)
        })
        .map_err(|reason| PipelineError::PipelineCreation {
            label: "render",
            reason,
        })?;
        log::info!("Point pipeline created");

        Ok(Self {
            device,
            queue,
            render_pipeline,
            bind_group_layout,
            camera_buffer,
            vertex_buffer,
            depth_texture,
            particle_count: geometry.particle_count(),
            surface_size,
        })
    }

    fn create_depth_texture(device: &wgpu::Device, (width, height): (u32, u32)) -> wgpu::TextureView {
        let depth_texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Depth Texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        depth_texture.create_view(&wgpu::TextureViewDescriptor::default())
    }

    pub fn particle_count(&self) -> u32 {
        self.particle_count
    }

    pub fn surface_size(&self) -> (u32, u32) {
        self.surface_size
    }

    pub fn render(
        &self,
        surface_view: &wgpu::TextureView,
        scene: &Scene,
        camera: &Camera,
        state: &GpuStateTexture,
    ) {
        // Update camera
        self.queue.write_buffer(
            &self.camera_buffer,
            0,
            bytemuck::bytes_of(&camera.to_uniform()),
        );

        // Bound for this frame only; the texture's role flips on the next step.
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Point Bind Group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.camera_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(state.view()),
                },
            ],
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: surface_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(scene.background),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            render_pass.set_pipeline(&self.render_pipeline);
            render_pass.set_bind_group(0, &bind_group, &[]);
            render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
            render_pass.draw(0..self.particle_count, 0..1);
        }

        self.queue.submit(std::iter::once(encoder.finish()));
    }
}

impl DrawPass for PointRenderer {
    type State = GpuStateTexture;
    type Target = wgpu::TextureView;

    fn draw(&mut self, target: &wgpu::TextureView, scene: &Scene, camera: &Camera, state: &GpuStateTexture) {
        self.render(target, scene, camera, state);
    }

    fn resize(&mut self, viewport: &ViewportConfig) {
        self.surface_size = viewport.surface_size();
        self.depth_texture = Self::create_depth_texture(&self.device, self.surface_size);
        log::debug!(
            "PointRenderer resized to {}x{}",
            self.surface_size.0,
            self.surface_size.1
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const POINTS: &str = r#"
struct VertexInput {
    @location(0) reference: vec2<f32>,
    @location(1) seed_position: vec3<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) color: vec4<f32>,
};

@vertex
fn vs_main(input: VertexInput) -> VertexOutput {
    let state = sample_state(input.reference);
    var out: VertexOutput;
    out.clip_position = camera.view_proj * vec4<f32>(state.xyz, 1.0);
    out.color = vec4<f32>(input.seed_position, state.w);
    return out;
}

@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    return input.color;
}
"#;

    #[test]
    fn render_prelude_validates() {
        shader::validate("render prelude", RENDER_PRELUDE).unwrap();
    }

    #[test]
    fn complete_render_shader_compiles() {
        let composed = compile_render_shader(POINTS).unwrap();
        assert!(composed.starts_with(RENDER_PRELUDE));
    }

    #[test]
    fn vertex_shader_must_read_the_reference_attribute() {
        let source = r#"
@vertex
fn vs_main(@location(1) seed_position: vec3<f32>) -> @builtin(position) vec4<f32> {
    return camera.view_proj * vec4<f32>(seed_position, 1.0);
}

@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return vec4<f32>(1.0);
}
"#;
        assert!(matches!(
            compile_render_shader(source),
            Err(PipelineError::MissingAttribute { location: 0, .. })
        ));
    }

    #[test]
    fn third_vertex_attribute_is_rejected() {
        let source = r#"
@vertex
fn vs_main(
    @location(0) reference: vec2<f32>,
    @location(1) seed_position: vec3<f32>,
    @location(2) size: f32,
) -> @builtin(position) vec4<f32> {
    return camera.view_proj * vec4<f32>(sample_state(reference).xyz * size + seed_position, 1.0);
}

@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return vec4<f32>(1.0);
}
"#;
        assert!(matches!(
            compile_render_shader(source),
            Err(PipelineError::UnexpectedInput {
                name: "vs_main",
                location: 2,
            })
        ));
    }

    #[test]
    fn unbound_resource_is_rejected() {
        let source = POINTS
            .replace(
                "struct VertexInput",
                "@group(1) @binding(0) var<uniform> tint: vec4<f32>;\n\nstruct VertexInput",
            )
            .replace("return input.color;", "return input.color * tint;");
        assert!(matches!(
            compile_render_shader(&source),
            Err(PipelineError::UnexpectedBinding {
                label: "render",
                group: 1,
                binding: 0,
            })
        ));
    }

    #[test]
    fn missing_fragment_stage() {
        let source = POINTS.replace("fn fs_main", "fn shade");
        assert!(matches!(
            compile_render_shader(&source),
            Err(PipelineError::MissingEntryPoint {
                name: "fs_main",
                ..
            })
        ));
    }

    #[test]
    fn vertex_layout_matches_particle_vertex() {
        let layout = particle_vertex_layout();
        assert_eq!(layout.array_stride, 20);
        assert_eq!(layout.attributes[1].offset, 8);
        assert_eq!(layout.attributes[1].format, wgpu::VertexFormat::Float32x3);
    }
}
