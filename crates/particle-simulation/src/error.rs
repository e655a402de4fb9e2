use particle_state::StateError;
use thiserror::Error;

/// Fatal set-up errors. A pipeline that returns one of these never starts.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{label} shader failed to parse:\n{message}")]
    ShaderParse { label: &'static str, message: String },

    #[error("{label} shader failed validation: {message}")]
    ShaderValidation { label: &'static str, message: String },

    #[error("{label} shader has no {stage:?} entry point named `{name}`")]
    MissingEntryPoint {
        label: &'static str,
        name: &'static str,
        stage: naga::ShaderStage,
    },

    #[error("update entry point `{name}` must return `@location(0) vec4<f32>`")]
    UpdateOutput { name: &'static str },

    #[error("vertex entry point `{name}` must consume vertex attribute @location({location})")]
    MissingAttribute { name: &'static str, location: u32 },

    #[error("entry point `{name}` reads @location({location}), which no earlier stage provides")]
    UnexpectedInput { name: &'static str, location: u32 },

    #[error("{label} shader declares @group({group}) @binding({binding}), which the pipeline does not bind")]
    UnexpectedBinding {
        label: &'static str,
        group: u32,
        binding: u32,
    },

    #[error("state texture format {format:?} is not renderable on this adapter: {reason}")]
    UnsupportedFormat {
        format: wgpu::TextureFormat,
        reason: String,
    },

    #[error("device rejected the {label} pipeline: {reason}")]
    PipelineCreation { label: &'static str, reason: String },

    #[error("state texture {width}x{height} exceeds the device limit of {max} texels per side")]
    UnsupportedSize { width: u32, height: u32, max: u32 },

    #[error("failed to create output surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),

    #[error("no compatible GPU adapter: {0}")]
    NoAdapter(#[from] wgpu::RequestAdapterError),

    #[error("failed to open GPU device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),

    #[error("state readback failed: {0}")]
    Readback(String),

    #[error(transparent)]
    State(#[from] StateError),
}
