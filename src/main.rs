//! GPGPU Particle Field
//!
//! Particle positions live in a floating-point texture that a fragment shader
//! advances every frame; a point pass then samples that texture to place each
//! particle in the scene.

use frame_scheduler::{FrameScheduler, SystemClock};
use particle_renderer::{PointRenderer, ViewportConfig};
use particle_simulation::{GpuSimulation, PipelineError};
use particle_state::{FieldConfig, ParticleGeometry};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::*,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

const WINDOW_TITLE: &str = "GPGPU Particles";
const WINDOW_WIDTH: u32 = 1280;
const WINDOW_HEIGHT: u32 = 720;
const FRAME_TIME_WINDOW: usize = 100;

const UPDATE_SHADER: &str = include_str!("shaders/simulation.wgsl");
const POINT_SHADER: &str = include_str!("shaders/points.wgsl");

type Scheduler = FrameScheduler<GpuSimulation, PointRenderer, SystemClock>;

/// Viewport of a window: its physical size and scale factor.
fn viewport_for(size: PhysicalSize<u32>, scale_factor: f64) -> ViewportConfig {
    ViewportConfig::new(size.width, size.height, scale_factor as f32)
}

struct GpuState {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    config: wgpu::SurfaceConfiguration,

    scheduler: Scheduler,

    frame_times: VecDeque<f32>,
    last_frame_time: Instant,
}

impl GpuState {
    async fn new(window: Arc<Window>, field: FieldConfig) -> Result<Self, PipelineError> {
        let viewport = viewport_for(window.inner_size(), window.scale_factor());

        // Create wgpu instance
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let surface = instance.create_surface(window.clone())?;

        // Request adapter
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await?;

        log::info!("✓ Using GPU: {}", adapter.get_info().name);

        // Create device and queue
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::default(),
                experimental_features: wgpu::ExperimentalFeatures::default(),
                trace: wgpu::Trace::Off,
            })
            .await?;

        // Configure surface
        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .unwrap_or(surface_caps.formats[0]);

        let (width, height) = viewport.surface_size();
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width,
            height,
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        // Particle state and static geometry
        let initial = field.initial_state()?;
        let geometry = ParticleGeometry::build(&initial)?;

        let simulation =
            GpuSimulation::configure(device.clone(), queue.clone(), UPDATE_SHADER, &initial)?;
        let renderer = PointRenderer::new(
            device.clone(),
            queue,
            surface_format,
            &viewport,
            POINT_SHADER,
            &geometry,
        )?;

        // The clock starts with the pipeline
        let scheduler = FrameScheduler::new(simulation, renderer, SystemClock::start(), viewport);

        Ok(Self {
            surface,
            device,
            config,
            scheduler,
            frame_times: VecDeque::with_capacity(FRAME_TIME_WINDOW),
            last_frame_time: Instant::now(),
        })
    }

    fn configure_surface(&mut self) {
        let (width, height) = self.scheduler.viewport().surface_size();
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
    }

    fn resize(&mut self, new_size: PhysicalSize<u32>, scale_factor: f64) {
        if new_size.width > 0 && new_size.height > 0 {
            let viewport = viewport_for(new_size, scale_factor);
            self.scheduler.set_pixel_ratio(viewport.scale_factor);
            self.scheduler.on_resize(viewport.width, viewport.height);
            self.configure_surface();
        }
    }

    fn render(&mut self) -> Result<(f32, f32), wgpu::SurfaceError> {
        // Track frame time
        let now = Instant::now();
        let frame_time = (now - self.last_frame_time).as_secs_f32() * 1000.0;
        self.last_frame_time = now;

        if self.frame_times.len() == FRAME_TIME_WINDOW {
            self.frame_times.pop_front();
        }
        self.frame_times.push_back(frame_time);
        let avg_frame_time = self.frame_times.iter().sum::<f32>() / self.frame_times.len() as f32;
        let fps = if avg_frame_time > 0.0 {
            1000.0 / avg_frame_time
        } else {
            0.0
        };

        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        self.scheduler.tick(&view);

        output.present();
        Ok((fps, avg_frame_time))
    }
}

struct App {
    window: Option<Arc<Window>>,
    gpu_state: Option<GpuState>,
    field: FieldConfig,
}

impl App {
    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(mut gpu_state) = self.gpu_state.take() {
            gpu_state.scheduler.stop();
            // Dropping the state releases both state textures and all buffers.
        }
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window_attributes = Window::default_attributes()
            .with_title(WINDOW_TITLE)
            .with_inner_size(winit::dpi::LogicalSize::new(WINDOW_WIDTH, WINDOW_HEIGHT));

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(err) => {
                log::error!("Failed to create window: {err}");
                event_loop.exit();
                return;
            }
        };

        match pollster::block_on(GpuState::new(window.clone(), self.field)) {
            Ok(gpu_state) => {
                self.gpu_state = Some(gpu_state);
                self.window = Some(window);
            }
            Err(err) => {
                log::error!("Failed to start particle pipeline: {err}");
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested
            | WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(KeyCode::Escape),
                        ..
                    },
                ..
            } => {
                self.shutdown(event_loop);
                return;
            }

            WindowEvent::Resized(physical_size) => {
                if let (Some(window), Some(gpu_state)) = (&self.window, &mut self.gpu_state) {
                    gpu_state.resize(physical_size, window.scale_factor());
                }
            }

            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                if let (Some(window), Some(gpu_state)) = (&self.window, &mut self.gpu_state) {
                    gpu_state.resize(window.inner_size(), scale_factor);
                }
            }

            WindowEvent::RedrawRequested => {
                if let (Some(window), Some(gpu_state)) = (&self.window, &mut self.gpu_state) {
                    match gpu_state.render() {
                        Ok((fps, frame_time)) => {
                            window.set_title(&format!(
                                "{} - {:.0} FPS ({:.2}ms) - {} particles",
                                WINDOW_TITLE,
                                fps,
                                frame_time,
                                self.field.particle_count()
                            ));
                        }
                        Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                            gpu_state.configure_surface()
                        }
                        Err(wgpu::SurfaceError::OutOfMemory) => {
                            log::error!("Out of GPU memory, shutting down");
                            self.shutdown(event_loop);
                            return;
                        }
                        Err(e) => log::warn!("Dropped frame: {e:?}"),
                    }
                }
            }

            _ => {}
        }

        // Schedule the next frame
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

fn main() -> Result<(), winit::error::EventLoopError> {
    // Initialize logger (RUST_LOG=debug for verbose output)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Starting GPGPU particle field...");

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App {
        window: None,
        gpu_state: None,
        field: FieldConfig::default(),
    };

    event_loop.run_app(&mut app)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn surface_follows_the_physical_window_size() {
        let viewport = viewport_for(PhysicalSize::new(1001, 700), 2.0);
        assert_eq!(viewport.surface_size(), (1001, 700));
        assert_eq!(viewport_for(PhysicalSize::new(1500, 900), 3.0).surface_size(), (1000, 600));
    }
}
