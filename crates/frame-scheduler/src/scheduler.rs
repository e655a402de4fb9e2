//! The per-frame state machine
//!
//! Every tick runs, in order: clock sample, one simulation step, one draw of
//! the state that step produced. The scheduler never sleeps or reschedules
//! itself; the host calls `tick` from its own per-frame callback.

use crate::clock::{Clock, SystemClock};
use particle_renderer::{Camera, DrawPass, Scene, ViewportConfig};
use particle_simulation::StateStepper;
use particle_state::SimulationUniforms;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchedulerState {
    Running,
    Stopped,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TickOutcome {
    /// A step ran and its output was drawn.
    Rendered { frame: u64, time: f32 },
    /// The scheduler was stopped; nothing ran.
    Stopped,
}

pub struct FrameScheduler<S, R, C = SystemClock> {
    stepper: S,
    renderer: R,
    clock: C,
    camera: Camera,
    scene: Scene,
    viewport: ViewportConfig,
    state: SchedulerState,
    frame: u64,
    last_time: f32,
}

impl<S, R, C> FrameScheduler<S, R, C>
where
    S: StateStepper,
    R: DrawPass<State = S::State>,
    C: Clock,
{
    pub fn new(stepper: S, renderer: R, clock: C, viewport: ViewportConfig) -> Self {
        log::info!(
            "Frame scheduler running: {} particles, {}x{} viewport",
            stepper.particle_count(),
            viewport.width,
            viewport.height
        );
        let last_time = clock.elapsed();

        Self {
            stepper,
            renderer,
            clock,
            camera: Camera::new(viewport.width, viewport.height),
            scene: Scene::default(),
            viewport,
            state: SchedulerState::Running,
            frame: 0,
            last_time,
        }
    }

    /// Run one frame into `target`.
    pub fn tick(&mut self, target: &R::Target) -> TickOutcome {
        if self.state == SchedulerState::Stopped {
            return TickOutcome::Stopped;
        }

        let time = self.clock.elapsed();
        let delta = (time - self.last_time).max(0.0);
        self.last_time = time;

        let stepped = self.stepper.step(&SimulationUniforms::new(time, delta));
        self.renderer
            .draw(target, &self.scene, &self.camera, stepped);

        self.frame += 1;
        TickOutcome::Rendered {
            frame: self.frame,
            time,
        }
    }

    /// New physical output size. Updates the projection and the draw pass only.
    pub fn on_resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            log::debug!("Ignoring zero-area resize to {width}x{height}");
            return;
        }

        self.viewport = self.viewport.resized(width, height);
        self.camera.resize(width, height);
        self.renderer.resize(&self.viewport);
        log::debug!(
            "Viewport resized to {}x{} (aspect {:.3})",
            width,
            height,
            self.camera.aspect
        );
    }

    /// Device pixel ratio changed. The draw pass is resized only when the
    /// capped ratio changes the surface size.
    pub fn set_pixel_ratio(&mut self, pixel_ratio: f32) {
        let viewport = ViewportConfig::new(self.viewport.width, self.viewport.height, pixel_ratio);
        let resized = viewport.surface_size() != self.viewport.surface_size();
        self.viewport = viewport;
        if resized {
            self.renderer.resize(&self.viewport);
        }
    }

    /// Enter the terminal `Stopped` state. Later ticks do nothing.
    pub fn stop(&mut self) {
        if self.state == SchedulerState::Running {
            log::info!("Frame scheduler stopped after {} frames", self.frame);
            self.state = SchedulerState::Stopped;
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == SchedulerState::Running
    }

    /// Frames rendered so far.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn stepper(&self) -> &S {
        &self.stepper
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn viewport(&self) -> &ViewportConfig {
        &self.viewport
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use particle_simulation::{CpuSimulation, TexelContext};
    use particle_state::{StateImage, Texel};

    /// Records what each draw call saw.
    #[derive(Default)]
    struct RecordingPass {
        drawn: Vec<Texel>,
        aspects: Vec<f32>,
        resizes: Vec<ViewportConfig>,
    }

    impl DrawPass for RecordingPass {
        type State = StateImage;
        type Target = ();

        fn draw(&mut self, _target: &(), _scene: &Scene, camera: &Camera, state: &StateImage) {
            self.drawn.push(state.texel(0, 0).unwrap());
            self.aspects.push(camera.aspect);
        }

        fn resize(&mut self, viewport: &ViewportConfig) {
            self.resizes.push(*viewport);
        }
    }

    fn add_x(context: &TexelContext<'_>) -> Texel {
        let [x, y, z, w] = context.current();
        [x + 1.0, y, z, w]
    }

    fn grid(width: u32) -> StateImage {
        let mut image = StateImage::new(width, width).unwrap();
        image.seed(|_| [0.0, 0.0, 0.0, 1.0]);
        image
    }

    fn scheduler(
        clock: &ManualClock,
    ) -> FrameScheduler<CpuSimulation, RecordingPass, &ManualClock> {
        FrameScheduler::new(
            CpuSimulation::configure(add_x, grid(2)),
            RecordingPass::default(),
            clock,
            ViewportConfig::new(800, 600, 1.0),
        )
    }

    #[test]
    fn each_tick_draws_the_state_its_step_produced() {
        let clock = ManualClock::new();
        let mut scheduler = scheduler(&clock);

        for expected in 1..=3 {
            clock.advance(0.016);
            let outcome = scheduler.tick(&());
            assert!(matches!(outcome, TickOutcome::Rendered { frame, .. } if frame == expected));
        }

        let xs: Vec<f32> = scheduler.renderer().drawn.iter().map(|t| t[0]).collect();
        assert_eq!(xs, vec![1.0, 2.0, 3.0]);
        assert_eq!(scheduler.stepper().steps(), 3);
        assert_eq!(
            scheduler.stepper().current().texel(0, 0),
            Some([3.0, 0.0, 0.0, 1.0])
        );
    }

    #[test]
    fn clock_time_and_delta_reach_the_step() {
        let clock = ManualClock::new();
        let mut scheduler = FrameScheduler::new(
            CpuSimulation::configure(
                |ctx| {
                    let u = ctx.uniforms();
                    [u.time, u.delta, 0.0, 1.0]
                },
                grid(1),
            ),
            RecordingPass::default(),
            &clock,
            ViewportConfig::new(800, 600, 1.0),
        );

        clock.advance(0.5);
        assert_eq!(scheduler.tick(&()), TickOutcome::Rendered { frame: 1, time: 0.5 });
        clock.advance(0.25);
        scheduler.tick(&());

        assert_eq!(
            scheduler.renderer().drawn,
            vec![[0.5, 0.5, 0.0, 1.0], [0.75, 0.25, 0.0, 1.0]]
        );
    }

    #[test]
    fn resize_updates_projection_but_not_state() {
        let clock = ManualClock::new();
        let mut scheduler = scheduler(&clock);
        scheduler.tick(&());
        let before = scheduler.stepper().current().clone();

        scheduler.on_resize(1024, 768);

        assert_eq!(scheduler.camera().aspect, 1024.0 / 768.0);
        assert_eq!(scheduler.viewport().width, 1024);
        assert_eq!(scheduler.renderer().resizes.len(), 1);
        assert_eq!(scheduler.stepper().particle_count(), 4);
        assert_eq!(*scheduler.stepper().current(), before);
        assert_eq!(scheduler.stepper().steps(), 1);

        scheduler.tick(&());
        assert_eq!(scheduler.renderer().aspects, vec![800.0 / 600.0, 1024.0 / 768.0]);
    }

    #[test]
    fn pixel_ratio_change_resizes_the_surface_only() {
        let clock = ManualClock::new();
        let mut scheduler = scheduler(&clock);
        scheduler.set_pixel_ratio(2.0);
        assert_eq!(scheduler.viewport().surface_size(), (800, 600));
        assert!(scheduler.renderer().resizes.is_empty());

        scheduler.set_pixel_ratio(4.0);
        assert_eq!(scheduler.viewport().surface_size(), (400, 300));
        assert_eq!(scheduler.camera().aspect, 800.0 / 600.0);
        assert_eq!(scheduler.renderer().resizes.len(), 1);

        scheduler.set_pixel_ratio(1.0);
        assert_eq!(scheduler.renderer().resizes.len(), 2);
        assert_eq!(scheduler.renderer().resizes[1].surface_size(), (800, 600));
    }

    #[test]
    fn odd_physical_size_keeps_surface_equal_to_window() {
        let clock = ManualClock::new();
        let mut scheduler = scheduler(&clock);
        scheduler.set_pixel_ratio(2.0);
        scheduler.on_resize(1001, 700);
        assert_eq!(scheduler.viewport().surface_size(), (1001, 700));
        assert_eq!(
            scheduler.renderer().resizes.last().map(ViewportConfig::surface_size),
            Some((1001, 700))
        );
    }

    #[test]
    fn zero_area_resize_is_ignored() {
        let clock = ManualClock::new();
        let mut scheduler = scheduler(&clock);
        scheduler.on_resize(0, 768);
        assert_eq!(scheduler.camera().aspect, 800.0 / 600.0);
        assert!(scheduler.renderer().resizes.is_empty());
    }

    #[test]
    fn stopped_scheduler_does_no_work() {
        let clock = ManualClock::new();
        let mut scheduler = scheduler(&clock);
        assert!(scheduler.is_running());
        scheduler.tick(&());

        scheduler.stop();
        assert_eq!(scheduler.state(), SchedulerState::Stopped);
        assert_eq!(scheduler.tick(&()), TickOutcome::Stopped);
        assert_eq!(scheduler.frame(), 1);
        assert_eq!(scheduler.stepper().steps(), 1);
        assert_eq!(scheduler.renderer().drawn.len(), 1);
    }

    #[test]
    fn seeded_state_can_be_drawn_before_the_first_tick() {
        let clock = ManualClock::new();
        let scheduler = scheduler(&clock);
        let mut pass = RecordingPass::default();
        pass.draw(
            &(),
            scheduler.scene(),
            scheduler.camera(),
            scheduler.stepper().current(),
        );
        assert_eq!(pass.drawn, vec![[0.0, 0.0, 0.0, 1.0]]);
    }

    #[test]
    fn single_particle_field_runs() {
        let clock = ManualClock::new();
        let mut scheduler = FrameScheduler::new(
            CpuSimulation::configure(add_x, grid(1)),
            RecordingPass::default(),
            &clock,
            ViewportConfig::new(640, 480, 1.0),
        );
        scheduler.tick(&());
        scheduler.tick(&());
        assert_eq!(scheduler.renderer().drawn.last(), Some(&[2.0, 0.0, 0.0, 1.0]));
    }
}
