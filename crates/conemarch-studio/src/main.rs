use anyhow::Result;
use glam::{Vec2, Vec3};

use conemarch_engine::camera::CameraState;
use conemarch_engine::cascade::{Cascade, CascadeConfig, Resolution};
use conemarch_engine::core::{App, AppControl, FrameCtx, FrameOutcome};
use conemarch_engine::device::GpuInit;
use conemarch_engine::logging::{init_logging, LoggingConfig};
use conemarch_engine::render::{WgpuBackend, WgpuTarget};
use conemarch_engine::scene::{Primitive, Scene};
use conemarch_engine::window::{Runtime, RuntimeConfig};
use conemarch_engine::{CascadeError, DeviceError};

/// Initial camera position; the camera orbits the origin at this height and radius.
const EYE: Vec3 = Vec3::new(5.0, 10.0, 15.0);

/// Radians per second.
const ORBIT_SPEED: f32 = 0.15;

struct Renderer {
    backend: WgpuBackend,
    cascade: Cascade<WgpuTarget>,
}

struct Studio {
    scene: Scene,
    config: CascadeConfig,
    renderer: Option<Renderer>,
}

impl Studio {
    fn new() -> Self {
        let mut scene = Scene::new();
        scene.add(Primitive::cube(Vec3::new(-3.0, 0.0, 0.0)));
        scene.add(Primitive::sphere(Vec3::ZERO));
        scene.add(Primitive::cone(Vec3::new(3.0, 0.0, 0.0)));

        Self {
            scene,
            config: CascadeConfig::calibrated(),
            renderer: None,
        }
    }

    fn camera(elapsed: f32) -> CameraState {
        let radius = Vec2::new(EYE.x, EYE.z).length();
        let angle = EYE.z.atan2(EYE.x) + elapsed * ORBIT_SPEED;
        let eye = Vec3::new(radius * angle.cos(), EYE.y, radius * angle.sin());
        CameraState::looking_at(eye, Vec3::ZERO)
    }

    /// Creates the backend and cascade on first use (or after a device error)
    /// and follows the window size.
    fn sync_renderer(&mut self, ctx: &FrameCtx<'_, '_>, viewport: Resolution) -> Result<(), CascadeError> {
        if let Some(r) = self.renderer.as_mut() {
            if r.cascade.viewport() != viewport {
                r.cascade.resize(&mut r.backend, viewport)?;
            }
            return Ok(());
        }

        let mut backend = WgpuBackend::new(ctx.gpu);
        let cascade = Cascade::initialize(&mut backend, viewport, self.config.clone())?;
        self.renderer = Some(Renderer { backend, cascade });
        Ok(())
    }
}

impl App for Studio {
    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        self.scene.update(ctx.time.dt);

        let viewport: Resolution = ctx.gpu.size().into();
        if let Err(err) = self.sync_renderer(ctx, viewport) {
            log::error!("cannot build cascade for {}x{}: {err}", viewport.width, viewport.height);
            return AppControl::Exit;
        }
        let Some(renderer) = self.renderer.as_mut() else {
            return AppControl::Continue;
        };

        let elapsed = ctx.time.elapsed;
        let camera = Self::camera(elapsed);
        let scene = self.scene.buffer();

        let result = ctx.render(|_, frame| {
            renderer
                .cascade
                .render(&mut renderer.backend, frame, elapsed, &camera, scene)
                .map(|_| ())
        });

        match result {
            Ok(FrameOutcome::Presented) => {}
            Ok(FrameOutcome::Skipped) => log::debug!("frame {} skipped", ctx.time.frame_index),
            Err(DeviceError::OutOfMemory) => {
                log::error!("device out of memory, exiting");
                return AppControl::Exit;
            }
            Err(DeviceError::Lost) if ctx.gpu.lost_signal().is_raised() => {
                log::error!("graphics device lost, exiting");
                return AppControl::Exit;
            }
            Err(err) => {
                log::warn!("frame abandoned ({err}), re-initializing cascade");
                self.renderer = None;
            }
        }

        AppControl::Continue
    }
}

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let config = RuntimeConfig {
        title: "conemarch studio".to_string(),
        ..RuntimeConfig::default()
    };
    Runtime::run(config, GpuInit::default(), Studio::new())
}
