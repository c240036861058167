use crate::camera::{CameraBasis, CameraState};
use crate::error::{CascadeError, DeviceError};
use crate::scene::SceneBuffer;

use super::{
    CascadeBackend, CascadeConfig, Pass, PassDescriptor, PassRole, PassUniforms, Resolution,
};

/// What a successful `render` executed.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FrameReport {
    pub passes_executed: usize,
    /// Time value broadcast to every pass.
    pub elapsed: f32,
    pub basis: CameraBasis,
}

/// Ordered chain of passes from coarsest to full resolution.
///
/// Pass `k` samples pass `k - 1`'s render target; the last pass writes the
/// visible surface. The chain is rebuilt wholesale on resize.
#[derive(Debug)]
pub struct Cascade<T> {
    config: CascadeConfig,
    viewport: Resolution,
    passes: Vec<Pass<T>>,
    last_time: f32,
}

impl<T> Cascade<T> {
    /// Builds every pass and allocates its render target.
    ///
    /// Any allocation failure aborts the whole cascade.
    pub fn initialize<B>(
        backend: &mut B,
        viewport: Resolution,
        config: CascadeConfig,
    ) -> Result<Self, CascadeError>
    where
        B: CascadeBackend<Target = T>,
    {
        let passes = build_passes(backend, viewport, &config)?;
        backend.reset();

        log::info!(
            "cascade initialized: {} passes for {}x{}",
            passes.len(),
            viewport.width,
            viewport.height
        );

        Ok(Self {
            config,
            viewport,
            passes,
            last_time: 0.0,
        })
    }

    /// Recomputes every pass resolution and reallocates every target.
    ///
    /// On failure the previous cascade is left untouched and the error is
    /// returned; the caller decides whether that is fatal.
    pub fn resize<B>(&mut self, backend: &mut B, viewport: Resolution) -> Result<(), CascadeError>
    where
        B: CascadeBackend<Target = T>,
    {
        let passes = build_passes(backend, viewport, &self.config)?;
        self.passes = passes;
        self.viewport = viewport;
        backend.reset();

        log::info!("cascade resized to {}x{}", viewport.width, viewport.height);
        Ok(())
    }

    /// Draws one frame: every pass in ascending resolution, same time and basis.
    ///
    /// A device failure abandons the frame and is returned as-is; nothing is retried.
    pub fn render<B>(
        &mut self,
        backend: &mut B,
        frame: &mut B::Frame,
        elapsed: f32,
        camera: &CameraState,
        scene: &SceneBuffer,
    ) -> Result<FrameReport, DeviceError>
    where
        B: CascadeBackend<Target = T>,
    {
        let elapsed = self.monotonic(elapsed);
        let basis = CameraBasis::from_camera(camera);

        backend.prepare(scene)?;

        for pass in &self.passes {
            let uniforms = PassUniforms::new(
                pass.descriptor(),
                &self.config,
                elapsed,
                &basis,
                scene.primitive_count(),
            );

            if let Err(err) = backend.draw_pass(frame, pass, &uniforms) {
                log::warn!("pass {} failed, frame abandoned: {err}", pass.descriptor().index);
                return Err(err);
            }
        }

        Ok(FrameReport {
            passes_executed: self.passes.len(),
            elapsed,
            basis,
        })
    }

    #[inline]
    pub fn passes(&self) -> &[Pass<T>] {
        &self.passes
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.passes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    #[inline]
    pub fn viewport(&self) -> Resolution {
        self.viewport
    }

    #[inline]
    pub fn config(&self) -> &CascadeConfig {
        &self.config
    }

    /// Pass resolutions, coarsest first.
    pub fn resolutions(&self) -> Vec<Resolution> {
        self.passes.iter().map(|p| p.descriptor().resolution).collect()
    }

    fn monotonic(&mut self, elapsed: f32) -> f32 {
        if elapsed < self.last_time {
            log::warn!(
                "clock went backwards ({elapsed} < {}), holding previous time",
                self.last_time
            );
            return self.last_time;
        }
        self.last_time = elapsed;
        elapsed
    }
}

/// Constructs and wires all passes, coarsest first.
fn build_passes<B>(
    backend: &mut B,
    viewport: Resolution,
    config: &CascadeConfig,
) -> Result<Vec<Pass<B::Target>>, CascadeError>
where
    B: CascadeBackend,
{
    config.validate()?;
    let viewport = Resolution::viewport(viewport.width, viewport.height)?;

    let count = config.pass_count();
    let aspect = viewport.aspect();
    let half_fov_tan = config.half_fov_tan();

    let mut passes: Vec<Pass<B::Target>> = Vec::with_capacity(count);
    for (index, scale) in config.scales.iter().enumerate() {
        let descriptor = PassDescriptor {
            index,
            role: PassRole::for_position(index, count),
            resolution: scale.resolve(viewport),
            aspect,
            half_fov_tan,
        };

        let target = backend.allocate_target(&descriptor)?;
        log::debug!(
            "pass {index} ({:?}): {}x{}",
            descriptor.role,
            descriptor.resolution.width,
            descriptor.resolution.height
        );

        let pass = Pass::wire(descriptor, target, passes.last());
        passes.push(pass);
    }

    Ok(passes)
}
