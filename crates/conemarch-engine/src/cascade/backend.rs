use crate::error::{DeviceError, ResourceError};
use crate::scene::SceneBuffer;

use super::{Pass, PassDescriptor, PassUniforms};

/// Executes cascade passes on some device.
///
/// The cascade owns pass wiring and per-frame uniforms; a backend owns the
/// device resources behind each render target and knows how to draw one pass.
pub trait CascadeBackend {
    /// Off-screen color buffer sized to a pass resolution.
    type Target;

    /// Per-frame handle to the visible surface (and any recording state).
    type Frame;

    /// Allocates the render target for `pass`.
    ///
    /// Failure is fatal for the whole cascade.
    fn allocate_target(&mut self, pass: &PassDescriptor) -> Result<Self::Target, ResourceError>;

    /// Called once per frame before the first pass.
    fn prepare(&mut self, scene: &SceneBuffer) -> Result<(), DeviceError>;

    /// Draws one pass into its target, reading its input if any.
    ///
    /// Last-role passes also write `frame`'s visible surface.
    fn draw_pass(
        &mut self,
        frame: &mut Self::Frame,
        pass: &Pass<Self::Target>,
        uniforms: &PassUniforms,
    ) -> Result<(), DeviceError>;

    /// Drops every cached reference into a previous cascade's targets.
    fn reset(&mut self) {}
}
