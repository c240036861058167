use winit::window::{Window, WindowId};

use crate::device::{Gpu, GpuFrame, SurfaceErrorAction};
use crate::error::DeviceError;
use crate::time::FrameTime;

/// Per-window handles and immutable window metadata.
pub struct WindowCtx<'a> {
    pub id: WindowId,
    pub window: &'a Window,
}

/// Outcome of [`FrameCtx::render`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameOutcome {
    Presented,
    /// No frame was available; the surface may have been reconfigured.
    Skipped,
}

/// Per-frame context passed to `core::App::on_frame`.
///
/// Lifetimes:
/// - `'a` is the duration of the callback invocation
/// - `'w` is the window-borrow lifetime carried by `Gpu<'w>`
pub struct FrameCtx<'a, 'w> {
    pub window: WindowCtx<'a>,
    pub gpu: &'a mut Gpu<'w>,
    pub time: FrameTime,
}

impl<'a, 'w> FrameCtx<'a, 'w> {
    /// Acquires a surface frame, hands it to `draw`, then presents it.
    ///
    /// Transient surface errors skip the frame. A fatal surface error or an
    /// error from `draw` is returned; in the latter case the frame is dropped
    /// without being submitted.
    pub fn render<F>(&mut self, draw: F) -> Result<FrameOutcome, DeviceError>
    where
        F: FnOnce(&Gpu<'w>, &mut GpuFrame) -> Result<(), DeviceError>,
    {
        let mut frame = match self.gpu.begin_frame() {
            Ok(f) => f,
            Err(err) => {
                let action = self.gpu.handle_surface_error(&err);
                log::debug!("surface error {err:?}: {action:?}");
                if action == SurfaceErrorAction::Fatal {
                    return Err(err.into());
                }
                return Ok(FrameOutcome::Skipped);
            }
        };

        draw(&*self.gpu, &mut frame)?;

        self.window.window.pre_present_notify();
        self.gpu.submit(frame);

        Ok(FrameOutcome::Presented)
    }
}
