use std::sync::Arc;

use parking_lot::Mutex;

/// High-level response after a surface error.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SurfaceErrorAction {
    /// Surface was reconfigured; rendering may resume next frame.
    Reconfigured,
    /// Transient error; skip the current frame.
    SkipFrame,
    /// Fatal error (commonly OOM); terminate gracefully.
    Fatal,
}

/// Raised from the device-lost callback, polled by renderers before each frame.
#[derive(Debug, Clone, Default)]
pub struct LostSignal(Arc<Mutex<Option<String>>>);

impl LostSignal {
    pub fn raise(&self, reason: impl Into<String>) {
        let mut slot = self.0.lock();
        if slot.is_none() {
            *slot = Some(reason.into());
        }
    }

    pub fn is_raised(&self) -> bool {
        self.0.lock().is_some()
    }

    pub fn reason(&self) -> Option<String> {
        self.0.lock().clone()
    }
}
