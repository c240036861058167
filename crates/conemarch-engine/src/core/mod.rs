//! Core engine-facing contracts.
//!
//! The stable interface between the runtime (platform loop) and the shell.
//! Runtime internals stay private; the shell sees a per-frame context.

mod app;
mod ctx;

pub use app::{App, AppControl};
pub use ctx::{FrameCtx, FrameOutcome, WindowCtx};
