//! Camera view basis extraction.
//!
//! The application shell owns camera controls; the engine only needs the
//! world-space position and look direction once per frame.

mod basis;

pub use basis::{CameraBasis, CameraState, WORLD_FORWARD, WORLD_UP};
