//! Conemarch engine crate.
//!
//! Progressive multi-resolution distance-field rendering: a fixed cascade of
//! passes, coarsest first, each refining the march distances of its
//! predecessor until the last one shades the visible surface.
//!
//! Also owns the platform + GPU runtime pieces used by the studio shell.

pub mod camera;
pub mod cascade;
pub mod error;
pub mod render;
pub mod scene;

pub mod core;
pub mod device;
pub mod logging;
pub mod time;
pub mod window;

pub use cascade::{Cascade, CascadeBackend, CascadeConfig, FrameReport, Resolution};
pub use error::{CascadeError, ConfigError, DeviceError, ResourceError};
