//! Cascade marching pipeline.
//!
//! A fixed chain of passes at increasing resolution. Each pass refines the
//! previous pass's march result; the last one writes the visible surface.
//!
//! Per frame:
//! - time and camera basis are computed once and broadcast to every pass
//! - passes execute strictly in order (each reads its predecessor's target)
//! - device errors abandon the frame and surface to the caller

mod backend;
mod config;
mod descriptor;
mod pipeline;
mod uniforms;

pub use backend::CascadeBackend;
pub use config::{CascadeConfig, MarchSettings, PassScale};
pub use descriptor::{Pass, PassDescriptor, PassRole, Resolution};
pub use pipeline::{Cascade, FrameReport};
pub use uniforms::{PassUniforms, FLAG_FIRST, FLAG_LAST};
