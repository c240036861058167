//! Cascade backends.
//!
//! Both backends evaluate the same per-pixel march:
//! - `wgpu_backend` records one fullscreen draw per pass (`shaders/conemarch.wgsl`)
//! - `software` runs `march` on the CPU, for tests and headless use
//!
//! Convention: pixel centres at `+0.5`, top-left origin, NDC +Y up.

pub mod march;
pub mod software;
mod wgpu_backend;

pub use software::{SoftwareBackend, SoftwareFrame, SoftwareTarget};
pub use wgpu_backend::{WgpuBackend, WgpuTarget, MARCH_FORMAT};
