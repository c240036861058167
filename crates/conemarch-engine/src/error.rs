//! Error taxonomy for the cascade.
//!
//! - [`ConfigError`]: rejected at construction time, never reaches a frame.
//! - [`ResourceError`]: target allocation failed; fatal for `initialize`/`resize`.
//! - [`DeviceError`]: a frame could not be drawn; the frame is abandoned and
//!   recovery is left to the caller.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("invalid viewport size {width}x{height}")]
    InvalidViewport { width: u32, height: u32 },

    #[error("unknown shape kind `{0}`")]
    UnknownShape(String),

    #[error("cascade must contain at least one pass")]
    EmptyCascade,

    #[error("pass {pass} does not increase resolution over its predecessor")]
    NonMonotonicCascade { pass: usize },

    #[error("pass {pass} divides the viewport by 2^{shift}; shifts must be below 32")]
    ShiftTooLarge { pass: usize, shift: u32 },

    #[error("last pass must render at full viewport resolution")]
    LastPassNotFullResolution,

    #[error("vertical field of view must be in (0, 180) degrees, got {0}")]
    InvalidFieldOfView(f32),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResourceError {
    #[error("failed to allocate render target for pass {pass} ({width}x{height}): {reason}")]
    TargetAllocation {
        pass: usize,
        width: u32,
        height: u32,
        reason: String,
    },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    #[error("graphics surface lost")]
    Lost,

    #[error("graphics surface outdated")]
    Outdated,

    #[error("graphics device out of memory")]
    OutOfMemory,

    #[error("timed out acquiring the next frame")]
    Timeout,

    #[error("draw failed: {0}")]
    Other(String),
}

impl From<wgpu::SurfaceError> for DeviceError {
    fn from(err: wgpu::SurfaceError) -> Self {
        match err {
            wgpu::SurfaceError::Lost => DeviceError::Lost,
            wgpu::SurfaceError::Outdated => DeviceError::Outdated,
            wgpu::SurfaceError::OutOfMemory => DeviceError::OutOfMemory,
            wgpu::SurfaceError::Timeout => DeviceError::Timeout,
            other => DeviceError::Other(other.to_string()),
        }
    }
}

/// Umbrella error returned by cascade construction and resize.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CascadeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Resource(#[from] ResourceError),

    #[error(transparent)]
    Device(#[from] DeviceError),
}
