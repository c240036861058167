use std::sync::Arc;

use crate::error::ConfigError;

/// Size in physical pixels.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    #[inline]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Viewport size as supplied by the shell; zero on either axis is rejected.
    pub fn viewport(width: u32, height: u32) -> Result<Self, ConfigError> {
        if width == 0 || height == 0 {
            return Err(ConfigError::InvalidViewport { width, height });
        }
        Ok(Self { width, height })
    }

    #[inline]
    pub fn aspect(self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }

    #[inline]
    pub fn texel_count(self) -> usize {
        self.width as usize * self.height as usize
    }

    #[inline]
    pub fn as_vec2(self) -> [f32; 2] {
        [self.width as f32, self.height as f32]
    }
}

impl From<winit::dpi::PhysicalSize<u32>> for Resolution {
    fn from(size: winit::dpi::PhysicalSize<u32>) -> Self {
        Self::new(size.width, size.height)
    }
}

/// Position-derived role of a pass.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum PassRole {
    /// Seeds the march from scene data alone; has no input texture.
    First,
    Middle,
    /// Writes the visible surface.
    Last,
    /// A one-pass cascade: both first and last.
    Sole,
}

impl PassRole {
    pub fn for_position(index: usize, count: usize) -> Self {
        match (index == 0, index + 1 == count) {
            (true, true) => PassRole::Sole,
            (true, false) => PassRole::First,
            (false, true) => PassRole::Last,
            (false, false) => PassRole::Middle,
        }
    }

    #[inline]
    pub fn is_first(self) -> bool {
        matches!(self, PassRole::First | PassRole::Sole)
    }

    #[inline]
    pub fn is_last(self) -> bool {
        matches!(self, PassRole::Last | PassRole::Sole)
    }
}

/// Immutable per-pass configuration, frozen at initialization.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PassDescriptor {
    pub index: usize,
    pub role: PassRole,
    pub resolution: Resolution,
    /// Viewport aspect ratio, shared by every pass so rays line up across passes.
    pub aspect: f32,
    pub half_fov_tan: f32,
}

/// A pass wired into the cascade: its own target plus its predecessor's.
#[derive(Debug)]
pub struct Pass<T> {
    descriptor: PassDescriptor,
    target: Arc<T>,
    input: Option<Arc<T>>,
}

impl<T> Pass<T> {
    /// Wires a pass to its predecessor's render target.
    ///
    /// The input is `None` exactly when `predecessor` is `None`, which must
    /// coincide with a first-role descriptor.
    pub fn wire(descriptor: PassDescriptor, target: T, predecessor: Option<&Pass<T>>) -> Self {
        debug_assert_eq!(descriptor.role.is_first(), predecessor.is_none());
        Self {
            descriptor,
            target: Arc::new(target),
            input: predecessor.map(|p| Arc::clone(&p.target)),
        }
    }

    #[inline]
    pub fn descriptor(&self) -> &PassDescriptor {
        &self.descriptor
    }

    /// Render target this pass writes.
    #[inline]
    pub fn target(&self) -> &Arc<T> {
        &self.target
    }

    /// Predecessor's render target, sampled by this pass.
    #[inline]
    pub fn input(&self) -> Option<&Arc<T>> {
        self.input.as_ref()
    }
}
