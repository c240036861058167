use std::fmt;
use std::str::FromStr;

use glam::Vec3;

use crate::error::ConfigError;

/// Closed set of implicit shapes the marcher understands.
///
/// The discriminant is the tag written into the scene buffer and read back by
/// the shader; it never changes for a given variant.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
#[repr(u32)]
pub enum ShapeKind {
    Box = 0,
    Sphere = 1,
    Cone = 2,
}

impl ShapeKind {
    pub const ALL: [ShapeKind; 3] = [ShapeKind::Box, ShapeKind::Sphere, ShapeKind::Cone];

    #[inline]
    pub const fn tag(self) -> u32 {
        self as u32
    }

    /// Tag as stored in the float record.
    #[inline]
    pub const fn tag_f32(self) -> f32 {
        self as u32 as f32
    }

    #[inline]
    pub const fn name(self) -> &'static str {
        match self {
            ShapeKind::Box => "box",
            ShapeKind::Sphere => "sphere",
            ShapeKind::Cone => "cone",
        }
    }
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<u32> for ShapeKind {
    type Error = ConfigError;

    fn try_from(tag: u32) -> Result<Self, Self::Error> {
        match tag {
            0 => Ok(ShapeKind::Box),
            1 => Ok(ShapeKind::Sphere),
            2 => Ok(ShapeKind::Cone),
            other => Err(ConfigError::UnknownShape(other.to_string())),
        }
    }
}

impl FromStr for ShapeKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "box" => Ok(ShapeKind::Box),
            "sphere" => Ok(ShapeKind::Sphere),
            "cone" => Ok(ShapeKind::Cone),
            _ => Err(ConfigError::UnknownShape(s.to_string())),
        }
    }
}

/// One renderable implicit shape.
///
/// The shape is fixed at construction; only the position moves afterwards.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Primitive {
    pub position: Vec3,
    shape: ShapeKind,
    /// Constant drift applied by `Scene::update`. Zero means static.
    pub velocity: Vec3,
}

impl Primitive {
    #[inline]
    pub fn new(shape: ShapeKind, position: Vec3) -> Self {
        Self {
            position,
            shape,
            velocity: Vec3::ZERO,
        }
    }

    #[inline]
    pub fn cube(position: Vec3) -> Self {
        Self::new(ShapeKind::Box, position)
    }

    #[inline]
    pub fn sphere(position: Vec3) -> Self {
        Self::new(ShapeKind::Sphere, position)
    }

    #[inline]
    pub fn cone(position: Vec3) -> Self {
        Self::new(ShapeKind::Cone, position)
    }

    /// Builds a primitive from a raw tag, rejecting anything outside the closed set.
    pub fn from_tag(tag: u32, position: Vec3) -> Result<Self, ConfigError> {
        Ok(Self::new(ShapeKind::try_from(tag)?, position))
    }

    #[inline]
    pub fn with_velocity(mut self, velocity: Vec3) -> Self {
        self.velocity = velocity;
        self
    }

    #[inline]
    pub fn shape(&self) -> ShapeKind {
        self.shape
    }

    pub(crate) fn advance(&mut self, dt: f32) {
        if self.velocity != Vec3::ZERO {
            self.position += self.velocity * dt;
        }
    }
}
