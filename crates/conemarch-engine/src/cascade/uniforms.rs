use bytemuck::{Pod, Zeroable};

use crate::camera::CameraBasis;

use super::{CascadeConfig, PassDescriptor};

pub const FLAG_FIRST: u32 = 1;
pub const FLAG_LAST: u32 = 2;

/// Uniform block consumed by one pass; mirrors `PassUniforms` in `conemarch.wgsl`.
///
/// Layout (128 bytes):
///
///  offset   0  camera_basis     mat4x4   columns look, up, right, position
///  offset  64  background       vec4
///  offset  80  resolution       vec2
///  offset  88  time             f32
///  offset  92  aspect           f32
///  offset  96  half_fov_tan     f32
///  offset 100  max_distance     f32
///  offset 104  hit_epsilon      f32
///  offset 108  max_steps        u32
///  offset 112  primitive_count  u32
///  offset 116  flags            u32      FLAG_FIRST | FLAG_LAST
///  offset 120  _pad             [u32; 2]
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct PassUniforms {
    pub camera_basis: [[f32; 4]; 4],
    pub background: [f32; 4],
    pub resolution: [f32; 2],
    pub time: f32,
    pub aspect: f32,
    pub half_fov_tan: f32,
    pub max_distance: f32,
    pub hit_epsilon: f32,
    pub max_steps: u32,
    pub primitive_count: u32,
    pub flags: u32,
    pub _pad: [u32; 2],
}

impl PassUniforms {
    pub fn new(
        pass: &PassDescriptor,
        config: &CascadeConfig,
        time: f32,
        basis: &CameraBasis,
        primitive_count: usize,
    ) -> Self {
        let mut flags = 0;
        if pass.role.is_first() {
            flags |= FLAG_FIRST;
        }
        if pass.role.is_last() {
            flags |= FLAG_LAST;
        }

        Self {
            camera_basis: basis.to_mat4().to_cols_array_2d(),
            background: config.background,
            resolution: pass.resolution.as_vec2(),
            time,
            aspect: pass.aspect,
            half_fov_tan: pass.half_fov_tan,
            max_distance: config.march.max_distance,
            hit_epsilon: config.march.hit_epsilon,
            max_steps: config.march.max_steps,
            primitive_count: primitive_count as u32,
            flags,
            _pad: [0; 2],
        }
    }

    #[inline]
    pub fn is_first(&self) -> bool {
        self.flags & FLAG_FIRST != 0
    }

    #[inline]
    pub fn is_last(&self) -> bool {
        self.flags & FLAG_LAST != 0
    }

    /// Rebuilds the basis from the packed matrix.
    pub fn basis(&self) -> CameraBasis {
        let [look, up, right, position] = self.camera_basis;
        CameraBasis {
            look: glam::Vec3::new(look[0], look[1], look[2]),
            up: glam::Vec3::new(up[0], up[1], up[2]),
            right: glam::Vec3::new(right[0], right[1], right[2]),
            position: glam::Vec3::new(position[0], position[1], position[2]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::CameraState;
    use crate::cascade::{PassRole, Resolution};
    use glam::Vec3;

    #[test]
    fn layout_is_128_bytes() {
        assert_eq!(std::mem::size_of::<PassUniforms>(), 128);
        assert_eq!(std::mem::size_of::<PassUniforms>() % 16, 0);
    }

    #[test]
    fn flags_and_basis_round_trip() {
        let cfg = CascadeConfig::calibrated();
        let desc = PassDescriptor {
            index: 0,
            role: PassRole::Sole,
            resolution: Resolution::new(8, 6),
            aspect: 4.0 / 3.0,
            half_fov_tan: cfg.half_fov_tan(),
        };
        let basis = CameraBasis::from_camera(&CameraState::looking_at(
            Vec3::new(5.0, 10.0, 15.0),
            Vec3::ZERO,
        ));
        let u = PassUniforms::new(&desc, &cfg, 2.5, &basis, 3);

        assert!(u.is_first() && u.is_last());
        assert_eq!(u.resolution, [8.0, 6.0]);
        assert_eq!(u.primitive_count, 3);
        assert_eq!(u.time, 2.5);
        assert_eq!(u.basis(), basis);
    }
}
