use glam::{Mat4, Vec3, Vec4};

/// World-up axis used to derive the basis.
pub const WORLD_UP: Vec3 = Vec3::Y;

/// Secondary axis used when the look direction is parallel to [`WORLD_UP`].
pub const WORLD_FORWARD: Vec3 = Vec3::Z;

/// Below this `|look × up|` the cross product is treated as degenerate.
const PARALLEL_EPSILON: f32 = 1e-5;

/// World-space camera as supplied by the application shell.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CameraState {
    pub position: Vec3,
    /// Normalized on use; a zero vector falls back to `-Z`.
    pub look: Vec3,
}

impl CameraState {
    #[inline]
    pub fn new(position: Vec3, look: Vec3) -> Self {
        Self { position, look }
    }

    /// Camera at `eye` looking towards `target`.
    pub fn looking_at(eye: Vec3, target: Vec3) -> Self {
        Self {
            position: eye,
            look: (target - eye).normalize_or(Vec3::NEG_Z),
        }
    }
}

/// Orthonormal view basis plus camera position.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CameraBasis {
    pub look: Vec3,
    pub up: Vec3,
    pub right: Vec3,
    pub position: Vec3,
}

impl CameraBasis {
    /// Derives the basis as `right = look × up_world`, `up = look × right`.
    ///
    /// When `look` is (anti)parallel to world-up the secondary axis
    /// [`WORLD_FORWARD`] takes its place, so the result is always finite.
    pub fn from_camera(camera: &CameraState) -> Self {
        let look = camera.look.normalize_or(Vec3::NEG_Z);

        let mut right = look.cross(WORLD_UP);
        if right.length() < PARALLEL_EPSILON {
            right = look.cross(WORLD_FORWARD);
        }
        let right = right.normalize();
        let up = look.cross(right).normalize();

        Self {
            look,
            up,
            right,
            position: camera.position,
        }
    }

    /// Packs the basis as columns `[look, up, right, position]` with `w = 1`
    /// on the translation column.
    pub fn to_mat4(&self) -> Mat4 {
        Mat4::from_cols(
            self.look.extend(0.0),
            self.up.extend(0.0),
            self.right.extend(0.0),
            Vec4::new(self.position.x, self.position.y, self.position.z, 1.0),
        )
    }

    /// World-space ray direction through `ndc` (`[-1, 1]`, +Y up on screen).
    ///
    /// `up` as derived points toward screen-bottom for an upright camera, hence
    /// the negated vertical term.
    pub fn ray_direction(&self, ndc: glam::Vec2, aspect: f32, half_fov_tan: f32) -> Vec3 {
        (self.look + ndc.x * aspect * half_fov_tan * self.right
            - ndc.y * half_fov_tan * self.up)
            .normalize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-5;

    fn assert_orthonormal(b: &CameraBasis) {
        for v in [b.look, b.up, b.right] {
            assert!((v.length() - 1.0).abs() < EPS, "not unit: {v:?}");
            assert!(v.is_finite());
        }
        assert!(b.look.dot(b.up).abs() < EPS);
        assert!(b.look.dot(b.right).abs() < EPS);
        assert!(b.up.dot(b.right).abs() < EPS);
    }

    // ── orthonormality ────────────────────────────────────────────────────

    #[test]
    fn basis_is_orthonormal_for_reference_camera() {
        let cam = CameraState::looking_at(Vec3::new(5.0, 10.0, 15.0), Vec3::ZERO);
        assert_orthonormal(&CameraBasis::from_camera(&cam));
    }

    #[test]
    fn basis_is_orthonormal_over_a_sweep_of_directions() {
        for i in 0..32 {
            for j in 1..16 {
                let yaw = i as f32 / 32.0 * std::f32::consts::TAU;
                let pitch = (j as f32 / 16.0 - 0.5) * std::f32::consts::PI * 0.98;
                let look = Vec3::new(
                    pitch.cos() * yaw.sin(),
                    pitch.sin(),
                    pitch.cos() * yaw.cos(),
                );
                let b = CameraBasis::from_camera(&CameraState::new(Vec3::ONE, look));
                assert_orthonormal(&b);
            }
        }
    }

    #[test]
    fn unnormalized_look_is_normalized() {
        let b = CameraBasis::from_camera(&CameraState::new(Vec3::ZERO, Vec3::new(0.0, 0.0, -4.0)));
        assert_eq!(b.look, Vec3::NEG_Z);
        assert!((b.right - Vec3::X).length() < EPS);
        assert!((b.up - Vec3::NEG_Y).length() < EPS);
    }

    // ── degenerate inputs ─────────────────────────────────────────────────

    #[test]
    fn looking_straight_up_or_down_stays_finite() {
        for look in [Vec3::Y, Vec3::NEG_Y, Vec3::new(0.0, 3.0, 0.0)] {
            let b = CameraBasis::from_camera(&CameraState::new(Vec3::ZERO, look));
            assert_orthonormal(&b);
            assert!(b.to_mat4().is_finite());
        }
    }

    #[test]
    fn zero_look_falls_back_to_negative_z() {
        let b = CameraBasis::from_camera(&CameraState::new(Vec3::ZERO, Vec3::ZERO));
        assert_eq!(b.look, Vec3::NEG_Z);
        assert_orthonormal(&b);
    }

    // ── packing ───────────────────────────────────────────────────────────

    #[test]
    fn matrix_columns_hold_look_up_right_position() {
        let cam = CameraState::looking_at(Vec3::new(1.0, 2.0, 3.0), Vec3::ZERO);
        let b = CameraBasis::from_camera(&cam);
        let m = b.to_mat4();
        assert_eq!(m.x_axis, b.look.extend(0.0));
        assert_eq!(m.y_axis, b.up.extend(0.0));
        assert_eq!(m.z_axis, b.right.extend(0.0));
        assert_eq!(m.w_axis, Vec4::new(1.0, 2.0, 3.0, 1.0));
    }

    #[test]
    fn centre_ray_follows_look() {
        let cam = CameraState::looking_at(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO);
        let b = CameraBasis::from_camera(&cam);
        let dir = b.ray_direction(glam::Vec2::ZERO, 4.0 / 3.0, 0.4);
        assert!((dir - Vec3::NEG_Z).length() < EPS);
    }

    #[test]
    fn top_of_screen_ray_points_up() {
        let cam = CameraState::looking_at(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO);
        let b = CameraBasis::from_camera(&cam);
        let dir = b.ray_direction(glam::Vec2::new(0.0, 1.0), 1.0, 0.4);
        assert!(dir.y > 0.0);
        let dir = b.ray_direction(glam::Vec2::new(1.0, 0.0), 1.0, 0.4);
        assert!(dir.x > 0.0);
    }
}
