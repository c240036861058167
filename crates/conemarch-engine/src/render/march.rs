//! Per-pixel march evaluated on the CPU.
//!
//! Mirrors `shaders/conemarch.wgsl` function for function so the software
//! backend produces the same march data as the GPU path.

use glam::{Vec2, Vec3};

use crate::cascade::PassUniforms;
use crate::scene::RECORD_STRIDE;

pub const BOX_HALF_EXTENT: f32 = 0.5;
pub const SPHERE_RADIUS: f32 = 1.0;
pub const CONE_RADIUS: f32 = 1.0;
pub const CONE_HALF_HEIGHT: f32 = 0.5;

const AMBIENT: f32 = 0.15;
const NORMAL_EPSILON: f32 = 1e-3;

fn light_dir() -> Vec3 {
    Vec3::new(0.3, 1.0, 0.5).normalize()
}

/// March result stored in a render target texel: `[t, steps, tag, hit]`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct MarchSample {
    pub t: f32,
    pub steps: f32,
    /// Shape tag of the closest primitive at the stop point, `-1` on a miss.
    pub tag: f32,
    pub hit: bool,
}

impl MarchSample {
    #[inline]
    pub fn to_texel(self) -> [f32; 4] {
        [self.t, self.steps, self.tag, if self.hit { 1.0 } else { 0.0 }]
    }

    #[inline]
    pub fn from_texel(texel: [f32; 4]) -> Self {
        Self {
            t: texel[0],
            steps: texel[1],
            tag: texel[2],
            hit: texel[3] > 0.5,
        }
    }
}

/// Output of one pixel of one pass.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PixelOutput {
    pub sample: MarchSample,
    /// Shaded color; only produced by the last pass.
    pub color: Option<[f32; 4]>,
}

// ── distance functions ────────────────────────────────────────────────────

pub fn sd_box(p: Vec3, half: Vec3) -> f32 {
    let q = p.abs() - half;
    q.max(Vec3::ZERO).length() + q.max_element().min(0.0)
}

pub fn sd_sphere(p: Vec3, radius: f32) -> f32 {
    p.length() - radius
}

/// Capped cone with base radius `radius` at `y = -half_height` and apex at `+half_height`.
pub fn sd_cone(p: Vec3, half_height: f32, radius: f32) -> f32 {
    let q = Vec2::new(Vec2::new(p.x, p.z).length(), p.y);
    let k1 = Vec2::new(0.0, half_height);
    let k2 = Vec2::new(-radius, 2.0 * half_height);
    let rad = if q.y < 0.0 { radius } else { 0.0 };
    let ca = Vec2::new(q.x - q.x.min(rad), q.y.abs() - half_height);
    let cb = q - k1 + k2 * ((k1 - q).dot(k2) / k2.length_squared()).clamp(0.0, 1.0);
    let s = if cb.x < 0.0 && ca.y < 0.0 { -1.0 } else { 1.0 };
    s * ca.length_squared().min(cb.length_squared()).sqrt()
}

pub fn primitive_distance(p: Vec3, tag: f32) -> f32 {
    if tag < 0.5 {
        sd_box(p, Vec3::splat(BOX_HALF_EXTENT))
    } else if tag < 1.5 {
        sd_sphere(p, SPHERE_RADIUS)
    } else {
        sd_cone(p, CONE_HALF_HEIGHT, CONE_RADIUS)
    }
}

/// Closest distance over every record, with the owning tag (`-1` when none is closer
/// than `max_distance`).
pub fn scene_distance(p: Vec3, scene: &[f32], max_distance: f32) -> (f32, f32) {
    let mut best = (max_distance, -1.0);
    for r in scene.chunks_exact(RECORD_STRIDE) {
        let d = primitive_distance(p - Vec3::new(r[0], r[1], r[2]), r[3]);
        if d < best.0 {
            best = (d, r[3]);
        }
    }
    best
}

// ── march ─────────────────────────────────────────────────────────────────

/// NDC of the center of pixel `frag` (`frag` already includes the +0.5 offset).
#[inline]
pub fn frag_to_ndc(frag: Vec2, resolution: [f32; 2]) -> Vec2 {
    Vec2::new(
        frag.x / resolution[0] * 2.0 - 1.0,
        1.0 - frag.y / resolution[1] * 2.0,
    )
}

/// Pixel half-diagonal on the image plane at unit distance; zero for the last pass.
///
/// Every ray through the pixel stays within `cone_ratio * t` of the centre ray
/// at distance `t`.
#[inline]
pub fn cone_ratio(u: &PassUniforms) -> f32 {
    if u.is_last() {
        0.0
    } else {
        let half_w = u.aspect / u.resolution[0];
        let half_h = 1.0 / u.resolution[1];
        u.half_fov_tan * (half_w * half_w + half_h * half_h).sqrt()
    }
}

/// Marches the centre ray of a pixel cone from `start_t`.
///
/// The cone stops once the surface may touch it. Each step stays inside the
/// empty ball around the current centre point for the whole cone, so the
/// returned `t` never passes the first hit of any ray inside the cone.
pub fn march(
    u: &PassUniforms,
    scene: &[f32],
    origin: Vec3,
    dir: Vec3,
    start_t: f32,
    cone_ratio: f32,
) -> MarchSample {
    let miss = |steps: u32| MarchSample {
        t: u.max_distance,
        steps: steps as f32,
        tag: -1.0,
        hit: false,
    };

    let mut t = start_t;
    if t >= u.max_distance {
        return miss(0);
    }
    for i in 0..u.max_steps {
        let (d, tag) = scene_distance(origin + dir * t, scene, u.max_distance);
        let clearance = d - cone_ratio * t;
        if clearance < u.hit_epsilon * t.max(1.0) {
            return MarchSample {
                t,
                steps: i as f32,
                tag,
                hit: true,
            };
        }
        t += clearance / (1.0 + cone_ratio);
        if t >= u.max_distance {
            return miss(i + 1);
        }
    }
    MarchSample {
        t,
        steps: u.max_steps as f32,
        tag: -1.0,
        hit: false,
    }
}

pub fn normal(p: Vec3, scene: &[f32], max_distance: f32) -> Vec3 {
    let e = NORMAL_EPSILON;
    let d = |o: Vec3| scene_distance(p + o, scene, max_distance).0;
    Vec3::new(
        d(Vec3::X * e) - d(Vec3::NEG_X * e),
        d(Vec3::Y * e) - d(Vec3::NEG_Y * e),
        d(Vec3::Z * e) - d(Vec3::NEG_Z * e),
    )
    .normalize_or_zero()
}

pub fn shape_color(tag: f32) -> Vec3 {
    if tag < 0.5 {
        Vec3::new(0.9, 0.2, 0.2)
    } else if tag < 1.5 {
        Vec3::new(0.2, 0.7, 0.9)
    } else {
        Vec3::new(0.95, 0.75, 0.2)
    }
}

pub fn shade(p: Vec3, tag: f32, scene: &[f32], max_distance: f32) -> [f32; 4] {
    let n = normal(p, scene, max_distance);
    let diffuse = n.dot(light_dir()).max(0.0);
    let c = shape_color(tag) * (AMBIENT + (1.0 - AMBIENT) * diffuse);
    [c.x, c.y, c.z, 1.0]
}

/// Evaluates one pixel of one pass.
///
/// `previous` is the predecessor's texel covering this pixel; `None` seeds the
/// march at the camera.
pub fn evaluate_pixel(
    u: &PassUniforms,
    scene: &[f32],
    frag: Vec2,
    previous: Option<[f32; 4]>,
) -> PixelOutput {
    let basis = u.basis();
    let ndc = frag_to_ndc(frag, u.resolution);
    let dir = basis.ray_direction(ndc, u.aspect, u.half_fov_tan);
    let origin = basis.position;

    let start_t = match previous {
        Some(texel) if !u.is_first() => MarchSample::from_texel(texel).t,
        _ => 0.0,
    };

    let sample = march(u, scene, origin, dir, start_t, cone_ratio(u));

    let color = u.is_last().then(|| {
        if sample.hit {
            shade(origin + dir * sample.t, sample.tag, scene, u.max_distance)
        } else {
            u.background
        }
    });

    PixelOutput { sample, color }
}

#[cfg(test)]
mod tests {
    use bytemuck::Zeroable;

    use super::*;

    const EPS: f32 = 1e-4;

    // ── distances ─────────────────────────────────────────────────────────

    #[test]
    fn sphere_distance() {
        assert!((sd_sphere(Vec3::new(3.0, 0.0, 0.0), 1.0) - 2.0).abs() < EPS);
        assert!(sd_sphere(Vec3::ZERO, 1.0) < 0.0);
    }

    #[test]
    fn box_distance_faces_and_corners() {
        let half = Vec3::splat(0.5);
        assert!((sd_box(Vec3::new(2.0, 0.0, 0.0), half) - 1.5).abs() < EPS);
        assert!((sd_box(Vec3::new(1.5, 1.5, 0.0), half) - 2f32.sqrt()).abs() < EPS);
        assert!((sd_box(Vec3::ZERO, half) + 0.5).abs() < EPS);
    }

    #[test]
    fn cone_distance_apex_base_and_inside() {
        // Above the apex.
        assert!((sd_cone(Vec3::new(0.0, 1.5, 0.0), 0.5, 1.0) - 1.0).abs() < EPS);
        // Below the base.
        assert!((sd_cone(Vec3::new(0.0, -1.5, 0.0), 0.5, 1.0) - 1.0).abs() < EPS);
        // Beside the base rim.
        assert!((sd_cone(Vec3::new(2.0, -0.5, 0.0), 0.5, 1.0) - 1.0).abs() < EPS);
        assert!(sd_cone(Vec3::new(0.0, -0.25, 0.0), 0.5, 1.0) < 0.0);
    }

    #[test]
    fn scene_distance_picks_closest_tag() {
        let scene = [-3.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 3.0, 0.0, 0.0, 2.0];
        let (d, tag) = scene_distance(Vec3::new(0.0, 0.0, 5.0), &scene, 100.0);
        assert!((d - 4.0).abs() < EPS);
        assert_eq!(tag, 1.0);

        let (_, tag) = scene_distance(Vec3::new(-3.0, 2.0, 0.0), &scene, 100.0);
        assert_eq!(tag, 0.0);
    }

    #[test]
    fn empty_scene_is_max_distance() {
        assert_eq!(scene_distance(Vec3::ZERO, &[], 50.0), (50.0, -1.0));
    }

    // ── pixels ────────────────────────────────────────────────────────────

    #[test]
    fn ndc_of_pixel_centres() {
        let res = [4.0, 2.0];
        assert_eq!(frag_to_ndc(Vec2::new(0.5, 0.5), res), Vec2::new(-0.75, 0.5));
        assert_eq!(frag_to_ndc(Vec2::new(3.5, 1.5), res), Vec2::new(0.75, -0.5));
    }

    // ── cone march ────────────────────────────────────────────────────────

    fn pass_uniforms(resolution: [f32; 2], aspect: f32, flags: u32) -> PassUniforms {
        PassUniforms {
            resolution,
            aspect,
            half_fov_tan: 0.5,
            max_distance: 100.0,
            hit_epsilon: 1e-3,
            max_steps: 256,
            flags,
            ..PassUniforms::zeroed()
        }
    }

    /// Analytic first hit of a unit-direction ray from the origin on a sphere.
    fn ray_sphere(dir: Vec3, centre: Vec3, radius: f32) -> Option<f32> {
        let b = dir.dot(centre);
        let disc = b * b - (centre.length_squared() - radius * radius);
        (disc >= 0.0).then(|| b - disc.sqrt())
    }

    #[test]
    fn cone_ratio_is_pixel_half_diagonal() {
        let u = pass_uniforms([8.0, 2.0], 2.0, 0);
        let expected = 0.5 * (0.25f32 * 0.25 + 0.5 * 0.5).sqrt();
        assert!((cone_ratio(&u) - expected).abs() < EPS);

        let last = pass_uniforms([8.0, 2.0], 2.0, crate::cascade::FLAG_LAST);
        assert_eq!(cone_ratio(&last), 0.0);
    }

    #[test]
    fn cone_stop_never_passes_a_ray_inside_the_cone() {
        let centre = Vec3::new(0.0, 0.0, -10.0);
        let scene = [centre.x, centre.y, centre.z, 1.0];
        let u = pass_uniforms([8.0, 8.0], 1.0, 0);
        let ratio = 0.05;

        for x in [0.0, 0.06, 0.09, 0.1, 0.12, 0.15] {
            let axis = Vec3::new(x, 0.0, -1.0);
            let stop = march(&u, &scene, Vec3::ZERO, axis.normalize(), 0.0, ratio);

            for k in 0..32 {
                let angle = k as f32 / 32.0 * std::f32::consts::TAU;
                for r in [ratio * 0.5, ratio] {
                    let offset = Vec3::new(angle.cos(), angle.sin(), 0.0) * r;
                    let dir = (axis + offset).normalize();
                    if let Some(hit) = ray_sphere(dir, centre, SPHERE_RADIUS) {
                        assert!(
                            stop.t <= hit + 1e-4,
                            "axis x {x}: cone stopped at {} past a hit at {hit}",
                            stop.t
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn last_pass_march_converges_on_the_surface() {
        let scene = [0.0, 0.0, -10.0, 1.0];
        let u = pass_uniforms([8.0, 8.0], 1.0, crate::cascade::FLAG_LAST);
        let s = march(&u, &scene, Vec3::ZERO, Vec3::NEG_Z, 0.0, cone_ratio(&u));
        assert!(s.hit);
        assert_eq!(s.tag, 1.0);
        assert!((s.t - 9.0).abs() < 0.01);
    }

    #[test]
    fn start_beyond_max_distance_is_a_miss() {
        let scene = [0.0, 0.0, -10.0, 1.0];
        let u = pass_uniforms([8.0, 8.0], 1.0, 0);
        let s = march(&u, &scene, Vec3::ZERO, Vec3::NEG_Z, 100.0, 0.01);
        assert!(!s.hit);
        assert_eq!(s.t, 100.0);
        assert_eq!(s.steps, 0.0);
    }

    #[test]
    fn texel_round_trip_keeps_hit_flag() {
        let s = MarchSample { t: 12.5, steps: 7.0, tag: 2.0, hit: true };
        assert_eq!(MarchSample::from_texel(s.to_texel()), s);
    }
}
