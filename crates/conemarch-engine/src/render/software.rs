//! CPU implementation of the cascade backend.
//!
//! Runs the same per-pixel march as the shader, one pass at a time. Useful
//! headless and as the reference the GPU output is compared against.

use glam::Vec2;
use parking_lot::RwLock;

use crate::cascade::{CascadeBackend, Pass, PassDescriptor, PassUniforms, Resolution};
use crate::error::{DeviceError, ResourceError};
use crate::scene::SceneBuffer;

use super::march;

/// RGBA f32 texel grid written by one pass.
#[derive(Debug)]
pub struct SoftwareTarget {
    resolution: Resolution,
    texels: RwLock<Vec<[f32; 4]>>,
}

impl SoftwareTarget {
    fn new(resolution: Resolution) -> Self {
        Self {
            resolution,
            texels: RwLock::new(vec![[0.0; 4]; resolution.texel_count()]),
        }
    }

    #[inline]
    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn texel(&self, x: u32, y: u32) -> [f32; 4] {
        self.texels.read()[(y * self.resolution.width + x) as usize]
    }

    /// Texel with the smallest distance among those overlapping pixel `(x, y)`
    /// of a `dst`-sized pass. This is where that pixel's march starts.
    pub fn footprint_texel(&self, x: u32, y: u32, dst: Resolution) -> [f32; 4] {
        load_footprint(&self.texels.read(), self.resolution, x, y, dst)
    }
}

/// Inclusive range of `src` cells overlapping cell `i` of a `dst`-cell axis.
#[inline]
fn overlap(i: u32, dst: u32, src: u32) -> (u32, u32) {
    let (i, dst, src) = (u64::from(i), u64::from(dst), u64::from(src));
    let lo = i * src / dst;
    let hi = ((i + 1) * src).div_ceil(dst).saturating_sub(1);
    let last = src.saturating_sub(1);
    (lo.min(last) as u32, hi.clamp(lo.min(last), last) as u32)
}

/// Smallest-distance texel of `src` under pixel `(x, y)` of a `dst`-sized pass.
///
/// Taking the minimum over the whole footprint keeps the start distance below
/// the first hit of every ray in the pixel, also when the grids do not nest.
fn load_footprint(src: &[[f32; 4]], src_res: Resolution, x: u32, y: u32, dst: Resolution) -> [f32; 4] {
    let (x0, x1) = overlap(x, dst.width, src_res.width);
    let (y0, y1) = overlap(y, dst.height, src_res.height);

    let mut best = src[(y0 * src_res.width + x0) as usize];
    for sy in y0..=y1 {
        for sx in x0..=x1 {
            let texel = src[(sy * src_res.width + sx) as usize];
            if texel[0] < best[0] {
                best = texel;
            }
        }
    }
    best
}

/// Visible surface of the software backend: linear RGBA.
#[derive(Debug, Clone)]
pub struct SoftwareFrame {
    resolution: Resolution,
    pixels: Vec<[f32; 4]>,
}

impl SoftwareFrame {
    pub fn new(resolution: Resolution) -> Self {
        Self {
            resolution,
            pixels: vec![[0.0; 4]; resolution.texel_count()],
        }
    }

    #[inline]
    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn pixel(&self, x: u32, y: u32) -> [f32; 4] {
        self.pixels[(y * self.resolution.width + x) as usize]
    }

    #[inline]
    pub fn pixels(&self) -> &[[f32; 4]] {
        &self.pixels
    }
}

#[derive(Debug, Default)]
pub struct SoftwareBackend {
    scene: Vec<f32>,
    scene_generation: Option<u64>,
    texel_budget: Option<usize>,
    lost: bool,
    draws: usize,
    recording: bool,
    recorded: Vec<PassUniforms>,
}

impl SoftwareBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects any target larger than `texels`.
    pub fn with_texel_budget(texels: usize) -> Self {
        Self {
            texel_budget: Some(texels),
            ..Self::default()
        }
    }

    /// Keeps the uniforms of every pass drawn in the current frame.
    pub fn with_recording(mut self) -> Self {
        self.recording = true;
        self
    }

    /// Simulates a lost context: every draw fails until the next `reset`.
    pub fn lose_device(&mut self) {
        self.lost = true;
    }

    /// Passes drawn since creation.
    #[inline]
    pub fn draw_count(&self) -> usize {
        self.draws
    }

    /// Uniforms of the passes drawn in the most recent frame.
    #[inline]
    pub fn recorded(&self) -> &[PassUniforms] {
        &self.recorded
    }
}

impl CascadeBackend for SoftwareBackend {
    type Target = SoftwareTarget;
    type Frame = SoftwareFrame;

    fn allocate_target(&mut self, pass: &PassDescriptor) -> Result<SoftwareTarget, ResourceError> {
        let res = pass.resolution;
        let fail = |reason: String| ResourceError::TargetAllocation {
            pass: pass.index,
            width: res.width,
            height: res.height,
            reason,
        };

        if res.texel_count() == 0 {
            return Err(fail("zero-sized target".into()));
        }
        if let Some(budget) = self.texel_budget {
            if res.texel_count() > budget {
                return Err(fail(format!("exceeds texel budget of {budget}")));
            }
        }

        Ok(SoftwareTarget::new(res))
    }

    fn prepare(&mut self, scene: &SceneBuffer) -> Result<(), DeviceError> {
        if self.lost {
            return Err(DeviceError::Lost);
        }

        let structural = self.scene_generation != Some(scene.generation())
            || self.scene.len() != scene.len();
        if structural {
            self.scene = scene.as_slice().to_vec();
            self.scene_generation = Some(scene.generation());
        } else {
            self.scene.copy_from_slice(scene.as_slice());
        }

        self.recorded.clear();
        Ok(())
    }

    fn draw_pass(
        &mut self,
        frame: &mut SoftwareFrame,
        pass: &Pass<SoftwareTarget>,
        uniforms: &PassUniforms,
    ) -> Result<(), DeviceError> {
        if self.lost {
            return Err(DeviceError::Lost);
        }

        let res = pass.descriptor().resolution;
        let last = uniforms.is_last();
        if last && frame.resolution != res {
            return Err(DeviceError::Outdated);
        }

        let input = pass.input().map(|t| (t.resolution, t.texels.read()));
        let mut out = vec![[0.0f32; 4]; res.texel_count()];

        for y in 0..res.height {
            for x in 0..res.width {
                let frag = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
                let previous = input
                    .as_ref()
                    .map(|(src_res, src)| load_footprint(src, *src_res, x, y, res));

                let px = march::evaluate_pixel(uniforms, &self.scene, frag, previous);
                let i = (y * res.width + x) as usize;
                out[i] = px.sample.to_texel();
                if let Some(color) = px.color {
                    frame.pixels[i] = color;
                }
            }
        }
        drop(input);

        *pass.target().texels.write() = out;

        self.draws += 1;
        if self.recording {
            self.recorded.push(*uniforms);
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.lost = false;
        self.scene_generation = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── footprint ─────────────────────────────────────────────────────────

    #[test]
    fn nested_footprint_is_the_covering_texel() {
        let src = vec![[0.0; 4], [1.0; 4], [2.0; 4], [3.0; 4]];
        let src_res = Resolution::new(2, 2);
        let dst = Resolution::new(4, 4);
        assert_eq!(load_footprint(&src, src_res, 0, 0, dst), [0.0; 4]);
        assert_eq!(load_footprint(&src, src_res, 3, 0, dst), [1.0; 4]);
        assert_eq!(load_footprint(&src, src_res, 1, 2, dst), [2.0; 4]);
        assert_eq!(load_footprint(&src, src_res, 3, 3, dst), [3.0; 4]);
    }

    #[test]
    fn straddling_footprint_takes_the_nearest_texel() {
        // 3 coarse cells under 5 fine ones: fine cell 1 spans coarse cells 0 and 1.
        let src = vec![[4.0, 0.0, 0.0, 1.0], [2.0, 0.0, 1.0, 1.0], [9.0, 0.0, 2.0, 1.0]];
        let src_res = Resolution::new(3, 1);
        let dst = Resolution::new(5, 1);
        assert_eq!(load_footprint(&src, src_res, 0, 0, dst)[0], 4.0);
        assert_eq!(load_footprint(&src, src_res, 1, 0, dst)[0], 2.0);
        assert_eq!(load_footprint(&src, src_res, 3, 0, dst)[0], 2.0);
        assert_eq!(load_footprint(&src, src_res, 4, 0, dst)[0], 9.0);
    }

    #[test]
    fn overlap_ranges_stay_in_bounds() {
        assert_eq!(overlap(0, 4, 2), (0, 0));
        assert_eq!(overlap(3, 4, 2), (1, 1));
        assert_eq!(overlap(1, 5, 3), (0, 1));
        assert_eq!(overlap(2, 5, 3), (1, 1));
        assert_eq!(overlap(0, 1, 1), (0, 0));
        for i in 0..13 {
            let (lo, hi) = overlap(i, 13, 7);
            assert!(lo <= hi && hi < 7);
        }
    }

    #[test]
    fn zero_sized_target_is_rejected() {
        let mut backend = SoftwareBackend::new();
        let desc = PassDescriptor {
            index: 2,
            role: crate::cascade::PassRole::Middle,
            resolution: Resolution::new(0, 4),
            aspect: 1.0,
            half_fov_tan: 0.4,
        };
        assert!(matches!(
            backend.allocate_target(&desc),
            Err(ResourceError::TargetAllocation { pass: 2, .. })
        ));
    }
}
