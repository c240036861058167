use crate::error::ConfigError;

use super::Resolution;

/// Resolution of one pass relative to the viewport.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum PassScale {
    /// `ceil(viewport / 2^shift)` on each axis.
    Fraction { shift: u32 },
    /// Exactly the viewport size.
    Full,
}

impl PassScale {
    /// Power-of-two divisor exponent; `Full` is shift 0.
    #[inline]
    pub fn shift(self) -> u32 {
        match self {
            PassScale::Fraction { shift } => shift,
            PassScale::Full => 0,
        }
    }

    pub fn resolve(self, viewport: Resolution) -> Resolution {
        match self {
            PassScale::Full => viewport,
            PassScale::Fraction { shift } => Resolution::new(
                div_ceil_pow2(viewport.width, shift),
                div_ceil_pow2(viewport.height, shift),
            ),
        }
    }
}

#[inline]
fn div_ceil_pow2(value: u32, shift: u32) -> u32 {
    let divisor = 1u64 << shift;
    (u64::from(value).div_ceil(divisor)) as u32
}

/// Ray-march tuning shared by every pass.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct MarchSettings {
    /// Step budget per pass, per pixel.
    pub max_steps: u32,
    /// Rays farther than this are misses.
    pub max_distance: f32,
    /// Final-pass hit threshold, scaled by distance beyond 1.
    pub hit_epsilon: f32,
}

impl Default for MarchSettings {
    fn default() -> Self {
        Self {
            max_steps: 64,
            max_distance: 100.0,
            hit_epsilon: 1e-3,
        }
    }
}

/// Fixed shape of the cascade. Changing it requires re-initialization.
#[derive(Debug, Clone, PartialEq)]
pub struct CascadeConfig {
    /// One entry per pass, coarsest first.
    pub scales: Vec<PassScale>,

    /// Vertical field of view in degrees.
    pub vertical_fov_degrees: f32,

    pub march: MarchSettings,

    /// Linear RGBA written where no surface is hit.
    pub background: [f32; 4],
}

impl CascadeConfig {
    /// Number of shifts in the calibrated cascade (1/128 .. 1/2).
    pub const CALIBRATED_SHIFTS: u32 = 7;

    /// Eight passes: 1/128, 1/64, 1/32, 1/16, 1/8, 1/4, 1/2 and full resolution.
    pub fn calibrated() -> Self {
        Self::with_pass_count(Self::CALIBRATED_SHIFTS as usize + 1)
    }

    /// `count` passes halving resolution towards the coarse end, last at full size.
    ///
    /// `count == 0` yields an empty scale list, which `validate` rejects.
    pub fn with_pass_count(count: usize) -> Self {
        let scales = (0..count)
            .rev()
            .map(|shift| match shift {
                0 => PassScale::Full,
                s => PassScale::Fraction { shift: s as u32 },
            })
            .collect();

        Self {
            scales,
            ..Self::base()
        }
    }

    fn base() -> Self {
        Self {
            scales: Vec::new(),
            vertical_fov_degrees: 45.0,
            march: MarchSettings::default(),
            // 0x999999
            background: [0.6, 0.6, 0.6, 1.0],
        }
    }

    #[inline]
    pub fn pass_count(&self) -> usize {
        self.scales.len()
    }

    /// `tan(fov / 2)`.
    #[inline]
    pub fn half_fov_tan(&self) -> f32 {
        (self.vertical_fov_degrees.to_radians() * 0.5).tan()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scales.is_empty() {
            return Err(ConfigError::EmptyCascade);
        }

        if !(self.vertical_fov_degrees > 0.0 && self.vertical_fov_degrees < 180.0) {
            return Err(ConfigError::InvalidFieldOfView(self.vertical_fov_degrees));
        }

        for (pass, pair) in self.scales.windows(2).enumerate() {
            if pair[1].shift() > pair[0].shift() {
                return Err(ConfigError::NonMonotonicCascade { pass: pass + 1 });
            }
        }

        if let Some(pass) = self.scales.iter().position(|s| s.shift() >= 32) {
            let shift = self.scales[pass].shift();
            return Err(ConfigError::ShiftTooLarge { pass, shift });
        }

        match self.scales.last() {
            Some(PassScale::Full) => Ok(()),
            _ => Err(ConfigError::LastPassNotFullResolution),
        }
    }
}

impl Default for CascadeConfig {
    fn default() -> Self {
        Self::calibrated()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── scales ────────────────────────────────────────────────────────────

    #[test]
    fn calibrated_has_eight_halving_passes() {
        let cfg = CascadeConfig::calibrated();
        let shifts: Vec<u32> = cfg.scales.iter().map(|s| s.shift()).collect();
        assert_eq!(shifts, vec![7, 6, 5, 4, 3, 2, 1, 0]);
        assert_eq!(cfg.scales.last(), Some(&PassScale::Full));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn fractions_round_up() {
        let vp = Resolution::new(1000, 750);
        assert_eq!(PassScale::Fraction { shift: 7 }.resolve(vp), Resolution::new(8, 6));
        assert_eq!(PassScale::Fraction { shift: 3 }.resolve(vp), Resolution::new(125, 94));
        assert_eq!(PassScale::Full.resolve(vp), vp);
    }

    #[test]
    fn tiny_viewports_never_resolve_to_zero() {
        let vp = Resolution::new(3, 1);
        assert_eq!(PassScale::Fraction { shift: 7 }.resolve(vp), Resolution::new(1, 1));
    }

    #[test]
    fn half_fov_matches_22_5_degrees() {
        let cfg = CascadeConfig::default();
        assert!((cfg.half_fov_tan() - 22.5f32.to_radians().tan()).abs() < 1e-6);
    }

    // ── validation ────────────────────────────────────────────────────────

    #[test]
    fn empty_cascade_is_rejected() {
        assert_eq!(CascadeConfig::with_pass_count(0).validate(), Err(ConfigError::EmptyCascade));
    }

    #[test]
    fn single_full_pass_is_valid() {
        let cfg = CascadeConfig::with_pass_count(1);
        assert_eq!(cfg.scales, vec![PassScale::Full]);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn increasing_shift_is_rejected() {
        let mut cfg = CascadeConfig::calibrated();
        cfg.scales.swap(2, 3);
        assert_eq!(cfg.validate(), Err(ConfigError::NonMonotonicCascade { pass: 3 }));
    }

    #[test]
    fn oversized_shift_names_its_pass() {
        let mut cfg = CascadeConfig::calibrated();
        cfg.scales[0] = PassScale::Fraction { shift: 40 };
        assert_eq!(cfg.validate(), Err(ConfigError::ShiftTooLarge { pass: 0, shift: 40 }));

        let cfg = CascadeConfig::with_pass_count(34);
        assert_eq!(cfg.validate(), Err(ConfigError::ShiftTooLarge { pass: 0, shift: 33 }));
    }

    #[test]
    fn last_pass_must_be_full() {
        let mut cfg = CascadeConfig::calibrated();
        cfg.scales.pop();
        assert_eq!(cfg.validate(), Err(ConfigError::LastPassNotFullResolution));
    }

    #[test]
    fn field_of_view_bounds() {
        let mut cfg = CascadeConfig::calibrated();
        cfg.vertical_fov_degrees = 0.0;
        assert_eq!(cfg.validate(), Err(ConfigError::InvalidFieldOfView(0.0)));
        cfg.vertical_fov_degrees = 180.0;
        assert!(cfg.validate().is_err());
    }
}
