//! DX7 envelope generation
//!
//! This module implements the four-stage envelopes used in the DX7.
//! The envelope generator produces logarithmic output values (Q24, one
//! unit of 2^24 per doubling) that are later converted to linear gain.
//! All stage arithmetic is done on `i32` so stage transitions land on the
//! same samples as the hardware.

use super::constants::{LEVEL_CEILING, LG_N, Q24_ONE};

const LEVEL_LUT: [i32; 20] = [
    0, 5, 9, 13, 17, 20, 23, 25, 27, 29, 31, 33, 35, 37, 39, 41, 42, 43, 45, 46,
];

// Velocity response curve, indexed by velocity >> 1
const VELOCITY_DATA: [i32; 64] = [
    0, 70, 86, 97, 106, 114, 121, 126, 132, 138, 142, 148, 152, 156, 160, 163,
    166, 170, 173, 174, 178, 181, 184, 186, 189, 190, 194, 196, 198, 200, 202,
    205, 206, 209, 211, 214, 216, 218, 220, 222, 224, 225, 227, 229, 230, 232,
    233, 235, 237, 238, 240, 241, 242, 243, 244, 246, 246, 248, 249, 250, 251,
    252, 253, 254,
];

const VELOCITY_OFFSET: i32 = 239;

/// Rising stages never start below this level (Q8 microsteps)
const JUMP_TARGET: i32 = 1716;

/// Stage entered on key-up
pub const RELEASE_STAGE: usize = 3;

/// Stage value once the release stage has completed
pub const FINISHED_STAGE: usize = 4;

/// Scale a 0-99 output level onto the hardware's 0-127 curve
pub fn scale_output_level(level: i32) -> i32 {
    if level >= 20 {
        28 + level
    } else {
        LEVEL_LUT[level.max(0) as usize]
    }
}

/// Velocity delta in microsteps for a velocity (0-127) and sensitivity (0-7)
pub fn scale_velocity(velocity: i32, sensitivity: i32) -> i32 {
    let clamped = velocity.clamp(0, 127);
    let vel_value = VELOCITY_DATA[(clamped >> 1) as usize] - VELOCITY_OFFSET;
    ((sensitivity * vel_value + 7) >> 3) << 4
}

/// Combined operator output level and velocity offset fed to the envelope
pub fn output_level_bias(output_level: i32, velocity: i32, sensitivity: i32) -> i32 {
    let bias = (scale_output_level(output_level) << 5) + scale_velocity(velocity, sensitivity);
    bias.max(0)
}

/// Linear gain of a Q24 envelope level: `2^(10 + level / 2^24) / 2^24`
#[inline]
pub fn level_to_gain(level: f64) -> f64 {
    2.0_f64.powf(10.0 + level * (1.0 / Q24_ONE as f64)) / Q24_ONE as f64
}

/// Same gain as [`level_to_gain`] computed as `2^(level / 2^24 - 14)`
#[inline]
pub fn level_to_gain_direct(level: f64) -> f64 {
    2.0_f64.powf(level / Q24_ONE as f64 - 14.0)
}

/// DX7-style envelope generator
///
/// Stages 0-2 run as soon as the key goes down; stage 3 only runs once the
/// key is released and then holds its level until the next key-down.
#[derive(Clone, Debug)]
pub struct EnvelopeGenerator {
    rates: [i32; 4],
    levels: [i32; 4],
    outlevel: i32,

    level: i32, // Q24 format (2^24 = one doubling)
    targetlevel: i32,
    rising: bool,
    ix: usize,
    inc: i32,
    down: bool,
}

impl EnvelopeGenerator {
    /// Create a generator with the key down, positioned at stage 0
    ///
    /// # Arguments
    /// * `rates` - Stage rates (0-99)
    /// * `levels` - Stage levels (0-99)
    /// * `outlevel` - Output level bias from [`output_level_bias`]
    pub fn new(rates: [u8; 4], levels: [u8; 4], outlevel: i32) -> Self {
        let mut env = Self {
            rates: rates.map(i32::from),
            levels: levels.map(i32::from),
            outlevel,
            level: 0,
            targetlevel: 0,
            rising: false,
            ix: 0,
            inc: 0,
            down: true,
        };
        env.advance(0);
        env
    }

    /// Handle key down/up events. Repeating the current state is a no-op.
    pub fn keydown(&mut self, down: bool) {
        if self.down != down {
            self.down = down;
            self.advance(if down { 0 } else { RELEASE_STAGE });
        }
    }

    /// Change a rate (`param` 0-3) or level (`param` 4-7).
    ///
    /// Takes effect at the next stage change.
    pub fn set_param(&mut self, param: usize, value: u8) {
        if param < 4 {
            self.rates[param] = value as i32;
        } else if param < 8 {
            self.levels[param - 4] = value as i32;
        }
    }

    /// Get the next envelope sample in Q24 log format
    pub fn get_sample(&mut self) -> i32 {
        if self.ix < RELEASE_STAGE || (self.ix == RELEASE_STAGE && !self.down) {
            if self.rising {
                if self.level < (JUMP_TARGET << 16) {
                    self.level = JUMP_TARGET << 16;
                }
                self.level += ((LEVEL_CEILING - self.level) >> 24) * self.inc;
                if self.level >= self.targetlevel {
                    self.level = self.targetlevel;
                    self.advance(self.ix + 1);
                }
            } else {
                self.level -= self.inc;
                if self.level <= self.targetlevel {
                    self.level = self.targetlevel;
                    self.advance(self.ix + 1);
                }
            }
        }
        self.level
    }

    /// Current stage (4 once the release stage has completed)
    pub fn stage(&self) -> usize {
        self.ix
    }

    /// Current level in Q24 log format
    pub fn level(&self) -> i32 {
        self.level
    }

    /// Level the current stage is heading for
    pub fn target_level(&self) -> i32 {
        self.targetlevel
    }

    /// Per-sample increment of the current stage
    pub fn increment(&self) -> i32 {
        self.inc
    }

    /// Whether the current stage moves upward
    pub fn is_rising(&self) -> bool {
        self.rising
    }

    /// Whether the key is held
    pub fn is_key_down(&self) -> bool {
        self.down
    }

    fn advance(&mut self, newix: usize) {
        self.ix = newix;
        if self.ix >= 4 {
            return;
        }

        let newlevel = self.levels[self.ix];
        let mut actuallevel = scale_output_level(newlevel) >> 1;
        actuallevel = (actuallevel << 6) + self.outlevel - 4256;
        actuallevel = actuallevel.max(16);

        self.targetlevel = actuallevel << 16;
        self.rising = self.targetlevel > self.level;

        // max 99 * 41 = 4059, 12 bits down to 6
        let qrate = ((self.rates[self.ix] * 41) >> 6).min(63);
        self.inc = (4 + (qrate & 3)) << (2 + LG_N + (qrate >> 2));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_outlevel() {
        assert_eq!(scale_output_level(0), 0);
        assert_eq!(scale_output_level(19), 46);
        assert_eq!(scale_output_level(20), 48);
        assert_eq!(scale_output_level(99), 127);
    }

    #[test]
    fn test_scale_outlevel_non_decreasing() {
        for level in 1..=99 {
            assert!(scale_output_level(level) >= scale_output_level(level - 1));
        }
    }

    #[test]
    fn test_scale_velocity_non_decreasing() {
        for sensitivity in 1..=7 {
            for velocity in 1..=127 {
                assert!(
                    scale_velocity(velocity, sensitivity)
                        >= scale_velocity(velocity - 1, sensitivity)
                );
            }
        }
    }

    #[test]
    fn test_scale_velocity_values() {
        assert_eq!(scale_velocity(100, 0), 0);
        // 254 - 239 = 15; (7 * 15 + 7) >> 3 = 14; << 4 = 224
        assert_eq!(scale_velocity(127, 7), 224);
        // out-of-range velocity clamps
        assert_eq!(scale_velocity(500, 7), 224);
        assert_eq!(scale_velocity(-3, 7), scale_velocity(0, 7));
        assert!(scale_velocity(0, 7) < 0);
    }

    #[test]
    fn test_output_level_bias_floor() {
        assert_eq!(output_level_bias(99, 100, 0), 127 << 5);
        assert_eq!(output_level_bias(0, 0, 7), 0);
    }

    #[test]
    fn test_gain_formulas_agree() {
        let mut level = 0i64;
        while level <= LEVEL_CEILING as i64 {
            let l = level as f64;
            assert!((level_to_gain(l) - level_to_gain_direct(l)).abs() < 1e-9);
            level += 1 << 12;
        }
    }

    #[test]
    fn test_initial_stage() {
        let env = EnvelopeGenerator::new([50; 4], [99, 75, 50, 0], 99 << 5);
        assert_eq!(env.stage(), 0);
        assert!(env.is_rising());
        assert!(env.is_key_down());
    }

    #[test]
    fn test_increment_law() {
        // qrate = (99 * 41) >> 6 = 63 -> (4 + 3) << (8 + 15)
        let env = EnvelopeGenerator::new([99; 4], [99; 4], 0);
        assert_eq!(env.increment(), 7 << 23);
        // qrate = (50 * 41) >> 6 = 32 -> 4 << (8 + 8)
        let env = EnvelopeGenerator::new([50; 4], [99; 4], 0);
        assert_eq!(env.increment(), 4 << 16);
        let env = EnvelopeGenerator::new([0; 4], [99; 4], 0);
        assert_eq!(env.increment(), 4 << 8);
    }

    #[test]
    fn test_target_floor() {
        let env = EnvelopeGenerator::new([50; 4], [0; 4], 0);
        assert_eq!(env.target_level(), 16 << 16);
    }

    #[test]
    fn test_keydown() {
        let mut env = EnvelopeGenerator::new([50; 4], [99, 75, 50, 0], 99 << 5);
        env.keydown(true);
        assert_eq!(env.stage(), 0);

        env.keydown(false);
        assert_eq!(env.stage(), RELEASE_STAGE);

        env.keydown(true);
        assert_eq!(env.stage(), 0);
    }

    #[test]
    fn test_attack_jumps_and_advances() {
        let mut env = EnvelopeGenerator::new([99, 99, 99, 50], [99, 99, 99, 0], 127 << 5);
        let first = env.get_sample();
        // 63 << 6 + 4064 - 4256 = 3840
        assert_eq!(first, 3840 << 16);
        assert_eq!(env.stage(), 1);
    }

    #[test]
    fn test_release_holds() {
        let mut env = EnvelopeGenerator::new([99, 99, 99, 50], [99, 99, 99, 0], 127 << 5);
        for _ in 0..10 {
            env.get_sample();
        }
        // held in stage 3 while the key is down
        assert_eq!(env.stage(), RELEASE_STAGE);
        let held = env.level();
        assert_eq!(env.get_sample(), held);

        env.keydown(false);
        let target = env.target_level();
        let mut previous = env.level();
        for _ in 0..100_000 {
            let level = env.get_sample();
            assert!(level <= previous);
            previous = level;
            if env.stage() == FINISHED_STAGE {
                break;
            }
        }
        assert_eq!(env.stage(), FINISHED_STAGE);
        assert_eq!(env.level(), target);
        for _ in 0..10 {
            assert_eq!(env.get_sample(), target);
        }
    }

    #[test]
    fn test_set_param_applies_on_next_stage() {
        let mut env = EnvelopeGenerator::new([99; 4], [99, 99, 99, 0], 127 << 5);
        env.set_param(3, 0);
        env.set_param(7, 99);
        let before = env.increment();
        env.keydown(false);
        assert_ne!(env.increment(), before);
        assert_eq!(env.increment(), 4 << 8);
    }
}
