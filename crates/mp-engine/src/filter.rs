//! Amiga output low-pass filter.
//!
//! Two-pole Butterworth biquad with the coefficients of the A500 LED filter,
//! run once per output channel.

const GAIN: f32 = 24.336_193;
const Y0_COEFF: f32 = -0.514_754_1;
const Y1_COEFF: f32 = 1.350_389_8;

/// Filter state; persists across pulls.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AmigaLowPass {
    xv: [f32; 3],
    yv: [f32; 3],
}

impl AmigaLowPass {
    pub const fn new() -> Self {
        Self {
            xv: [0.0; 3],
            yv: [0.0; 3],
        }
    }

    /// Filter one sample.
    pub fn next(&mut self, sample: f32) -> f32 {
        self.xv = [self.xv[1], self.xv[2], sample / GAIN];
        self.yv[0] = self.yv[1];
        self.yv[1] = self.yv[2];
        self.yv[2] = (self.xv[0] + self.xv[2])
            + 2.0 * self.xv[1]
            + Y0_COEFF * self.yv[0]
            + Y1_COEFF * self.yv[1];
        self.yv[2]
    }
}
