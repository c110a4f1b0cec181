use num_complex::Complex32;
use std::f32::consts::PI;

use super::BlockTransform;

/// FM-style discriminator: phase step between consecutive samples.
#[derive(Debug, Clone, PartialEq)]
pub struct QuadratureDemodulator {
    last: Complex32,
}

impl QuadratureDemodulator {
    pub fn new() -> Self {
        Self {
            last: Complex32::new(0.0, 0.0),
        }
    }

    #[inline]
    fn step(&mut self, sample: Complex32) -> f32 {
        let product = sample * self.last.conj();
        let sample_ok = sample.re.is_finite() && sample.im.is_finite();
        self.last = if sample_ok {
            sample
        } else {
            Complex32::new(0.0, 0.0)
        };

        // zero-magnitude (or garbage) input has no defined phase
        if product.norm_sqr() > 0.0 && product.re.is_finite() && product.im.is_finite() {
            product.im.atan2(product.re)
        } else {
            0.0
        }
    }
}

impl Default for QuadratureDemodulator {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockTransform for QuadratureDemodulator {
    type Input = Complex32;
    type Output = f32;

    fn ratio(&self) -> (usize, usize) {
        (1, 1)
    }

    fn work(&mut self, input: &[Complex32], output: &mut Vec<f32>) {
        output.reserve(input.len());
        for &sample in input {
            let phase = self.step(sample);
            output.push(phase);
        }
    }

    fn reset(&mut self) {
        self.last = Complex32::new(0.0, 0.0);
    }
}

/// Single-pole IIR estimate of the demodulator bias, subtracted from the
/// stream. A constant carrier offset shows up as exactly such a bias.
#[derive(Debug, Clone, PartialEq)]
pub struct DcTracker {
    alpha: f32,
    estimate: f32,
}

impl DcTracker {
    pub fn new(alpha: f32) -> Self {
        Self {
            alpha,
            estimate: 0.0,
        }
    }

    /// Current bias estimate (radians per sample)
    pub fn estimate(&self) -> f32 {
        self.estimate
    }

    /// Bias estimate expressed as a carrier frequency offset
    pub fn frequency_offset_hz(&self, sample_rate: u32) -> f32 {
        self.estimate * sample_rate as f32 / (2.0 * PI)
    }
}

impl BlockTransform for DcTracker {
    type Input = f32;
    type Output = f32;

    fn ratio(&self) -> (usize, usize) {
        (1, 1)
    }

    fn work(&mut self, input: &[f32], output: &mut Vec<f32>) {
        output.reserve(input.len());
        for &x in input {
            self.estimate += self.alpha * (x - self.estimate);
            output.push(x - self.estimate);
        }
    }

    fn reset(&mut self) {
        self.estimate = 0.0;
    }
}
