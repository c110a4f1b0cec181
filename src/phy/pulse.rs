use num_complex::Complex32;
use std::collections::VecDeque;
use std::f32::consts::PI;

use super::BlockTransform;

/// Half-sine pulse shaping with the O-QPSK quadrature offset.
///
/// Every chip pair is held for `oversample` samples and weighted by
/// `sin(pi * n / oversample)`, `n` counted from the chip boundary. The Q
/// rail is then delayed by half a chip pair, which turns the stream into a
/// constant-envelope MSK-like waveform.
#[derive(Debug, Clone)]
pub struct PulseShaper {
    oversample: usize,
    weights: Vec<f32>,
    q_delay: VecDeque<f32>,
}

impl PulseShaper {
    pub fn new(oversample: usize) -> Self {
        let weights = (0..oversample)
            .map(|n| (PI * n as f32 / oversample as f32).sin())
            .collect();

        Self {
            oversample,
            weights,
            q_delay: VecDeque::from(vec![0.0; oversample / 2]),
        }
    }

    /// Emit the Q samples still held in the offset delay line, closing the
    /// burst. Leaves the shaper ready for the next burst.
    pub fn flush(&mut self, output: &mut Vec<Complex32>) {
        for _ in 0..self.oversample / 2 {
            let q = self.q_delay.pop_front().unwrap_or(0.0);
            self.q_delay.push_back(0.0);
            output.push(Complex32::new(0.0, q));
        }
    }

    pub fn oversample(&self) -> usize {
        self.oversample
    }
}

impl BlockTransform for PulseShaper {
    type Input = Complex32;
    type Output = Complex32;

    fn ratio(&self) -> (usize, usize) {
        (1, self.oversample)
    }

    fn work(&mut self, input: &[Complex32], output: &mut Vec<Complex32>) {
        output.reserve(input.len() * self.oversample);
        for chip in input {
            for &w in &self.weights {
                self.q_delay.push_back(chip.im * w);
                let q = self.q_delay.pop_front().unwrap_or(0.0);
                output.push(Complex32::new(chip.re * w, q));
            }
        }
    }

    fn reset(&mut self) {
        self.q_delay.iter_mut().for_each(|q| *q = 0.0);
    }
}
