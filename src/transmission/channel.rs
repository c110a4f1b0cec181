use num_complex::Complex32;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::PI;
use tracing::debug;

/// Baseband channel for loopback sessions: carrier frequency offset,
/// constant phase rotation and complex AWGN.
pub struct ChannelModel {
    sample_rate: u32,
    cfo_hz: f32,
    phase: f32,
    noise_std: f32,
    rng: StdRng,
    // running carrier phase, wrapped to [-pi, pi)
    carrier: f32,
    spare: Option<f32>,
}

impl ChannelModel {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            cfo_hz: 0.0,
            phase: 0.0,
            noise_std: 0.0,
            rng: StdRng::seed_from_u64(0),
            carrier: 0.0,
            spare: None,
        }
    }

    pub fn with_cfo(mut self, cfo_hz: f32) -> Self {
        self.cfo_hz = cfo_hz;
        self
    }

    /// Constant phase rotation (radians)
    pub fn with_phase(mut self, phase: f32) -> Self {
        self.phase = phase;
        self
    }

    /// Standard deviation per rail of the added noise
    pub fn with_noise(mut self, noise_std: f32) -> Self {
        self.noise_std = noise_std;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self.spare = None;
        self
    }

    pub fn is_ideal(&self) -> bool {
        self.cfo_hz == 0.0 && self.phase == 0.0 && self.noise_std == 0.0
    }

    /// Apply the channel in place. The carrier keeps running across calls.
    pub fn apply(&mut self, samples: &mut [Complex32]) {
        if self.is_ideal() {
            return;
        }

        let step = 2.0 * PI * self.cfo_hz / self.sample_rate as f32;
        for s in samples.iter_mut() {
            let rotation = Complex32::from_polar(1.0, self.carrier + self.phase);
            self.carrier += step;
            if self.carrier >= PI {
                self.carrier -= 2.0 * PI;
            } else if self.carrier < -PI {
                self.carrier += 2.0 * PI;
            }

            *s *= rotation;
            if self.noise_std > 0.0 {
                let noise = Complex32::new(self.gaussian(), self.gaussian());
                *s += noise * self.noise_std;
            }
        }

        debug!(
            "Channel applied to {} samples (cfo={} Hz, noise_std={})",
            samples.len(),
            self.cfo_hz,
            self.noise_std
        );
    }

    /// Box-Muller, two variates per draw
    fn gaussian(&mut self) -> f32 {
        if let Some(z) = self.spare.take() {
            return z;
        }
        let u1: f32 = self.rng.random::<f32>().max(1e-12);
        let u2: f32 = self.rng.random();
        let r = (-2.0 * u1.ln()).sqrt();
        let theta = 2.0 * PI * u2;
        self.spare = Some(r * theta.sin());
        r * theta.cos()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ideal_channel_is_identity() {
        let mut channel = ChannelModel::new(4_000_000);
        let mut samples = vec![Complex32::new(0.5, -0.25); 16];
        channel.apply(&mut samples);
        assert!(samples.iter().all(|s| *s == Complex32::new(0.5, -0.25)));
    }

    #[test]
    fn test_cfo_rotates_at_expected_rate() {
        let mut channel = ChannelModel::new(4_000_000).with_cfo(40_000.0);
        let mut samples = vec![Complex32::new(1.0, 0.0); 1000];
        channel.apply(&mut samples);

        let expected = 2.0 * PI * 40_000.0 / 4_000_000.0;
        for pair in samples.windows(2) {
            let step = (pair[1] * pair[0].conj()).arg();
            assert!((step - expected).abs() < 1e-3);
            assert!((pair[1].norm() - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_noise_statistics() {
        let mut channel = ChannelModel::new(4_000_000).with_noise(0.1).with_seed(42);
        let mut samples = vec![Complex32::new(0.0, 0.0); 20_000];
        channel.apply(&mut samples);

        let n = samples.len() as f32;
        let mean_re = samples.iter().map(|s| s.re).sum::<f32>() / n;
        let var_re = samples.iter().map(|s| s.re * s.re).sum::<f32>() / n;
        assert!(mean_re.abs() < 0.01);
        assert!((var_re.sqrt() - 0.1).abs() < 0.01);
    }

    #[test]
    fn test_same_seed_same_noise() {
        let mut a = ChannelModel::new(1000).with_noise(1.0).with_seed(9);
        let mut b = ChannelModel::new(1000).with_noise(1.0).with_seed(9);
        let mut xa = vec![Complex32::new(0.0, 0.0); 64];
        let mut xb = xa.clone();
        a.apply(&mut xa);
        b.apply(&mut xb);
        assert_eq!(xa, xb);
    }
}
