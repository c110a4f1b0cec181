use tracing::trace;

use super::BlockTransform;
use super::config::PhyConfig;
use crate::error::PhyResult;

/// Loop state of the Mueller & Müller timing recovery
#[derive(Debug, Clone, PartialEq)]
pub struct TimingState {
    /// Current estimate of input samples per output sample
    pub omega: f32,
    /// Fractional sampling phase, always in [0, 1)
    pub mu: f32,
    /// Previous interpolated output
    pub last_sample: f32,
}

/// Mueller & Müller clock recovery: resamples the demodulated stream to one
/// value per chip, using linear interpolation between input samples.
///
/// Input that the loop can not consume yet (it needs a look-ahead window
/// past the current index) is kept and prepended to the next block.
#[derive(Debug, Clone)]
pub struct TimingRecovery {
    state: TimingState,
    omega_mid: f32,
    omega_limit: f32,
    gain_omega: f32,
    gain_mu: f32,
    initial_mu: f32,
    look_ahead: usize,
    history: Vec<f32>,
}

fn slice(v: f32) -> f32 {
    if v > 0.0 { 1.0 } else { -1.0 }
}

impl TimingRecovery {
    pub fn new(config: &PhyConfig) -> PhyResult<Self> {
        config.validate()?;

        let omega = config.samples_per_chip();
        let omega_limit = omega * config.omega_relative_limit;

        Ok(Self {
            state: TimingState {
                omega,
                mu: config.initial_mu,
                last_sample: 0.0,
            },
            omega_mid: omega,
            omega_limit,
            gain_omega: config.gain_omega,
            gain_mu: config.gain_mu,
            initial_mu: config.initial_mu,
            look_ahead: (omega + omega_limit + config.gain_mu).ceil() as usize,
            history: Vec::new(),
        })
    }

    pub fn state(&self) -> &TimingState {
        &self.state
    }

    /// Input samples held back for the next call
    pub fn pending(&self) -> usize {
        self.history.len()
    }
}

impl BlockTransform for TimingRecovery {
    type Input = f32;
    type Output = f32;

    fn ratio(&self) -> (usize, usize) {
        (self.omega_mid.round() as usize, 1)
    }

    fn work(&mut self, input: &[f32], output: &mut Vec<f32>) {
        self.history.extend_from_slice(input);
        let samples = &self.history;
        let state = &mut self.state;

        let mut ii = 0usize;
        while ii + self.look_ahead < samples.len() {
            let value = samples[ii] + state.mu * (samples[ii + 1] - samples[ii]);
            let error = slice(state.last_sample) * value - slice(value) * state.last_sample;
            state.last_sample = value;

            state.omega += self.gain_omega * error;
            state.omega = self.omega_mid
                + (state.omega - self.omega_mid).clamp(-self.omega_limit, self.omega_limit);
            state.mu += state.omega + self.gain_mu * error;

            let step = state.mu.floor();
            ii += step as usize;
            state.mu -= step;

            output.push(value);
        }

        trace!(
            "Timing recovery consumed {} samples, omega={:.4}, mu={:.3}",
            ii,
            state.omega,
            state.mu
        );
        self.history.drain(..ii);
    }

    fn reset(&mut self) {
        self.state = TimingState {
            omega: self.omega_mid,
            mu: self.initial_mu,
            last_sample: 0.0,
        };
        self.history.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PhyError;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    /// Random ±1 chips held for two samples each
    fn chip_stream(len: usize, seed: u64) -> Vec<f32> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..len)
            .flat_map(|_| {
                let v = if rng.random::<bool>() { 1.0 } else { -1.0 };
                [v, v]
            })
            .collect()
    }

    #[test]
    fn test_output_rate_close_to_nominal() {
        let mut clock = TimingRecovery::new(&PhyConfig::default()).unwrap();
        let input = chip_stream(1000, 1);
        let mut out = Vec::new();
        clock.work(&input, &mut out);
        assert!(out.len() >= 990 && out.len() <= 1000, "got {}", out.len());
    }

    #[test]
    fn test_recovers_chip_signs() {
        let mut rng = StdRng::seed_from_u64(7);
        let chips: Vec<f32> = (0..2000)
            .map(|_| if rng.random::<bool>() { 1.0 } else { -1.0 })
            .collect();
        let input: Vec<f32> = chips.iter().flat_map(|&c| [c, c]).collect();

        let mut clock = TimingRecovery::new(&PhyConfig::default()).unwrap();
        let mut out = Vec::new();
        clock.work(&input, &mut out);

        // mu = 0.5 lands between the two copies of a chip, both equal
        let matches = out
            .iter()
            .zip(chips.iter())
            .filter(|(o, c)| o.signum() == c.signum())
            .count();
        assert!(matches > out.len() * 99 / 100);
    }

    #[test]
    fn test_split_blocks_match_single_block() {
        let input = chip_stream(500, 3);

        let mut whole = TimingRecovery::new(&PhyConfig::default()).unwrap();
        let mut expected = Vec::new();
        whole.work(&input, &mut expected);

        let mut split = TimingRecovery::new(&PhyConfig::default()).unwrap();
        let mut out = Vec::new();
        for block in input.chunks(37) {
            split.work(block, &mut out);
        }

        assert_eq!(out, expected);
        assert_eq!(split.state(), whole.state());
    }

    #[test]
    fn test_omega_stays_clamped() {
        let config = PhyConfig {
            gain_omega: 0.5,
            ..PhyConfig::default()
        };
        let mut clock = TimingRecovery::new(&config).unwrap();
        let mut rng = StdRng::seed_from_u64(11);
        let input: Vec<f32> = (0..5000).map(|_| rng.random_range(-3.0..3.0)).collect();
        let mut out = Vec::new();
        clock.work(&input, &mut out);

        let state = clock.state();
        assert!(state.omega >= 1.0 && state.omega <= 3.0);
        assert!(state.mu >= 0.0 && state.mu < 1.0);
    }

    #[test]
    fn test_reset_restores_initial_state() {
        let config = PhyConfig::default();
        let mut clock = TimingRecovery::new(&config).unwrap();
        let mut out = Vec::new();
        clock.work(&chip_stream(100, 5), &mut out);
        clock.reset();

        assert_eq!(clock.pending(), 0);
        assert_eq!(clock.state(), TimingRecovery::new(&config).unwrap().state());
        clock.reset();
        assert_eq!(clock.state(), TimingRecovery::new(&config).unwrap().state());
    }

    #[test]
    fn test_zero_oversample_rejected() {
        // omega = 0 would never advance through the input
        let config = PhyConfig {
            oversample: 0,
            ..PhyConfig::default()
        };
        assert!(matches!(
            TimingRecovery::new(&config),
            Err(PhyError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_short_input_is_held_back() {
        let mut clock = TimingRecovery::new(&PhyConfig::default()).unwrap();
        let mut out = Vec::new();
        clock.work(&[1.0, 1.0, -1.0], &mut out);
        assert!(out.is_empty());
        assert_eq!(clock.pending(), 3);
    }
}
