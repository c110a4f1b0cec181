use serde::{Deserialize, Serialize};

use crate::error::{PhyError, PhyResult};
use crate::utils::consts::*;

/// Tunables shared by the transmit and receive chains.
///
/// The clock-recovery gains and the DC tracker coefficient were tuned
/// empirically for one channel; treat them as starting points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhyConfig {
    /// Sample rate (Hz)
    pub sample_rate: u32,
    /// Samples per O-QPSK chip pair
    pub oversample: usize,
    /// Start-of-frame access code
    pub access_code: u32,
    /// 0x00 pad bytes before the access code
    pub preamble_bytes: usize,
    /// Largest accepted payload (bytes)
    pub max_payload: usize,
    /// Chip errors tolerated in the access code window
    pub sync_tolerance: u32,
    /// Symbol decisions need fewer chip errors than this
    pub chip_threshold: u32,
    /// DC tracker coefficient
    pub dc_alpha: f32,
    /// Clock recovery proportional gain
    pub gain_mu: f32,
    /// Clock recovery integral gain
    pub gain_omega: f32,
    /// Max deviation of the symbol period, relative to nominal
    pub omega_relative_limit: f32,
    /// Initial fractional sampling phase
    pub initial_mu: f32,
}

impl Default for PhyConfig {
    fn default() -> Self {
        Self {
            sample_rate: SAMPLE_RATE,
            oversample: OVERSAMPLE,
            access_code: ACCESS_CODE,
            preamble_bytes: PREAMBLE_BYTES,
            max_payload: MAX_PAYLOAD_BYTES,
            sync_tolerance: SYNC_TOLERANCE,
            chip_threshold: CHIP_THRESHOLD,
            dc_alpha: DC_ALPHA,
            gain_mu: GAIN_MU,
            gain_omega: GAIN_OMEGA,
            omega_relative_limit: OMEGA_RELATIVE_LIMIT,
            initial_mu: INITIAL_MU,
        }
    }
}

impl PhyConfig {
    /// Nominal demodulated samples per chip, the clock recovery `omega`.
    pub fn samples_per_chip(&self) -> f32 {
        self.oversample as f32 / 2.0
    }

    /// Chip pairs per second on air
    pub fn chip_rate(&self) -> f32 {
        self.sample_rate as f32 / self.oversample as f32
    }

    pub fn validate(&self) -> PhyResult<()> {
        if self.sample_rate == 0 {
            return Err(PhyError::InvalidConfig("sample_rate must be non-zero".into()));
        }
        if self.oversample < 2 || self.oversample % 2 != 0 {
            return Err(PhyError::InvalidConfig(format!(
                "oversample must be even and >= 2, got {}",
                self.oversample
            )));
        }
        if self.max_payload > u8::MAX as usize - FCS_BYTES {
            return Err(PhyError::InvalidConfig(format!(
                "max_payload {} does not fit the one-byte length field",
                self.max_payload
            )));
        }
        if self.chip_threshold == 0 || self.chip_threshold > CHIPS_PER_SYMBOL as u32 {
            return Err(PhyError::InvalidConfig(format!(
                "chip_threshold must be in 1..=32, got {}",
                self.chip_threshold
            )));
        }
        if !(self.dc_alpha > 0.0 && self.dc_alpha < 1.0) {
            return Err(PhyError::InvalidConfig(format!(
                "dc_alpha must be in (0, 1), got {}",
                self.dc_alpha
            )));
        }
        if !(self.omega_relative_limit >= 0.0 && self.omega_relative_limit < 1.0) {
            return Err(PhyError::InvalidConfig(format!(
                "omega_relative_limit must be in [0, 1), got {}",
                self.omega_relative_limit
            )));
        }
        if self.gain_mu < 0.0 || self.gain_omega < 0.0 {
            return Err(PhyError::InvalidConfig("clock recovery gains must be >= 0".into()));
        }
        if !(0.0..1.0).contains(&self.initial_mu) {
            return Err(PhyError::InvalidConfig(format!(
                "initial_mu must be in [0, 1), got {}",
                self.initial_mu
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = PhyConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.samples_per_chip(), 2.0);
        assert_eq!(config.chip_rate(), 1_000_000.0);
        assert_eq!(config.access_code, 0x0000_00A7);
    }

    #[test]
    fn test_rejects_odd_oversample() {
        let config = PhyConfig {
            oversample: 3,
            ..PhyConfig::default()
        };
        assert!(matches!(config.validate(), Err(PhyError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_oversize_payload_limit() {
        let config = PhyConfig {
            max_payload: 254,
            ..PhyConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: PhyConfig = serde_json::from_str(r#"{"gain_mu": 0.05}"#).unwrap();
        assert_eq!(config.gain_mu, 0.05);
        assert_eq!(config.oversample, OVERSAMPLE);
    }
}
