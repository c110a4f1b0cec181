use num_complex::Complex32;
use tracing::{debug, info};

use super::BlockTransform;
use super::chips::ChipSpreader;
use super::config::PhyConfig;
use super::frame::{Frame, FrameBuilder};
use super::pulse::PulseShaper;
use crate::error::PhyResult;
use crate::utils::consts::CHIPS_PER_SYMBOL;

/// Transmit chain: FrameBuilder -> ChipSpreader -> PulseShaper
pub struct PhyEncoder {
    builder: FrameBuilder,
    shaper: PulseShaper,
}

impl PhyEncoder {
    pub fn new(config: &PhyConfig) -> PhyResult<Self> {
        config.validate()?;

        info!("PhyEncoder initialized:");
        info!("  - access code: 0x{:08X}", config.access_code);
        info!("  - preamble: {} bytes", config.preamble_bytes);
        info!("  - oversample: {}", config.oversample);

        Ok(Self {
            builder: FrameBuilder::new(config),
            shaper: PulseShaper::new(config.oversample),
        })
    }

    /// Frame and modulate one payload into a complete baseband burst
    pub fn encode_payload(&mut self, payload: &[u8]) -> PhyResult<Vec<Complex32>> {
        let frame = self.builder.build(payload)?;
        Ok(self.encode_frame(&frame))
    }

    /// Modulate a prepared frame. The burst ends with the Q offset tail, so
    /// consecutive calls are independent.
    pub fn encode_frame(&mut self, frame: &Frame) -> Vec<Complex32> {
        let chips: Vec<Complex32> = frame
            .symbols()
            .into_iter()
            .flat_map(ChipSpreader::quadrature_chips)
            .collect();

        let mut samples = Vec::new();
        self.shaper.reset();
        self.shaper.work(&chips, &mut samples);
        self.shaper.flush(&mut samples);

        debug!(
            "Encoding frame: payload_len={}, chips={}, total_samples={}",
            frame.payload.len(),
            chips.len() * 2,
            samples.len()
        );

        samples
    }

    /// Encode several payloads with `gap_samples` of silence around each burst
    pub fn encode_frames(
        &mut self,
        payloads: &[Vec<u8>],
        gap_samples: usize,
    ) -> PhyResult<Vec<Complex32>> {
        let silence = Complex32::new(0.0, 0.0);
        let mut output = vec![silence; gap_samples];

        for payload in payloads {
            output.extend(self.encode_payload(payload)?);
            output.extend(std::iter::repeat_n(silence, gap_samples));
        }

        debug!(
            "Encoded {} frames, total samples: {}",
            payloads.len(),
            output.len()
        );
        Ok(output)
    }

    /// Samples the burst for `frame` occupies
    pub fn burst_len(&self, frame: &Frame) -> usize {
        let pairs = frame.symbols().len() * CHIPS_PER_SYMBOL / 2;
        pairs * self.shaper.oversample() + self.shaper.oversample() / 2
    }
}
