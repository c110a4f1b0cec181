use num_complex::Complex32;
use tracing::{debug, info};

use super::BlockTransform;
use super::clock::TimingRecovery;
use super::config::PhyConfig;
use super::demod::{DcTracker, QuadratureDemodulator};
use super::sync::{PacketSynchronizer, SyncEvent};
use crate::error::PhyResult;
use crate::utils::consts::CHIPS_PER_SYMBOL;

/// Running counters of the receive chain
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RxStats {
    pub frames_ok: u64,
    pub integrity_failures: u64,
    pub length_rejections: u64,
    pub sync_losses: u64,
}

impl RxStats {
    fn record(&mut self, event: &SyncEvent) {
        match event {
            SyncEvent::Frame(_) => self.frames_ok += 1,
            SyncEvent::IntegrityFailure { .. } => self.integrity_failures += 1,
            SyncEvent::LengthOutOfRange { .. } => self.length_rejections += 1,
            SyncEvent::SyncLost { .. } => self.sync_losses += 1,
        }
    }
}

/// Receive chain: QuadratureDemodulator -> DcTracker -> TimingRecovery ->
/// PacketSynchronizer
pub struct PhyDecoder {
    demod: QuadratureDemodulator,
    dc: DcTracker,
    clock: TimingRecovery,
    sync: PacketSynchronizer,
    sample_rate: u32,
    stats: RxStats,
    /// Input samples per symbol; the CFO estimate is sampled at this step
    granule: usize,

    // scratch buffers, reused between calls
    phase: Vec<f32>,
    corrected: Vec<f32>,
    chips: Vec<f32>,
}

impl PhyDecoder {
    pub fn new(config: &PhyConfig) -> PhyResult<Self> {
        config.validate()?;

        info!("PhyDecoder initialized:");
        info!("  - sample rate: {} Hz", config.sample_rate);
        info!(
            "  - clock recovery: omega={}, gain_mu={}, gain_omega={}, limit={}",
            config.samples_per_chip(),
            config.gain_mu,
            config.gain_omega,
            config.omega_relative_limit
        );
        info!("  - dc alpha: {}", config.dc_alpha);

        Ok(Self {
            demod: QuadratureDemodulator::new(),
            dc: DcTracker::new(config.dc_alpha),
            clock: TimingRecovery::new(config)?,
            sync: PacketSynchronizer::new(config),
            sample_rate: config.sample_rate,
            stats: RxStats::default(),
            granule: CHIPS_PER_SYMBOL * config.oversample / 2,
            phase: Vec::new(),
            corrected: Vec::new(),
            chips: Vec::new(),
        })
    }

    // entry point for processing incoming samples
    //
    // Runs the chain one symbol's worth of samples at a time, so a frame is
    // tagged with the CFO estimate from within a symbol of its last chip.
    pub fn process_samples(&mut self, samples: &[Complex32]) -> Vec<SyncEvent> {
        let mut events = Vec::new();

        for granule in samples.chunks(self.granule) {
            self.phase.clear();
            self.corrected.clear();
            self.chips.clear();

            self.demod.work(granule, &mut self.phase);
            self.dc.work(&self.phase, &mut self.corrected);
            self.clock.work(&self.corrected, &mut self.chips);
            if self.chips.is_empty() {
                continue;
            }

            let cfo_hz = self.dc.frequency_offset_hz(self.sample_rate);
            for mut event in self.sync.process(&self.chips) {
                if let SyncEvent::Frame(frame) = &mut event {
                    frame.cfo_hz = cfo_hz;
                    debug!(
                        "Frame: {} bytes, {} chip errors, cfo {:.0} Hz",
                        frame.payload.len(),
                        frame.chip_errors,
                        frame.cfo_hz
                    );
                }
                self.stats.record(&event);
                events.push(event);
            }
        }

        events
    }

    pub fn stats(&self) -> RxStats {
        self.stats
    }

    /// Current carrier offset estimate (Hz)
    pub fn frequency_offset_hz(&self) -> f32 {
        self.dc.frequency_offset_hz(self.sample_rate)
    }

    /// Restart the receive session. Counters are kept.
    pub fn reset(&mut self) {
        self.demod.reset();
        self.dc.reset();
        self.clock.reset();
        self.sync.reset();
    }
}
