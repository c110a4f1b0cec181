// Packet synchronizer / deframer
// Works on hard chip decisions at one value per chip, as produced by the
// timing recovery. Frames are found by correlating against the chip pattern
// of the access code, then decoded one 32-chip symbol at a time.

use tracing::{debug, trace, warn};

use super::chips::ChipSpreader;
use super::config::PhyConfig;
use super::crc::{bytes_to_symbols, symbols_to_bytes};
use super::frame::verify_psdu;
use crate::utils::consts::{CHIPS_PER_SYMBOL, FCS_BYTES, SYMBOLS_PER_BYTE};

/// Access code window: 4 bytes, 8 symbols
const WINDOW_WORDS: usize = 8;

/// Externally visible state of the deframer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Searching,
    Synced,
    ReadingLength,
    ReadingPayload,
}

/// A frame that passed the FCS check
#[derive(Debug, Clone, PartialEq)]
pub struct ReceivedFrame {
    pub payload: Vec<u8>,
    /// Chip errors summed over every symbol after the access code
    pub chip_errors: u32,
    /// Carrier offset estimate (Hz), sampled within one symbol of the
    /// frame's last chip
    pub cfo_hz: f32,
}

/// Everything the deframer reports
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    Frame(ReceivedFrame),
    IntegrityFailure {
        length: usize,
        computed: u16,
        received: u16,
    },
    LengthOutOfRange {
        length: usize,
        max: usize,
    },
    /// A symbol after the access code could not be decided
    SyncLost { state: SyncState },
}

#[derive(Debug, Clone, PartialEq)]
enum Stage {
    Searching,
    Synced,
    ReadingLength { low: u8 },
    ReadingPayload { length: usize, symbols: Vec<u8> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PacketSynchronizer {
    /// Last 256 hard chips, oldest in the MSB of `window[0]`
    window: [u32; WINDOW_WORDS],
    chips_seen: usize,
    access_pattern: [u32; WINDOW_WORDS],
    access_mask: [u32; WINDOW_WORDS],
    sync_tolerance: u32,
    chip_threshold: u32,
    max_payload: usize,
    stage: Stage,
    chip_count: usize,
    chip_errors: u32,
}

impl PacketSynchronizer {
    pub fn new(config: &PhyConfig) -> Self {
        let access_symbols = bytes_to_symbols(&config.access_code.to_be_bytes());

        // the access code follows the zero pad
        let mut prev = ChipSpreader::last_chip(0);
        let mut access_pattern = [0u32; WINDOW_WORDS];
        for (word, &symbol) in access_pattern.iter_mut().zip(access_symbols.iter()) {
            *word = ChipSpreader::msk_word(symbol, prev);
            prev = ChipSpreader::last_chip(symbol);
        }

        // first chip depends on whatever preceded the frame
        let mut access_mask = [u32::MAX; WINDOW_WORDS];
        access_mask[0] = 0x7FFF_FFFF;

        debug!(
            "PacketSynchronizer: access code 0x{:08X}, tolerance {}, chip threshold {}",
            config.access_code, config.sync_tolerance, config.chip_threshold
        );

        Self {
            window: [0; WINDOW_WORDS],
            chips_seen: 0,
            access_pattern,
            access_mask,
            sync_tolerance: config.sync_tolerance,
            chip_threshold: config.chip_threshold,
            max_payload: config.max_payload,
            stage: Stage::Searching,
            chip_count: 0,
            chip_errors: 0,
        }
    }

    pub fn state(&self) -> SyncState {
        match self.stage {
            Stage::Searching => SyncState::Searching,
            Stage::Synced => SyncState::Synced,
            Stage::ReadingLength { .. } => SyncState::ReadingLength,
            Stage::ReadingPayload { .. } => SyncState::ReadingPayload,
        }
    }

    /// Slice a block of recovered chips (`> 0` is a one) and run them
    /// through the state machine.
    pub fn process(&mut self, chips: &[f32]) -> Vec<SyncEvent> {
        chips
            .iter()
            .filter_map(|&v| self.push_chip(v > 0.0))
            .collect()
    }

    pub fn push_chip(&mut self, chip: bool) -> Option<SyncEvent> {
        self.shift_in(chip);

        if self.stage == Stage::Searching {
            if self.chips_seen >= WINDOW_WORDS * CHIPS_PER_SYMBOL {
                let distance = self.access_distance();
                if distance <= self.sync_tolerance {
                    debug!("Access code found ({} chip errors)", distance);
                    self.stage = Stage::Synced;
                    self.chip_count = 0;
                    self.chip_errors = 0;
                }
            }
            return None;
        }

        self.chip_count += 1;
        if self.chip_count < CHIPS_PER_SYMBOL {
            return None;
        }
        self.chip_count = 0;

        let word = self.window[WINDOW_WORDS - 1];
        match ChipSpreader::decode_word(word, self.chip_threshold) {
            Some((symbol, errors)) => {
                trace!("Symbol {:X} ({} chip errors)", symbol, errors);
                self.chip_errors += errors;
                self.advance(symbol)
            }
            None => {
                let state = self.state();
                debug!("Undecodable symbol in {:?}, back to searching", state);
                self.stage = Stage::Searching;
                Some(SyncEvent::SyncLost { state })
            }
        }
    }

    /// Back to the freshly constructed state
    pub fn reset(&mut self) {
        self.window = [0; WINDOW_WORDS];
        self.chips_seen = 0;
        self.stage = Stage::Searching;
        self.chip_count = 0;
        self.chip_errors = 0;
    }

    fn shift_in(&mut self, chip: bool) {
        for i in 0..WINDOW_WORDS - 1 {
            self.window[i] = (self.window[i] << 1) | (self.window[i + 1] >> 31);
        }
        self.window[WINDOW_WORDS - 1] = (self.window[WINDOW_WORDS - 1] << 1) | chip as u32;
        self.chips_seen = self.chips_seen.saturating_add(1);
    }

    fn access_distance(&self) -> u32 {
        self.window
            .iter()
            .zip(self.access_pattern.iter())
            .zip(self.access_mask.iter())
            .map(|((w, p), m)| ((w ^ p) & m).count_ones())
            .sum()
    }

    fn advance(&mut self, symbol: u8) -> Option<SyncEvent> {
        match &mut self.stage {
            Stage::Searching => None,
            Stage::Synced => {
                self.stage = Stage::ReadingLength { low: symbol };
                None
            }
            Stage::ReadingLength { low } => {
                let length = ((symbol << 4) | *low) as usize;
                if length > self.max_payload {
                    warn!(
                        "Length field {} exceeds maximum {}, dropping frame",
                        length, self.max_payload
                    );
                    self.stage = Stage::Searching;
                    return Some(SyncEvent::LengthOutOfRange {
                        length,
                        max: self.max_payload,
                    });
                }
                debug!("Reading payload of {} bytes", length);
                self.stage = Stage::ReadingPayload {
                    length,
                    symbols: Vec::with_capacity((length + FCS_BYTES) * SYMBOLS_PER_BYTE),
                };
                None
            }
            Stage::ReadingPayload { length, symbols } => {
                symbols.push(symbol);
                if symbols.len() < (*length + FCS_BYTES) * SYMBOLS_PER_BYTE {
                    return None;
                }

                let length = *length;
                let psdu = symbols_to_bytes(symbols);
                self.stage = Stage::Searching;

                match verify_psdu(&psdu) {
                    Ok(payload) => {
                        debug!(
                            "Frame received: {} bytes, {} chip errors",
                            payload.len(),
                            self.chip_errors
                        );
                        Some(SyncEvent::Frame(ReceivedFrame {
                            payload: payload.to_vec(),
                            chip_errors: self.chip_errors,
                            cfo_hz: 0.0,
                        }))
                    }
                    Err(mismatch) => {
                        warn!(
                            "FCS mismatch on {}-byte frame: computed 0x{:04X}, received 0x{:04X}",
                            length, mismatch.computed, mismatch.received
                        );
                        Some(SyncEvent::IntegrityFailure {
                            length,
                            computed: mismatch.computed,
                            received: mismatch.received,
                        })
                    }
                }
            }
        }
    }
}
