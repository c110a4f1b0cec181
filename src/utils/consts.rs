/// 日志级别（可被 RUST_LOG 覆盖）
pub const LOG_LEVEL: &str = "info";

// ============================================================================
// Physical Layer Parameters
// ============================================================================

/// Sample rate (Hz)
pub const SAMPLE_RATE: u32 = 4_000_000;

/// Samples per O-QPSK chip pair (I chip + Q chip)
pub const OVERSAMPLE: usize = 4;

/// Chips per symbol
pub const CHIPS_PER_SYMBOL: usize = 32;

/// Symbols (nibbles) per byte
pub const SYMBOLS_PER_BYTE: usize = 2;

// Frame Parameters
/// Start-of-frame access code, sent big-endian after the preamble
pub const ACCESS_CODE: u32 = 0x0000_00A7;

/// Number of 0x00 pad bytes sent before the access code
pub const PREAMBLE_BYTES: usize = 1;

/// Frame check sequence length (bytes)
pub const FCS_BYTES: usize = 2;

/// Largest PSDU the one-byte length field allows
pub const MAX_PSDU_BYTES: usize = 127;

/// Maximum data payload per frame (bytes)
pub const MAX_PAYLOAD_BYTES: usize = MAX_PSDU_BYTES - FCS_BYTES;

// Receiver Parameters
/// Chip errors tolerated when matching the access code window
pub const SYNC_TOLERANCE: u32 = 12;

/// A symbol decision is accepted only below this many chip errors
pub const CHIP_THRESHOLD: u32 = 10;

/// DC tracker single-pole coefficient
pub const DC_ALPHA: f32 = 0.000_16;

// Clock recovery gains
pub const GAIN_MU: f32 = 0.03;
pub const GAIN_OMEGA: f32 = 0.000_2;
pub const OMEGA_RELATIVE_LIMIT: f32 = 0.5;
pub const INITIAL_MU: f32 = 0.5;

// Pipeline Parameters
/// Zero samples around every burst
pub const BURST_PADDING: usize = 256;

/// Samples per block handed between stages
pub const BLOCK_SIZE: usize = 4096;

/// Sample blocks buffered between two stages
pub const BLOCK_QUEUE_DEPTH: usize = 16;

/// Payloads, receive events and delivered frames buffered between stages
pub const MESSAGE_QUEUE_DEPTH: usize = 64;

/// Poll interval for stop checks (ms)
pub const STOP_POLL_MS: u64 = 50;

/// Default periodic source interval (ms)
pub const MESSAGE_PERIOD_MS: u64 = 100;

/// Payload used by the periodic source when none is given
pub const DEFAULT_PAYLOAD: &str = "HELLO WORLD";
