//! Error types for the O-QPSK link

use thiserror::Error;

/// Result type for PHY and pipeline operations
pub type PhyResult<T> = Result<T, PhyError>;

/// Errors surfaced to the caller.
///
/// Signal-chain conditions such as a missed sync, an out-of-range length
/// field or a failed FCS are not errors; they are reported as
/// [`SyncEvent`](crate::phy::SyncEvent) values.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PhyError {
    /// A configuration field is out of its valid range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Payload does not fit in one frame
    #[error("Payload too long: {len} bytes (max {max})")]
    PayloadTooLong { len: usize, max: usize },

    /// The peer end of a pipeline channel is gone
    #[error("Channel closed: {0}")]
    ChannelClosed(&'static str),

    /// A stage thread panicked before it could drain
    #[error("Stage thread '{0}' panicked")]
    ThreadPanicked(&'static str),
}
