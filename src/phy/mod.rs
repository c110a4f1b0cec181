// Physical layer: IEEE 802.15.4 style O-QPSK with DSSS spreading
// TX: FrameBuilder -> ChipSpreader -> PulseShaper
// RX: QuadratureDemodulator -> DcTracker -> TimingRecovery -> PacketSynchronizer

pub mod chips;
pub mod clock;
pub mod config;
pub mod crc;
pub mod decoder;
pub mod demod;
pub mod encoder;
pub mod frame;
pub mod pulse;
pub mod sync;

pub use chips::ChipSpreader;
pub use clock::{TimingRecovery, TimingState};
pub use config::PhyConfig;
pub use decoder::{PhyDecoder, RxStats};
pub use demod::{DcTracker, QuadratureDemodulator};
pub use encoder::PhyEncoder;
pub use frame::{Frame, FrameBuilder};
pub use pulse::PulseShaper;
pub use sync::{PacketSynchronizer, ReceivedFrame, SyncEvent, SyncState};

/// A streaming block. State carries across calls, so a stream split into
/// arbitrary blocks produces the same output as one big block.
pub trait BlockTransform {
    type Input;
    type Output;

    /// Nominal (input, output) rate
    fn ratio(&self) -> (usize, usize);

    /// Consume `input`, append whatever can be produced to `output`
    fn work(&mut self, input: &[Self::Input], output: &mut Vec<Self::Output>);

    fn reset(&mut self);
}
