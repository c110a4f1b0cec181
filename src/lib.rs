//! O-QPSK (IEEE 802.15.4 style) baseband link: DSSS spreading, half-sine
//! pulse shaping, and a receive chain with quadrature demodulation, DC
//! tracking, Mueller & Müller clock recovery and access-code framing.

pub mod error;
pub mod phy;
pub mod transmission;
pub mod ui;
pub mod utils;

pub use error::{PhyError, PhyResult};
pub use phy::{PhyConfig, PhyDecoder, PhyEncoder, SyncEvent};
