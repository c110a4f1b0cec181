// Frame format: [Preamble 0x00 x N] [Access Code:4] [Len:1] [Payload:Len] [FCS:2]

use tracing::debug;

use super::config::PhyConfig;
use super::crc::{bytes_to_symbols, calculate_fcs};
use crate::error::{PhyError, PhyResult};
use crate::utils::consts::FCS_BYTES;

/// One transmission: synchronisation header plus payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub preamble_bytes: usize,
    pub access_code: u32,
    pub payload: Vec<u8>,
}

impl Frame {
    /// Length field: payload bytes, FCS excluded
    pub fn length(&self) -> u8 {
        self.payload.len() as u8
    }

    pub fn fcs(&self) -> u16 {
        calculate_fcs(&self.payload)
    }

    /// Serialize the whole frame as sent on air
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes =
            Vec::with_capacity(self.preamble_bytes + 4 + 1 + self.payload.len() + FCS_BYTES);

        bytes.extend(std::iter::repeat_n(0x00, self.preamble_bytes));
        bytes.extend_from_slice(&self.access_code.to_be_bytes());
        bytes.push(self.length());
        bytes.extend_from_slice(&self.payload);
        bytes.extend_from_slice(&self.fcs().to_le_bytes());

        bytes
    }

    /// Symbols handed to the spreader, low nibble of every byte first
    pub fn symbols(&self) -> Vec<u8> {
        bytes_to_symbols(&self.to_bytes())
    }
}

/// FCS disagreement on a received PSDU
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FcsMismatch {
    pub computed: u16,
    pub received: u16,
}

/// Split a received PSDU (payload followed by the FCS) and check it.
pub fn verify_psdu(psdu: &[u8]) -> Result<&[u8], FcsMismatch> {
    if psdu.len() < FCS_BYTES {
        return Err(FcsMismatch {
            computed: calculate_fcs(&[]),
            received: 0,
        });
    }
    let (payload, fcs) = psdu.split_at(psdu.len() - FCS_BYTES);
    let received = u16::from_le_bytes([fcs[0], fcs[1]]);
    let computed = calculate_fcs(payload);
    if computed == received {
        Ok(payload)
    } else {
        Err(FcsMismatch { computed, received })
    }
}

/// Prepends preamble, access code and length to raw payloads.
#[derive(Debug, Clone)]
pub struct FrameBuilder {
    preamble_bytes: usize,
    access_code: u32,
    max_payload: usize,
}

impl FrameBuilder {
    pub fn new(config: &PhyConfig) -> Self {
        Self {
            preamble_bytes: config.preamble_bytes,
            access_code: config.access_code,
            max_payload: config.max_payload,
        }
    }

    pub fn build(&self, payload: &[u8]) -> PhyResult<Frame> {
        if payload.len() > self.max_payload {
            return Err(PhyError::PayloadTooLong {
                len: payload.len(),
                max: self.max_payload,
            });
        }

        debug!("Building frame: payload_len={}", payload.len());

        Ok(Frame {
            preamble_bytes: self.preamble_bytes,
            access_code: self.access_code,
            payload: payload.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hello_world_layout() {
        let builder = FrameBuilder::new(&PhyConfig::default());
        let frame = builder.build(b"HELLO WORLD").unwrap();
        let bytes = frame.to_bytes();

        assert_eq!(&bytes[..5], &[0x00, 0x00, 0x00, 0x00, 0xA7]);
        assert_eq!(bytes[5], 11);
        assert_eq!(&bytes[6..17], b"HELLO WORLD");
        assert_eq!(bytes.len(), 1 + 4 + 1 + 11 + 2);
        assert_eq!(frame.symbols().len(), bytes.len() * 2);
    }

    #[test]
    fn test_empty_payload_is_header_only() {
        let builder = FrameBuilder::new(&PhyConfig::default());
        let frame = builder.build(&[]).unwrap();
        let bytes = frame.to_bytes();
        assert_eq!(bytes, vec![0x00, 0x00, 0x00, 0x00, 0xA7, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn test_payload_too_long() {
        let builder = FrameBuilder::new(&PhyConfig::default());
        let err = builder.build(&[0u8; 126]).unwrap_err();
        assert_eq!(err, PhyError::PayloadTooLong { len: 126, max: 125 });
    }

    #[test]
    fn test_verify_psdu() {
        let builder = FrameBuilder::new(&PhyConfig::default());
        let frame = builder.build(b"abc").unwrap();
        let bytes = frame.to_bytes();
        let psdu = &bytes[6..];
        assert_eq!(verify_psdu(psdu), Ok(&b"abc"[..]));

        let mut corrupted = psdu.to_vec();
        corrupted[1] ^= 0x01;
        assert!(verify_psdu(&corrupted).is_err());
    }
}
