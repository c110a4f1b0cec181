/// Text side of the receive control plane
use crossbeam_channel::{Receiver, Sender, TrySendError};
use std::borrow::Cow;
use tracing::{debug, info, warn};

use crate::phy::{ReceivedFrame, SyncEvent};

/// Decodes received frames for display and passes them on untouched
pub struct TextProcessor;

impl TextProcessor {
    /// Invalid UTF-8 sequences become U+FFFD, nothing is rejected
    pub fn decode_lossy(bytes: &[u8]) -> Cow<'_, str> {
        String::from_utf8_lossy(bytes)
    }

    /// Log every received frame as text and forward it whole, original
    /// bytes and link metrics. A full output drops the frame instead of
    /// stalling the receive chain.
    /// Runs until the event channel closes; returns the frames seen.
    pub fn run_sink(events: Receiver<SyncEvent>, output: Sender<ReceivedFrame>) -> usize {
        let mut frames = 0;
        let mut output = Some(output);

        for event in events.iter() {
            match event {
                SyncEvent::Frame(frame) => {
                    frames += 1;
                    info!(
                        "RX TEXT: {} (chip errors: {}, cfo: {:.0} Hz)",
                        Self::decode_lossy(&frame.payload),
                        frame.chip_errors,
                        frame.cfo_hz
                    );

                    let Some(tx) = output.as_ref() else {
                        continue;
                    };
                    match tx.try_send(frame) {
                        Ok(()) => {}
                        Err(TrySendError::Full(frame)) => {
                            warn!(
                                "Frame output full, dropping {}-byte frame",
                                frame.payload.len()
                            );
                        }
                        Err(TrySendError::Disconnected(_)) => {
                            warn!("Frame output closed, continuing with logging only");
                            output = None;
                        }
                    }
                }
                SyncEvent::IntegrityFailure { length, .. } => {
                    debug!("Dropped {}-byte frame with bad FCS", length);
                }
                other => debug!("Receive event: {:?}", other),
            }
        }

        frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phy::sync::ReceivedFrame;

    fn frame(payload: &[u8]) -> SyncEvent {
        SyncEvent::Frame(ReceivedFrame {
            payload: payload.to_vec(),
            chip_errors: payload.len() as u32,
            cfo_hz: 1500.0,
        })
    }

    #[test]
    fn test_decode_lossy() {
        assert_eq!(TextProcessor::decode_lossy(b"HELLO WORLD"), "HELLO WORLD");
        assert_eq!(TextProcessor::decode_lossy(&[0x41, 0xFF, 0x42]), "A\u{FFFD}B");
        assert!(matches!(TextProcessor::decode_lossy(b"ok"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_sink_forwards_original_bytes() {
        let (event_tx, event_rx) = crossbeam_channel::unbounded();
        let (out_tx, out_rx) = crossbeam_channel::unbounded();

        event_tx.send(frame(&[0xC3, 0x28, 0x00])).unwrap();
        event_tx
            .send(SyncEvent::IntegrityFailure {
                length: 3,
                computed: 1,
                received: 2,
            })
            .unwrap();
        event_tx.send(frame(b"text")).unwrap();
        drop(event_tx);

        assert_eq!(TextProcessor::run_sink(event_rx, out_tx), 2);
        let forwarded: Vec<ReceivedFrame> = out_rx.iter().collect();
        let payloads: Vec<Vec<u8>> = forwarded.into_iter().map(|f| f.payload).collect();
        assert_eq!(payloads, vec![vec![0xC3, 0x28, 0x00], b"text".to_vec()]);
    }

    #[test]
    fn test_sink_keeps_link_metrics() {
        let (event_tx, event_rx) = crossbeam_channel::unbounded();
        let (out_tx, out_rx) = crossbeam_channel::unbounded();

        event_tx
            .send(SyncEvent::Frame(ReceivedFrame {
                payload: b"metrics".to_vec(),
                chip_errors: 17,
                cfo_hz: -42_000.0,
            }))
            .unwrap();
        drop(event_tx);

        assert_eq!(TextProcessor::run_sink(event_rx, out_tx), 1);
        let received = out_rx.recv().unwrap();
        assert_eq!(received.payload, b"metrics");
        assert_eq!(received.chip_errors, 17);
        assert_eq!(received.cfo_hz, -42_000.0);
    }

    #[test]
    fn test_sink_drops_when_output_full() {
        let (event_tx, event_rx) = crossbeam_channel::unbounded();
        let (out_tx, out_rx) = crossbeam_channel::bounded(1);

        for i in 0..10u8 {
            event_tx.send(frame(&[i])).unwrap();
        }
        drop(event_tx);

        // nobody drains the output, the sink still sees every frame
        assert_eq!(TextProcessor::run_sink(event_rx, out_tx), 10);
        assert_eq!(out_rx.len(), 1);
        assert_eq!(out_rx.recv().unwrap().payload, vec![0]);
    }

    #[test]
    fn test_sink_survives_closed_output() {
        let (event_tx, event_rx) = crossbeam_channel::unbounded();
        let (out_tx, out_rx) = crossbeam_channel::unbounded();
        drop(out_rx);

        event_tx.send(frame(b"a")).unwrap();
        event_tx.send(frame(b"b")).unwrap();
        drop(event_tx);

        assert_eq!(TextProcessor::run_sink(event_rx, out_tx), 2);
    }
}
