use crossbeam_channel::Sender;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;
use tracing::{debug, info};

use crate::utils::consts::{DEFAULT_PAYLOAD, STOP_POLL_MS};

#[derive(Debug, Clone, PartialEq)]
enum PayloadKind {
    Fixed(Vec<u8>),
    /// `"{seq:06} HELLO WORLD"`, seq counting from 1
    Sequenced,
}

/// Timed message generator feeding the transmit chain
#[derive(Debug, Clone)]
pub struct PeriodicSource {
    payload: PayloadKind,
    period: Duration,
    /// `None` repeats until stopped
    repeat: Option<usize>,
}

impl PeriodicSource {
    pub fn new(payload: Vec<u8>, period: Duration, repeat: Option<usize>) -> Self {
        Self {
            payload: PayloadKind::Fixed(payload),
            period,
            repeat,
        }
    }

    pub fn sequenced(period: Duration, repeat: Option<usize>) -> Self {
        Self {
            payload: PayloadKind::Sequenced,
            period,
            repeat,
        }
    }

    /// Payload of the `seq`-th message (1-based)
    pub fn payload(&self, seq: usize) -> Vec<u8> {
        match &self.payload {
            PayloadKind::Fixed(bytes) => bytes.clone(),
            PayloadKind::Sequenced => format!("{:06} {}", seq, DEFAULT_PAYLOAD).into_bytes(),
        }
    }

    /// Emit messages until the repeat count is reached, the stop flag is
    /// raised or the receiving side hangs up. Returns the number sent.
    pub fn run(self, tx: Sender<Vec<u8>>, stop: Arc<AtomicBool>) -> usize {
        info!(
            "Periodic source started: period={:?}, repeat={:?}",
            self.period, self.repeat
        );

        let mut sent = 0;
        while !stop.load(Ordering::SeqCst) {
            if self.repeat.is_some_and(|n| sent >= n) {
                break;
            }

            let payload = self.payload(sent + 1);
            debug!("Source message {}: {} bytes", sent + 1, payload.len());
            if tx.send(payload).is_err() {
                debug!("Source output closed");
                break;
            }
            sent += 1;

            if self.repeat.is_some_and(|n| sent >= n) {
                break;
            }
            Self::sleep_unless_stopped(self.period, &stop);
        }

        info!("Periodic source finished after {} messages", sent);
        sent
    }

    fn sleep_unless_stopped(period: Duration, stop: &AtomicBool) {
        let poll = Duration::from_millis(STOP_POLL_MS);
        let mut remaining = period;
        while !remaining.is_zero() && !stop.load(Ordering::SeqCst) {
            let nap = remaining.min(poll);
            thread::sleep(nap);
            remaining -= nap;
        }
    }
}
