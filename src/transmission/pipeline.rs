// Loopback pipeline: one thread per stage, typed channels in between.
//
//   payloads -> [tx] => [channel] => [rx] -> events -> [sink] -> frames
//
// Every channel is bounded. `=>` carry sample blocks and block the sender
// when full, `->` carry messages. The payload queue blocks the producer;
// events and frames are dropped with a warning rather than stall the
// receiver. Stop halts the TX stage; everything downstream drains on
// disconnect.

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError, bounded};
use num_complex::Complex32;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::channel::ChannelModel;
use super::text_processor::TextProcessor;
use crate::error::{PhyError, PhyResult};
use crate::phy::{PhyConfig, PhyDecoder, PhyEncoder, ReceivedFrame, RxStats, SyncEvent};
use crate::utils::consts::{
    BLOCK_QUEUE_DEPTH, BLOCK_SIZE, BURST_PADDING, MESSAGE_QUEUE_DEPTH, STOP_POLL_MS,
};

type SampleBlock = Vec<Complex32>;

/// Outer ends of a running pipeline
pub struct PipelinePorts {
    /// Payloads to transmit. Holds at most `MESSAGE_QUEUE_DEPTH` entries,
    /// sends block beyond that. Dropping it ends the session once the last
    /// burst has drained.
    pub payload_tx: Sender<Vec<u8>>,
    /// Received frames: original payload bytes, chip errors and CFO
    pub frames_rx: Receiver<ReceivedFrame>,
}

impl PipelinePorts {
    /// Queue a payload, waiting while the queue is full
    pub fn send_payload(&self, payload: Vec<u8>) -> PhyResult<()> {
        self.payload_tx
            .send(payload)
            .map_err(|_| PhyError::ChannelClosed("payload"))
    }
}

/// What a finished session did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineSummary {
    pub frames_sent: usize,
    pub frames_delivered: usize,
    pub rx: RxStats,
}

/// Owns every stage thread of a loopback session
pub struct Pipeline {
    stop: Arc<AtomicBool>,
    frames_sent: Arc<AtomicUsize>,
    tx_handle: JoinHandle<()>,
    channel_handle: JoinHandle<()>,
    rx_handle: JoinHandle<RxStats>,
    sink_handle: JoinHandle<usize>,
}

impl Pipeline {
    /// Start TX, channel, RX and sink stages for `config`
    pub fn loopback(
        config: &PhyConfig,
        channel: ChannelModel,
    ) -> PhyResult<(Pipeline, PipelinePorts)> {
        config.validate()?;

        let stop = Arc::new(AtomicBool::new(false));
        let frames_sent = Arc::new(AtomicUsize::new(0));

        let encoder = PhyEncoder::new(config)?;
        let decoder = PhyDecoder::new(config)?;

        let (payload_tx, payload_rx) = bounded::<Vec<u8>>(MESSAGE_QUEUE_DEPTH);
        let (air_tx, air_rx) = bounded::<SampleBlock>(BLOCK_QUEUE_DEPTH);
        let (rx_in_tx, rx_in_rx) = bounded::<SampleBlock>(BLOCK_QUEUE_DEPTH);
        let (event_tx, event_rx) = bounded::<SyncEvent>(MESSAGE_QUEUE_DEPTH);
        let (frames_tx, frames_rx) = bounded::<ReceivedFrame>(MESSAGE_QUEUE_DEPTH);

        let tx_stop = stop.clone();
        let tx_count = frames_sent.clone();
        let tx_handle = thread::spawn(move || {
            run_transmitter(encoder, payload_rx, air_tx, tx_stop, tx_count);
        });

        let channel_handle = thread::spawn(move || {
            run_channel(channel, air_rx, rx_in_tx);
        });

        let rx_handle = thread::spawn(move || run_receiver(decoder, rx_in_rx, event_tx));

        let sink_handle = thread::spawn(move || TextProcessor::run_sink(event_rx, frames_tx));

        info!("Loopback pipeline started");

        Ok((
            Pipeline {
                stop,
                frames_sent,
                tx_handle,
                channel_handle,
                rx_handle,
                sink_handle,
            },
            PipelinePorts {
                payload_tx,
                frames_rx,
            },
        ))
    }

    /// Shared stop flag, for sources and signal handlers
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    /// Frames modulated so far
    pub fn frames_sent(&self) -> usize {
        self.frames_sent.load(Ordering::SeqCst)
    }

    /// Ask the TX stage to stop producing. In-flight blocks still drain.
    pub fn stop(&self) {
        info!("Stopping pipeline");
        self.stop.store(true, Ordering::SeqCst);
    }

    /// Join every stage, upstream first
    pub fn wait(self) -> PhyResult<PipelineSummary> {
        self.tx_handle
            .join()
            .map_err(|_| PhyError::ThreadPanicked("tx"))?;
        self.channel_handle
            .join()
            .map_err(|_| PhyError::ThreadPanicked("channel"))?;
        let rx = self
            .rx_handle
            .join()
            .map_err(|_| PhyError::ThreadPanicked("rx"))?;
        let frames_delivered = self
            .sink_handle
            .join()
            .map_err(|_| PhyError::ThreadPanicked("sink"))?;

        let summary = PipelineSummary {
            frames_sent: self.frames_sent.load(Ordering::SeqCst),
            frames_delivered,
            rx,
        };
        info!(
            "Pipeline finished: sent={}, ok={}, fcs_failures={}, length_rejections={}, sync_losses={}",
            summary.frames_sent,
            rx.frames_ok,
            rx.integrity_failures,
            rx.length_rejections,
            rx.sync_losses
        );
        Ok(summary)
    }
}

fn run_transmitter(
    mut encoder: PhyEncoder,
    payloads: Receiver<Vec<u8>>,
    air: Sender<SampleBlock>,
    stop: Arc<AtomicBool>,
    frames_sent: Arc<AtomicUsize>,
) {
    let poll = Duration::from_millis(STOP_POLL_MS);

    while !stop.load(Ordering::SeqCst) {
        let payload = match payloads.recv_timeout(poll) {
            Ok(payload) => payload,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        };

        let burst = match encoder.encode_frames(&[payload], BURST_PADDING) {
            Ok(burst) => burst,
            Err(e) => {
                warn!("Dropping payload: {}", e);
                continue;
            }
        };

        for block in burst.chunks(BLOCK_SIZE) {
            if air.send(block.to_vec()).is_err() {
                warn!("Channel stage gone, transmitter exiting");
                return;
            }
        }
        let n = frames_sent.fetch_add(1, Ordering::SeqCst) + 1;
        debug!("Burst {} queued ({} samples)", n, burst.len());
    }

    debug!("Transmitter stopped");
}

fn run_channel(
    mut channel: ChannelModel,
    input: Receiver<SampleBlock>,
    output: Sender<SampleBlock>,
) {
    for mut block in input.iter() {
        channel.apply(&mut block);
        if output.send(block).is_err() {
            warn!("Receiver stage gone, channel exiting");
            return;
        }
    }
    debug!("Channel drained");
}

fn run_receiver(
    mut decoder: PhyDecoder,
    input: Receiver<SampleBlock>,
    events: Sender<SyncEvent>,
) -> RxStats {
    for block in input.iter() {
        for event in decoder.process_samples(&block) {
            // a missing sink only loses the notification
            if let Err(TrySendError::Full(event)) = events.try_send(event) {
                warn!("Event queue full, dropping {:?}", event);
            }
        }
    }
    debug!("Receiver drained");
    decoder.stats()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transmission::source::PeriodicSource;

    #[test]
    fn test_pipeline_delivers_in_order() {
        let config = PhyConfig::default();
        let (pipeline, ports) =
            Pipeline::loopback(&config, ChannelModel::new(config.sample_rate)).unwrap();

        let sent: Vec<Vec<u8>> = (1..=3)
            .map(|i| format!("{:06} HELLO WORLD", i).into_bytes())
            .collect();
        for payload in &sent {
            ports.send_payload(payload.clone()).unwrap();
        }

        let PipelinePorts {
            payload_tx,
            frames_rx,
        } = ports;
        drop(payload_tx);

        let summary = pipeline.wait().unwrap();
        let received: Vec<Vec<u8>> = frames_rx.iter().map(|f| f.payload).collect();
        assert_eq!(received, sent);
        assert_eq!(summary.frames_sent, 3);
        assert_eq!(summary.frames_delivered, 3);
        assert_eq!(summary.rx.frames_ok, 3);
    }

    #[test]
    fn test_stop_drains_and_joins() {
        let config = PhyConfig::default();
        let (pipeline, ports) =
            Pipeline::loopback(&config, ChannelModel::new(config.sample_rate)).unwrap();
        ports.send_payload(b"before stop".to_vec()).unwrap();

        // payload_tx stays open, only the stop flag ends the session
        while pipeline.frames_sent() < 1 {
            thread::sleep(Duration::from_millis(5));
        }
        pipeline.stop();
        let summary = pipeline.wait().unwrap();

        assert_eq!(summary.frames_sent, 1);
        let received: Vec<Vec<u8>> = ports.frames_rx.iter().map(|f| f.payload).collect();
        assert_eq!(received, vec![b"before stop".to_vec()]);
        assert!(ports.send_payload(b"late".to_vec()).is_err());
    }

    #[test]
    fn test_payload_queue_applies_backpressure() {
        let config = PhyConfig::default();
        let (pipeline, ports) =
            Pipeline::loopback(&config, ChannelModel::new(config.sample_rate)).unwrap();

        // a zero-period source outruns the modulator by far
        let source = PeriodicSource::sequenced(Duration::ZERO, Some(200_000));
        let source_tx = ports.payload_tx.clone();
        let source_stop = pipeline.stop_flag();
        let source_handle = thread::spawn(move || source.run(source_tx, source_stop));

        for _ in 0..100 {
            assert!(ports.payload_tx.len() <= MESSAGE_QUEUE_DEPTH);
            thread::sleep(Duration::from_millis(2));
        }

        pipeline.stop();
        let summary = pipeline.wait().unwrap();
        let sent = source_handle.join().unwrap();

        assert!(sent < 200_000, "source was never held back");
        assert!(summary.frames_sent <= sent);
        assert!(ports.frames_rx.len() <= MESSAGE_QUEUE_DEPTH);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = PhyConfig {
            oversample: 5,
            ..PhyConfig::default()
        };
        assert!(matches!(
            Pipeline::loopback(&config, ChannelModel::new(config.sample_rate)),
            Err(PhyError::InvalidConfig(_))
        ));
    }
}
