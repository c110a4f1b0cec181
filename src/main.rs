use clap::Parser;
use crossbeam_channel::RecvTimeoutError;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;
use tracing::{error, info, warn};

use oqpsk_rs::error::PhyResult;
use oqpsk_rs::phy::PhyConfig;
use oqpsk_rs::transmission::{
    ChannelModel, PeriodicSource, Pipeline, PipelinePorts, TextProcessor,
};
use oqpsk_rs::ui::progress::ProgressManager;
use oqpsk_rs::ui::{create_link_bars, print_banner, update_progress};
use oqpsk_rs::utils::consts::*;
use oqpsk_rs::utils::logging::init_logging;

/// Periodic O-QPSK loopback: source -> TX -> channel -> RX -> text sink
#[derive(Parser, Debug)]
#[command(name = "oqpsk-rs", version)]
struct Args {
    /// Fixed payload text. Without it messages are sequence numbered.
    #[arg(short, long)]
    payload: Option<String>,

    /// Interval between messages (ms)
    #[arg(long, default_value_t = MESSAGE_PERIOD_MS)]
    period_ms: u64,

    /// Number of messages, 0 runs until Ctrl+C
    #[arg(short = 'n', long, default_value_t = 10)]
    count: usize,

    /// Sample rate (Hz)
    #[arg(long, default_value_t = SAMPLE_RATE)]
    sample_rate: u32,

    /// Chip errors tolerated in the access code
    #[arg(long, default_value_t = SYNC_TOLERANCE)]
    sync_tolerance: u32,

    /// Channel carrier frequency offset (Hz)
    #[arg(long, default_value_t = 0.0)]
    cfo: f32,

    /// Channel phase rotation (rad)
    #[arg(long, default_value_t = 0.0)]
    phase: f32,

    /// Channel noise standard deviation per rail
    #[arg(long, default_value_t = 0.0)]
    noise: f32,

    /// Noise seed
    #[arg(long, default_value_t = 1)]
    seed: u64,

    /// Disable progress bars
    #[arg(long)]
    quiet: bool,
}

fn main() {
    let args = Args::parse();
    init_logging();
    print_banner();

    if let Err(e) = run(args) {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> PhyResult<()> {
    let config = PhyConfig {
        sample_rate: args.sample_rate,
        sync_tolerance: args.sync_tolerance,
        ..PhyConfig::default()
    };
    match serde_json::to_string(&config) {
        Ok(json) => info!("PHY config: {}", json),
        Err(e) => warn!("Could not serialize config: {}", e),
    }

    let channel = ChannelModel::new(config.sample_rate)
        .with_cfo(args.cfo)
        .with_phase(args.phase)
        .with_noise(args.noise)
        .with_seed(args.seed);

    let (pipeline, ports) = Pipeline::loopback(&config, channel)?;
    let PipelinePorts {
        payload_tx,
        frames_rx,
    } = ports;

    // Ctrl+C raises the pipeline's own flag: source and TX stop, the rest drains
    let stop = pipeline.stop_flag();
    let handler_stop = stop.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        handler_stop.store(true, Ordering::SeqCst);
    }) {
        warn!("Failed to install Ctrl+C handler: {}", e);
    }

    let repeat = (args.count > 0).then_some(args.count);
    let period = Duration::from_millis(args.period_ms);
    let source = match args.payload {
        Some(text) => PeriodicSource::new(text.into_bytes(), period, repeat),
        None => PeriodicSource::sequenced(period, repeat),
    };
    let source_handle = thread::spawn(move || source.run(payload_tx, stop));

    let progress_manager = ProgressManager::new();
    if !args.quiet {
        create_link_bars(&progress_manager, repeat);
    }

    let poll = Duration::from_millis(STOP_POLL_MS);
    let mut received = 0usize;
    loop {
        match frames_rx.recv_timeout(poll) {
            Ok(frame) => {
                received += 1;
                let text = TextProcessor::decode_lossy(&frame.payload);
                update_progress(&progress_manager, pipeline.frames_sent(), Some(text.as_ref()));
            }
            Err(RecvTimeoutError::Timeout) => {
                update_progress(&progress_manager, pipeline.frames_sent(), None);
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    let generated = source_handle.join().unwrap_or_else(|_| {
        warn!("Source thread panicked");
        0
    });
    let summary = pipeline.wait()?;
    progress_manager.finish_all();

    info!(
        "Session done: generated={}, sent={}, received={}, delivered={}",
        generated, summary.frames_sent, received, summary.frames_delivered
    );
    Ok(())
}
