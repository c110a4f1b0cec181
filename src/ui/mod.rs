pub mod progress;

use progress::{ProgressManager, templates};

pub const SENT_BAR: &str = "sent";
pub const RECEIVED_BAR: &str = "received";

pub fn print_banner() {
    println!("oqpsk-rs");
}

/// Bars for a loopback session. `expected` is the message count, `None`
/// for an endless source.
pub fn create_link_bars(progress_manager: &ProgressManager, expected: Option<usize>) {
    let (total, sent_template, received_template) = match expected {
        Some(n) => (n as u64, templates::SENDER, templates::RECEIVER),
        None => (0, templates::OPEN_ENDED, templates::OPEN_ENDED),
    };

    let _ = progress_manager.create_bar(SENT_BAR, total, sent_template, "sent");
    let _ = progress_manager.create_bar(RECEIVED_BAR, total, received_template, "received");
}

pub fn update_progress(
    progress_manager: &ProgressManager,
    frames_sent: usize,
    received_text: Option<&str>,
) {
    let _ = progress_manager.set_position(SENT_BAR, frames_sent as u64);
    if let Some(text) = received_text {
        let _ = progress_manager.inc(RECEIVED_BAR, 1);
        let _ = progress_manager.set_message(RECEIVED_BAR, text);
    }
}
