/// Control plane and loopback plumbing around the PHY
pub mod channel;
pub mod pipeline;
pub mod source;
pub mod text_processor;

pub use channel::ChannelModel;
pub use pipeline::{Pipeline, PipelinePorts, PipelineSummary};
pub use source::PeriodicSource;
pub use text_processor::TextProcessor;
