//! The frame-paced processing loop and its controller.

pub mod controller;
pub(crate) mod scheduler;
pub mod settings;
pub mod state;

pub use controller::SpectrumPipeline;
pub use settings::{frame_period, PipelineSettings, SharedSettings};
pub use state::{RunState, StatsSnapshot, StopReason};
