//! Real-time I/Q spectrum pipeline.
//!
//! A producer fills [`buffers::SampleBlock`]s and submits them to a bounded
//! input queue. The [`pipeline::SpectrumPipeline`] runs one processing thread
//! that, once per frame, takes a block, turns it into a recentred
//! log-magnitude spectrum, returns the block for reuse and hands the
//! spectrum to a [`render::RenderTarget`].

pub mod buffers;
pub mod dsp;
pub mod error;
pub mod pipeline;
pub mod render;
pub mod source;

pub use buffers::{BufferPool, SampleBlock};
pub use error::{ConfigError, PipelineError};
pub use pipeline::{PipelineSettings, RunState, SpectrumPipeline, StopReason};
