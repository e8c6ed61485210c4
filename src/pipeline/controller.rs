use crossbeam_channel::{bounded, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use super::scheduler::FrameScheduler;
use super::settings::{PipelineSettings, SharedSettings};
use super::state::{RunState, SharedState, StatsSnapshot, StopReason};
use crate::buffers::ConsumerEnd;
use crate::dsp::SpectrumProcessor;
use crate::error::{ConfigError, PipelineError, Result};
use crate::render::SharedRenderTarget;

/// Owns the processing thread and exposes run state, load and
/// configuration to the rest of the application.
///
/// At most one processing loop runs at a time. The loop stops on
/// [`SpectrumPipeline::stop`], when no samples arrive within one frame
/// period, or when the render target fails; in every case the pipeline can
/// be started again.
pub struct SpectrumPipeline {
    settings: Arc<SharedSettings>,
    state: Arc<SharedState>,
    consumer: ConsumerEnd,
    renderer: SharedRenderTarget,
    stop_tx: Option<Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

impl SpectrumPipeline {
    pub fn new(settings: PipelineSettings, consumer: ConsumerEnd, renderer: SharedRenderTarget) -> Self {
        Self {
            settings: Arc::new(SharedSettings::new(settings)),
            state: Arc::new(SharedState::default()),
            consumer,
            renderer,
            stop_tx: None,
            worker: None,
        }
    }

    /// Spawn the processing loop. Fails with [`PipelineError::AlreadyRunning`]
    /// if a loop is active.
    pub fn start(&mut self) -> Result<()> {
        if !self.state.try_begin() {
            return Err(PipelineError::AlreadyRunning);
        }
        // A loop that stopped on its own has already left its frame; reap it.
        self.join_worker();

        let current = self.settings.snapshot();
        let processor = match SpectrumProcessor::new(current.fft_size, current.window) {
            Ok(processor) => processor,
            Err(err) => {
                self.state.mark_stopped();
                return Err(err.into());
            }
        };

        let (stop_tx, stop_rx) = bounded(1);
        let scheduler = FrameScheduler {
            settings: Arc::clone(&self.settings),
            state: Arc::clone(&self.state),
            consumer: self.consumer.clone(),
            renderer: Arc::clone(&self.renderer),
            stop_rx,
            spectrum: Vec::with_capacity(processor.size()),
            processor,
        };

        self.state.clear_stop_reason();
        let spawned = thread::Builder::new()
            .name("spectrum-loop".into())
            .spawn(move || scheduler.run());
        match spawned {
            Ok(handle) => {
                self.stop_tx = Some(stop_tx);
                self.worker = Some(handle);
                Ok(())
            }
            Err(err) => {
                self.state.mark_stopped();
                Err(err.into())
            }
        }
    }

    /// Ask the loop to stop without waiting for it. The loop notices within
    /// one frame period, even while blocked on input or sleeping.
    pub fn request_stop(&mut self) {
        // Dropping the sender disconnects the stop channel, which wakes the
        // loop from either of its waits.
        self.stop_tx.take();
    }

    /// Stop the loop and wait for the thread to finish.
    pub fn stop(&mut self) {
        self.request_stop();
        self.join_worker();
    }

    fn join_worker(&mut self) {
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                log::error!("Processing thread terminated by panic");
            }
        }
    }

    pub fn run_state(&self) -> RunState {
        self.state.run_state()
    }

    pub fn is_running(&self) -> bool {
        self.run_state() == RunState::Running
    }

    /// Load of the most recent frame: processing plus render time divided by
    /// the frame period. Exactly 1.0 when the deadline was missed.
    pub fn load(&self) -> f64 {
        self.state.load()
    }

    /// Why the last run ended, or `None` if a run is active or none finished.
    pub fn last_stop_reason(&self) -> Option<StopReason> {
        self.state.stop_reason()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.state.stats.snapshot(self.consumer.dropped_returns())
    }

    pub fn settings(&self) -> PipelineSettings {
        self.settings.snapshot()
    }

    /// Live settings handle, for producers that follow the transform size
    /// and sample rate.
    pub fn shared_settings(&self) -> Arc<SharedSettings> {
        Arc::clone(&self.settings)
    }

    pub fn render_target(&self) -> &SharedRenderTarget {
        &self.renderer
    }

    pub fn fft_size(&self) -> usize {
        self.settings.fft_size()
    }

    /// Change the transform size. Safe while running: the loop switches
    /// between frames, never during a transform. Invalid sizes are rejected
    /// and the current size is kept.
    pub fn set_fft_size(&self, fft_size: usize) -> std::result::Result<(), ConfigError> {
        self.settings.set_fft_size(fft_size)
    }

    pub fn sample_rate(&self) -> u32 {
        self.settings.sample_rate()
    }

    pub fn set_sample_rate(&self, sample_rate: u32) {
        self.settings.set_sample_rate(sample_rate);
    }

    pub fn center_frequency(&self) -> i64 {
        self.settings.center_frequency()
    }

    pub fn set_center_frequency(&self, center_frequency: i64) {
        self.settings.set_center_frequency(center_frequency);
    }

    pub fn frame_rate(&self) -> u32 {
        self.settings.frame_rate()
    }

    pub fn set_frame_rate(&self, frame_rate: u32) -> std::result::Result<(), ConfigError> {
        self.settings.set_frame_rate(frame_rate)
    }
}

impl Drop for SpectrumPipeline {
    fn drop(&mut self) {
        self.stop();
    }
}
