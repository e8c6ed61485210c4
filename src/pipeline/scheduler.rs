use crossbeam_channel::{select, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::settings::{PipelineSettings, SharedSettings};
use super::state::{SharedState, StopReason};
use crate::buffers::{ConsumerEnd, SampleBlock};
use crate::dsp::SpectrumProcessor;
use crate::error::PipelineError;
use crate::render::{draw_frame, SharedRenderTarget, SpectrumFrame};

enum FrameOutcome {
    Continue,
    Stop(StopReason),
}

/// Forces the run state back to Stopped however the loop exits, including
/// by panic.
struct ExitGuard {
    state: Arc<SharedState>,
    reason: Option<StopReason>,
}

impl Drop for ExitGuard {
    fn drop(&mut self) {
        let reason = self.reason.unwrap_or(StopReason::Panicked);
        if reason == StopReason::Panicked {
            log::error!("Processing loop panicked");
        }
        self.state.set_stop_reason(reason);
        self.state.mark_stopped();
        log::info!("Processing loop stopped ({:?})", reason);
    }
}

/// The frame-paced processing loop. Runs on its own thread; it is the only
/// reader of the input queue and the only writer of the return queue.
pub(crate) struct FrameScheduler {
    pub(crate) settings: Arc<SharedSettings>,
    pub(crate) state: Arc<SharedState>,
    pub(crate) consumer: ConsumerEnd,
    pub(crate) renderer: SharedRenderTarget,
    pub(crate) stop_rx: Receiver<()>,
    pub(crate) processor: SpectrumProcessor,
    pub(crate) spectrum: Vec<f32>,
}

impl FrameScheduler {
    pub(crate) fn run(mut self) {
        let mut guard = ExitGuard {
            state: Arc::clone(&self.state),
            reason: None,
        };
        log::info!(
            "Processing loop started (fft_size={}, frame_rate={})",
            self.processor.size(),
            self.settings.frame_rate()
        );

        let reason = loop {
            if let FrameOutcome::Stop(reason) = self.run_frame() {
                break reason;
            }
        };
        guard.reason = Some(reason);
    }

    fn run_frame(&mut self) -> FrameOutcome {
        let frame_start = Instant::now();
        let current = self.settings.snapshot();
        self.apply_fft_size(current.fft_size);
        let period = current.frame_period();
        let deadline = frame_start + period;

        // Blocks left over from an earlier transform size are discarded
        // without costing a frame; the wait stays bounded by this frame's
        // deadline.
        loop {
            let mut block = match self.next_block(deadline, period) {
                Ok(block) => block,
                Err(reason) => return FrameOutcome::Stop(reason),
            };
            let processed = self.processor.process_into(&mut block, &mut self.spectrum);
            self.consumer.try_recycle(block);

            match processed {
                Ok(()) => break,
                Err(PipelineError::BlockSizeMismatch { expected, actual }) => {
                    log::warn!("Discarding block of {} samples (transform size {})", actual, expected);
                    self.state.stats.size_mismatch();
                }
                Err(err) => {
                    log::error!("Signal processing failed: {}. stop.", err);
                    return FrameOutcome::Stop(StopReason::ProcessingFailed);
                }
            }
        }
        self.state.stats.frame_processed();

        if let FrameOutcome::Stop(reason) = self.render(&current) {
            return FrameOutcome::Stop(reason);
        }

        self.pace(frame_start, period)
    }

    /// Wait for the next input block until `deadline`.
    fn next_block(&self, deadline: Instant, period: Duration) -> Result<SampleBlock, StopReason> {
        let timeout = deadline.saturating_duration_since(Instant::now());
        select! {
            recv(self.consumer.input()) -> msg => msg.map_err(|_| {
                log::error!("Input queue closed by producer. stop.");
                StopReason::InputClosed
            }),
            recv(self.stop_rx) -> _ => {
                log::info!("Stop requested while waiting on input data");
                Err(StopReason::Requested)
            },
            default(timeout) => {
                log::error!("Timeout while waiting on input data ({:?}). stop.", period);
                Err(StopReason::Starved)
            },
        }
    }

    /// Reallocate the transform when the configured size changed since the
    /// last frame.
    fn apply_fft_size(&mut self, fft_size: usize) {
        if fft_size == self.processor.size() {
            return;
        }
        match self.processor.resize(fft_size) {
            Ok(()) => log::info!("Transform size changed to {}", fft_size),
            Err(err) => log::error!("Keeping transform size {}: {}", self.processor.size(), err),
        }
    }

    fn render(&self, current: &PipelineSettings) -> FrameOutcome {
        let frame = SpectrumFrame {
            magnitudes: &self.spectrum,
            sample_rate: current.sample_rate,
            center_frequency: current.center_frequency,
            frame_rate: current.frame_rate,
            load: self.state.load(),
        };
        match draw_frame(&self.renderer, &frame) {
            Ok(true) => {
                self.state.stats.frame_rendered();
                FrameOutcome::Continue
            }
            Ok(false) => {
                log::debug!("Render target unavailable, frame skipped");
                self.state.stats.render_skipped();
                FrameOutcome::Continue
            }
            Err(err) => {
                log::error!("Error while drawing frame: {:#}. stop.", err);
                FrameOutcome::Stop(StopReason::RenderFailed)
            }
        }
    }

    /// Update the load figure and sleep out the rest of the frame. The sleep
    /// ends early on a stop request.
    fn pace(&self, frame_start: Instant, period: Duration) -> FrameOutcome {
        let elapsed = frame_start.elapsed();
        if elapsed >= period {
            log::warn!("Couldn't meet requested frame rate ({:?} >= {:?})", elapsed, period);
            self.state.set_load(1.0);
            self.state.stats.deadline_missed();
            return FrameOutcome::Continue;
        }

        let load = elapsed.as_secs_f64() / period.as_secs_f64();
        self.state.set_load(load);
        let remaining = period - elapsed;
        log::debug!("Load: {:.3}; sleep for {:?}", load, remaining);

        match self.stop_rx.recv_timeout(remaining) {
            Err(RecvTimeoutError::Timeout) => FrameOutcome::Continue,
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                log::info!("Stop requested during frame pacing");
                FrameOutcome::Stop(StopReason::Requested)
            }
        }
    }
}
