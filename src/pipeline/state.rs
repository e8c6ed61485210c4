use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

/// Lifecycle of the processing loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    Stopped,
    Running,
}

/// Why the processing loop last exited.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    /// `stop` or `request_stop` was called.
    Requested,
    /// No sample block arrived within one frame period.
    Starved,
    /// Every producer handle was dropped.
    InputClosed,
    /// The render target returned an error.
    RenderFailed,
    /// The transform failed for a reason other than a size mismatch.
    ProcessingFailed,
    /// The processing thread panicked.
    Panicked,
}

impl StopReason {
    fn to_u8(self) -> u8 {
        match self {
            StopReason::Requested => 1,
            StopReason::Starved => 2,
            StopReason::InputClosed => 3,
            StopReason::RenderFailed => 4,
            StopReason::ProcessingFailed => 5,
            StopReason::Panicked => 6,
        }
    }

    fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(StopReason::Requested),
            2 => Some(StopReason::Starved),
            3 => Some(StopReason::InputClosed),
            4 => Some(StopReason::RenderFailed),
            5 => Some(StopReason::ProcessingFailed),
            6 => Some(StopReason::Panicked),
            _ => None,
        }
    }
}

const STOPPED: u8 = 0;
const RUNNING: u8 = 1;

/// Counters kept by the processing loop.
#[derive(Debug, Default)]
pub struct PipelineStats {
    frames_processed: AtomicU64,
    frames_rendered: AtomicU64,
    renders_skipped: AtomicU64,
    deadlines_missed: AtomicU64,
    size_mismatches: AtomicU64,
}

/// Point-in-time copy of [`PipelineStats`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub frames_processed: u64,
    pub frames_rendered: u64,
    pub renders_skipped: u64,
    pub deadlines_missed: u64,
    pub size_mismatches: u64,
    /// Recycled blocks dropped because the return queue was full.
    pub returns_dropped: u64,
}

impl PipelineStats {
    pub(crate) fn frame_processed(&self) {
        self.frames_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn frame_rendered(&self) {
        self.frames_rendered.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn render_skipped(&self) {
        self.renders_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn deadline_missed(&self) {
        self.deadlines_missed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn size_mismatch(&self) {
        self.size_mismatches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self, returns_dropped: u64) -> StatsSnapshot {
        StatsSnapshot {
            frames_processed: self.frames_processed.load(Ordering::Relaxed),
            frames_rendered: self.frames_rendered.load(Ordering::Relaxed),
            renders_skipped: self.renders_skipped.load(Ordering::Relaxed),
            deadlines_missed: self.deadlines_missed.load(Ordering::Relaxed),
            size_mismatches: self.size_mismatches.load(Ordering::Relaxed),
            returns_dropped,
        }
    }
}

/// State observable from outside the processing thread.
#[derive(Debug)]
pub(crate) struct SharedState {
    run_state: AtomicU8,
    load_bits: AtomicU64,
    stop_reason: AtomicU8,
    pub(crate) stats: PipelineStats,
}

impl Default for SharedState {
    fn default() -> Self {
        Self {
            run_state: AtomicU8::new(STOPPED),
            load_bits: AtomicU64::new(0f64.to_bits()),
            stop_reason: AtomicU8::new(0),
            stats: PipelineStats::default(),
        }
    }
}

impl SharedState {
    pub(crate) fn run_state(&self) -> RunState {
        match self.run_state.load(Ordering::Acquire) {
            RUNNING => RunState::Running,
            _ => RunState::Stopped,
        }
    }

    /// Claim the Stopped → Running transition. Fails if already running.
    pub(crate) fn try_begin(&self) -> bool {
        self.run_state
            .compare_exchange(STOPPED, RUNNING, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub(crate) fn mark_stopped(&self) {
        self.run_state.store(STOPPED, Ordering::Release);
    }

    pub(crate) fn load(&self) -> f64 {
        f64::from_bits(self.load_bits.load(Ordering::Relaxed))
    }

    pub(crate) fn set_load(&self, load: f64) {
        self.load_bits.store(load.clamp(0.0, 1.0).to_bits(), Ordering::Relaxed);
    }

    pub(crate) fn stop_reason(&self) -> Option<StopReason> {
        StopReason::from_u8(self.stop_reason.load(Ordering::Acquire))
    }

    pub(crate) fn set_stop_reason(&self, reason: StopReason) {
        self.stop_reason.store(reason.to_u8(), Ordering::Release);
    }

    pub(crate) fn clear_stop_reason(&self) {
        self.stop_reason.store(0, Ordering::Release);
    }
}
