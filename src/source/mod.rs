//! Sample producers feeding the pipeline's input queue.
//!
//! Each source runs on its own thread, refills blocks recycled by the
//! pipeline where it can and submits without blocking. A full input queue
//! means the block is dropped, as a radio front end would drop samples.

pub mod tone;
pub mod wav;

use anyhow::Result;
use crossbeam_channel::TrySendError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::buffers::{ProducerEnd, SampleBlock};

pub use tone::ToneSource;
pub use wav::{decode_iq, IqRecording, WavIqSource};

/// Counters reported by a source thread when it exits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SourceReport {
    pub submitted: u64,
    pub dropped: u64,
    pub allocated: u64,
}

/// Running source thread.
#[derive(Debug)]
pub struct SourceHandle {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<SourceReport>>,
}

impl SourceHandle {
    pub(crate) fn new(stop: Arc<AtomicBool>, thread: JoinHandle<SourceReport>) -> Self {
        Self {
            stop,
            thread: Some(thread),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().map_or(true, |t| t.is_finished())
    }

    /// Signal the thread to stop and wait for its report.
    pub fn stop(mut self) -> Result<SourceReport> {
        self.stop.store(true, Ordering::SeqCst);
        self.join()
    }

    fn join(&mut self) -> Result<SourceReport> {
        match self.thread.take() {
            Some(thread) => thread
                .join()
                .map_err(|_panic| anyhow::anyhow!("source thread panicked")),
            None => Ok(SourceReport::default()),
        }
    }
}

impl Drop for SourceHandle {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Err(err) = self.join() {
            log::warn!("Source exited with error: {:#}", err);
        }
    }
}

pub(crate) enum Submitted {
    Sent,
    Dropped,
    Closed,
}

/// Shared producer-side bookkeeping: block reuse, submission and pacing.
pub(crate) struct Feeder {
    producer: ProducerEnd,
    report: SourceReport,
    next_deadline: Instant,
}

impl Feeder {
    pub(crate) fn new(producer: ProducerEnd) -> Self {
        Self {
            producer,
            report: SourceReport::default(),
            next_deadline: Instant::now(),
        }
    }

    /// Whether the consumer has room for another block right now.
    pub(crate) fn has_room(&self) -> bool {
        self.producer.pending() < self.producer.capacity()
    }

    /// A block of `len` samples, recycled when possible.
    pub(crate) fn block(&mut self, len: usize) -> SampleBlock {
        match self.producer.try_reclaim() {
            Some(mut block) => {
                if block.len() != len {
                    block.resize(len);
                }
                block
            }
            None => {
                self.report.allocated += 1;
                SampleBlock::new(len)
            }
        }
    }

    pub(crate) fn submit(&mut self, block: SampleBlock) -> Submitted {
        match self.producer.try_submit(block) {
            Ok(()) => {
                self.report.submitted += 1;
                Submitted::Sent
            }
            Err(TrySendError::Full(_)) => {
                self.report.dropped += 1;
                Submitted::Dropped
            }
            Err(TrySendError::Disconnected(_)) => Submitted::Closed,
        }
    }

    /// Record a block that was never generated because the queue was full.
    pub(crate) fn skip(&mut self) {
        self.report.dropped += 1;
    }

    /// Sleep until `block_duration` after the previous deadline, so the
    /// average rate matches the sample rate even when one wake-up is late.
    pub(crate) fn pace(&mut self, block_duration: Duration) {
        self.next_deadline += block_duration;
        let now = Instant::now();
        if self.next_deadline > now {
            std::thread::sleep(self.next_deadline - now);
        } else if now - self.next_deadline > block_duration * 16 {
            // Too far behind to catch up; resynchronise.
            self.next_deadline = now;
        }
    }

    pub(crate) fn report(&self) -> SourceReport {
        self.report
    }
}

/// Wall-clock length of `len` samples at `sample_rate`.
pub(crate) fn block_duration(len: usize, sample_rate: u32) -> Duration {
    if sample_rate == 0 {
        return Duration::from_millis(1);
    }
    Duration::from_secs_f64(len as f64 / sample_rate as f64)
}
