use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::block::SampleBlock;
use crate::error::ConfigError;

/// A fixed-capacity pair of channels moving sample blocks between a producer
/// and the processing loop.
///
/// Filled blocks travel producer → consumer over the input channel; drained
/// blocks travel back over the return channel so the producer can refill
/// them instead of allocating.
#[derive(Debug)]
pub struct BufferPool {
    capacity: usize,
    input: (Sender<SampleBlock>, Receiver<SampleBlock>),
    returns: (Sender<SampleBlock>, Receiver<SampleBlock>),
}

impl BufferPool {
    pub fn new(capacity: usize) -> Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::InvalidPoolCapacity);
        }
        Ok(Self {
            capacity,
            input: bounded(capacity),
            returns: bounded(capacity),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Split into the producer-side and consumer-side endpoints.
    pub fn split(self) -> (ProducerEnd, ConsumerEnd) {
        let (input_tx, input_rx) = self.input;
        let (return_tx, return_rx) = self.returns;
        let producer = ProducerEnd {
            capacity: self.capacity,
            input: input_tx,
            recycled: return_rx,
        };
        let consumer = ConsumerEnd {
            input: input_rx,
            recycle: return_tx,
            dropped: Arc::new(AtomicU64::new(0)),
        };
        (producer, consumer)
    }
}

/// Producer side: submits filled blocks and takes back recycled ones.
#[derive(Debug, Clone)]
pub struct ProducerEnd {
    capacity: usize,
    input: Sender<SampleBlock>,
    recycled: Receiver<SampleBlock>,
}

impl ProducerEnd {
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Non-blocking submit. On `Full` or `Disconnected` the block is handed
    /// back inside the error.
    pub fn try_submit(&self, block: SampleBlock) -> Result<(), TrySendError<SampleBlock>> {
        self.input.try_send(block)
    }

    /// Take a recycled block if one is waiting.
    pub fn try_reclaim(&self) -> Option<SampleBlock> {
        self.recycled.try_recv().ok()
    }

    pub fn reclaim_timeout(&self, timeout: Duration) -> Option<SampleBlock> {
        self.recycled.recv_timeout(timeout).ok()
    }

    /// Blocks currently queued for the consumer.
    pub fn pending(&self) -> usize {
        self.input.len()
    }
}

/// Consumer side, held by the processing loop.
#[derive(Debug, Clone)]
pub struct ConsumerEnd {
    input: Receiver<SampleBlock>,
    recycle: Sender<SampleBlock>,
    dropped: Arc<AtomicU64>,
}

impl ConsumerEnd {
    /// Wait at most `timeout` for the next filled block.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<SampleBlock, RecvTimeoutError> {
        self.input.recv_timeout(timeout)
    }

    /// Raw receiver, for use inside `select!`.
    pub(crate) fn input(&self) -> &Receiver<SampleBlock> {
        &self.input
    }

    /// Hand a drained block back to the producer without blocking.
    ///
    /// Returns `false` if the return channel is full or the producer is gone;
    /// the block is then dropped and counted. Recycling is lossy: a producer
    /// that relies only on returned blocks can run dry, which shows up in
    /// [`ConsumerEnd::dropped_returns`].
    pub fn try_recycle(&self, block: SampleBlock) -> bool {
        match self.recycle.try_send(block) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                // Log the first drop and then every 100th to keep the loop quiet.
                if dropped == 1 || dropped % 100 == 0 {
                    log::warn!("Return queue full, dropped recycled block (total dropped: {})", dropped);
                }
                false
            }
        }
    }

    pub fn dropped_returns(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn zero_capacity_is_rejected() {
        assert_eq!(BufferPool::new(0).unwrap_err(), ConfigError::InvalidPoolCapacity);
    }

    #[test]
    fn blocks_arrive_in_submit_order() {
        let (producer, consumer) = BufferPool::new(4).unwrap().split();
        for i in 0..3 {
            let block = SampleBlock::from_parts(vec![i as f32; 2], vec![0.0; 2]).unwrap();
            producer.try_submit(block).unwrap();
        }
        assert_eq!(producer.pending(), 3);
        for i in 0..3 {
            let block = consumer.recv_timeout(Duration::from_millis(10)).unwrap();
            assert_eq!(block.re()[0], i as f32);
        }
    }

    #[test]
    fn submit_to_full_input_returns_block() {
        let (producer, _consumer) = BufferPool::new(1).unwrap().split();
        producer.try_submit(SampleBlock::new(4)).unwrap();
        match producer.try_submit(SampleBlock::new(4)) {
            Err(TrySendError::Full(block)) => assert_eq!(block.len(), 4),
            other => panic!("expected Full, got {:?}", other),
        }
    }

    #[test]
    fn recv_times_out_when_empty() {
        let (_producer, consumer) = BufferPool::new(2).unwrap().split();
        let start = Instant::now();
        let result = consumer.recv_timeout(Duration::from_millis(20));
        assert_eq!(result.unwrap_err(), RecvTimeoutError::Timeout);
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn recycle_into_full_channel_drops_without_blocking() {
        let (producer, consumer) = BufferPool::new(2).unwrap().split();
        assert!(consumer.try_recycle(SampleBlock::new(4)));
        assert!(consumer.try_recycle(SampleBlock::new(4)));

        let start = Instant::now();
        assert!(!consumer.try_recycle(SampleBlock::new(4)));
        assert!(!consumer.try_recycle(SampleBlock::new(4)));
        assert!(start.elapsed() < Duration::from_millis(50));
        assert_eq!(consumer.dropped_returns(), 2);

        assert!(producer.try_reclaim().is_some());
        assert!(producer.try_reclaim().is_some());
        assert!(producer.try_reclaim().is_none());
    }

    #[test]
    fn recycle_after_producer_gone_is_dropped() {
        let (producer, consumer) = BufferPool::new(2).unwrap().split();
        drop(producer);
        assert!(!consumer.try_recycle(SampleBlock::new(4)));
        assert_eq!(consumer.dropped_returns(), 1);
    }

    #[test]
    fn dropped_counter_is_shared_between_clones() {
        let (_producer, consumer) = BufferPool::new(1).unwrap().split();
        let clone = consumer.clone();
        assert!(consumer.try_recycle(SampleBlock::new(1)));
        assert!(!clone.try_recycle(SampleBlock::new(1)));
        assert_eq!(consumer.dropped_returns(), 1);
    }
}
