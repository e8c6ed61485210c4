//! Sample blocks and the bounded channels that move them between the
//! producer and the processing loop.

pub mod block;
pub mod pool;

pub use block::SampleBlock;
pub use pool::{BufferPool, ConsumerEnd, ProducerEnd};
