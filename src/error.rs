use thiserror::Error;

/// Rejected configuration values. Returned synchronously by every mutator;
/// the previous value stays active.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    #[error("FFT size must be a power of two >= 2, got {0}")]
    InvalidFftSize(usize),

    #[error("frame rate must be positive, got {0}")]
    InvalidFrameRate(u32),

    #[error("buffer pool capacity must be positive")]
    InvalidPoolCapacity,
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("processing loop is already running")]
    AlreadyRunning,

    #[error("sample block has {actual} samples, transform size is {expected}")]
    BlockSizeMismatch { expected: usize, actual: usize },

    #[error("failed to spawn processing thread: {0}")]
    Spawn(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
