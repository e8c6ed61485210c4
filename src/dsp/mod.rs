pub mod fft;
pub mod spectrum;
pub mod window;

pub use fft::{validate_fft_size, FftEngine};
pub use spectrum::{recentre_index, SpectrumProcessor, MIN_POWER};
pub use window::WindowFunction;
