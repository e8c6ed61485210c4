use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

use crate::error::{ConfigError, PipelineError};

/// Check that `size` is usable as a transform size.
pub fn validate_fft_size(size: usize) -> Result<usize, ConfigError> {
    if size >= 2 && size.is_power_of_two() {
        Ok(size)
    } else {
        Err(ConfigError::InvalidFftSize(size))
    }
}

/// Forward complex FFT over split real/imaginary arrays.
///
/// The plan, the interleaved work buffer and the scratch space are allocated
/// once per size, so `forward` does not allocate.
pub struct FftEngine {
    size: usize,
    fft: Arc<dyn Fft<f32>>,
    buffer: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
}

impl std::fmt::Debug for FftEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FftEngine").field("size", &self.size).finish()
    }
}

impl FftEngine {
    pub fn new(size: usize) -> Result<Self, ConfigError> {
        let size = validate_fft_size(size)?;
        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(size);
        let scratch = vec![Complex::new(0.0, 0.0); fft.get_inplace_scratch_len()];
        Ok(Self {
            size,
            fft,
            buffer: vec![Complex::new(0.0, 0.0); size],
            scratch,
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Transform `re` + j·`im` in place. Output is unnormalised.
    pub fn forward(&mut self, re: &mut [f32], im: &mut [f32]) -> Result<(), PipelineError> {
        if re.len() != self.size || im.len() != self.size {
            return Err(PipelineError::BlockSizeMismatch {
                expected: self.size,
                actual: re.len().max(im.len()),
            });
        }

        for ((c, &r), &i) in self.buffer.iter_mut().zip(re.iter()).zip(im.iter()) {
            *c = Complex::new(r, i);
        }
        self.fft.process_with_scratch(&mut self.buffer, &mut self.scratch);
        for ((c, r), i) in self.buffer.iter().zip(re.iter_mut()).zip(im.iter_mut()) {
            *r = c.re;
            *i = c.im;
        }
        Ok(())
    }
}
