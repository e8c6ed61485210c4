use super::fft::{validate_fft_size, FftEngine};
use super::window::{apply_window, WindowFunction};
use crate::buffers::SampleBlock;
use crate::error::{ConfigError, PipelineError};

/// Lower bound on the normalised power before taking the logarithm, so an
/// empty bin reads ln(1e-20) ≈ -46.05 instead of negative infinity.
pub const MIN_POWER: f32 = 1e-20;

/// Destination of source bin `i` once the spectrum is recentred, putting the
/// zero-frequency bin in the middle of the output.
#[inline]
pub fn recentre_index(i: usize, size: usize) -> usize {
    (i + size / 2) % size
}

/// Turns sample blocks into log-magnitude spectra.
///
/// Holds the window coefficients and FFT plan for one transform size; both
/// are rebuilt by [`SpectrumProcessor::resize`].
#[derive(Debug)]
pub struct SpectrumProcessor {
    window_fn: WindowFunction,
    window: Vec<f32>,
    engine: FftEngine,
}

impl SpectrumProcessor {
    pub fn new(size: usize, window_fn: WindowFunction) -> Result<Self, ConfigError> {
        let engine = FftEngine::new(size)?;
        Ok(Self {
            window_fn,
            window: window_fn.coefficients(size),
            engine,
        })
    }

    pub fn size(&self) -> usize {
        self.engine.size()
    }

    pub fn window_function(&self) -> WindowFunction {
        self.window_fn
    }

    /// Switch to a new transform size. An invalid size leaves the current
    /// state untouched.
    pub fn resize(&mut self, size: usize) -> Result<(), ConfigError> {
        let size = validate_fft_size(size)?;
        if size == self.size() {
            return Ok(());
        }
        self.engine = FftEngine::new(size)?;
        self.window = self.window_fn.coefficients(size);
        Ok(())
    }

    /// Window, transform and log-scale `block`, writing the recentred result
    /// into `out` (resized to the transform size).
    ///
    /// The block's samples are overwritten with the transform output.
    pub fn process_into(&mut self, block: &mut SampleBlock, out: &mut Vec<f32>) -> Result<(), PipelineError> {
        let n = self.size();
        if block.len() != n {
            return Err(PipelineError::BlockSizeMismatch {
                expected: n,
                actual: block.len(),
            });
        }

        let (re, im) = block.parts_mut();
        apply_window(&self.window, re, im);
        self.engine.forward(re, im)?;

        out.resize(n, 0.0);
        let scale = n as f32;
        for i in 0..n {
            let r = re[i] / scale;
            let q = im[i] / scale;
            out[recentre_index(i, n)] = (r * r + q * q).max(MIN_POWER).ln();
        }
        Ok(())
    }

    /// Convenience wrapper around [`SpectrumProcessor::process_into`] that
    /// allocates the output.
    pub fn process(&mut self, block: &mut SampleBlock) -> Result<Vec<f32>, PipelineError> {
        let mut out = Vec::with_capacity(self.size());
        self.process_into(block, &mut out)?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn cosine_block(size: usize, bin: usize) -> SampleBlock {
        let re = (0..size)
            .map(|i| (2.0 * PI * bin as f32 * i as f32 / size as f32).cos())
            .collect();
        SampleBlock::from_parts(re, vec![0.0; size]).unwrap()
    }

    fn argmax(values: &[f32], skip: Option<usize>) -> usize {
        values
            .iter()
            .enumerate()
            .filter(|(i, _)| Some(*i) != skip)
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .map(|(i, _)| i)
            .unwrap()
    }

    #[test]
    fn output_length_matches_transform_size() {
        let mut size = 2;
        while size <= 4096 {
            let mut processor = SpectrumProcessor::new(size, WindowFunction::Blackman).unwrap();
            let mut block = cosine_block(size, 1);
            let mag = processor.process(&mut block).unwrap();
            assert_eq!(mag.len(), size);
            assert!(mag.iter().all(|v| v.is_finite()));
            size *= 2;
        }
    }

    #[test]
    fn non_power_of_two_resize_keeps_previous_size() {
        let mut processor = SpectrumProcessor::new(1024, WindowFunction::Hann).unwrap();
        assert_eq!(processor.resize(1000), Err(ConfigError::InvalidFftSize(1000)));
        assert_eq!(processor.size(), 1024);

        let mut block = cosine_block(1024, 10);
        assert_eq!(processor.process(&mut block).unwrap().len(), 1024);
    }

    #[test]
    fn resize_rebuilds_state() {
        let mut processor = SpectrumProcessor::new(64, WindowFunction::Blackman).unwrap();
        processor.resize(256).unwrap();
        assert_eq!(processor.size(), 256);
        let mut block = cosine_block(256, 3);
        assert_eq!(processor.process(&mut block).unwrap().len(), 256);
    }

    #[test]
    fn recentring_twice_is_identity() {
        for n in [2usize, 8, 1024] {
            let values: Vec<usize> = (0..n).collect();
            let mut once = vec![0; n];
            for i in 0..n {
                once[recentre_index(i, n)] = values[i];
            }
            let mut twice = vec![0; n];
            for i in 0..n {
                twice[recentre_index(i, n)] = once[i];
            }
            assert_eq!(twice, values);

            let mut sorted = once.clone();
            sorted.sort_unstable();
            assert_eq!(sorted, values);
        }
    }

    #[test]
    fn cosine_peaks_at_its_bin_and_mirror() {
        let n = 256;
        let k = 20;
        let mut processor = SpectrumProcessor::new(n, WindowFunction::Blackman).unwrap();
        let mut block = cosine_block(n, k);
        let mag = processor.process(&mut block).unwrap();

        let positive = recentre_index(k, n);
        let negative = recentre_index(n - k, n);
        let first = argmax(&mag, None);
        let second = argmax(&mag, Some(first));
        let mut peaks = [first, second];
        peaks.sort_unstable();
        let mut expected = [positive, negative];
        expected.sort_unstable();
        assert_eq!(peaks, expected);
        assert!((mag[positive] - mag[negative]).abs() < 1e-3);
    }

    #[test]
    fn dc_lands_in_the_middle() {
        let n = 64;
        let mut processor = SpectrumProcessor::new(n, WindowFunction::Rectangular).unwrap();
        let mut block = SampleBlock::from_parts(vec![1.0; n], vec![0.0; n]).unwrap();
        let mag = processor.process(&mut block).unwrap();
        // Full-scale DC normalises to power 1, i.e. ln(1) = 0.
        assert!(mag[n / 2].abs() < 1e-4);
        assert_eq!(argmax(&mag, None), n / 2);
    }

    #[test]
    fn zero_input_hits_the_floor() {
        let n = 32;
        let mut processor = SpectrumProcessor::new(n, WindowFunction::Blackman).unwrap();
        let mut block = SampleBlock::new(n);
        let mag = processor.process(&mut block).unwrap();
        let floor = MIN_POWER.ln();
        assert!(mag.iter().all(|&v| (v - floor).abs() < 1e-3));
        assert!(mag.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn mismatched_block_is_rejected() {
        let mut processor = SpectrumProcessor::new(64, WindowFunction::Blackman).unwrap();
        let mut block = SampleBlock::new(32);
        let mut out = Vec::new();
        let err = processor.process_into(&mut block, &mut out).unwrap_err();
        assert!(matches!(err, PipelineError::BlockSizeMismatch { expected: 64, actual: 32 }));
        assert!(out.is_empty());
    }

    #[test]
    fn process_into_reuses_output_buffer() {
        let mut processor = SpectrumProcessor::new(128, WindowFunction::Hann).unwrap();
        let mut out = Vec::with_capacity(128);
        let ptr = out.as_ptr();
        for _ in 0..3 {
            let mut block = cosine_block(128, 5);
            processor.process_into(&mut block, &mut out).unwrap();
        }
        assert_eq!(out.len(), 128);
        assert_eq!(out.as_ptr(), ptr);
    }
}
