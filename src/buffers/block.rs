/// One fixed-length chunk of I/Q samples.
///
/// The real and imaginary halves always have the same length. A block is
/// owned by exactly one party at a time and moves between the producer and
/// the processing loop through the pool's channels.
#[derive(Clone, Debug, PartialEq)]
pub struct SampleBlock {
    re: Vec<f32>,
    im: Vec<f32>,
}

impl SampleBlock {
    /// Zero-filled block of `len` samples.
    pub fn new(len: usize) -> Self {
        Self {
            re: vec![0.0; len],
            im: vec![0.0; len],
        }
    }

    /// Build a block from separate I and Q vectors. Returns `None` when the
    /// two halves differ in length.
    pub fn from_parts(re: Vec<f32>, im: Vec<f32>) -> Option<Self> {
        if re.len() != im.len() {
            return None;
        }
        Some(Self { re, im })
    }

    pub fn len(&self) -> usize {
        self.re.len()
    }

    pub fn is_empty(&self) -> bool {
        self.re.is_empty()
    }

    pub fn re(&self) -> &[f32] {
        &self.re
    }

    pub fn im(&self) -> &[f32] {
        &self.im
    }

    /// Both halves, mutably, for in-place processing.
    pub fn parts_mut(&mut self) -> (&mut [f32], &mut [f32]) {
        (&mut self.re, &mut self.im)
    }

    /// Change the block length, zeroing any newly exposed samples. Used by
    /// producers when a recycled block predates a transform-size change.
    pub fn resize(&mut self, len: usize) {
        self.re.resize(len, 0.0);
        self.im.resize(len, 0.0);
    }
}
