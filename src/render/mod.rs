//! Hand-off of finished spectra to a drawing surface.
//!
//! The processing loop never draws itself. Each frame it locks the shared
//! [`RenderTarget`], draws through a [`SurfaceLock`] and releases the
//! surface again, whatever happens in between.

pub mod console;

use anyhow::Result;
use std::sync::{Arc, Mutex, PoisonError};

pub use console::ConsoleRenderer;

/// A finished frame plus the metadata needed to label it.
#[derive(Clone, Copy, Debug)]
pub struct SpectrumFrame<'a> {
    /// Recentred log-power values, one per bin; DC sits at `len / 2`.
    pub magnitudes: &'a [f32],
    pub sample_rate: u32,
    pub center_frequency: i64,
    pub frame_rate: u32,
    /// Load of the previous frame, 0.0 to 1.0.
    pub load: f64,
}

impl SpectrumFrame<'_> {
    pub fn fft_size(&self) -> usize {
        self.magnitudes.len()
    }

    /// Absolute frequency in Hz of recentred bin `index`.
    pub fn bin_frequency(&self, index: usize) -> f64 {
        bin_frequency(index, self.fft_size(), self.sample_rate, self.center_frequency)
    }

    /// Index and value of the strongest bin.
    pub fn peak(&self) -> Option<(usize, f32)> {
        self.magnitudes
            .iter()
            .copied()
            .enumerate()
            .fold(None, |best, (i, v)| match best {
                Some((_, b)) if b >= v => best,
                _ => Some((i, v)),
            })
    }
}

/// Map a recentred bin index to an absolute frequency in Hz.
pub fn bin_frequency(index: usize, fft_size: usize, sample_rate: u32, center_frequency: i64) -> f64 {
    if fft_size == 0 {
        return center_frequency as f64;
    }
    let offset_bins = index as f64 - (fft_size / 2) as f64;
    center_frequency as f64 + offset_bins * sample_rate as f64 / fft_size as f64
}

/// A drawing surface the processing loop can hand frames to.
pub trait RenderTarget: Send {
    /// Acquire the surface for one frame. Returning `false` means the
    /// surface is unavailable right now and the frame is skipped.
    fn lock(&mut self) -> bool;

    /// Draw one frame. An error stops the processing loop.
    fn draw(&mut self, frame: &SpectrumFrame<'_>) -> Result<()>;

    /// Release the surface and present what was drawn. Called exactly once
    /// after every successful `lock`.
    fn unlock_and_post(&mut self);
}

pub type SharedRenderTarget = Arc<Mutex<Box<dyn RenderTarget>>>;

/// Wrap a render target for sharing between the controller and the loop.
pub fn shared<R: RenderTarget + 'static>(target: R) -> SharedRenderTarget {
    Arc::new(Mutex::new(Box::new(target)))
}

/// Scoped acquisition of a render target; released on drop.
pub struct SurfaceLock<'a, R: RenderTarget + ?Sized> {
    target: &'a mut R,
}

impl<'a, R: RenderTarget + ?Sized> SurfaceLock<'a, R> {
    pub fn acquire(target: &'a mut R) -> Option<Self> {
        if target.lock() {
            Some(Self { target })
        } else {
            None
        }
    }

    pub fn draw(&mut self, frame: &SpectrumFrame<'_>) -> Result<()> {
        self.target.draw(frame)
    }
}

impl<R: RenderTarget + ?Sized> Drop for SurfaceLock<'_, R> {
    fn drop(&mut self) {
        self.target.unlock_and_post();
    }
}

/// Draw `frame` on the shared target. `Ok(false)` when the surface was not
/// available this frame.
///
/// A target whose lock was poisoned by a panicking `draw` is reused: the
/// surface was already released by the unwinding [`SurfaceLock`].
pub fn draw_frame(target: &Mutex<Box<dyn RenderTarget>>, frame: &SpectrumFrame<'_>) -> Result<bool> {
    let mut guard = target.lock().unwrap_or_else(|poisoned| {
        log::warn!("Render target recovered after a panic in an earlier draw");
        target.clear_poison();
        PoisonError::into_inner(poisoned)
    });
    let Some(mut surface) = SurfaceLock::acquire(&mut **guard) else {
        return Ok(false);
    };
    surface.draw(frame)?;
    Ok(true)
}
