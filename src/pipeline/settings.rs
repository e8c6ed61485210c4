use std::sync::atomic::{AtomicI64, AtomicU32, AtomicUsize, Ordering};
use std::time::Duration;

use crate::dsp::{validate_fft_size, WindowFunction};
use crate::error::ConfigError;

/// Target duration of one frame at `frame_rate` frames per second.
pub fn frame_period(frame_rate: u32) -> Duration {
    Duration::from_secs(1) / frame_rate.max(1)
}

fn validate_frame_rate(frame_rate: u32) -> Result<u32, ConfigError> {
    if frame_rate == 0 {
        Err(ConfigError::InvalidFrameRate(frame_rate))
    } else {
        Ok(frame_rate)
    }
}

/// Validated pipeline parameters. Also used as the per-frame snapshot the
/// processing loop works from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PipelineSettings {
    /// Transform size N, a power of two.
    pub fft_size: usize,
    /// Sample rate of the incoming I/Q stream, in Hz.
    pub sample_rate: u32,
    /// Frequency the samples are centred on, in Hz.
    pub center_frequency: i64,
    /// Frames per second.
    pub frame_rate: u32,
    pub window: WindowFunction,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            fft_size: 1024,
            sample_rate: 0,
            center_frequency: 0,
            frame_rate: 1,
            window: WindowFunction::default(),
        }
    }
}

impl PipelineSettings {
    pub fn new(
        fft_size: usize,
        sample_rate: u32,
        center_frequency: i64,
        frame_rate: u32,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            fft_size: validate_fft_size(fft_size)?,
            sample_rate,
            center_frequency,
            frame_rate: validate_frame_rate(frame_rate)?,
            window: WindowFunction::default(),
        })
    }

    pub fn with_window(mut self, window: WindowFunction) -> Self {
        self.window = window;
        self
    }

    pub fn frame_period(&self) -> Duration {
        frame_period(self.frame_rate)
    }
}

/// Run-time configuration shared between the controlling thread and the
/// processing loop.
///
/// Every field is an independent atomic; the loop reads a whole
/// [`PipelineSettings`] snapshot once per frame. Display parameters may be
/// mixed across two updates within one snapshot. The transform size is only
/// applied by the loop between frames.
#[derive(Debug)]
pub struct SharedSettings {
    fft_size: AtomicUsize,
    sample_rate: AtomicU32,
    center_frequency: AtomicI64,
    frame_rate: AtomicU32,
    window: WindowFunction,
}

impl SharedSettings {
    pub fn new(settings: PipelineSettings) -> Self {
        Self {
            fft_size: AtomicUsize::new(settings.fft_size),
            sample_rate: AtomicU32::new(settings.sample_rate),
            center_frequency: AtomicI64::new(settings.center_frequency),
            frame_rate: AtomicU32::new(settings.frame_rate),
            window: settings.window,
        }
    }

    pub fn snapshot(&self) -> PipelineSettings {
        PipelineSettings {
            fft_size: self.fft_size(),
            sample_rate: self.sample_rate(),
            center_frequency: self.center_frequency(),
            frame_rate: self.frame_rate(),
            window: self.window,
        }
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size.load(Ordering::Acquire)
    }

    pub fn set_fft_size(&self, fft_size: usize) -> Result<(), ConfigError> {
        let fft_size = validate_fft_size(fft_size)?;
        self.fft_size.store(fft_size, Ordering::Release);
        Ok(())
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate.load(Ordering::Relaxed)
    }

    pub fn set_sample_rate(&self, sample_rate: u32) {
        self.sample_rate.store(sample_rate, Ordering::Relaxed);
    }

    pub fn center_frequency(&self) -> i64 {
        self.center_frequency.load(Ordering::Relaxed)
    }

    pub fn set_center_frequency(&self, center_frequency: i64) {
        self.center_frequency.store(center_frequency, Ordering::Relaxed);
    }

    pub fn frame_rate(&self) -> u32 {
        self.frame_rate.load(Ordering::Relaxed)
    }

    pub fn set_frame_rate(&self, frame_rate: u32) -> Result<(), ConfigError> {
        let frame_rate = validate_frame_rate(frame_rate)?;
        self.frame_rate.store(frame_rate, Ordering::Relaxed);
        Ok(())
    }

    pub fn window(&self) -> WindowFunction {
        self.window
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_period_follows_rate() {
        assert_eq!(frame_period(1), Duration::from_secs(1));
        assert_eq!(frame_period(20), Duration::from_millis(50));
        assert_eq!(frame_period(0), Duration::from_secs(1));
    }

    #[test]
    fn new_validates_inputs() {
        assert!(PipelineSettings::new(1024, 2_000_000, 100_000_000, 30).is_ok());
        assert_eq!(
            PipelineSettings::new(1000, 2_000_000, 0, 30),
            Err(ConfigError::InvalidFftSize(1000))
        );
        assert_eq!(
            PipelineSettings::new(1024, 2_000_000, 0, 0),
            Err(ConfigError::InvalidFrameRate(0))
        );
    }

    #[test]
    fn rejected_updates_leave_previous_values() {
        let shared = SharedSettings::new(PipelineSettings::default());
        assert_eq!(shared.set_fft_size(1000), Err(ConfigError::InvalidFftSize(1000)));
        assert_eq!(shared.fft_size(), 1024);
        assert_eq!(shared.set_frame_rate(0), Err(ConfigError::InvalidFrameRate(0)));
        assert_eq!(shared.frame_rate(), 1);
    }

    #[test]
    fn snapshot_reflects_updates() {
        let shared = SharedSettings::new(PipelineSettings::default().with_window(WindowFunction::Hann));
        shared.set_fft_size(4096).unwrap();
        shared.set_sample_rate(2_400_000);
        shared.set_center_frequency(-250_000);
        shared.set_frame_rate(25).unwrap();

        let snap = shared.snapshot();
        assert_eq!(snap.fft_size, 4096);
        assert_eq!(snap.sample_rate, 2_400_000);
        assert_eq!(snap.center_frequency, -250_000);
        assert_eq!(snap.frame_rate, 25);
        assert_eq!(snap.window, WindowFunction::Hann);
        assert_eq!(snap.frame_period(), Duration::from_millis(40));
    }
}
