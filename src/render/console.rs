use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use std::f32::consts::LN_10;

use super::{RenderTarget, SpectrumFrame};

const SHADES: &[u8] = b" .:-=+*#%@";
const FLOOR_DB: f32 = -120.0;

/// Natural-log power to decibels.
pub fn to_db(ln_power: f32) -> f32 {
    ln_power * 10.0 / LN_10
}

/// Squeeze a spectrum into `columns` characters, one shade per column,
/// keeping the strongest bin of each column.
pub fn ascii_spectrum(magnitudes: &[f32], columns: usize) -> String {
    if magnitudes.is_empty() || columns == 0 {
        return String::new();
    }
    let columns = columns.min(magnitudes.len());
    (0..columns)
        .map(|c| {
            let start = c * magnitudes.len() / columns;
            let end = ((c + 1) * magnitudes.len() / columns).max(start + 1);
            let level = magnitudes[start..end]
                .iter()
                .copied()
                .fold(f32::NEG_INFINITY, f32::max);
            let db = to_db(level).clamp(FLOOR_DB, 0.0);
            let shade = ((db - FLOOR_DB) / -FLOOR_DB * (SHADES.len() - 1) as f32).round() as usize;
            SHADES[shade.min(SHADES.len() - 1)] as char
        })
        .collect()
}

/// Render target that keeps a single status line on the terminal: peak
/// frequency and level, loop load and a coarse text spectrum.
pub struct ConsoleRenderer {
    bar: ProgressBar,
    columns: usize,
    locked: bool,
}

impl ConsoleRenderer {
    pub fn new(columns: usize) -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        Self::with_bar(bar, columns)
    }

    /// A renderer that draws nowhere. Useful when stdout is not a terminal.
    pub fn hidden(columns: usize) -> Self {
        Self::with_bar(ProgressBar::hidden(), columns)
    }

    fn with_bar(bar: ProgressBar, columns: usize) -> Self {
        Self {
            bar,
            columns,
            locked: false,
        }
    }

    /// Handle to the status line, for clearing it once the pipeline is done.
    pub fn progress_bar(&self) -> ProgressBar {
        self.bar.clone()
    }
}

impl RenderTarget for ConsoleRenderer {
    fn lock(&mut self) -> bool {
        if self.bar.is_finished() {
            return false;
        }
        self.locked = true;
        true
    }

    fn draw(&mut self, frame: &SpectrumFrame<'_>) -> Result<()> {
        if !self.locked {
            anyhow::bail!("console surface drawn without lock");
        }
        let Some((peak_bin, peak_level)) = frame.peak() else {
            return Ok(());
        };
        self.bar.set_message(format!(
            "peak {:>14.6} MHz {:>7.1} dB | load {:>3.0}% | {}",
            frame.bin_frequency(peak_bin) / 1e6,
            to_db(peak_level),
            frame.load * 100.0,
            ascii_spectrum(frame.magnitudes, self.columns),
        ));
        Ok(())
    }

    fn unlock_and_post(&mut self) {
        if self.locked {
            self.locked = false;
            self.bar.tick();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn db_conversion() {
        assert!((to_db(1.0f32.ln()) - 0.0).abs() < 1e-6);
        assert!((to_db(0.01f32.ln()) + 20.0).abs() < 1e-4);
    }

    #[test]
    fn ascii_spectrum_width_and_shading() {
        let mut mags = vec![(1e-14f32).ln(); 64];
        mags[32] = 0.0;
        let line = ascii_spectrum(&mags, 16);
        assert_eq!(line.chars().count(), 16);
        assert_eq!(line.chars().nth(8), Some('@'));
        assert_eq!(line.chars().next(), Some(' '));
    }

    #[test]
    fn ascii_spectrum_never_wider_than_input() {
        assert_eq!(ascii_spectrum(&[0.0; 4], 80).len(), 4);
        assert_eq!(ascii_spectrum(&[], 80), "");
    }

    #[test]
    fn draw_requires_lock() {
        let mut renderer = ConsoleRenderer::hidden(32);
        let mags = vec![0.0f32; 8];
        let frame = SpectrumFrame {
            magnitudes: &mags,
            sample_rate: 48_000,
            center_frequency: 0,
            frame_rate: 10,
            load: 0.5,
        };
        assert!(renderer.draw(&frame).is_err());
        assert!(renderer.lock());
        renderer.draw(&frame).unwrap();
        renderer.unlock_and_post();
        assert!(renderer.draw(&frame).is_err());
    }
}
