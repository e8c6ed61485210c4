use clap::Parser;
use rfscope::dsp::WindowFunction;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "rfscope", about = "Real-time I/Q spectrum analyzer")]
pub struct Cli {
    /// Stereo WAV I/Q recording (left = I, right = Q). A synthetic tone is
    /// used when omitted.
    pub input: Option<PathBuf>,

    /// Config file (TOML)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// FFT size, a power of two
    #[arg(long, default_value_t = 1024)]
    pub fft_size: usize,

    /// Sample rate in Hz. Ignored for WAV input, which carries its own.
    #[arg(long, default_value_t = 2_000_000)]
    pub sample_rate: u32,

    /// Center frequency in Hz
    #[arg(long, default_value_t = 100_000_000, allow_negative_numbers = true)]
    pub center_frequency: i64,

    /// Frames per second
    #[arg(long, default_value_t = 30)]
    pub fps: u32,

    /// Window function (blackman, hann, rectangular)
    #[arg(long, default_value = "blackman")]
    pub window: WindowFunction,

    /// Number of sample blocks in flight between source and pipeline
    #[arg(long, default_value_t = 16)]
    pub pool_size: usize,

    /// Synthetic tone offset from the center frequency, in Hz
    #[arg(long, default_value_t = 200_000.0, allow_negative_numbers = true)]
    pub tone_offset: f64,

    /// Synthetic tone amplitude (0.0-1.0)
    #[arg(long, default_value_t = 0.5)]
    pub amplitude: f32,

    /// Seconds to run; 0 runs until the source ends
    #[arg(short, long, default_value_t = 10.0)]
    pub duration: f64,

    /// Loop the WAV recording
    #[arg(long)]
    pub repeat: bool,

    /// Width of the text spectrum
    #[arg(long, default_value_t = 64)]
    pub columns: usize,

    /// Don't draw the status line
    #[arg(short, long)]
    pub quiet: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cli = Cli::parse_from(["rfscope"]);
        assert!(cli.input.is_none());
        assert_eq!(cli.fft_size, 1024);
        assert_eq!(cli.fps, 30);
        assert_eq!(cli.window, WindowFunction::Blackman);
    }

    #[test]
    fn parses_negative_offsets_and_window() {
        let cli = Cli::parse_from([
            "rfscope",
            "--center-frequency",
            "-100000",
            "--tone-offset",
            "-2500",
            "--window",
            "hann",
            "capture.wav",
        ]);
        assert_eq!(cli.center_frequency, -100_000);
        assert_eq!(cli.tone_offset, -2_500.0);
        assert_eq!(cli.window, WindowFunction::Hann);
        assert_eq!(cli.input, Some(PathBuf::from("capture.wav")));
    }
}
