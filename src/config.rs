use rfscope::dsp::WindowFunction;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub pool: PoolConfig,
    #[serde(default)]
    pub source: SourceConfig,
}

#[derive(Debug, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_fft_size")]
    pub fft_size: usize,
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    #[serde(default = "default_center_frequency")]
    pub center_frequency: i64,
    #[serde(default = "default_frame_rate")]
    pub frame_rate: u32,
    #[serde(default)]
    pub window: WindowFunction,
}

#[derive(Debug, Deserialize)]
pub struct PoolConfig {
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

#[derive(Debug, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_tone_offset")]
    pub tone_offset: f64,
    #[serde(default = "default_amplitude")]
    pub amplitude: f32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            fft_size: default_fft_size(),
            sample_rate: default_sample_rate(),
            center_frequency: default_center_frequency(),
            frame_rate: default_frame_rate(),
            window: WindowFunction::default(),
        }
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            tone_offset: default_tone_offset(),
            amplitude: default_amplitude(),
        }
    }
}

fn default_fft_size() -> usize { 1024 }
fn default_sample_rate() -> u32 { 2_000_000 }
fn default_center_frequency() -> i64 { 100_000_000 }
fn default_frame_rate() -> u32 { 30 }
fn default_capacity() -> usize { 16 }
fn default_tone_offset() -> f64 { 200_000.0 }
fn default_amplitude() -> f32 { 0.5 }

pub fn parse_config(content: &str) -> Result<Config, toml::de::Error> {
    toml::from_str(content)
}

pub fn load_config(path: &Path) -> Option<Config> {
    let content = std::fs::read_to_string(path).ok()?;
    match parse_config(&content) {
        Ok(config) => Some(config),
        Err(err) => {
            log::warn!("Invalid config {}: {}", path.display(), err);
            None
        }
    }
}

/// Explicit path, else `rfscope.toml` in the working directory, else the
/// user's config directory.
pub fn find_config(explicit: Option<PathBuf>) -> Option<PathBuf> {
    explicit.or_else(|| {
        let local = PathBuf::from("rfscope.toml");
        if local.exists() {
            return Some(local);
        }
        if let Some(home) = dirs::home_dir() {
            let xdg = home.join(".config").join("rfscope").join("config.toml");
            if xdg.exists() {
                return Some(xdg);
            }
        }
        if let Some(config_dir) = dirs::config_dir() {
            let platform = config_dir.join("rfscope").join("config.toml");
            if platform.exists() {
                return Some(platform);
            }
        }
        None
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let cfg = parse_config("").unwrap();
        assert_eq!(cfg.pipeline.fft_size, 1024);
        assert_eq!(cfg.pipeline.frame_rate, 30);
        assert_eq!(cfg.pipeline.window, WindowFunction::Blackman);
        assert_eq!(cfg.pool.capacity, 16);
    }

    #[test]
    fn partial_sections_fill_in_defaults() {
        let cfg = parse_config(
            r#"
            [pipeline]
            fft_size = 4096
            center_frequency = -50000
            window = "hann"

            [source]
            tone_offset = 12500.0
            "#,
        )
        .unwrap();
        assert_eq!(cfg.pipeline.fft_size, 4096);
        assert_eq!(cfg.pipeline.center_frequency, -50_000);
        assert_eq!(cfg.pipeline.sample_rate, 2_000_000);
        assert_eq!(cfg.pipeline.window, WindowFunction::Hann);
        assert_eq!(cfg.source.tone_offset, 12_500.0);
        assert_eq!(cfg.source.amplitude, 0.5);
    }

    #[test]
    fn wrong_types_fail_to_parse() {
        assert!(parse_config("[pipeline]\nfft_size = \"big\"\n").is_err());
        assert!(parse_config("[pool]\ncapacity = -1\n").is_err());
    }

    #[test]
    fn unknown_window_fails_to_parse() {
        assert!(parse_config("[pipeline]\nwindow = \"kaiser\"\n").is_err());
    }

    #[test]
    fn explicit_path_wins() {
        let path = PathBuf::from("/nonexistent/custom.toml");
        assert_eq!(find_config(Some(path.clone())), Some(path));
    }
}
