mod cli;
mod config;

use anyhow::{Context, Result};
use clap::Parser;
use std::time::{Duration, Instant};

use cli::Cli;
use rfscope::buffers::BufferPool;
use rfscope::dsp::WindowFunction;
use rfscope::pipeline::{PipelineSettings, SpectrumPipeline, StopReason};
use rfscope::render::{self, ConsoleRenderer};
use rfscope::source::{ToneSource, WavIqSource};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let mut cli = Cli::parse();

    // Config values apply only where the CLI is left at its default.
    if let Some(ref path) = config::find_config(cli.config.clone()) {
        if let Some(cfg) = config::load_config(path) {
            log::info!("Loaded config from {}", path.display());
            if cli.fft_size == 1024 { cli.fft_size = cfg.pipeline.fft_size; }
            if cli.sample_rate == 2_000_000 { cli.sample_rate = cfg.pipeline.sample_rate; }
            if cli.center_frequency == 100_000_000 { cli.center_frequency = cfg.pipeline.center_frequency; }
            if cli.fps == 30 { cli.fps = cfg.pipeline.frame_rate; }
            if cli.window == WindowFunction::Blackman { cli.window = cfg.pipeline.window; }
            if cli.pool_size == 16 { cli.pool_size = cfg.pool.capacity; }
            if cli.tone_offset == 200_000.0 { cli.tone_offset = cfg.source.tone_offset; }
            if cli.amplitude == 0.5 { cli.amplitude = cfg.source.amplitude; }
        } else {
            log::warn!("Failed to load config from {}", path.display());
        }
    }

    let wav = match cli.input {
        Some(ref path) => {
            log::info!("Input: {}", path.display());
            Some(WavIqSource::open(path, cli.repeat)?)
        }
        None => None,
    };
    let sample_rate = wav.as_ref().map_or(cli.sample_rate, |w| w.sample_rate());

    let settings = PipelineSettings::new(cli.fft_size, sample_rate, cli.center_frequency, cli.fps)
        .context("Invalid pipeline configuration")?
        .with_window(cli.window);

    log::info!("rfscope - real-time I/Q spectrum");
    log::info!(
        "FFT size: {}, window: {:?}, {} fps, {} Hz @ {} Hz",
        settings.fft_size,
        settings.window,
        settings.frame_rate,
        settings.sample_rate,
        settings.center_frequency
    );

    let (producer, consumer) = BufferPool::new(cli.pool_size)
        .context("Invalid buffer pool size")?
        .split();

    let console = if cli.quiet {
        ConsoleRenderer::hidden(cli.columns)
    } else {
        ConsoleRenderer::new(cli.columns)
    };
    let status_line = console.progress_bar();
    let mut pipeline = SpectrumPipeline::new(settings, consumer, render::shared(console));

    let source = match wav {
        Some(wav) => wav.spawn(producer, pipeline.shared_settings())?,
        None => ToneSource {
            offset_hz: cli.tone_offset,
            amplitude: cli.amplitude,
        }
        .spawn(producer, pipeline.shared_settings())?,
    };

    pipeline.start().context("Failed to start processing loop")?;

    let deadline = (cli.duration > 0.0).then(|| Instant::now() + Duration::from_secs_f64(cli.duration));
    while pipeline.is_running() {
        if deadline.is_some_and(|d| Instant::now() >= d) {
            break;
        }
        std::thread::sleep(Duration::from_millis(50));
    }

    pipeline.stop();
    status_line.finish_and_clear();
    let report = source.stop()?;

    let stats = pipeline.stats();
    log::info!(
        "Frames: {} processed, {} rendered, {} skipped, {} late; last load {:.0}%",
        stats.frames_processed,
        stats.frames_rendered,
        stats.renders_skipped,
        stats.deadlines_missed,
        pipeline.load() * 100.0
    );
    log::info!(
        "Blocks: {} submitted, {} dropped at source, {} recycled blocks dropped, {} size mismatches",
        report.submitted,
        report.dropped,
        stats.returns_dropped,
        stats.size_mismatches
    );

    match pipeline.last_stop_reason() {
        Some(StopReason::Requested) | Some(StopReason::InputClosed) | None => {}
        Some(reason) => anyhow::bail!("Processing loop stopped unexpectedly: {:?}", reason),
    }

    log::info!("Done");
    Ok(())
}
