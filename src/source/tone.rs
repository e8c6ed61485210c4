use anyhow::Result;
use std::f64::consts::TAU;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use super::{block_duration, Feeder, SourceHandle, SourceReport, Submitted};
use crate::buffers::{ProducerEnd, SampleBlock};
use crate::pipeline::SharedSettings;

/// Synthetic I/Q source: a complex tone at a fixed offset from the centre
/// frequency, generated at the configured sample rate.
///
/// Block length and sample rate follow the pipeline's live settings, so a
/// transform-size change is picked up on the next block.
#[derive(Clone, Debug)]
pub struct ToneSource {
    /// Offset of the tone from the centre frequency, in Hz.
    pub offset_hz: f64,
    pub amplitude: f32,
}

impl Default for ToneSource {
    fn default() -> Self {
        Self {
            offset_hz: 100_000.0,
            amplitude: 0.5,
        }
    }
}

/// Phase-continuous complex oscillator.
#[derive(Debug, Default)]
struct Oscillator {
    phase: f64,
}

impl Oscillator {
    fn fill(&mut self, block: &mut SampleBlock, offset_hz: f64, sample_rate: u32, amplitude: f32) {
        let step = if sample_rate == 0 {
            0.0
        } else {
            TAU * offset_hz / sample_rate as f64
        };
        let (re, im) = block.parts_mut();
        for (r, i) in re.iter_mut().zip(im.iter_mut()) {
            *r = amplitude * self.phase.cos() as f32;
            *i = amplitude * self.phase.sin() as f32;
            self.phase = (self.phase + step) % TAU;
        }
    }
}

impl ToneSource {
    pub fn spawn(self, producer: ProducerEnd, settings: Arc<SharedSettings>) -> Result<SourceHandle> {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);
        let thread = thread::Builder::new()
            .name("tone-source".into())
            .spawn(move || self.run(producer, &settings, &stop_flag))?;
        log::info!("Tone source started");
        Ok(SourceHandle::new(stop, thread))
    }

    fn run(&self, producer: ProducerEnd, settings: &SharedSettings, stop: &AtomicBool) -> SourceReport {
        let mut feeder = Feeder::new(producer);
        let mut osc = Oscillator::default();

        while !stop.load(Ordering::SeqCst) {
            let len = settings.fft_size();
            let sample_rate = settings.sample_rate();

            if feeder.has_room() {
                let mut block = feeder.block(len);
                osc.fill(&mut block, self.offset_hz, sample_rate, self.amplitude);
                if let Submitted::Closed = feeder.submit(block) {
                    log::info!("Pipeline input closed, tone source exiting");
                    break;
                }
            } else {
                feeder.skip();
            }
            feeder.pace(block_duration(len, sample_rate));
        }

        let report = feeder.report();
        log::info!(
            "Tone source stopped: {} blocks submitted, {} dropped, {} allocated",
            report.submitted,
            report.dropped,
            report.allocated
        );
        report
    }
}
