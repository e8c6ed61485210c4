use anyhow::{Context, Result};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use super::{block_duration, Feeder, SourceHandle, SourceReport, Submitted};
use crate::buffers::ProducerEnd;
use crate::pipeline::SharedSettings;

/// A decoded I/Q recording: left channel is I, right channel is Q.
/// Both streams always have the same length.
#[derive(Clone, Debug)]
pub struct IqRecording {
    i: Vec<f32>,
    q: Vec<f32>,
    sample_rate: u32,
}

impl IqRecording {
    /// `None` unless `i` and `q` have the same length.
    pub fn new(i: Vec<f32>, q: Vec<f32>, sample_rate: u32) -> Option<Self> {
        if i.len() != q.len() {
            return None;
        }
        Some(Self { i, q, sample_rate })
    }

    pub fn i(&self) -> &[f32] {
        &self.i
    }

    pub fn q(&self) -> &[f32] {
        &self.q
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.i.len()
    }

    pub fn is_empty(&self) -> bool {
        self.i.is_empty()
    }
}

/// Decode a stereo WAV recording into separate I and Q streams.
pub fn decode_iq(path: &Path) -> Result<IqRecording> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open IQ recording: {}", path.display()))?;

    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .context("Failed to probe recording format")?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != symphonia::core::codecs::CODEC_TYPE_NULL)
        .context("No audio tracks found")?;

    let track_id = track.id;
    let channels = track.codec_params.channels.map_or(1, |c| c.count());
    if channels != 2 {
        anyhow::bail!("IQ recording must be stereo (I/Q), found {} channel(s)", channels);
    }
    let sample_rate = track.codec_params.sample_rate.context("Unknown sample rate")?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .context("Failed to create decoder")?;

    let mut i_samples: Vec<f32> = Vec::new();
    let mut q_samples: Vec<f32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => return Err(e.into()),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(symphonia::core::errors::Error::DecodeError(_)) => continue,
            Err(e) => return Err(e.into()),
        };

        let spec = *decoded.spec();
        let mut sample_buf = SampleBuffer::<f32>::new(decoded.frames() as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);

        for pair in sample_buf.samples().chunks_exact(2) {
            i_samples.push(pair[0]);
            q_samples.push(pair[1]);
        }
    }

    log::info!(
        "Decoded IQ recording: {} samples, {}Hz, {:.1}s",
        i_samples.len(),
        sample_rate,
        i_samples.len() as f32 / sample_rate as f32
    );

    Ok(IqRecording {
        i: i_samples,
        q: q_samples,
        sample_rate,
    })
}

/// Plays an [`IqRecording`] into the pipeline in real time, one block of the
/// current transform size at a time.
#[derive(Debug)]
pub struct WavIqSource {
    recording: IqRecording,
    looping: bool,
}

impl WavIqSource {
    pub fn new(recording: IqRecording, looping: bool) -> Self {
        Self { recording, looping }
    }

    pub fn open(path: &Path, looping: bool) -> Result<Self> {
        Ok(Self::new(decode_iq(path)?, looping))
    }

    pub fn sample_rate(&self) -> u32 {
        self.recording.sample_rate
    }

    pub fn spawn(self, producer: ProducerEnd, settings: Arc<SharedSettings>) -> Result<SourceHandle> {
        if self.recording.is_empty() {
            anyhow::bail!("IQ recording contains no samples");
        }
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);
        let thread = thread::Builder::new()
            .name("wav-iq-source".into())
            .spawn(move || self.run(producer, &settings, &stop_flag))?;
        Ok(SourceHandle::new(stop, thread))
    }

    fn run(&self, producer: ProducerEnd, settings: &SharedSettings, stop: &AtomicBool) -> SourceReport {
        let mut feeder = Feeder::new(producer);
        let total = self.recording.len();
        let mut pos = 0usize;

        while !stop.load(Ordering::SeqCst) {
            let len = settings.fft_size();
            if pos + len > total {
                if !self.looping || len > total {
                    log::info!("End of IQ recording reached");
                    break;
                }
                pos = 0;
            }

            if feeder.has_room() {
                let mut block = feeder.block(len);
                let (re, im) = block.parts_mut();
                re.copy_from_slice(&self.recording.i[pos..pos + len]);
                im.copy_from_slice(&self.recording.q[pos..pos + len]);
                if let Submitted::Closed = feeder.submit(block) {
                    log::info!("Pipeline input closed, IQ source exiting");
                    break;
                }
            } else {
                feeder.skip();
            }
            pos += len;
            feeder.pace(block_duration(len, self.recording.sample_rate));
        }

        let report = feeder.report();
        log::info!(
            "IQ source stopped: {} blocks submitted, {} dropped",
            report.submitted,
            report.dropped
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffers::BufferPool;
    use crate::pipeline::PipelineSettings;
    use std::io::Write;
    use std::time::Duration;

    fn write_wav(path: &Path, channels: u16, sample_rate: u32, frames: &[(i16, i16)]) {
        let block_align = channels * 2;
        let data_len = (frames.len() * block_align as usize) as u32;
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"RIFF");
        bytes.extend_from_slice(&(36 + data_len).to_le_bytes());
        bytes.extend_from_slice(b"WAVEfmt ");
        bytes.extend_from_slice(&16u32.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.extend_from_slice(&channels.to_le_bytes());
        bytes.extend_from_slice(&sample_rate.to_le_bytes());
        bytes.extend_from_slice(&(sample_rate * block_align as u32).to_le_bytes());
        bytes.extend_from_slice(&block_align.to_le_bytes());
        bytes.extend_from_slice(&16u16.to_le_bytes());
        bytes.extend_from_slice(b"data");
        bytes.extend_from_slice(&data_len.to_le_bytes());
        for &(l, r) in frames {
            bytes.extend_from_slice(&l.to_le_bytes());
            if channels == 2 {
                bytes.extend_from_slice(&r.to_le_bytes());
            }
        }
        let mut file = std::fs::File::create(path).unwrap();
        file.write_all(&bytes).unwrap();
    }

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("rfscope-{}-{}.wav", name, std::process::id()))
    }

    #[test]
    fn decodes_stereo_into_i_and_q() {
        let path = temp_path("stereo");
        let frames: Vec<(i16, i16)> = (0..256).map(|n| (16384, -16384 + n as i16)).collect();
        write_wav(&path, 2, 48_000, &frames);

        let rec = decode_iq(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(rec.sample_rate(), 48_000);
        assert_eq!(rec.len(), 256);
        assert_eq!(rec.q().len(), 256);
        assert!((rec.i()[0] - 0.5).abs() < 1e-3);
        assert!((rec.q()[0] + 0.5).abs() < 1e-3);
    }

    #[test]
    fn recording_requires_matching_streams() {
        assert!(IqRecording::new(vec![0.0; 64], vec![0.0; 32], 48_000).is_none());
        let rec = IqRecording::new(vec![0.0; 64], vec![0.0; 64], 48_000).unwrap();
        assert_eq!(rec.len(), 64);
    }

    #[test]
    fn rejects_mono_recordings() {
        let path = temp_path("mono");
        let frames: Vec<(i16, i16)> = (0..64).map(|_| (1000, 0)).collect();
        write_wav(&path, 1, 48_000, &frames);

        let result = decode_iq(&path);
        std::fs::remove_file(&path).ok();
        assert!(result.is_err());
    }

    #[test]
    fn plays_recording_in_blocks_then_stops() {
        let rec = IqRecording::new((0..256).map(|n| n as f32).collect(), vec![0.0; 256], 64_000).unwrap();
        let (producer, consumer) = BufferPool::new(8).unwrap().split();
        let settings = Arc::new(SharedSettings::new(PipelineSettings::new(64, 64_000, 0, 10).unwrap()));
        let handle = WavIqSource::new(rec, false).spawn(producer, settings).unwrap();

        let mut firsts = Vec::new();
        while let Ok(block) = consumer.recv_timeout(Duration::from_millis(500)) {
            assert_eq!(block.len(), 64);
            firsts.push(block.re()[0]);
        }
        assert_eq!(firsts, vec![0.0, 64.0, 128.0, 192.0]);
        assert_eq!(handle.stop().unwrap().submitted, 4);
    }
}
