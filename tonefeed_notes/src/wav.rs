// WAV input for the CLI.
//
// Decodes a WAV file with `hound` into the mono `f32` buffer the segmenter
// expects: integer samples are scaled to [-1, 1] by their bit depth and
// multi-channel frames are averaged down to one channel. No resampling; the
// file's own sample rate is returned alongside the samples.

use crate::error::NotesError;
use std::io::Read;
use std::path::Path;

/// A decoded mono buffer.
#[derive(Debug, Clone)]
pub struct MonoAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl MonoAudio {
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Read a WAV file as mono `f32`.
pub fn read_wav(path: &Path) -> Result<MonoAudio, NotesError> {
    let reader = hound::WavReader::open(path)?;
    decode(reader)
}

fn decode<R: Read>(reader: hound::WavReader<R>) -> Result<MonoAudio, NotesError> {
    let spec = reader.spec();
    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader.into_samples::<f32>().collect::<Result<_, _>>()?,
        hound::SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample.clamp(1, 32) - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()?
        }
    };

    let channels = spec.channels.max(1) as usize;
    let samples = if channels == 1 {
        interleaved
    } else {
        interleaved
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect()
    };
    log::debug!(
        "wav: {} Hz, {} channel(s), {} mono samples",
        spec.sample_rate,
        channels,
        samples.len()
    );
    Ok(MonoAudio {
        samples,
        sample_rate: spec.sample_rate,
    })
}
