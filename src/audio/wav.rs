use std::path::Path;

use hound::{SampleFormat, WavReader};

use crate::error::AudioError;

/// Decoded PCM audio with samples scaled to [-1, 1].
#[derive(Debug, Clone)]
pub struct Waveform {
    /// Interleaved samples.
    pub samples: Vec<f32>,
    pub channels: u16,
    pub sample_rate: u32,
}

impl Waveform {
    /// Samples of the first channel only.
    pub fn first_channel(&self) -> impl Iterator<Item = f32> + '_ {
        self.samples
            .iter()
            .step_by(usize::from(self.channels.max(1)))
            .copied()
    }

    pub fn frame_count(&self) -> usize {
        self.samples.len() / usize::from(self.channels.max(1))
    }
}

/// Read a WAV file. Integer PCM of any width and 32-bit float are supported.
pub fn read_wav(path: &Path) -> Result<Waveform, AudioError> {
    let read_err = |source| AudioError::Read {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = WavReader::open(path).map_err(read_err)?;
    let spec = reader.spec();

    let samples = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Float, 32) => reader
            .samples::<f32>()
            .collect::<Result<Vec<_>, _>>()
            .map_err(read_err)?,
        (SampleFormat::Int, bits @ 1..=32) => {
            let scale = (1u64 << (bits - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<Vec<_>, _>>()
                .map_err(read_err)?
        }
        (format, bits) => {
            return Err(AudioError::UnsupportedFormat {
                path: path.to_path_buf(),
                bits,
                format: match format {
                    SampleFormat::Float => "float",
                    SampleFormat::Int => "int",
                },
            })
        }
    };

    if samples.is_empty() {
        return Err(AudioError::Empty(path.to_path_buf()));
    }

    Ok(Waveform {
        samples,
        channels: spec.channels,
        sample_rate: spec.sample_rate,
    })
}
