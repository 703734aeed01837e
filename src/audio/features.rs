use std::path::Path;

use rand::Rng;
use rand_distr::{Distribution, Normal};

use super::mfcc::{Mfcc, MfccParams, WithVelocities};
use super::wav::{read_wav, Waveform};
use crate::error::AudioError;

/// One feature vector per analysis window.
pub type FeatureSequence = Vec<Vec<f32>>;

/// Acoustic front-end settings.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Analysis window length in milliseconds.
    pub window_ms: u32,
    /// Overlap between consecutive windows in milliseconds.
    pub overlap_ms: u32,
    pub mel_bands: usize,
    pub cepstral_coefficients: usize,
    pub low_freq_hz: f64,
    pub high_freq_hz: f64,
    /// Standard deviation of the Gaussian noise added to every sample.
    pub noise_std: f64,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        FeatureConfig {
            window_ms: 20,
            overlap_ms: 10,
            mel_bands: 26,
            cepstral_coefficients: 13,
            low_freq_hz: 300.0,
            high_freq_hz: 8000.0,
            noise_std: 1e-5,
        }
    }
}

impl FeatureConfig {
    /// Dimension of each feature vector: coefficients plus velocities.
    pub fn feature_dim(&self) -> usize {
        2 * self.cepstral_coefficients
    }
}

/// Converts audio into feature sequences. Holds no state between calls.
#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    config: FeatureConfig,
}

impl FeatureExtractor {
    pub fn new(config: FeatureConfig) -> Self {
        FeatureExtractor { config }
    }

    pub fn config(&self) -> &FeatureConfig {
        &self.config
    }

    pub fn feature_dim(&self) -> usize {
        self.config.feature_dim()
    }

    /// Decode a WAV file and extract its features.
    pub fn extract_file<R: Rng + ?Sized>(
        &self,
        path: &Path,
        rng: &mut R,
    ) -> Result<FeatureSequence, AudioError> {
        let wave = read_wav(path)?;
        Ok(self.extract(&wave, rng))
    }

    /// Extract features from the first channel of `wave`.
    pub fn extract<R: Rng + ?Sized>(&self, wave: &Waveform, rng: &mut R) -> FeatureSequence {
        let noise = Normal::new(0.0, self.config.noise_std.max(0.0)).ok();
        let signal: Vec<f64> = wave
            .first_channel()
            .map(|s| {
                let jitter = noise.as_ref().map_or(0.0, |n| n.sample(rng));
                f64::from(s) + jitter
            })
            .collect();

        let mfcc = Mfcc::new(self.params(wave.sample_rate));
        WithVelocities::new(mfcc.frames(&signal))
            .map(|frame| frame.into_iter().map(|v| v as f32).collect())
            .collect()
    }

    fn params(&self, sample_rate: u32) -> MfccParams {
        let samples_per_ms = f64::from(sample_rate) / 1000.0;
        let window_len = (f64::from(self.config.window_ms) * samples_per_ms).round() as usize;
        let hop_ms = self.config.window_ms.saturating_sub(self.config.overlap_ms).max(1);
        let hop_len = (f64::from(hop_ms) * samples_per_ms).round() as usize;
        MfccParams {
            sample_rate,
            window_len: window_len.max(1),
            hop_len: hop_len.max(1),
            mel_bands: self.config.mel_bands,
            coefficients: self.config.cepstral_coefficients,
            low_freq_hz: self.config.low_freq_hz,
            high_freq_hz: self.config.high_freq_hz,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::wav::tests::write_wav;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn wave(samples: Vec<f32>, channels: u16) -> Waveform {
        Waveform {
            samples,
            channels,
            sample_rate: 16_000,
        }
    }

    #[test]
    fn test_silence_stays_finite() {
        let extractor = FeatureExtractor::new(FeatureConfig::default());
        let mut rng = StdRng::seed_from_u64(7);
        let features = extractor.extract(&wave(vec![0.0; 16_000], 1), &mut rng);

        assert_eq!(features.len(), 99);
        for frame in &features {
            assert_eq!(frame.len(), 26);
            assert!(frame.iter().all(|v| v.is_finite()));
        }
    }

    #[test]
    fn test_silence_without_noise_stays_finite() {
        let config = FeatureConfig {
            noise_std: 0.0,
            ..FeatureConfig::default()
        };
        let extractor = FeatureExtractor::new(config);
        let mut rng = StdRng::seed_from_u64(7);
        let features = extractor.extract(&wave(vec![0.0; 4000], 1), &mut rng);
        assert!(features.iter().flatten().all(|v| v.is_finite()));
    }

    #[test]
    fn test_uses_first_channel_only() {
        let config = FeatureConfig {
            noise_std: 0.0,
            ..FeatureConfig::default()
        };
        let extractor = FeatureExtractor::new(config);
        let mut rng = StdRng::seed_from_u64(1);
        let tone: Vec<f32> = (0..3200).map(|i| (i as f32 * 0.2).sin() * 0.5).collect();

        let mono = extractor.extract(&wave(tone.clone(), 1), &mut rng);
        let stereo_samples: Vec<f32> = tone.iter().flat_map(|&s| [s, 0.9]).collect();
        let stereo = extractor.extract(&wave(stereo_samples, 2), &mut rng);

        assert_eq!(mono, stereo);
    }

    #[test]
    fn test_restartable_across_calls() {
        let extractor = FeatureExtractor::new(FeatureConfig::default());
        let tone: Vec<f32> = (0..2400).map(|i| (i as f32 * 0.05).cos()).collect();
        let a = extractor.extract(&wave(tone.clone(), 1), &mut StdRng::seed_from_u64(3));
        let _ = extractor.extract(&wave(vec![0.2; 500], 1), &mut StdRng::seed_from_u64(4));
        let b = extractor.extract(&wave(tone, 1), &mut StdRng::seed_from_u64(3));
        assert_eq!(a, b);
    }

    #[test]
    fn test_extract_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.wav");
        write_wav(&path, 1, 8000, &vec![1000i16; 800]);

        let extractor = FeatureExtractor::new(FeatureConfig::default());
        let features = extractor
            .extract_file(&path, &mut StdRng::seed_from_u64(0))
            .unwrap();
        // 100 ms at 8 kHz: 160-sample windows every 80 samples.
        assert_eq!(features.len(), 9);
        assert_eq!(features[0].len(), extractor.feature_dim());
    }
}
