//! Mel-frequency cepstral coefficients with velocity channels.

use std::f64::consts::PI;
use std::sync::Arc;

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

/// Lower bound on mel band energy before taking the log. Only reached by
/// bands that cover no FFT bins.
const MIN_BAND_ENERGY: f64 = 1e-12;

/// Framing and filterbank parameters for [`Mfcc`].
#[derive(Debug, Clone, Copy)]
pub struct MfccParams {
    pub sample_rate: u32,
    pub window_len: usize,
    pub hop_len: usize,
    pub mel_bands: usize,
    pub coefficients: usize,
    pub low_freq_hz: f64,
    pub high_freq_hz: f64,
}

/// Precomputed window, filterbank and DCT for one sample rate.
pub struct Mfcc {
    params: MfccParams,
    fft: Arc<dyn Fft<f64>>,
    fft_len: usize,
    window: Vec<f64>,
    filterbank: Vec<Vec<(usize, f64)>>,
    dct: Vec<Vec<f64>>,
}

impl Mfcc {
    pub fn new(params: MfccParams) -> Self {
        let window_len = params.window_len.max(1);
        let fft_len = window_len.next_power_of_two();
        let fft = FftPlanner::new().plan_fft_forward(fft_len);
        let window = hamming(window_len);
        let filterbank = mel_filterbank(&params, fft_len);
        let dct = dct_matrix(params.mel_bands, params.coefficients);
        Mfcc {
            params: MfccParams {
                window_len,
                hop_len: params.hop_len.max(1),
                ..params
            },
            fft,
            fft_len,
            window,
            filterbank,
            dct,
        }
    }

    pub fn coefficients(&self) -> usize {
        self.params.coefficients
    }

    /// Lazily computes one coefficient vector per analysis window.
    pub fn frames<'a>(&'a self, signal: &'a [f64]) -> CepstralFrames<'a> {
        CepstralFrames {
            mfcc: self,
            signal,
            start: 0,
        }
    }

    fn frame(&self, chunk: &[f64]) -> Vec<f64> {
        let mut buffer: Vec<Complex<f64>> = (0..self.fft_len)
            .map(|i| {
                let sample = chunk.get(i).copied().unwrap_or(0.0);
                let weight = self.window.get(i).copied().unwrap_or(0.0);
                Complex::new(sample * weight, 0.0)
            })
            .collect();
        self.fft.process(&mut buffer);

        let power: Vec<f64> = buffer[..=self.fft_len / 2]
            .iter()
            .map(|c| c.norm_sqr() / self.fft_len as f64)
            .collect();

        let log_energies: Vec<f64> = self
            .filterbank
            .iter()
            .map(|band| {
                let energy: f64 = band.iter().map(|&(bin, w)| power[bin] * w).sum();
                energy.max(MIN_BAND_ENERGY).ln()
            })
            .collect();

        self.dct
            .iter()
            .map(|row| row.iter().zip(&log_energies).map(|(a, b)| a * b).sum())
            .collect()
    }
}

/// Iterator over cepstral vectors of a signal. The final partial window is
/// zero-padded.
pub struct CepstralFrames<'a> {
    mfcc: &'a Mfcc,
    signal: &'a [f64],
    start: usize,
}

impl Iterator for CepstralFrames<'_> {
    type Item = Vec<f64>;

    fn next(&mut self) -> Option<Vec<f64>> {
        if self.start >= self.signal.len() {
            return None;
        }
        let end = (self.start + self.mfcc.params.window_len).min(self.signal.len());
        let frame = self.mfcc.frame(&self.signal[self.start..end]);
        self.start = if end == self.signal.len() {
            self.signal.len()
        } else {
            self.start + self.mfcc.params.hop_len
        };
        Some(frame)
    }
}

/// Appends first-difference channels to each frame. The first frame's
/// velocities are zero.
pub struct WithVelocities<I> {
    inner: I,
    previous: Option<Vec<f64>>,
}

impl<I: Iterator<Item = Vec<f64>>> WithVelocities<I> {
    pub fn new(inner: I) -> Self {
        WithVelocities {
            inner,
            previous: None,
        }
    }
}

impl<I: Iterator<Item = Vec<f64>>> Iterator for WithVelocities<I> {
    type Item = Vec<f64>;

    fn next(&mut self) -> Option<Vec<f64>> {
        let frame = self.inner.next()?;
        let prev = self.previous.as_ref().unwrap_or(&frame);
        let velocity: Vec<f64> = frame.iter().zip(prev).map(|(c, p)| c - p).collect();
        let mut out = frame.clone();
        out.extend(velocity);
        self.previous = Some(frame);
        Some(out)
    }
}

fn hamming(len: usize) -> Vec<f64> {
    if len == 1 {
        return vec![1.0];
    }
    (0..len)
        .map(|i| 0.54 - 0.46 * (2.0 * PI * i as f64 / (len - 1) as f64).cos())
        .collect()
}

fn hz_to_mel(hz: f64) -> f64 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

fn mel_to_hz(mel: f64) -> f64 {
    700.0 * (10f64.powf(mel / 2595.0) - 1.0)
}

/// Triangular filters as sparse (bin, weight) lists.
fn mel_filterbank(params: &MfccParams, fft_len: usize) -> Vec<Vec<(usize, f64)>> {
    let nyquist = params.sample_rate as f64 / 2.0;
    let high = params.high_freq_hz.min(nyquist);
    let low = params.low_freq_hz.min(high);
    let (mel_low, mel_high) = (hz_to_mel(low), hz_to_mel(high));
    let bands = params.mel_bands;

    let edges: Vec<f64> = (0..bands + 2)
        .map(|i| mel_to_hz(mel_low + (mel_high - mel_low) * i as f64 / (bands + 1) as f64))
        .collect();
    let bin_hz = params.sample_rate as f64 / fft_len as f64;

    (0..bands)
        .map(|b| {
            let (left, center, right) = (edges[b], edges[b + 1], edges[b + 2]);
            (0..=fft_len / 2)
                .filter_map(|bin| {
                    let hz = bin as f64 * bin_hz;
                    let weight = if hz > left && hz <= center && center > left {
                        (hz - left) / (center - left)
                    } else if hz > center && hz < right && right > center {
                        (right - hz) / (right - center)
                    } else {
                        0.0
                    };
                    (weight > 0.0).then_some((bin, weight))
                })
                .collect()
        })
        .collect()
}

/// Orthonormal DCT-II rows for the first `coefficients` outputs.
fn dct_matrix(inputs: usize, coefficients: usize) -> Vec<Vec<f64>> {
    let n = inputs as f64;
    (0..coefficients)
        .map(|k| {
            let scale = if k == 0 { (1.0 / n).sqrt() } else { (2.0 / n).sqrt() };
            (0..inputs)
                .map(|i| scale * (PI * k as f64 * (i as f64 + 0.5) / n).cos())
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> MfccParams {
        MfccParams {
            sample_rate: 16_000,
            window_len: 320,
            hop_len: 160,
            mel_bands: 26,
            coefficients: 13,
            low_freq_hz: 300.0,
            high_freq_hz: 8000.0,
        }
    }

    #[test]
    fn test_frame_count_uses_hop() {
        let mfcc = Mfcc::new(params());
        // 1600 samples: windows start every 160 until one reaches the end.
        let signal = vec![0.1; 1600];
        assert_eq!(mfcc.frames(&signal).count(), 9);
        assert_eq!(mfcc.frames(&signal[..100]).count(), 1);
        assert_eq!(mfcc.frames(&[]).count(), 0);
    }

    #[test]
    fn test_frame_width() {
        let mfcc = Mfcc::new(params());
        let signal: Vec<f64> = (0..800).map(|i| (i as f64 * 0.3).sin()).collect();
        for frame in mfcc.frames(&signal) {
            assert_eq!(frame.len(), 13);
            assert!(frame.iter().all(|v| v.is_finite()));
        }
    }

    #[test]
    fn test_velocities_are_first_differences() {
        let frames = vec![vec![1.0, 2.0], vec![4.0, 1.0]];
        let out: Vec<Vec<f64>> = WithVelocities::new(frames.into_iter()).collect();
        assert_eq!(out[0], vec![1.0, 2.0, 0.0, 0.0]);
        assert_eq!(out[1], vec![4.0, 1.0, 3.0, -1.0]);
    }

    #[test]
    fn test_filterbank_respects_nyquist() {
        let p = MfccParams {
            sample_rate: 8000,
            ..params()
        };
        let fft_len = 512;
        for band in mel_filterbank(&p, fft_len) {
            for (bin, weight) in band {
                assert!(bin <= fft_len / 2);
                assert!(weight > 0.0 && weight <= 1.0);
            }
        }
    }

    #[test]
    fn test_dct_first_row_is_mean() {
        let dct = dct_matrix(4, 2);
        assert!(dct[0].iter().all(|&v| (v - 0.5).abs() < 1e-12));
    }
}
