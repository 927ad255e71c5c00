//! Audio loading and log-mel feature extraction.

use crate::error::{AudioError, Result};
use hound::{SampleFormat, WavReader, WavSpec};
use ndarray::Array2;
use rustfft::{FftPlanner, num_complex::Complex};
use std::f32::consts::PI;
use std::path::Path;

/// Expected sample rate for Whisper models (16kHz)
pub const SAMPLE_RATE: u32 = 16000;

/// Whisper log-mel spectrogram extractor.
///
/// Audio is padded or trimmed to a fixed window before extraction, so the
/// output always has `n_samples / hop_length` frames.
#[derive(Clone, Debug)]
pub struct LogMelSpectrogram {
    pub n_mels: usize,
    pub n_fft: usize,
    pub hop_length: usize,
    pub sample_rate: usize,
    /// Fixed input length in samples.
    pub n_samples: usize,
}

impl LogMelSpectrogram {
    /// Whisper large-v3: 128 mel bins over 30 seconds of audio.
    pub const WHISPER_V3: Self = Self {
        n_mels: 128,
        n_fft: 400,
        hop_length: 160,
        sample_rate: 16000,
        n_samples: 480_000,
    };

    /// Number of output frames.
    pub fn n_frames(&self) -> usize {
        self.n_samples / self.hop_length
    }

    /// Extract features of shape `(n_mels, n_frames)`.
    pub fn apply(&self, audio: &[f32]) -> Array2<f32> {
        let audio = pad_or_trim(audio, self.n_samples);
        log_mel_spectrogram(&audio, self)
    }
}

/// Load audio from a WAV file.
///
/// Returns audio samples and WAV specification.
pub fn load_audio<P: AsRef<Path>>(path: P) -> Result<(Vec<f32>, WavSpec)> {
    let mut reader = WavReader::open(path)?;
    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader.samples::<f32>().collect::<hound::Result<_>>()?,
        SampleFormat::Int => reader
            .samples::<i16>()
            .map(|s| s.map(|s| s as f32 / i16::MAX as f32))
            .collect::<hound::Result<_>>()?,
    };

    Ok((samples, spec))
}

/// Load audio from a WAV file as mono f32 samples at 16kHz.
///
/// Validates sample rate is 16kHz and converts stereo to mono if needed.
///
/// # Errors
///
/// Returns error if:
/// - File cannot be read
/// - Sample rate is not 16kHz
/// - Channel count is invalid (0 or > 2)
pub fn read_audio_mono(path: impl AsRef<Path>) -> Result<Vec<f32>> {
    let (mut audio, spec) = load_audio(path)?;

    if spec.sample_rate != SAMPLE_RATE {
        return Err(AudioError::InvalidSampleRate {
            expected: SAMPLE_RATE,
            got: spec.sample_rate,
        }
        .into());
    }

    if spec.channels == 0 || spec.channels > 2 {
        return Err(AudioError::InvalidChannels(spec.channels).into());
    }

    if spec.channels == 2 {
        audio = audio
            .chunks(2)
            .map(|chunk| chunk.iter().sum::<f32>() / 2.0)
            .collect();
    }

    Ok(audio)
}

/// Zero-pad or truncate to exactly `len` samples.
pub fn pad_or_trim(audio: &[f32], len: usize) -> Vec<f32> {
    let mut out = audio[..audio.len().min(len)].to_vec();
    out.resize(len, 0.0);
    out
}

/// Periodic Hann window.
fn hann_window(window_length: usize) -> Vec<f32> {
    (0..window_length)
        .map(|i| 0.5 - 0.5 * ((2.0 * PI * i as f32) / window_length as f32).cos())
        .collect()
}

/// Reflect-pad by `pad` samples on both sides, mirroring around the edges.
fn reflect_pad(audio: &[f32], pad: usize) -> Vec<f32> {
    let n = audio.len() as isize;
    (-(pad as isize)..n + pad as isize)
        .map(|i| {
            let i = i.abs();
            let i = if i >= n { 2 * (n - 1) - i } else { i };
            audio[i.clamp(0, n - 1) as usize]
        })
        .collect()
}

/// Centered STFT power spectrogram, `(n_fft / 2 + 1, frames)`.
///
/// The trailing frame is dropped so the frame count equals
/// `audio.len() / hop_length`.
fn stft(audio: &[f32], n_fft: usize, hop_length: usize) -> Array2<f32> {
    let window = hann_window(n_fft);
    let padded = reflect_pad(audio, n_fft / 2);
    let num_frames = audio.len() / hop_length;
    let freq_bins = n_fft / 2 + 1;
    let mut spectrogram = Array2::<f32>::zeros((freq_bins, num_frames));

    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(n_fft);
    let mut frame = vec![Complex::new(0.0, 0.0); n_fft];

    for frame_idx in 0..num_frames {
        let start = frame_idx * hop_length;

        for (i, slot) in frame.iter_mut().enumerate() {
            *slot = Complex::new(padded[start + i] * window[i], 0.0);
        }

        fft.process(&mut frame);

        for k in 0..freq_bins {
            spectrogram[[k, frame_idx]] = frame[k].norm_sqr();
        }
    }

    spectrogram
}

const MIN_LOG_HZ: f32 = 1000.0;
const MIN_LOG_MEL: f32 = 15.0;
const LINEAR_HZ_PER_MEL: f32 = 200.0 / 3.0;

fn log_step() -> f32 {
    6.4f32.ln() / 27.0
}

/// Slaney mel scale: linear below 1kHz, logarithmic above.
fn hz_to_mel(freq: f32) -> f32 {
    if freq >= MIN_LOG_HZ {
        MIN_LOG_MEL + (freq / MIN_LOG_HZ).ln() / log_step()
    } else {
        freq / LINEAR_HZ_PER_MEL
    }
}

fn mel_to_hz(mel: f32) -> f32 {
    if mel >= MIN_LOG_MEL {
        MIN_LOG_HZ * (log_step() * (mel - MIN_LOG_MEL)).exp()
    } else {
        mel * LINEAR_HZ_PER_MEL
    }
}

/// Slaney-normalized triangular mel filterbank, `(n_mels, n_fft / 2 + 1)`.
fn mel_filterbank(n_fft: usize, n_mels: usize, sample_rate: usize) -> Array2<f32> {
    let freq_bins = n_fft / 2 + 1;
    let mut filterbank = Array2::<f32>::zeros((n_mels, freq_bins));

    let max_mel = hz_to_mel(sample_rate as f32 / 2.0);
    let mel_points: Vec<f32> = (0..n_mels + 2)
        .map(|i| mel_to_hz(max_mel * i as f32 / (n_mels + 1) as f32))
        .collect();

    let freq_bin_width = sample_rate as f32 / n_fft as f32;

    for mel_idx in 0..n_mels {
        let left = mel_points[mel_idx];
        let center = mel_points[mel_idx + 1];
        let right = mel_points[mel_idx + 2];
        let enorm = 2.0 / (right - left);

        for freq_idx in 0..freq_bins {
            let freq = freq_idx as f32 * freq_bin_width;
            let lower = (freq - left) / (center - left);
            let upper = (right - freq) / (right - center);

            filterbank[[mel_idx, freq_idx]] = lower.min(upper).max(0.0) * enorm;
        }
    }

    filterbank
}

/// Log10 mel power, floored at 8 below the peak and scaled to roughly [-1, 1].
fn log_mel_spectrogram(audio: &[f32], config: &LogMelSpectrogram) -> Array2<f32> {
    let spectrogram = stft(audio, config.n_fft, config.hop_length);
    let filterbank = mel_filterbank(config.n_fft, config.n_mels, config.sample_rate);

    let mel = filterbank.dot(&spectrogram).mapv(|x| x.max(1e-10).log10());
    let peak = mel.fold(f32::NEG_INFINITY, |acc, &x| acc.max(x));

    mel.mapv(|x| (x.max(peak - 8.0) + 4.0) / 4.0)
}
