//! Audio preprocessor for Whisper models.

use crate::audio::LogMelSpectrogram;
use crate::error::Result;
use crate::traits::AudioPreprocessor;
use ndarray::{Array3, Axis};

/// Whisper audio preprocessor.
///
/// Produces batched log-mel features of shape `(1, n_mels, n_frames)`.
#[derive(Clone, Debug)]
pub struct WhisperPreprocessor {
    mel: LogMelSpectrogram,
}

impl WhisperPreprocessor {
    pub fn new(mel: LogMelSpectrogram) -> Self {
        Self { mel }
    }

    pub fn mel(&self) -> &LogMelSpectrogram {
        &self.mel
    }
}

impl Default for WhisperPreprocessor {
    fn default() -> Self {
        Self::new(LogMelSpectrogram::WHISPER_V3)
    }
}

impl AudioPreprocessor for WhisperPreprocessor {
    type Features = Array3<f32>;

    fn preprocess(&self, audio: &[f32]) -> Result<Self::Features> {
        Ok(self.mel.apply(audio).insert_axis(Axis(0)))
    }
}
