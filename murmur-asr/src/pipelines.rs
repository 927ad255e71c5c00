//! High-level transcription pipeline.

use crate::audio::read_audio_mono;
use crate::error::Result;
use crate::models::whisper::WhisperModel;
use crate::preprocessor::WhisperPreprocessor;
use crate::task::{Prompt, TranscriptionTask};
use crate::traits::{AudioPreprocessor, Encoder};
use crate::transcriber::Transcriber;
use crate::types::{ModelRepo, Transcription};
use crate::vocab::VocabularyTable;
use eyre::{Result as EyreResult, WrapErr};
use ort::session::builder::SessionBuilder;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

/// Whisper large-v3 pipeline: log-mel features, ONNX encoder and greedy
/// decoding.
pub struct Whisper {
    preprocessor: WhisperPreprocessor,
    model: WhisperModel,
    transcriber: Transcriber,
}

impl Whisper {
    pub const VOCAB_FILES: &[&str] = &["whisper_v3_vocab.json", "vocab.json"];
    pub const ADDED_TOKENS_FILES: &[&str] =
        &["whisper_v3_added_tokens.json", "added_tokens.json"];
    pub const TOKENIZER_FILE: &str = "tokenizer.json";

    pub fn new(
        preprocessor: WhisperPreprocessor,
        model: WhisperModel,
        transcriber: Transcriber,
    ) -> Self {
        Self {
            preprocessor,
            model,
            transcriber,
        }
    }

    /// Load the pipeline from a model repository.
    ///
    /// The vocabulary comes from a `vocab.json` and `added_tokens.json` pair
    /// when both exist, otherwise from `tokenizer.json`.
    pub fn from_repo(repo: &ModelRepo, session_builder: SessionBuilder) -> EyreResult<Self> {
        let vocabulary = load_vocabulary(repo)?;
        tracing::info!(size = vocabulary.len(), "vocabulary loaded");

        let model = WhisperModel::from_repo(repo, session_builder)?;
        tracing::info!("model loaded");

        let transcriber =
            Transcriber::new(vocabulary).wrap_err("vocabulary does not fit whisper large-v3")?;

        Ok(Self::new(WhisperPreprocessor::default(), model, transcriber))
    }

    /// See [`Transcriber::with_cancellation`].
    pub fn with_cancellation(mut self, flag: Arc<AtomicBool>) -> Self {
        self.transcriber = self.transcriber.with_cancellation(flag);
        self
    }

    /// Transcribe up to 30 seconds of 16kHz mono audio.
    pub fn transcribe(&mut self, audio: &[f32], task: &TranscriptionTask) -> Result<Transcription> {
        self.transcribe_with_prompt(audio, &task.prompt())
    }

    /// Transcribe with caller-supplied start tokens.
    pub fn transcribe_with_prompt(
        &mut self,
        audio: &[f32],
        prompt: &Prompt,
    ) -> Result<Transcription> {
        let features = self.preprocessor.preprocess(audio)?;
        let encoder_output = self.model.encode(features)?;

        self.transcriber
            .transcribe(&mut self.model, &encoder_output, prompt)
    }

    /// Load a WAV file and transcribe it.
    pub fn transcribe_file(
        &mut self,
        path: impl AsRef<Path>,
        task: &TranscriptionTask,
    ) -> Result<Transcription> {
        let audio = read_audio_mono(path)?;
        let duration_sec = audio.len() as f32 / crate::audio::SAMPLE_RATE as f32;

        if audio.len() > self.preprocessor.mel().n_samples {
            tracing::warn!(duration_sec, "audio longer than one window is truncated");
        }

        self.transcribe(&audio, task)
    }
}

fn load_vocabulary(repo: &ModelRepo) -> EyreResult<VocabularyTable> {
    let pair = repo
        .resolve_any(Whisper::VOCAB_FILES)
        .and_then(|vocab| Ok((vocab, repo.resolve_any(Whisper::ADDED_TOKENS_FILES)?)));

    match pair {
        Ok((vocab, added)) => VocabularyTable::from_files(&vocab, &added)
            .wrap_err_with(|| format!("failed to load vocabulary from {:?}", vocab.display())),
        Err(e) => {
            tracing::debug!(error = %e, "no vocabulary pair, falling back to tokenizer");
            let path = repo.resolve(Whisper::TOKENIZER_FILE)?;
            VocabularyTable::from_tokenizer_file(&path)
                .wrap_err_with(|| format!("failed to load tokenizer from {:?}", path.display()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_tokenizer_json() {
        let dir = std::env::temp_dir().join(format!("murmur-pipeline-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let result = load_vocabulary(&ModelRepo::Path(dir.clone()));

        let message = format!("{:?}", result.unwrap_err());
        assert!(message.contains("tokenizer.json"), "{message}");

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn prefers_vocabulary_pair() {
        let dir = std::env::temp_dir().join(format!("murmur-pair-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("vocab.json"), r#"{"a": 0}"#).unwrap();
        std::fs::write(dir.join("added_tokens.json"), r#"{"<|endoftext|>": 1}"#).unwrap();

        let vocabulary = load_vocabulary(&ModelRepo::Path(dir.clone())).unwrap();

        assert_eq!(vocabulary.len(), 2);

        std::fs::remove_dir_all(&dir).ok();
    }
}
