//! Start-token prompts and the task builder that produces them.

use crate::error::ConfigError;
use crate::token::{Language, SpecialToken, TokenId, WhisperToken};

/// Validated start-token sequence.
///
/// The first token seeds the decoder and must carry an id. Later tokens are
/// forced at their positions; tokens without an id (such as
/// [`Language::Auto`]) leave their position to the model.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Prompt {
    tokens: Vec<WhisperToken>,
    seed: TokenId,
}

impl Prompt {
    pub fn new(tokens: Vec<WhisperToken>) -> Result<Self, ConfigError> {
        let first = tokens.first().ok_or(ConfigError::EmptyPrompt)?;
        let seed = first
            .id()
            .ok_or_else(|| ConfigError::MissingSeedToken(first.to_string()))?;

        Ok(Self { tokens, seed })
    }

    /// Decoder input for step 0.
    pub fn seed(&self) -> TokenId {
        self.seed
    }

    pub fn tokens(&self) -> &[WhisperToken] {
        &self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Timestamps are generated unless the prompt asks for no timestamps.
    pub fn with_timestamps(&self) -> bool {
        !self
            .tokens
            .contains(&WhisperToken::Special(SpecialToken::NoTimestamps))
    }
}

impl Default for Prompt {
    /// `[SOT, AUTO, TRANSCRIBE, NO_TIMESTAMPS]`
    fn default() -> Self {
        TranscriptionTask::new().prompt()
    }
}

/// Whether to transcribe in the spoken language or translate to English.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Task {
    #[default]
    Transcribe,
    Translate,
}

impl Task {
    pub fn token(self) -> SpecialToken {
        match self {
            Task::Transcribe => SpecialToken::Transcribe,
            Task::Translate => SpecialToken::Translate,
        }
    }
}

/// Builder for start-token prompts.
///
/// Defaults to automatic language detection, transcription and no
/// timestamps.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TranscriptionTask {
    pub language: Language,
    pub task: Task,
    pub timestamps: bool,
}

impl TranscriptionTask {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    pub fn transcribe(mut self) -> Self {
        self.task = Task::Transcribe;
        self
    }

    pub fn translate(mut self) -> Self {
        self.task = Task::Translate;
        self
    }

    pub fn with_timestamps(mut self) -> Self {
        self.timestamps = true;
        self
    }

    pub fn no_timestamps(mut self) -> Self {
        self.timestamps = false;
        self
    }

    /// `[SOT, language, task]`, followed by no-timestamps unless timestamps
    /// are requested.
    pub fn prompt(&self) -> Prompt {
        let mut tokens = vec![
            WhisperToken::from(SpecialToken::StartOfTranscript),
            WhisperToken::from(self.language),
            WhisperToken::from(self.task.token()),
        ];

        if !self.timestamps {
            tokens.push(WhisperToken::from(SpecialToken::NoTimestamps));
        }

        Prompt {
            tokens,
            seed: SpecialToken::StartOfTranscript.id(),
        }
    }
}
