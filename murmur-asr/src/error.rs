//! Error types for murmur-asr organized by processing stage.

use ndarray::ShapeError;
use ndarray_stats::errors::MinMaxError;
use std::path::PathBuf;
use thiserror::Error;

use crate::token::TokenId;

/// Transcription error variants organized by processing stage.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration stage error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Vocabulary or model resource error
    #[error(transparent)]
    Resource(#[from] ResourceError),

    /// Token construction or lookup error
    #[error(transparent)]
    Token(#[from] TokenError),

    /// Audio loading stage error
    #[error(transparent)]
    Audio(#[from] AudioError),

    /// Model inference stage error
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Decoding loop failure
    #[error(transparent)]
    Transcription(#[from] TranscriptionError),
}

/// Configuration errors, fatal at construction.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Execution device not compiled into this build
    #[error("unsupported execution device: {0} (enable the `{1}` feature)")]
    UnsupportedDevice(String, &'static str),

    /// Execution device name not recognized
    #[error("unknown execution device: {0}")]
    UnknownDevice(String),

    /// Start token list is empty
    #[error("prompt must contain at least one start token")]
    EmptyPrompt,

    /// First start token has no id to seed the decoder with
    #[error("first start token has no token id: {0}")]
    MissingSeedToken(String),

    /// Step limit must allow at least one decoder call
    #[error("invalid max steps: {0} (minimum 1)")]
    InvalidMaxSteps(usize),

    /// Decoder vocabulary is larger than the symbol table
    #[error("decoder vocabulary size {expected} exceeds symbol table size {got}")]
    VocabularyMismatch { expected: usize, got: usize },

    /// Model session does not match the expected decoder signature
    #[error("{model} expects {expected} {kind}, model declares {got}")]
    ModelSignature {
        model: &'static str,
        kind: &'static str,
        expected: usize,
        got: usize,
    },
}

/// Vocabulary and model file errors, fatal at initialization.
#[derive(Debug, Error)]
pub enum ResourceError {
    /// Required file is missing
    #[error("resource not found: {0}")]
    NotFound(PathBuf),

    /// File could not be read
    #[error("failed to read {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File content is not the expected JSON
    #[error("malformed resource {path}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// HuggingFace tokenizer could not be loaded
    #[error("failed to load tokenizer: {0}")]
    Tokenizer(tokenizers::Error),

    /// Vocabulary sources contained no entries
    #[error("vocabulary is empty")]
    EmptyVocabulary,
}

/// Token construction and lookup errors. Values are rejected, never clamped.
#[derive(Debug, Error)]
pub enum TokenError {
    /// Token id outside the vocabulary
    #[error("unknown token id {id} (vocabulary size {size})")]
    UnknownTokenId { id: TokenId, size: usize },

    /// Timestamp token id outside the timestamp range
    #[error("timestamp token id {id} out of range [{min}, {max}]")]
    TimestampIdOutOfRange { id: TokenId, min: TokenId, max: TokenId },

    /// Timestamp milliseconds outside the timestamp range
    #[error("timestamp {ms}ms out of range [{min}, {max}]")]
    TimestampOutOfRange { ms: u32, min: u32, max: u32 },

    /// Timestamp milliseconds not on the step grid
    #[error("timestamp {ms}ms is not a multiple of {step}ms")]
    TimestampMisaligned { ms: u32, step: u32 },

    /// Language code or name not in the catalog
    #[error("unknown language: {0}")]
    UnknownLanguage(String),

    /// Character with no byte mapping (strict decoding only)
    #[error("character {0:?} has no byte mapping")]
    UnmappedCharacter(char),
}

/// Audio loading and validation errors.
#[derive(Debug, Error)]
pub enum AudioError {
    /// Sample rate validation failed
    #[error("invalid sample rate: expected {expected}Hz, got {got}Hz")]
    InvalidSampleRate { expected: u32, got: u32 },

    /// Channel count validation failed
    #[error("invalid channel count: expected mono or stereo, got {0} channels")]
    InvalidChannels(u16),

    /// IO error during audio loading
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// WAV file format error
    #[error(transparent)]
    Hound(#[from] hound::Error),
}

/// Model inference errors (ONNX, ndarray operations, tensor shapes).
#[derive(Debug, Error)]
pub enum ModelError {
    /// Missing expected output tensor
    #[error("missing model output: {name}")]
    MissingOutput { name: String },

    /// Logits row does not cover the vocabulary
    #[error("logits size mismatch: expected {expected}, got {got}")]
    LogitsSize { expected: usize, got: usize },

    /// Decoder returned no positions
    #[error("decoder returned empty logits")]
    EmptyLogits,

    /// Cache tensors do not pair up per layer
    #[error("expected {expected} cache tensors, got {got}")]
    CacheArity { expected: usize, got: usize },

    /// Self-attention cache did not grow by exactly one position
    #[error("layer {layer}: self-attention length {got}, expected {expected}")]
    CacheLength {
        layer: usize,
        expected: usize,
        got: usize,
    },

    /// Cache tensor shape disagrees with the model geometry
    #[error("layer {layer}: cache shape {got:?}, expected heads={heads} head_dim={head_dim}")]
    CacheShape {
        layer: usize,
        got: Vec<usize>,
        heads: usize,
        head_dim: usize,
    },

    /// ONNX Runtime error
    #[error(transparent)]
    Ort(#[from] ort::Error),

    /// ndarray shape error
    #[error(transparent)]
    Shape(#[from] ShapeError),

    /// ndarray-stats min/max error (NaN logits)
    #[error(transparent)]
    MinMax(#[from] MinMaxError),
}

/// Decoding loop failures. Never carries a partial transcript.
#[derive(Debug, Error)]
pub enum TranscriptionError {
    /// A decode step failed, aborting the whole request
    #[error("decode step {step} failed")]
    StepFailed {
        step: usize,
        #[source]
        source: Box<Error>,
    },

    /// Cancellation observed between steps
    #[error("transcription cancelled before step {step}")]
    Cancelled { step: usize },
}

/// Result type alias for murmur-asr operations.
pub type Result<T> = std::result::Result<T, Error>;

// Nested From implementations for automatic error conversion chains

// hound::Error → AudioError → Error
impl From<hound::Error> for Error {
    fn from(e: hound::Error) -> Self {
        Error::Audio(AudioError::Hound(e))
    }
}

// ort::Error → ModelError → Error
impl From<ort::Error> for Error {
    fn from(e: ort::Error) -> Self {
        Error::Model(ModelError::Ort(e))
    }
}

// ShapeError → ModelError → Error
impl From<ShapeError> for Error {
    fn from(e: ShapeError) -> Self {
        Error::Model(ModelError::Shape(e))
    }
}

// MinMaxError → ModelError → Error
impl From<MinMaxError> for Error {
    fn from(e: MinMaxError) -> Self {
        Error::Model(ModelError::MinMax(e))
    }
}
