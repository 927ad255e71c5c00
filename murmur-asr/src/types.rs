//! Core types for murmur-asr

use crate::token::TokenId;
use eyre::{OptionExt, Result, WrapErr};
use hf_hub::CacheRepo;
use hf_hub::api::sync::ApiRepo;
use serde::Serialize;
use std::path::PathBuf;

/// Emitted token with its vocabulary symbol.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Token {
    pub id: TokenId,
    pub symbol: String,
}

/// Text segment with timestamps.
///
/// Represents a portion of transcribed text between two timestamp tokens,
/// with start and end times in seconds.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Segment {
    /// Transcribed text
    pub text: String,
    /// Start time in seconds
    pub start: f32,
    /// End time in seconds
    pub end: f32,
}

/// Result of one transcription.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Transcription {
    /// Decoded text including special markers such as `<|en|>`.
    pub raw_text: String,
    /// Text with special markers removed and surrounding whitespace trimmed.
    pub text: String,
    /// Tokens up to and including end-of-text.
    pub tokens: Vec<Token>,
    /// Timestamped segments; empty when decoding without timestamps.
    pub segments: Vec<Segment>,
}

/// Model repository sources.
#[derive(Debug)]
pub enum ModelRepo {
    /// Local filesystem path
    Path(PathBuf),
    /// HuggingFace cache repository
    Cache(CacheRepo),
    /// HuggingFace API repository
    Api(ApiRepo),
}

impl ModelRepo {
    /// Resolve a file name to its full path in this repository.
    pub fn resolve(&self, file_name: &str) -> Result<PathBuf> {
        match self {
            ModelRepo::Path(path) => path
                .join(file_name)
                .canonicalize()
                .wrap_err(format!("failed to resolve model file: {file_name}")),
            ModelRepo::Cache(cache_repo) => cache_repo
                .get(file_name)
                .ok_or_eyre(format!("model file not found in cache: {file_name}")),
            ModelRepo::Api(api_repo) => api_repo
                .get(file_name)
                .wrap_err(format!("failed to download from api: {file_name}")),
        }
    }

    /// Try resolving multiple file names, return first successful match.
    pub fn resolve_any(&self, candidates: &[&str]) -> Result<PathBuf> {
        candidates
            .iter()
            .find_map(|name| self.resolve(name).ok())
            .ok_or_eyre(format!("no model file found from candidates: {candidates:?}"))
    }
}
