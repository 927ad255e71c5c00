//! murmur-asr: greedy Whisper v3 decoding with a key/value cache.
//!
//! The crate turns encoder hidden states into text. It owns the token
//! catalog, the logits rules, the cache bookkeeping and the byte-level
//! detokenizer; the neural network itself sits behind traits so the decoding
//! core can run against ONNX sessions or scripted decoders alike.
//!
//! # Architecture
//!
//! - [`traits::AudioPreprocessor`]: raw audio to log-mel features
//! - [`traits::Encoder`]: features to encoder output, once per request
//! - [`traits::DecoderModel`]: cross-attention initialization and one decode
//!   step against a [`cache::KvCache`]
//! - [`decoding::GreedyDecoder`]: the step loop, driven by
//!   [`logits::LogitsPipeline`]
//! - [`assembler::ResultAssembler`]: ids to raw and clean text
//!
//! # Quick Start
//!
//! ```ignore
//! use murmur_asr::pipelines::Whisper;
//! use murmur_asr::session::ExecutionDevice;
//! use murmur_asr::task::TranscriptionTask;
//! use murmur_asr::token::Language;
//! use murmur_asr::types::ModelRepo;
//!
//! let repo = ModelRepo::Path("models/whisper-large-v3".into());
//! let builder = ExecutionDevice::Cpu.session_builder()?;
//! let mut whisper = Whisper::from_repo(&repo, builder)?;
//!
//! let task = TranscriptionTask::new().language(Language::English);
//! let result = whisper.transcribe_file("audio.wav", &task)?;
//! println!("{}", result.text);
//! ```

pub mod assembler;
pub mod audio;
pub mod cache;
pub mod codec;
pub mod decoding;
pub mod error;
pub mod logits;
pub mod models;
pub mod pipelines;
pub mod preprocessor;
pub mod session;
pub mod task;
pub mod token;
pub mod traits;
pub mod transcriber;
pub mod types;
pub mod vocab;
