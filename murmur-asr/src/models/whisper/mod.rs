//! Whisper v3 exported as three ONNX graphs: encoder, cross-attention
//! initializer and cached decoder.

pub mod core;
pub mod inference;

pub use self::core::WhisperModel;
