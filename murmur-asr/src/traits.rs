//! Seams between the decoding core and the neural network.
//!
//! The core never runs a model itself. Feature extraction, encoding,
//! cross-attention initialization and the per-step decoder are supplied by
//! implementations of these traits, either the ONNX adapters in
//! [`crate::models`] or scripted stand-ins in tests.

use crate::cache::{CacheGeometry, KvCache, KvTensor};
use crate::error::Result;
use crate::token::TokenId;
use ndarray::Array3;

/// Encoder hidden states, `(batch, frames, width)`.
pub type EncoderOutput = Array3<f32>;

/// Converts raw audio into model-specific features.
pub trait AudioPreprocessor {
    /// Feature type consumed by the matching [`Encoder`].
    type Features;

    fn preprocess(&self, audio: &[f32]) -> Result<Self::Features>;
}

/// Runs the audio encoder once per transcription.
pub trait Encoder {
    type Features;

    /// Note: takes `&mut self` because ONNX Runtime's `Session::run` requires it.
    fn encode(&mut self, features: Self::Features) -> Result<EncoderOutput>;
}

/// Output of one decoder call.
#[derive(Clone, Debug)]
pub struct DecoderStep {
    /// `(batch, positions, vocab)`; only the last position is used.
    pub logits: Array3<f32>,
    /// New self-attention tensors as `[k0, v0, k1, v1, ...]`.
    pub self_attention: Vec<KvTensor>,
}

/// Autoregressive decoder with a key/value cache.
pub trait DecoderModel {
    /// Dimensions of the cache this decoder reads and writes.
    fn geometry(&self) -> CacheGeometry;

    /// Compute cross-attention key/value tensors as `[k0, v0, k1, v1, ...]`.
    ///
    /// Called once per transcription, before the first step.
    fn cross_attention(&mut self, encoder_output: &EncoderOutput) -> Result<Vec<KvTensor>>;

    /// Run one decode step for `token` against the current cache.
    fn step(
        &mut self,
        token: TokenId,
        encoder_output: &EncoderOutput,
        cache: &KvCache,
    ) -> Result<DecoderStep>;
}

impl<M: DecoderModel + ?Sized> DecoderModel for &mut M {
    fn geometry(&self) -> CacheGeometry {
        (**self).geometry()
    }

    fn cross_attention(&mut self, encoder_output: &EncoderOutput) -> Result<Vec<KvTensor>> {
        (**self).cross_attention(encoder_output)
    }

    fn step(
        &mut self,
        token: TokenId,
        encoder_output: &EncoderOutput,
        cache: &KvCache,
    ) -> Result<DecoderStep> {
        (**self).step(token, encoder_output, cache)
    }
}
