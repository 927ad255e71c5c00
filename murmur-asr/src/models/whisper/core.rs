//! Whisper model definition and loading.

use crate::cache::CacheGeometry;
use crate::error::ConfigError;
use crate::types::ModelRepo;
use eyre::{Result, WrapErr};
use ort::session::Session;
use ort::session::builder::SessionBuilder;

/// Input and output names of a session, in declaration order.
#[derive(Clone, Debug)]
pub(super) struct Signature {
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
}

impl Signature {
    fn of(session: &Session) -> Self {
        Self {
            inputs: session.inputs.iter().map(|i| i.name.clone()).collect(),
            outputs: session.outputs.iter().map(|o| o.name.clone()).collect(),
        }
    }

    fn expect(
        names: &[String],
        model: &'static str,
        kind: &'static str,
        expected: usize,
    ) -> std::result::Result<(), ConfigError> {
        if names.len() != expected {
            return Err(ConfigError::ModelSignature {
                model,
                kind,
                expected,
                got: names.len(),
            });
        }
        Ok(())
    }
}

/// Which cache tensors the decoder returns after its logits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum CacheOutputs {
    /// `[self_k, self_v, cross_k, cross_v]` per layer
    Full,
    /// `[self_k, self_v]` per layer
    SelfOnly,
}

/// Whisper model for ONNX inference.
///
/// Decoder inputs are bound by position: the last token `(1, 1)` as i64, the
/// encoder output, then the flattened cache. Outputs are the logits followed
/// by the cache.
pub struct WhisperModel {
    pub(super) encoder: Session,
    pub(super) cross_attention_init: Session,
    pub(super) decoder: Session,
    pub(super) geometry: CacheGeometry,
    pub(super) encoder_signature: Signature,
    pub(super) cross_attention_signature: Signature,
    pub(super) decoder_signature: Signature,
    pub(super) cache_outputs: CacheOutputs,
}

impl WhisperModel {
    pub const ENCODER_FILES: &[&str] = &["whisper_v3_encoder.onnx", "encoder.onnx"];

    pub const CROSS_ATTENTION_FILES: &[&str] = &[
        "whisper_v3_decoder_cross_attention_initializer.onnx",
        "cross_attention_initializer.onnx",
    ];

    pub const DECODER_FILES: &[&str] = &["whisper_v3_decoder.onnx", "decoder.onnx"];

    /// Wrap loaded sessions, checking their arity against `geometry`.
    pub fn new(
        encoder: Session,
        cross_attention_init: Session,
        decoder: Session,
        geometry: CacheGeometry,
    ) -> crate::error::Result<Self> {
        let encoder_signature = Signature::of(&encoder);
        Signature::expect(&encoder_signature.inputs, "encoder", "inputs", 1)?;
        Signature::expect(&encoder_signature.outputs, "encoder", "outputs", 1)?;

        let cross_attention_signature = Signature::of(&cross_attention_init);
        Signature::expect(
            &cross_attention_signature.inputs,
            "cross-attention initializer",
            "inputs",
            1,
        )?;
        Signature::expect(
            &cross_attention_signature.outputs,
            "cross-attention initializer",
            "outputs",
            geometry.layers * 2,
        )?;

        let decoder_signature = Signature::of(&decoder);
        Signature::expect(
            &decoder_signature.inputs,
            "decoder",
            "inputs",
            2 + geometry.bundle_len(),
        )?;

        let cache_outputs = match decoder_signature.outputs.len().checked_sub(1) {
            Some(n) if n == geometry.bundle_len() => CacheOutputs::Full,
            Some(n) if n == geometry.layers * 2 => CacheOutputs::SelfOnly,
            _ => {
                return Err(ConfigError::ModelSignature {
                    model: "decoder",
                    kind: "outputs",
                    expected: 1 + geometry.bundle_len(),
                    got: decoder_signature.outputs.len(),
                }
                .into());
            }
        };

        tracing::debug!(
            layers = geometry.layers,
            ?cache_outputs,
            "decoder signature verified"
        );

        Ok(Self {
            encoder,
            cross_attention_init,
            decoder,
            geometry,
            encoder_signature,
            cross_attention_signature,
            decoder_signature,
            cache_outputs,
        })
    }

    /// Load Whisper large-v3 from a model repository.
    pub fn from_repo(repo: &ModelRepo, session_builder: SessionBuilder) -> Result<Self> {
        let encoder_path = repo.resolve_any(Self::ENCODER_FILES)?;
        let cross_attention_path = repo.resolve_any(Self::CROSS_ATTENTION_FILES)?;
        let decoder_path = repo.resolve_any(Self::DECODER_FILES)?;

        tracing::info!(encoder = ?encoder_path.display(), "loading encoder session");
        let encoder = session_builder
            .clone()
            .commit_from_file(&encoder_path)
            .wrap_err("failed to load encoder session")?;

        tracing::info!(
            initializer = ?cross_attention_path.display(),
            "loading cross-attention session"
        );
        let cross_attention_init = session_builder
            .clone()
            .commit_from_file(&cross_attention_path)
            .wrap_err("failed to load cross-attention initializer session")?;

        tracing::info!(decoder = ?decoder_path.display(), "loading decoder session");
        let decoder = session_builder
            .commit_from_file(&decoder_path)
            .wrap_err("failed to load decoder session")?;

        let model = Self::new(
            encoder,
            cross_attention_init,
            decoder,
            CacheGeometry::WHISPER_LARGE_V3,
        )
        .wrap_err("model files do not match whisper large-v3")?;

        Ok(model)
    }
}
