//! Encoder output in, transcription out.

use crate::assembler::ResultAssembler;
use crate::codec::ByteLevelCodec;
use crate::decoding::{DecodingConfig, DecodingOutcome, GreedyDecoder};
use crate::error::{ConfigError, Result};
use crate::logits::LogitsPipeline;
use crate::task::Prompt;
use crate::traits::{DecoderModel, EncoderOutput};
use crate::types::Transcription;
use crate::vocab::VocabularyTable;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

/// Greedy decoding followed by result assembly.
///
/// Holds only read-only state between calls. Decoding state and the cache
/// belong to a single [`Transcriber::transcribe`] call.
#[derive(Clone, Debug)]
pub struct Transcriber {
    decoder: GreedyDecoder,
    assembler: ResultAssembler,
}

impl Transcriber {
    /// Large-v3 defaults: 100 steps, the 88-token suppression mask, and a
    /// lenient codec.
    pub fn new(vocabulary: VocabularyTable) -> Result<Self> {
        Self::with_config(
            vocabulary,
            DecodingConfig::default(),
            LogitsPipeline::default(),
            ByteLevelCodec::default(),
        )
    }

    pub fn with_config(
        vocabulary: VocabularyTable,
        config: DecodingConfig,
        pipeline: LogitsPipeline,
        codec: ByteLevelCodec,
    ) -> Result<Self> {
        if config.vocab_size > vocabulary.len() {
            return Err(ConfigError::VocabularyMismatch {
                expected: config.vocab_size,
                got: vocabulary.len(),
            }
            .into());
        }

        Ok(Self {
            decoder: GreedyDecoder::new(config, pipeline)?,
            assembler: ResultAssembler::new(vocabulary, codec),
        })
    }

    /// See [`GreedyDecoder::with_cancellation`].
    pub fn with_cancellation(mut self, flag: Arc<AtomicBool>) -> Self {
        self.decoder = self.decoder.with_cancellation(flag);
        self
    }

    pub fn decoder(&self) -> &GreedyDecoder {
        &self.decoder
    }

    pub fn assembler(&self) -> &ResultAssembler {
        &self.assembler
    }

    /// Decode `encoder_output` starting from `prompt`.
    pub fn transcribe<M>(
        &self,
        model: &mut M,
        encoder_output: &EncoderOutput,
        prompt: &Prompt,
    ) -> Result<Transcription>
    where
        M: DecoderModel + ?Sized,
    {
        let DecodingOutcome { tokens, .. } = self.decoder.decode(model, encoder_output, prompt)?;
        self.assembler.assemble(&tokens)
    }
}
