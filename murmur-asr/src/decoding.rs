//! Greedy autoregressive decoding loop.

use crate::cache::{KvCache, SelfAttentionCache};
use crate::error::{ConfigError, Error, ModelError, Result, TranscriptionError};
use crate::logits::{LogitsPipeline, StepContext};
use crate::task::Prompt;
use crate::token::{SpecialToken, TokenId};
use crate::traits::{DecoderModel, EncoderOutput};
use ndarray::{Array1, Array3, s};
use ndarray_stats::QuantileExt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Decoding limits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DecodingConfig {
    /// Maximum number of decoder calls per transcription.
    pub max_steps: usize,
    /// Expected logits width.
    pub vocab_size: usize,
}

impl DecodingConfig {
    /// Whisper large-v3 vocabulary size.
    pub const WHISPER_V3_VOCAB_SIZE: usize = 51866;

    pub const DEFAULT_MAX_STEPS: usize = 100;

    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.max_steps == 0 {
            return Err(ConfigError::InvalidMaxSteps(self.max_steps));
        }
        Ok(())
    }
}

impl Default for DecodingConfig {
    fn default() -> Self {
        Self {
            max_steps: Self::DEFAULT_MAX_STEPS,
            vocab_size: Self::WHISPER_V3_VOCAB_SIZE,
        }
    }
}

/// Why the loop stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Termination {
    /// The decoder selected end-of-text.
    EndOfText,
    /// `max_steps` decoder calls were made without end-of-text.
    StepLimit,
}

/// Emitted ids of one finished decoding run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodingOutcome {
    /// Seed token followed by one token per step.
    pub tokens: Vec<TokenId>,
    pub steps: usize,
    pub termination: Termination,
}

/// Greedy decoder: one decoder call per step, argmax selection.
#[derive(Clone, Debug)]
pub struct GreedyDecoder {
    config: DecodingConfig,
    pipeline: LogitsPipeline,
    cancel: Option<Arc<AtomicBool>>,
}

impl GreedyDecoder {
    pub fn new(config: DecodingConfig, pipeline: LogitsPipeline) -> Result<Self> {
        config.validate()?;
        pipeline.suppression().validate(config.vocab_size)?;

        Ok(Self {
            config,
            pipeline,
            cancel: None,
        })
    }

    /// Abort with [`TranscriptionError::Cancelled`] once `flag` is set.
    ///
    /// The flag is read between steps only; a running decoder call is never
    /// interrupted.
    pub fn with_cancellation(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn config(&self) -> &DecodingConfig {
        &self.config
    }

    fn cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    /// Decode until end-of-text or the step limit.
    ///
    /// Any failure, including cross-attention initialization, is reported as
    /// [`TranscriptionError::StepFailed`] and discards everything decoded so
    /// far.
    pub fn decode<M>(
        &self,
        model: &mut M,
        encoder_output: &EncoderOutput,
        prompt: &Prompt,
    ) -> Result<DecodingOutcome>
    where
        M: DecoderModel + ?Sized,
    {
        tracing::debug!(
            prompt_len = prompt.len(),
            timestamps = prompt.with_timestamps(),
            max_steps = self.config.max_steps,
            "decoding started"
        );

        let mut cache =
            KvCache::initialize(model, encoder_output).map_err(|e| step_failed(0, e))?;

        let mut tokens = Vec::with_capacity(self.config.max_steps + 1);
        let mut last = prompt.seed();
        tokens.push(last);

        let mut termination = Termination::StepLimit;
        let mut steps = 0;

        for step in 0..self.config.max_steps {
            if self.cancelled() {
                tracing::debug!(step, "decoding cancelled");
                return Err(TranscriptionError::Cancelled { step }.into());
            }

            let ctx = StepContext {
                step,
                emitted: tokens.len(),
                prompt,
            };
            let (token, next) = self
                .step(model, encoder_output, &cache, &ctx, last)
                .map_err(|e| step_failed(step, e))?;

            cache = cache.advance(next).map_err(|e| step_failed(step, e))?;
            tokens.push(token);
            last = token;
            steps = step + 1;

            tracing::trace!(step, token, cache_len = cache.seq_len());

            if token == SpecialToken::EndOfText.id() {
                termination = Termination::EndOfText;
                break;
            }
        }

        if termination == Termination::StepLimit {
            tracing::warn!(steps, "decoding stopped at step limit without end-of-text");
        }

        tracing::debug!(steps, ?termination, "decoding finished");

        Ok(DecodingOutcome {
            tokens,
            steps,
            termination,
        })
    }

    fn step<M>(
        &self,
        model: &mut M,
        encoder_output: &EncoderOutput,
        cache: &KvCache,
        ctx: &StepContext<'_>,
        last: TokenId,
    ) -> Result<(TokenId, SelfAttentionCache)>
    where
        M: DecoderModel + ?Sized,
    {
        let output = model.step(last, encoder_output, cache)?;

        let mut logits = last_position(&output.logits)?;
        if logits.len() != self.config.vocab_size {
            return Err(ModelError::LogitsSize {
                expected: self.config.vocab_size,
                got: logits.len(),
            }
            .into());
        }

        self.pipeline.apply(ctx, &mut logits)?;

        // first index wins on ties
        let token = logits.argmax()? as TokenId;

        let next = SelfAttentionCache::from_tensors(output.self_attention, cache.geometry())?;

        Ok((token, next))
    }
}

fn last_position(logits: &Array3<f32>) -> Result<Array1<f32>> {
    let (batch, positions, _) = logits.dim();
    if batch == 0 || positions == 0 {
        return Err(ModelError::EmptyLogits.into());
    }

    Ok(logits.slice(s![0, positions - 1, ..]).to_owned())
}

fn step_failed(step: usize, source: Error) -> Error {
    TranscriptionError::StepFailed {
        step,
        source: Box::new(source),
    }
    .into()
}
