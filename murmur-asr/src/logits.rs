//! Per-step logits processing.
//!
//! Rules run in a fixed order on the last position's logits:
//!
//! 1. [`SuppressionMask`]: fixed vocabulary indices are set to −∞.
//! 2. [`ForcedToken`]: while the prompt still has a token for the next
//!    position, every entry but that token is set to −∞ and the token to 0.
//! 3. [`BeginSuppression`]: right after the three-token preamble, blank and
//!    end-of-text (and with timestamps enabled, no-timestamps and the first
//!    timestamp) are set to −∞.
//!
//! A forced token overrides the suppression mask, and begin suppression cannot
//! undo a forced token because everything but the target is already −∞.

use crate::error::TokenError;
use crate::task::Prompt;
use crate::token::{SpecialToken, Timestamp, TokenId};
use ndarray::Array1;

/// Negative infinity in the decoder's logits precision.
pub const NEG_INF: f32 = f32::NEG_INFINITY;

/// `suppress_tokens` from the Whisper large-v3 generation config.
const WHISPER_V3_SUPPRESS_TOKENS: [TokenId; 88] = [
    1, 2, 7, 8, 9, 10, 14, 25, 26, 27, 28, 29, 31, 58, 59, 60, 61, 62, 63, 90, 91, 92, 93, 359,
    503, 522, 542, 873, 893, 902, 918, 922, 931, 1350, 1853, 1982, 2460, 2627, 3246, 3253, 3268,
    3536, 3846, 3961, 4183, 4667, 6585, 6647, 7273, 9061, 9383, 10428, 10929, 11938, 12033, 12331,
    12562, 13793, 14157, 14635, 15265, 15618, 16553, 16604, 18362, 18956, 20075, 21675, 22520,
    26130, 26161, 26435, 28279, 29464, 31650, 32302, 32470, 36865, 42863, 47425, 49870, 50254,
    50258, 50359, 50360, 50361, 50362, 50363,
];

/// Blank (space) token suppressed at the first free position.
const BLANK_ID: TokenId = 220;

/// Number of emitted tokens after which begin suppression applies.
const BEGIN_INDEX: usize = 3;

/// What the pipeline needs to know about the current step.
#[derive(Clone, Copy, Debug)]
pub struct StepContext<'a> {
    /// Zero-based decode step.
    pub step: usize,
    /// Tokens emitted so far, seed included.
    pub emitted: usize,
    pub prompt: &'a Prompt,
}

/// Fixed set of indices forced to −∞ at every step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SuppressionMask {
    indices: Vec<usize>,
}

impl SuppressionMask {
    pub fn new(indices: impl IntoIterator<Item = TokenId>) -> Self {
        let mut indices: Vec<usize> = indices.into_iter().map(|id| id as usize).collect();
        indices.sort_unstable();
        indices.dedup();
        Self { indices }
    }

    /// The large-v3 suppression list.
    pub fn whisper_v3() -> Self {
        Self::new(WHISPER_V3_SUPPRESS_TOKENS)
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Check every index against the vocabulary size.
    pub fn validate(&self, vocab_size: usize) -> Result<(), TokenError> {
        match self.indices.last() {
            Some(&max) if max >= vocab_size => Err(TokenError::UnknownTokenId {
                id: max as TokenId,
                size: vocab_size,
            }),
            _ => Ok(()),
        }
    }

    pub fn apply(&self, logits: &mut Array1<f32>) {
        for &i in &self.indices {
            if let Some(x) = logits.get_mut(i) {
                *x = NEG_INF;
            }
        }
    }
}

/// Forces the prompt token for the next position, if any.
#[derive(Clone, Copy, Debug, Default)]
pub struct ForcedToken;

impl ForcedToken {
    /// Token forced at `step`, if the prompt has one with a real id.
    pub fn target(ctx: &StepContext<'_>) -> Option<TokenId> {
        ctx.prompt.tokens().get(ctx.step + 1).and_then(|token| token.id())
    }

    pub fn apply(&self, ctx: &StepContext<'_>, logits: &mut Array1<f32>) -> Result<(), TokenError> {
        let Some(id) = Self::target(ctx) else {
            return Ok(());
        };

        let size = logits.len();
        logits.fill(NEG_INF);
        let slot = logits
            .get_mut(id as usize)
            .ok_or(TokenError::UnknownTokenId { id, size })?;
        *slot = 0.0;

        Ok(())
    }
}

/// Suppression applied once, right after the preamble.
#[derive(Clone, Copy, Debug, Default)]
pub struct BeginSuppression;

impl BeginSuppression {
    pub fn apply(&self, ctx: &StepContext<'_>, logits: &mut Array1<f32>) {
        if ctx.emitted != BEGIN_INDEX {
            return;
        }

        let mut suppress = vec![BLANK_ID, SpecialToken::EndOfText.id()];
        if ctx.prompt.with_timestamps() {
            suppress.extend([SpecialToken::NoTimestamps.id(), Timestamp::MIN.id()]);
        }

        for id in suppress {
            if let Some(x) = logits.get_mut(id as usize) {
                *x = NEG_INF;
            }
        }
    }
}

/// Ordered logits processors for greedy Whisper decoding.
#[derive(Clone, Debug)]
pub struct LogitsPipeline {
    suppression: SuppressionMask,
    forced: ForcedToken,
    begin: BeginSuppression,
}

impl LogitsPipeline {
    pub fn new(suppression: SuppressionMask) -> Self {
        Self {
            suppression,
            forced: ForcedToken,
            begin: BeginSuppression,
        }
    }

    pub fn suppression(&self) -> &SuppressionMask {
        &self.suppression
    }

    pub fn apply(&self, ctx: &StepContext<'_>, logits: &mut Array1<f32>) -> Result<(), TokenError> {
        self.suppression.apply(logits);
        self.forced.apply(ctx, logits)?;
        self.begin.apply(ctx, logits);
        Ok(())
    }
}

impl Default for LogitsPipeline {
    fn default() -> Self {
        Self::new(SuppressionMask::whisper_v3())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TranscriptionTask;
    use crate::token::Language;
    use ndarray_stats::QuantileExt;
    use proptest::prelude::*;

    const VOCAB: usize = 51866;

    fn ctx(prompt: &Prompt, step: usize) -> StepContext<'_> {
        StepContext {
            step,
            emitted: step + 1,
            prompt,
        }
    }

    #[test]
    fn whisper_v3_mask_fits_the_vocabulary() {
        let mask = SuppressionMask::whisper_v3();

        assert_eq!(mask.indices().len(), 88);
        assert!(mask.validate(VOCAB).is_ok());
        assert!(mask.validate(50000).is_err());
    }

    #[test]
    fn forced_token_overrides_suppression() {
        // translate (50359) is in the suppression mask
        let prompt = TranscriptionTask::new().language(Language::English).translate().prompt();
        let pipeline = LogitsPipeline::default();
        let mut logits = Array1::zeros(VOCAB);

        pipeline.apply(&ctx(&prompt, 1), &mut logits).unwrap();

        assert_eq!(logits.argmax().unwrap(), 50359);
        assert_eq!(logits[50359], 0.0);
    }

    #[test]
    fn auto_language_is_not_forced() {
        let prompt = TranscriptionTask::new().prompt();
        let mut logits = Array1::zeros(VOCAB);
        logits[50262] = 5.0;

        LogitsPipeline::default()
            .apply(&ctx(&prompt, 0), &mut logits)
            .unwrap();

        assert_eq!(logits.argmax().unwrap(), 50262);
    }

    #[test]
    fn nothing_forced_past_the_prompt() {
        let prompt = TranscriptionTask::new().language(Language::English).prompt();
        let mut logits = Array1::from_elem(VOCAB, 1.0);

        LogitsPipeline::default()
            .apply(&ctx(&prompt, prompt.len() - 1), &mut logits)
            .unwrap();

        assert_eq!(logits[1000], 1.0);
    }

    #[test]
    fn begin_suppression_applies_only_after_preamble() {
        let prompt = TranscriptionTask::new()
            .language(Language::English)
            .with_timestamps()
            .prompt();
        let begin = BeginSuppression;

        let mut logits = Array1::zeros(VOCAB);
        begin.apply(&ctx(&prompt, 2), &mut logits);
        for id in [220usize, 50257, 50364, 50365] {
            assert_eq!(logits[id], NEG_INF, "id {id}");
        }

        let mut logits = Array1::zeros(VOCAB);
        begin.apply(&ctx(&prompt, 3), &mut logits);
        assert!(logits.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn begin_suppression_keeps_timestamp_tokens_without_timestamps() {
        let prompt = TranscriptionTask::new().language(Language::English).prompt();
        let mut logits = Array1::zeros(VOCAB);

        BeginSuppression.apply(&ctx(&prompt, 2), &mut logits);

        assert_eq!(logits[220], NEG_INF);
        assert_eq!(logits[50257], NEG_INF);
        assert_eq!(logits[50364], 0.0);
        assert_eq!(logits[50365], 0.0);
    }

    #[test]
    fn forced_token_dominates_begin_suppression() {
        // four-token prompt: position 3 (no-timestamps) is forced at step 2
        let prompt = TranscriptionTask::new().language(Language::English).prompt();
        let mut logits = Array1::zeros(VOCAB);

        LogitsPipeline::default()
            .apply(&ctx(&prompt, 2), &mut logits)
            .unwrap();

        assert_eq!(logits.argmax().unwrap(), 50364);
    }

    #[test]
    fn forced_token_outside_logits_fails() {
        let prompt = TranscriptionTask::new().language(Language::English).prompt();
        let mut logits = Array1::zeros(100);

        assert!(matches!(
            ForcedToken.apply(&ctx(&prompt, 0), &mut logits),
            Err(TokenError::UnknownTokenId { id: 50259, size: 100 })
        ));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn suppressed_indices_are_negative_infinity(
            values in proptest::collection::vec(-50.0f32..50.0, VOCAB..=VOCAB)
        ) {
            let mask = SuppressionMask::whisper_v3();
            let mut logits = Array1::from(values);

            mask.apply(&mut logits);

            for &i in mask.indices() {
                prop_assert_eq!(logits[i], NEG_INF);
            }
        }

        #[test]
        fn forced_id_wins_argmax(
            values in proptest::collection::vec(-1e6f32..1e6, VOCAB..=VOCAB),
            step in 0usize..3,
        ) {
            let prompt = TranscriptionTask::new().language(Language::French).translate().prompt();
            let expected = prompt.tokens()[step + 1].id().unwrap() as usize;
            let mut logits = Array1::from(values);

            LogitsPipeline::default().apply(&ctx(&prompt, step), &mut logits).unwrap();

            prop_assert_eq!(logits.argmax().unwrap(), expected);
        }
    }
}
