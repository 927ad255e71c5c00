//! Decoding loop and result assembly against scripted decoders.

use murmur_asr::cache::{CacheGeometry, KvCache, KvTensor};
use murmur_asr::decoding::{DecodingConfig, GreedyDecoder, Termination};
use murmur_asr::error::{Error, ModelError, Result, TranscriptionError};
use murmur_asr::logits::LogitsPipeline;
use murmur_asr::task::{Prompt, TranscriptionTask};
use murmur_asr::token::{Language, SpecialToken, Timestamp, TokenId};
use murmur_asr::traits::{DecoderModel, DecoderStep, EncoderOutput};
use murmur_asr::transcriber::Transcriber;
use murmur_asr::vocab::VocabularyTable;
use ndarray::{Array3, Axis};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

const VOCAB: usize = 51866;
const EOT: TokenId = SpecialToken::EndOfText.id();
const H: TokenId = 71;
const I: TokenId = 72;

const GEOMETRY: CacheGeometry = CacheGeometry {
    layers: 2,
    heads: 2,
    head_dim: 4,
};

/// Full-size vocabulary with filler text symbols and the real special ids.
fn vocabulary() -> VocabularyTable {
    let base = (0..EOT).map(|id| {
        let symbol = match id {
            H => "h".to_string(),
            I => "i".to_string(),
            _ => format!("t{id}"),
        };
        (symbol, id)
    });

    let specials = SpecialToken::ALL
        .into_iter()
        .map(|token| (token.symbol().to_string(), token.id()));
    let languages = Language::ALL
        .iter()
        .filter_map(|language| Some((language.symbol()?, language.id()?)));
    let unused = (50361..=50363).map(|id| (format!("<|unused{id}|>"), id));
    let timestamps = (Timestamp::MIN.id()..=Timestamp::MAX.id())
        .filter_map(|id| Some((Timestamp::from_id(id).ok()?.symbol(), id)));

    VocabularyTable::build(
        base,
        specials.chain(languages).chain(unused).chain(timestamps),
    )
    .unwrap()
}

fn encoder_output() -> EncoderOutput {
    Array3::zeros((1, 6, 8))
}

fn english() -> Prompt {
    TranscriptionTask::new().language(Language::English).prompt()
}

/// Decoder that prefers one scripted token per call, with a weaker backup.
struct ScriptedDecoder {
    script: Vec<TokenId>,
    fallback: TokenId,
    backup: TokenId,
    vocab: usize,
    fail_at: Option<usize>,
    cancel_at: Option<(usize, Arc<AtomicBool>)>,
    inputs: Vec<TokenId>,
    cache_lens: Vec<usize>,
    cross_intact: bool,
}

impl ScriptedDecoder {
    fn new(script: impl IntoIterator<Item = TokenId>, fallback: TokenId) -> Self {
        Self {
            script: script.into_iter().collect(),
            fallback,
            backup: H,
            vocab: VOCAB,
            fail_at: None,
            cancel_at: None,
            inputs: Vec::new(),
            cache_lens: Vec::new(),
            cross_intact: true,
        }
    }

    fn always(token: TokenId) -> Self {
        Self::new([], token)
    }

    fn kv(len: usize, fill: f32) -> KvTensor {
        KvTensor::from_elem((1, GEOMETRY.heads, len, GEOMETRY.head_dim), fill)
    }
}

impl DecoderModel for ScriptedDecoder {
    fn geometry(&self) -> CacheGeometry {
        GEOMETRY
    }

    fn cross_attention(&mut self, encoder_output: &EncoderOutput) -> Result<Vec<KvTensor>> {
        let frames = encoder_output.len_of(Axis(1));
        Ok(vec![Self::kv(frames, 0.25); GEOMETRY.layers * 2])
    }

    fn step(
        &mut self,
        token: TokenId,
        _encoder_output: &EncoderOutput,
        cache: &KvCache,
    ) -> Result<DecoderStep> {
        let call = self.inputs.len();
        self.inputs.push(token);
        self.cache_lens.push(cache.seq_len());
        self.cross_intact &= cache
            .cross_attention()
            .layers()
            .iter()
            .all(|pair| pair.key.iter().chain(&pair.value).all(|&x| x == 0.25));

        if self.fail_at == Some(call) {
            return Err(ModelError::MissingOutput {
                name: "logits".into(),
            }
            .into());
        }

        if let Some((at, flag)) = &self.cancel_at
            && *at == call
        {
            flag.store(true, Ordering::Relaxed);
        }

        let preferred = self.script.get(call).copied().unwrap_or(self.fallback);
        let mut logits = Array3::zeros((1, 1, self.vocab));
        logits[[0, 0, self.backup as usize]] = 5.0;
        logits[[0, 0, preferred as usize]] = 10.0;

        let len = cache.seq_len() + 1;
        Ok(DecoderStep {
            logits,
            self_attention: vec![Self::kv(len, call as f32); GEOMETRY.layers * 2],
        })
    }
}

fn decoder(max_steps: usize) -> GreedyDecoder {
    let config = DecodingConfig {
        max_steps,
        ..Default::default()
    };
    GreedyDecoder::new(config, LogitsPipeline::default()).unwrap()
}

#[test]
fn immediate_end_of_text_yields_empty_text() {
    let transcriber = Transcriber::new(vocabulary()).unwrap();
    let mut model = ScriptedDecoder::always(EOT);

    let result = transcriber
        .transcribe(&mut model, &encoder_output(), &english())
        .unwrap();

    let ids: Vec<_> = result.tokens.iter().map(|t| t.id).collect();
    assert_eq!(ids, [50258, 50259, 50360, 50364, EOT]);
    assert_eq!(result.text, "");
    assert_eq!(
        result.raw_text,
        "<|startoftranscript|><|en|><|transcribe|><|notimestamps|><|endoftext|>"
    );
}

#[test]
fn decodes_text_until_end_of_text() {
    let transcriber = Transcriber::new(vocabulary()).unwrap();
    let mut model = ScriptedDecoder::new([0, 0, 0, H, I, EOT], I);

    let result = transcriber
        .transcribe(&mut model, &encoder_output(), &english())
        .unwrap();

    assert_eq!(result.text, "hi");
    assert_eq!(result.tokens.len(), 7);
    assert_eq!(model.inputs, [50258, 50259, 50360, 50364, H, I]);
}

#[test]
fn stops_at_step_limit_without_end_of_text() {
    let mut model = ScriptedDecoder::always(H);

    let outcome = decoder(100)
        .decode(&mut model, &encoder_output(), &english())
        .unwrap();

    assert_eq!(outcome.steps, 100);
    assert_eq!(outcome.tokens.len(), 101);
    assert_eq!(outcome.termination, Termination::StepLimit);
    assert!(!outcome.tokens.contains(&EOT));
}

#[test]
fn end_of_text_stops_within_limit() {
    for eot_call in 3..12 {
        let script = (0..eot_call).map(|_| I).chain([EOT]);
        let mut model = ScriptedDecoder::new(script, H);

        let outcome = decoder(10)
            .decode(&mut model, &encoder_output(), &english())
            .unwrap();

        assert!(outcome.tokens.len() <= 11);
        if eot_call < 10 {
            assert_eq!(outcome.termination, Termination::EndOfText);
            assert_eq!(outcome.steps, eot_call + 1);
            assert_eq!(outcome.tokens.last(), Some(&EOT));
        } else {
            assert_eq!(outcome.termination, Termination::StepLimit);
            assert_eq!(outcome.steps, 10);
        }
    }
}

#[test]
fn cache_grows_by_one_per_step_and_cross_attention_is_untouched() {
    let mut model = ScriptedDecoder::always(H);

    decoder(12)
        .decode(&mut model, &encoder_output(), &english())
        .unwrap();

    assert_eq!(model.cache_lens, (0..12).collect::<Vec<_>>());
    assert!(model.cross_intact);
}

#[test]
fn decoder_failure_aborts_without_partial_result() {
    let transcriber = Transcriber::new(vocabulary()).unwrap();
    let mut model = ScriptedDecoder::always(H);
    model.fail_at = Some(5);

    let err = transcriber
        .transcribe(&mut model, &encoder_output(), &english())
        .unwrap_err();

    match err {
        Error::Transcription(TranscriptionError::StepFailed { step, source }) => {
            assert_eq!(step, 5);
            assert!(matches!(
                *source,
                Error::Model(ModelError::MissingOutput { .. })
            ));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn wrong_logits_width_fails_the_step() {
    let mut model = ScriptedDecoder::always(H);
    model.vocab = 51865;

    let err = decoder(10)
        .decode(&mut model, &encoder_output(), &english())
        .unwrap_err();

    match err {
        Error::Transcription(TranscriptionError::StepFailed { step: 0, source }) => {
            assert!(matches!(
                *source,
                Error::Model(ModelError::LogitsSize {
                    expected: 51866,
                    got: 51865
                })
            ));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn auto_language_is_chosen_by_the_model() {
    let mut model = ScriptedDecoder::new([Language::German.id().unwrap()], EOT);

    let outcome = decoder(10)
        .decode(&mut model, &encoder_output(), &Prompt::default())
        .unwrap();

    assert_eq!(outcome.tokens, [50258, 50261, 50360, 50364, EOT]);
}

#[test]
fn begin_suppression_blocks_end_of_text_after_preamble() {
    let prompt = TranscriptionTask::new()
        .language(Language::English)
        .with_timestamps()
        .prompt();
    // wants to stop right after the preamble
    let mut model = ScriptedDecoder::new([0, 0, EOT], EOT);

    let outcome = decoder(10)
        .decode(&mut model, &encoder_output(), &prompt)
        .unwrap();

    assert_eq!(outcome.tokens, [50258, 50259, 50360, H, EOT]);
}

#[test]
fn begin_suppression_blocks_leading_timestamp() {
    let transcriber = Transcriber::new(vocabulary()).unwrap();
    let prompt = TranscriptionTask::new()
        .language(Language::English)
        .with_timestamps()
        .prompt();
    let at = |ms| Timestamp::from_ms(ms).unwrap().id();
    let mut model = ScriptedDecoder::new([0, 0, at(0), H, I, at(1000)], EOT);

    let result = transcriber
        .transcribe(&mut model, &encoder_output(), &prompt)
        .unwrap();

    assert_eq!(result.tokens[3].id, H);
    assert_eq!(result.text, "hhi");
    assert!(result.segments.is_empty());
}

#[test]
fn timestamps_are_grouped_into_segments() {
    let transcriber = Transcriber::new(vocabulary()).unwrap();
    let prompt = TranscriptionTask::new()
        .language(Language::English)
        .with_timestamps()
        .prompt();
    let at = |ms| Timestamp::from_ms(ms).unwrap().id();
    let mut model = ScriptedDecoder::new([0, 0, at(20), H, I, at(1000)], EOT);

    let result = transcriber
        .transcribe(&mut model, &encoder_output(), &prompt)
        .unwrap();

    assert_eq!(result.text, "hi");
    assert_eq!(result.segments.len(), 1);
    assert_eq!(result.segments[0].text, "hi");
    assert!((result.segments[0].start - 0.02).abs() < 1e-6);
    assert!((result.segments[0].end - 1.0).abs() < 1e-6);
}

#[test]
fn cancellation_before_first_step() {
    let flag = Arc::new(AtomicBool::new(true));
    let mut model = ScriptedDecoder::always(H);

    let err = decoder(10)
        .with_cancellation(flag)
        .decode(&mut model, &encoder_output(), &english())
        .unwrap_err();

    assert!(matches!(
        err,
        Error::Transcription(TranscriptionError::Cancelled { step: 0 })
    ));
    assert!(model.inputs.is_empty());
}

#[test]
fn cancellation_is_observed_between_steps() {
    let flag = Arc::new(AtomicBool::new(false));
    let mut model = ScriptedDecoder::always(H);
    model.cancel_at = Some((3, flag.clone()));

    let transcriber = Transcriber::new(vocabulary())
        .unwrap()
        .with_cancellation(flag);

    let err = transcriber
        .transcribe(&mut model, &encoder_output(), &english())
        .unwrap_err();

    assert!(matches!(
        err,
        Error::Transcription(TranscriptionError::Cancelled { step: 4 })
    ));
    assert_eq!(model.inputs.len(), 4);
}
