//! Turns emitted token ids into text.

use crate::codec::ByteLevelCodec;
use crate::error::Result;
use crate::token::{SpecialToken, Timestamp, TokenId};
use crate::types::{Segment, Token, Transcription};
use crate::vocab::VocabularyTable;
use regex::Regex;
use std::sync::LazyLock;

/// `<|...|>` markers: special, language and timestamp symbols.
static SPECIAL_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<\|[a-z0-9.]+\|>").expect("marker pattern is valid"));

/// Resolves ids against the vocabulary and decodes the result.
#[derive(Clone, Debug)]
pub struct ResultAssembler {
    vocabulary: VocabularyTable,
    codec: ByteLevelCodec,
}

impl ResultAssembler {
    pub fn new(vocabulary: VocabularyTable, codec: ByteLevelCodec) -> Self {
        Self { vocabulary, codec }
    }

    pub fn vocabulary(&self) -> &VocabularyTable {
        &self.vocabulary
    }

    /// Resolve `ids` in order, stopping after the first id whose symbol is
    /// end-of-text.
    ///
    /// Without end-of-text every id is kept.
    pub fn assemble(&self, ids: &[TokenId]) -> Result<Transcription> {
        let mut tokens = Vec::with_capacity(ids.len());

        for &id in ids {
            let symbol = self.vocabulary.symbol(id)?;
            let end = symbol == SpecialToken::EndOfText.symbol();
            tokens.push(Token {
                id,
                symbol: symbol.to_owned(),
            });

            if end {
                break;
            }
        }

        let raw_text = self.codec.decode(tokens.iter().map(|t| &t.symbol))?;
        let text = strip_markers(&raw_text);
        let segments = self.segments(&tokens)?;

        Ok(Transcription {
            raw_text,
            text,
            tokens,
            segments,
        })
    }

    /// Group text between timestamp pairs.
    ///
    /// Text after an unclosed start timestamp is left out of the segments but
    /// still appears in the transcription text.
    fn segments(&self, tokens: &[Token]) -> Result<Vec<Segment>> {
        let mut segments = Vec::new();
        let mut start: Option<Timestamp> = None;
        let mut pending: Vec<&str> = Vec::new();

        for token in tokens {
            if let Ok(timestamp) = Timestamp::from_id(token.id) {
                match start.take() {
                    None => start = Some(timestamp),
                    Some(begin) => {
                        let text = self.codec.decode(pending.drain(..))?;
                        let text = text.trim();
                        if !text.is_empty() {
                            segments.push(Segment {
                                text: text.to_owned(),
                                start: begin.secs(),
                                end: timestamp.secs(),
                            });
                        }
                    }
                }
                continue;
            }

            if start.is_some() && token.id < SpecialToken::EndOfText.id() {
                pending.push(&token.symbol);
            }
        }

        Ok(segments)
    }
}

fn strip_markers(raw: &str) -> String {
    SPECIAL_MARKER.replace_all(raw, "").trim().to_owned()
}
