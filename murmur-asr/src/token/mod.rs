//! Closed Whisper v3 token sets: special, language and timestamp tokens.
//!
//! Every catalog token is a validated value type. [`WhisperToken`] is the
//! tagged union handed to the decoder as a start token, and exposes the one
//! capability all variants share: an optional id and an optional symbol.

pub mod language;
pub mod special;
pub mod timestamp;

pub use language::Language;
pub use special::SpecialToken;
pub use timestamp::Timestamp;

use std::borrow::Cow;
use std::fmt;

/// Numeric token id, as used by the vocabulary and the decoder input.
pub type TokenId = u32;

/// Any token that can appear in a start-token prompt.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum WhisperToken {
    Special(SpecialToken),
    Language(Language),
    Timestamp(Timestamp),
    /// Arbitrary vocabulary entry
    Text { id: TokenId, symbol: String },
}

impl WhisperToken {
    /// Token id, or `None` for [`Language::Auto`] which lets the model choose.
    pub fn id(&self) -> Option<TokenId> {
        match self {
            WhisperToken::Special(token) => Some(token.id()),
            WhisperToken::Language(language) => language.id(),
            WhisperToken::Timestamp(timestamp) => Some(timestamp.id()),
            WhisperToken::Text { id, .. } => Some(*id),
        }
    }

    /// Vocabulary symbol, or `None` for [`Language::Auto`].
    pub fn symbol(&self) -> Option<Cow<'_, str>> {
        match self {
            WhisperToken::Special(token) => Some(Cow::Borrowed(token.symbol())),
            WhisperToken::Language(language) => language.symbol().map(Cow::Owned),
            WhisperToken::Timestamp(timestamp) => Some(Cow::Owned(timestamp.symbol())),
            WhisperToken::Text { symbol, .. } => Some(Cow::Borrowed(symbol)),
        }
    }
}

impl fmt::Display for WhisperToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.symbol(), self.id()) {
            (Some(symbol), _) => f.write_str(&symbol),
            (None, Some(id)) => write!(f, "#{id}"),
            (None, None) => f.write_str("<auto>"),
        }
    }
}

impl From<SpecialToken> for WhisperToken {
    fn from(token: SpecialToken) -> Self {
        WhisperToken::Special(token)
    }
}

impl From<Language> for WhisperToken {
    fn from(language: Language) -> Self {
        WhisperToken::Language(language)
    }
}

impl From<Timestamp> for WhisperToken {
    fn from(timestamp: Timestamp) -> Self {
        WhisperToken::Timestamp(timestamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_language_has_no_id_or_symbol() {
        let token = WhisperToken::from(Language::Auto);

        assert_eq!(token.id(), None);
        assert_eq!(token.symbol(), None);
        assert_eq!(token.to_string(), "<auto>");
    }

    #[test]
    fn shares_id_and_symbol_across_variants() {
        let tokens = [
            WhisperToken::from(SpecialToken::Transcribe),
            WhisperToken::from(Language::German),
            WhisperToken::from(Timestamp::MIN),
            WhisperToken::Text {
                id: 71,
                symbol: "h".into(),
            },
        ];

        let ids: Vec<_> = tokens.iter().map(WhisperToken::id).collect();
        let symbols: Vec<_> = tokens.iter().map(|t| t.to_string()).collect();

        assert_eq!(ids, [Some(50360), Some(50261), Some(50365), Some(71)]);
        assert_eq!(symbols, ["<|transcribe|>", "<|de|>", "<|0.00|>", "h"]);
    }
}
