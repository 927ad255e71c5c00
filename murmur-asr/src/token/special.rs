//! Special control tokens of the Whisper v3 vocabulary.

use super::TokenId;

/// Fixed set of control tokens.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SpecialToken {
    StartOfTranscript,
    EndOfText,
    Translate,
    Transcribe,
    NoTimestamps,
}

impl SpecialToken {
    pub const ALL: [SpecialToken; 5] = [
        SpecialToken::StartOfTranscript,
        SpecialToken::EndOfText,
        SpecialToken::Translate,
        SpecialToken::Transcribe,
        SpecialToken::NoTimestamps,
    ];

    pub const fn id(self) -> TokenId {
        match self {
            SpecialToken::StartOfTranscript => 50258,
            SpecialToken::EndOfText => 50257,
            SpecialToken::Translate => 50359,
            SpecialToken::Transcribe => 50360,
            SpecialToken::NoTimestamps => 50364,
        }
    }

    pub const fn symbol(self) -> &'static str {
        match self {
            SpecialToken::StartOfTranscript => "<|startoftranscript|>",
            SpecialToken::EndOfText => "<|endoftext|>",
            SpecialToken::Translate => "<|translate|>",
            SpecialToken::Transcribe => "<|transcribe|>",
            SpecialToken::NoTimestamps => "<|notimestamps|>",
        }
    }

    /// Look up a special token by id.
    pub fn from_id(id: TokenId) -> Option<Self> {
        Self::ALL.into_iter().find(|token| token.id() == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        for (i, a) in SpecialToken::ALL.iter().enumerate() {
            for b in &SpecialToken::ALL[i + 1..] {
                assert_ne!(a.id(), b.id(), "{a:?} and {b:?} share an id");
            }
        }
    }

    #[test]
    fn resolves_from_id() {
        assert_eq!(SpecialToken::from_id(50257), Some(SpecialToken::EndOfText));
        assert_eq!(SpecialToken::from_id(50364), Some(SpecialToken::NoTimestamps));
        assert_eq!(SpecialToken::from_id(50361), None);
    }
}
