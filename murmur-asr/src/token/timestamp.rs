//! Timestamp tokens: one token per 20ms step over a 30 second window.

use super::TokenId;
use crate::error::TokenError;
use std::fmt;

/// Token id of the 0ms timestamp.
const FIRST_ID: TokenId = 50365;

/// Token id of the 30 000ms timestamp.
const LAST_ID: TokenId = 51865;

const FIRST_MS: u32 = 0;
const LAST_MS: u32 = 30_000;

/// Milliseconds between consecutive timestamp tokens.
pub const STEP_MS: u32 = 20;

/// Validated timestamp token.
///
/// Construction fails for ids outside `[50365, 51865]` and for milliseconds
/// outside `[0, 30000]` or off the 20ms grid. Nothing is clamped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp {
    id: TokenId,
}

impl Timestamp {
    /// Timestamp at 0.00s.
    pub const MIN: Timestamp = Timestamp { id: FIRST_ID };

    /// Timestamp at 30.00s.
    pub const MAX: Timestamp = Timestamp { id: LAST_ID };

    pub fn from_id(id: TokenId) -> Result<Self, TokenError> {
        if !Self::contains(id) {
            return Err(TokenError::TimestampIdOutOfRange {
                id,
                min: FIRST_ID,
                max: LAST_ID,
            });
        }

        Ok(Self { id })
    }

    pub fn from_ms(ms: u32) -> Result<Self, TokenError> {
        if !(FIRST_MS..=LAST_MS).contains(&ms) {
            return Err(TokenError::TimestampOutOfRange {
                ms,
                min: FIRST_MS,
                max: LAST_MS,
            });
        }

        if ms % STEP_MS != 0 {
            return Err(TokenError::TimestampMisaligned { ms, step: STEP_MS });
        }

        Ok(Self {
            id: ms / STEP_MS + FIRST_ID,
        })
    }

    /// Whether `id` falls in the timestamp token range.
    pub fn contains(id: TokenId) -> bool {
        (FIRST_ID..=LAST_ID).contains(&id)
    }

    pub fn id(self) -> TokenId {
        self.id
    }

    pub fn ms(self) -> u32 {
        (self.id - FIRST_ID) * STEP_MS
    }

    pub fn secs(self) -> f32 {
        self.ms() as f32 / 1000.0
    }

    /// Vocabulary symbol, e.g. `<|1.52|>`.
    pub fn symbol(self) -> String {
        let ms = self.ms();
        // centiseconds; the dropped millisecond digit is always zero
        format!("<|{}.{:02}|>", ms / 1000, (ms % 1000) / 10)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.symbol())
    }
}
