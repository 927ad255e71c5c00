//! Byte-level text codec for BPE token symbols.
//!
//! Vocabulary symbols spell raw bytes as printable characters: bytes in
//! `[33, 126]`, `[161, 172]` and `[174, 255]` stand for themselves, every
//! other byte is shifted to a code point from 256 upward in ascending byte
//! order. Decoding inverts the table and reads the bytes back as UTF-8.

use crate::error::TokenError;
use std::collections::HashMap;
use std::sync::LazyLock;

static TABLE: LazyLock<ByteTable> = LazyLock::new(ByteTable::new);

struct ByteTable {
    byte_to_char: [char; 256],
    char_to_byte: HashMap<char, u8>,
}

impl ByteTable {
    fn new() -> Self {
        let mut byte_to_char = ['\0'; 256];
        let mut char_to_byte = HashMap::with_capacity(256);
        let mut shifted = 0u32;

        for byte in 0..=255u8 {
            let c = if is_printable(byte) {
                char::from(byte)
            } else {
                shifted += 1;
                // 256..=323 are all valid scalar values
                char::from_u32(255 + shifted).unwrap_or(char::REPLACEMENT_CHARACTER)
            };

            byte_to_char[byte as usize] = c;
            char_to_byte.insert(c, byte);
        }

        Self {
            byte_to_char,
            char_to_byte,
        }
    }
}

fn is_printable(byte: u8) -> bool {
    matches!(byte, 33..=126 | 161..=172 | 174..=255)
}

/// Handling of characters that have no byte in the table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UnmappedPolicy {
    /// Substitute a zero byte and keep going.
    #[default]
    ZeroByte,
    /// Fail with [`TokenError::UnmappedCharacter`].
    Reject,
}

/// Reversible byte ↔ character codec.
#[derive(Clone, Copy, Debug, Default)]
pub struct ByteLevelCodec {
    policy: UnmappedPolicy,
}

impl ByteLevelCodec {
    pub fn new(policy: UnmappedPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> UnmappedPolicy {
        self.policy
    }

    /// Concatenate token symbols and decode them to text.
    ///
    /// Invalid UTF-8 sequences become U+FFFD. With [`UnmappedPolicy::ZeroByte`]
    /// this never fails; a character outside the basic multilingual plane
    /// becomes two zero bytes.
    pub fn decode<I, S>(&self, symbols: I) -> Result<String, TokenError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut bytes = Vec::new();
        let mut unmapped = 0usize;

        for symbol in symbols {
            for c in symbol.as_ref().chars() {
                match TABLE.char_to_byte.get(&c) {
                    Some(&byte) => bytes.push(byte),
                    None if self.policy == UnmappedPolicy::Reject => {
                        return Err(TokenError::UnmappedCharacter(c));
                    }
                    // one zero byte per UTF-16 unit
                    None => {
                        unmapped += 1;
                        bytes.extend(std::iter::repeat_n(0, c.len_utf16()));
                    }
                }
            }
        }

        if unmapped > 0 {
            tracing::warn!(unmapped, "substituted zero bytes for unmapped characters");
        }

        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Spell raw bytes as a symbol string.
    pub fn encode(bytes: &[u8]) -> String {
        bytes
            .iter()
            .map(|&b| TABLE.byte_to_char[b as usize])
            .collect()
    }
}
