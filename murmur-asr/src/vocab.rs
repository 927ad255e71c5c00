//! Dense id → symbol vocabulary table.

use crate::error::{ResourceError, Result, TokenError};
use crate::token::TokenId;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tokenizers::Tokenizer;

/// Vocabulary indexed by token id.
///
/// Built from a base vocabulary and an added-tokens table. Entries are written
/// base first, then added; an added token whose id collides with a base entry
/// overwrites it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VocabularyTable {
    symbols: Vec<Option<String>>,
}

impl VocabularyTable {
    /// Build the table from symbol → id maps.
    pub fn build<B, A>(base: B, added: A) -> Result<Self>
    where
        B: IntoIterator<Item = (String, TokenId)>,
        A: IntoIterator<Item = (String, TokenId)>,
    {
        let entries: Vec<_> = base.into_iter().chain(added).collect();

        let size = entries
            .iter()
            .map(|(_, id)| *id as usize + 1)
            .max()
            .ok_or(ResourceError::EmptyVocabulary)?;

        let mut symbols = vec![None; size];
        for (symbol, id) in entries {
            symbols[id as usize] = Some(symbol);
        }

        let holes = symbols.iter().filter(|s| s.is_none()).count();
        if holes > 0 {
            tracing::warn!(holes, size, "vocabulary ids are not contiguous");
        }

        Ok(Self { symbols })
    }

    /// Load from `vocab.json` and `added_tokens.json` style files.
    pub fn from_files(vocab_path: &Path, added_tokens_path: &Path) -> Result<Self> {
        let base = read_symbol_map(vocab_path)?;
        let added = read_symbol_map(added_tokens_path)?;

        tracing::debug!(base = base.len(), added = added.len(), "loaded vocabulary");

        Self::build(base, added)
    }

    /// Extract the vocabulary of a HuggingFace tokenizer.
    pub fn from_tokenizer(tokenizer: &Tokenizer) -> Result<Self> {
        let base = tokenizer.get_vocab(false);
        let added = tokenizer
            .get_added_tokens_decoder()
            .into_iter()
            .map(|(id, token)| (token.content, id));

        Self::build(base, added)
    }

    /// Load from a HuggingFace `tokenizer.json`.
    pub fn from_tokenizer_file(path: &Path) -> Result<Self> {
        let tokenizer = Tokenizer::from_file(path).map_err(ResourceError::Tokenizer)?;
        Self::from_tokenizer(&tokenizer)
    }

    /// Number of ids covered by the table (max id + 1).
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Symbol for `id`.
    pub fn symbol(&self, id: TokenId) -> std::result::Result<&str, TokenError> {
        self.symbols
            .get(id as usize)
            .and_then(Option::as_deref)
            .ok_or(TokenError::UnknownTokenId {
                id,
                size: self.symbols.len(),
            })
    }

    /// Id of `symbol`, by linear scan.
    pub fn id_of(&self, symbol: &str) -> Option<TokenId> {
        self.symbols
            .iter()
            .position(|s| s.as_deref() == Some(symbol))
            .map(|i| i as TokenId)
    }
}

fn read_symbol_map(path: &Path) -> Result<HashMap<String, TokenId>> {
    if !path.exists() {
        return Err(ResourceError::NotFound(path.to_path_buf()).into());
    }

    let file = File::open(path).map_err(|source| ResourceError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let map = serde_json::from_reader(BufReader::new(file)).map_err(|source| {
        ResourceError::Malformed {
            path: path.to_path_buf(),
            source,
        }
    })?;

    Ok(map)
}
