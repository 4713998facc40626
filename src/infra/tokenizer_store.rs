// ============================================================
// Layer 6 — Tokenizer Store
// ============================================================
// Turns hypotheses (output vocabulary IDs) back into text.
//
// Three detokenisers, tried in this order by the decode use case:
//   1. TokenizerDetokenizer  — a HuggingFace tokenizer.json, the
//                              same file the model was trained with
//   2. VocabularyDetokenizer — token strings shipped with a trace
//                              or bigram table, joined by spaces
//   3. IdDetokenizer         — the raw IDs, joined by spaces
//
// Special tokens ([CLS], [SEP], [PAD]) are skipped when decoding
// with a real tokenizer so they never leak into a query.
//
// Reference: HuggingFace tokenizers documentation

use anyhow::{anyhow, Result};
use std::path::PathBuf;
use tokenizers::Tokenizer;

use crate::domain::traits::Detokenizer;

pub struct TokenizerStore {
    path: PathBuf,
}

impl TokenizerStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load the tokenizer JSON file
    pub fn load(&self) -> Result<TokenizerDetokenizer> {
        let tokenizer = Tokenizer::from_file(&self.path)
            .map_err(|e| anyhow!(
                "Cannot load tokenizer from '{}': {}", self.path.display(), e
            ))?;

        tracing::info!(
            "Loaded tokenizer with {} tokens from '{}'",
            tokenizer.get_vocab_size(true),
            self.path.display()
        );
        Ok(TokenizerDetokenizer { tokenizer })
    }
}

// ─── Detokenizers ─────────────────────────────────────────────────────────────
pub struct TokenizerDetokenizer {
    tokenizer: Tokenizer,
}

impl Detokenizer for TokenizerDetokenizer {
    fn detokenize(&self, token_ids: &[u32]) -> Result<String> {
        self.tokenizer
            .decode(token_ids, true)
            .map_err(|e| anyhow!("Decode: {e}"))
    }
}

pub struct VocabularyDetokenizer {
    tokens: Vec<String>,
}

impl VocabularyDetokenizer {
    pub fn new(tokens: Vec<String>) -> Self {
        Self { tokens }
    }
}

impl Detokenizer for VocabularyDetokenizer {
    fn detokenize(&self, token_ids: &[u32]) -> Result<String> {
        let words = token_ids
            .iter()
            .map(|&id| {
                self.tokens
                    .get(id as usize)
                    .map(String::as_str)
                    .ok_or_else(|| anyhow!(
                        "Token id {} is outside the vocabulary of {}", id, self.tokens.len()
                    ))
            })
            .collect::<Result<Vec<&str>>>()?;
        Ok(words.join(" "))
    }
}

pub struct IdDetokenizer;

impl Detokenizer for IdDetokenizer {
    fn detokenize(&self, token_ids: &[u32]) -> Result<String> {
        Ok(token_ids.iter().map(u32::to_string).collect::<Vec<_>>().join(" "))
    }
}
