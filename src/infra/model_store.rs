// ============================================================
// Layer 6 — Model Store
// ============================================================
// Reads and writes the JSON files the decoder works from.
//
// What lives on disk:
//   decode_config.json — beam size, step budget, SOS/EOS ids
//   trace.json         — per-step log-probability matrices
//                        recorded from an external model
//   bigram.json        — a [vocab, vocab] logit table
//
// Example trace.json:
//   {
//     "vocab_size": 3,
//     "tokens": ["A", "B", "[SEP]"],
//     "steps": [
//       [[-0.1, -2.0, -5.0], [0.0, 0.0, 0.0]],
//       ...
//     ]
//   }
//
// Reference: serde_json documentation
//            Rust Book §9 (Error Handling)

use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::{fs, path::Path};

use crate::application::decode_use_case::DecodeConfig;
use crate::ml::sequence_model::{BigramTable, DecodeTrace};

pub struct ModelStore;

impl ModelStore {
    /// Load a decode configuration. Missing fields take their defaults.
    pub fn load_config(path: &Path) -> Result<DecodeConfig> {
        read_json(path, "decode config")
    }

    pub fn load_trace(path: &Path) -> Result<DecodeTrace> {
        let trace: DecodeTrace = read_json(path, "decode trace")?;
        tracing::info!(
            "Loaded trace with {} steps over {} tokens from '{}'",
            trace.steps.len(),
            trace.vocab_size,
            path.display()
        );
        Ok(trace)
    }

    pub fn load_bigram(path: &Path) -> Result<BigramTable> {
        let table: BigramTable = read_json(path, "bigram table")?;
        tracing::info!(
            "Loaded {}x{} bigram table from '{}'",
            table.logits.len(),
            table.logits.len(),
            path.display()
        );
        Ok(table)
    }
}

fn read_json<T: DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Cannot read {} from '{}'", what, path.display()))?;

    serde_json::from_str(&json)
        .with_context(|| format!("Malformed {} in '{}'", what, path.display()))
}

pub(crate) fn write_json<T: Serialize>(path: &Path, value: &T, what: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Cannot create '{}'", parent.display()))?;
        }
    }

    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json)
        .with_context(|| format!("Cannot write {} to '{}'", what, path.display()))?;

    tracing::debug!("Saved {} to '{}'", what, path.display());
    Ok(())
}
