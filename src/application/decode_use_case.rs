// ============================================================
// Layer 2 — DecodeUseCase
// ============================================================
// Orchestrates one beam search decode in order:
//
//   Step 1: Resolve the decode config   (Layer 6 - infra)
//   Step 2: Load the sequence model     (Layer 6 - infra)
//   Step 3: Run beam search             (Layer 5 - ml)
//   Step 4: Detokenise hypotheses       (Layer 6 - infra)
//   Step 5: Save the report (optional)  (Layer 6 - infra)
//
// Reference: Rust Book §10 (Generics and Traits)
//            Burn Book §3 (Backends)

use anyhow::{bail, Context, Result};
use burn::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::domain::traits::Detokenizer;
use crate::infra::{
    model_store::{write_json, ModelStore},
    tokenizer_store::{IdDetokenizer, TokenizerStore, VocabularyDetokenizer},
};
use crate::ml::{
    generator::{beam_decode, DecodeOutput},
    sequence_model::{BigramModel, ReplayModel, SequenceModel},
};

// ─── Decode Configuration ────────────────────────────────────────────────────
// Search parameters for one decode. Missing JSON fields fall back
// to the defaults, so a config file may set only what it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeConfig {
    pub beam_size: usize,
    pub max_steps: usize,
    pub sos_id:    u32,
    pub eos_id:    u32,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            beam_size: 10,
            max_steps: 128,
            sos_id:    101, // [CLS]
            eos_id:    102, // [SEP]
        }
    }
}

impl DecodeConfig {
    pub fn validate(&self) -> Result<()> {
        if self.beam_size == 0 {
            bail!("beam_size must be at least 1");
        }
        if self.max_steps == 0 {
            bail!("max_steps must be at least 1");
        }
        Ok(())
    }
}

/// Command line values that replace fields of the loaded config
#[derive(Debug, Clone, Default)]
pub struct DecodeOverrides {
    pub beam_size: Option<usize>,
    pub max_steps: Option<usize>,
    pub sos_id:    Option<u32>,
    pub eos_id:    Option<u32>,
}

impl DecodeOverrides {
    pub fn apply(&self, mut cfg: DecodeConfig) -> DecodeConfig {
        if let Some(v) = self.beam_size { cfg.beam_size = v; }
        if let Some(v) = self.max_steps { cfg.max_steps = v; }
        if let Some(v) = self.sos_id    { cfg.sos_id    = v; }
        if let Some(v) = self.eos_id    { cfg.eos_id    = v; }
        cfg
    }
}

/// Where the successor log-probabilities come from
#[derive(Debug, Clone)]
pub enum ModelSource {
    Trace(PathBuf),
    Bigram(PathBuf),
}

// ─── Decode Report ───────────────────────────────────────────────────────────
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedQuery {
    pub rank:      usize,
    pub text:      String,
    pub token_ids: Vec<u32>,
    pub log_prob:  f32,
    pub completed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecodeReport {
    pub config:    DecodeConfig,
    pub steps:     usize,
    pub converged: bool,
    pub queries:   Vec<RankedQuery>,
}

// ─── DecodeUseCase ────────────────────────────────────────────────────────────
pub struct DecodeUseCase {
    pub source:      ModelSource,
    pub config_path: Option<PathBuf>,
    pub overrides:   DecodeOverrides,
    pub tokenizer:   Option<PathBuf>,
    pub output:      Option<PathBuf>,
}

impl DecodeUseCase {
    /// Execute the decode on the given backend
    pub fn execute<B: Backend>(&self, device: &B::Device) -> Result<DecodeReport> {
        // ── Step 1: Resolve config ────────────────────────────────────────────
        let base = match &self.config_path {
            Some(path) => ModelStore::load_config(path)?,
            None       => DecodeConfig::default(),
        };
        let cfg = self.overrides.apply(base);
        cfg.validate()?;
        tracing::info!(
            "Decoding with beam_size={}, max_steps={}, sos={}, eos={}",
            cfg.beam_size, cfg.max_steps, cfg.sos_id, cfg.eos_id
        );

        // ── Step 2 + 3: Load the model and search ─────────────────────────────
        let (output, vocabulary) = match &self.source {
            ModelSource::Trace(path) => {
                let trace     = ModelStore::load_trace(path)?;
                let mut model = ReplayModel::<B>::new(trace, device)?;
                run(&mut model, &cfg, device)?
            }
            ModelSource::Bigram(path) => {
                let table     = ModelStore::load_bigram(path)?;
                let mut model = BigramModel::<B>::from_table(table, device)?;
                check_token_ids(&cfg, model.vocab_size())?;
                run(&mut model, &cfg, device)?
            }
        };
        tracing::info!(
            "Search took {} steps (converged: {}), {} hypotheses",
            output.steps,
            output.converged,
            output.hypotheses.len()
        );

        // ── Step 4: Detokenise ───────────────────────────────────────────────
        let detokenizer = self.detokenizer(vocabulary)?;
        let queries = output
            .hypotheses
            .iter()
            .map(|h| {
                Ok(RankedQuery {
                    rank:      h.rank,
                    text:      detokenizer.detokenize(&h.token_ids)?,
                    token_ids: h.token_ids.clone(),
                    log_prob:  h.log_prob,
                    completed: h.completed,
                })
            })
            .collect::<Result<Vec<_>>>()
            .context("Cannot detokenise hypotheses")?;

        let report = DecodeReport {
            config:    cfg,
            steps:     output.steps,
            converged: output.converged,
            queries,
        };

        // ── Step 5: Save report ──────────────────────────────────────────────
        if let Some(path) = &self.output {
            write_json(path, &report, "decode report")?;
            tracing::info!("Saved decode report to '{}'", path.display());
        }

        Ok(report)
    }

    /// Tokenizer file first, then the model's own vocabulary, then raw IDs
    fn detokenizer(&self, vocabulary: Option<Vec<String>>) -> Result<Box<dyn Detokenizer>> {
        if let Some(path) = &self.tokenizer {
            return Ok(Box::new(TokenizerStore::new(path).load()?));
        }
        Ok(match vocabulary {
            Some(tokens) => Box::new(VocabularyDetokenizer::new(tokens)),
            None         => Box::new(IdDetokenizer),
        })
    }
}

fn run<B: Backend, M: SequenceModel<B>>(
    model:  &mut M,
    cfg:    &DecodeConfig,
    device: &B::Device,
) -> Result<(DecodeOutput, Option<Vec<String>>)> {
    let output     = beam_decode(model, cfg, device)?;
    let vocabulary = model.vocabulary().map(<[String]>::to_vec);
    Ok((output, vocabulary))
}

/// A bigram model indexes its table by token, so both marker IDs must be rows
fn check_token_ids(cfg: &DecodeConfig, vocab_size: usize) -> Result<()> {
    for (name, id) in [("sos_id", cfg.sos_id), ("eos_id", cfg.eos_id)] {
        if id as usize >= vocab_size {
            bail!("{} {} is outside the bigram vocabulary of {}", name, id, vocab_size);
        }
    }
    Ok(())
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use std::fs;

    type B = NdArray;

    fn overrides(beam_size: usize, sos_id: u32, eos_id: u32) -> DecodeOverrides {
        DecodeOverrides {
            beam_size: Some(beam_size),
            max_steps: Some(10),
            sos_id:    Some(sos_id),
            eos_id:    Some(eos_id),
        }
    }

    fn write_trace(dir: &std::path::Path) -> PathBuf {
        let path = dir.join("trace.json");
        let json = r#"{
            "vocab_size": 3,
            "tokens": ["A", "B", "[SEP]"],
            "steps": [
                [[-0.1, -2.0, -5.0], [0.0, 0.0, 0.0]],
                [[-3.0, -4.0, -0.05], [-1.0, -1.5, -3.0]],
                [[-7.0, -7.0, -7.0], [-0.2, -9.0, -0.3]]
            ]
        }"#;
        fs::write(&path, json).unwrap();
        path
    }

    #[test]
    fn test_default_config() {
        let cfg = DecodeConfig::default();
        assert_eq!((cfg.beam_size, cfg.max_steps, cfg.sos_id, cfg.eos_id), (10, 128, 101, 102));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_partial_config_json_uses_defaults() {
        let cfg: DecodeConfig = serde_json::from_str(r#"{"beam_size": 3}"#).unwrap();
        assert_eq!(cfg.beam_size, 3);
        assert_eq!(cfg.max_steps, 128);
    }

    #[test]
    fn test_zero_beam_size_is_invalid() {
        let cfg = DecodeConfig { beam_size: 0, ..DecodeConfig::default() };
        assert!(cfg.validate().is_err());
        let cfg = DecodeConfig { max_steps: 0, ..DecodeConfig::default() };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_overrides_replace_only_given_fields() {
        let o   = DecodeOverrides { beam_size: Some(4), ..Default::default() };
        let cfg = o.apply(DecodeConfig::default());
        assert_eq!(cfg.beam_size, 4);
        assert_eq!(cfg.eos_id, 102);
    }

    #[test]
    fn test_trace_decode_uses_trace_vocabulary() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("report.json");
        let use_case = DecodeUseCase {
            source:      ModelSource::Trace(write_trace(dir.path())),
            config_path: None,
            overrides:   overrides(2, 0, 2),
            tokenizer:   None,
            output:      Some(out.clone()),
        };

        let report = use_case.execute::<B>(&Default::default()).unwrap();
        assert!(report.converged);
        let texts: Vec<&str> = report.queries.iter().map(|q| q.text.as_str()).collect();
        assert_eq!(texts, vec!["A", "B A"]);

        let saved: DecodeReport = serde_json::from_str(&fs::read_to_string(out).unwrap()).unwrap();
        assert_eq!(saved.queries.len(), 2);
    }

    #[test]
    fn test_bigram_decode_without_vocabulary_prints_ids() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("bigram.json");
        // 0 → 1 → 2 (EOS); token 3 is the start marker and prefers 0
        fs::write(&path, r#"{"logits": [
            [0, 9, 0, 0], [0, 0, 9, 0], [0, 0, 9, 0], [9, 0, 0, 0]
        ]}"#).unwrap();

        let use_case = DecodeUseCase {
            source:      ModelSource::Bigram(path),
            config_path: None,
            overrides:   overrides(1, 3, 2),
            tokenizer:   None,
            output:      None,
        };

        let report = use_case.execute::<B>(&Default::default()).unwrap();
        assert_eq!(report.queries[0].text, "0 1");
        assert!(report.queries[0].completed);
    }

    #[test]
    fn test_bigram_rejects_out_of_range_markers() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("bigram.json");
        fs::write(&path, r#"{"logits": [[0, 0], [0, 0]]}"#).unwrap();

        let use_case = DecodeUseCase {
            source:      ModelSource::Bigram(path),
            config_path: None,
            overrides:   DecodeOverrides { beam_size: Some(1), ..Default::default() },
            tokenizer:   None,
            output:      None,
        };
        assert!(use_case.execute::<B>(&Default::default()).is_err());
    }
}
