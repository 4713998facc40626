// ============================================================
// Layer 5 — Sequence Models
// ============================================================
// The beam searcher needs something that, given the prefix of
// every beam, answers "how likely is each next token?". That
// contract is the SequenceModel trait:
//
//   prefixes:  [beam_size, steps_so_far + 1]  (Int)
//   returns:   [beam_size, vocab_size]        (log-probabilities)
//
// A trained encoder-decoder transformer implements it by running
// its decoder over the prefixes against the repeated encoder
// context. The two implementations here need no training:
//
//   ReplayModel — replays log-probability matrices recorded from
//                 an external model, one per step
//   BigramModel — a logit table conditioned on each beam's last
//                 token, normalised with log_softmax
//
// Reference: Burn Book §3 (Tensors)
//            Jurafsky & Martin §3 (N-gram Language Models)

use anyhow::{bail, Result};
use burn::prelude::*;
use burn::tensor::{activation::log_softmax, TensorData};
use serde::{Deserialize, Serialize};

// ─── SequenceModel ────────────────────────────────────────────────────────────
pub trait SequenceModel<B: Backend> {
    /// Number of columns in every successor matrix
    fn vocab_size(&self) -> usize;

    /// Log-probability of every successor token, one row per beam
    fn successor_log_probs(&mut self, prefixes: Tensor<B, 2, Int>) -> Result<Tensor<B, 2>>;

    /// Re-order per-beam caches after a step. `mapping[i]` is the
    /// previous slot that current slot `i` descended from.
    fn reorder_beams(&mut self, _mapping: Tensor<B, 1, Int>) -> Result<()> {
        Ok(())
    }

    /// Token strings, when the model carries its own vocabulary
    fn vocabulary(&self) -> Option<&[String]> {
        None
    }
}

// ─── ReplayModel ──────────────────────────────────────────────────────────────
/// A recorded decode: `steps[t][beam][token]` is the log-probability
/// the external model produced at step `t`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecodeTrace {
    pub vocab_size: usize,
    pub steps:      Vec<Vec<Vec<f32>>>,

    #[serde(default)]
    pub tokens: Option<Vec<String>>,
}

pub struct ReplayModel<B: Backend> {
    trace:  DecodeTrace,
    cursor: usize,
    device: B::Device,
}

impl<B: Backend> ReplayModel<B> {
    pub fn new(trace: DecodeTrace, device: &B::Device) -> Result<Self> {
        if trace.vocab_size == 0 {
            bail!("Trace vocabulary size must be at least 1");
        }
        if let Some(tokens) = &trace.tokens {
            if tokens.len() != trace.vocab_size {
                bail!(
                    "Trace lists {} tokens for a vocabulary of {}",
                    tokens.len(),
                    trace.vocab_size
                );
            }
        }
        Ok(Self { trace, cursor: 0, device: device.clone() })
    }
}

impl<B: Backend> SequenceModel<B> for ReplayModel<B> {
    fn vocab_size(&self) -> usize {
        self.trace.vocab_size
    }

    fn successor_log_probs(&mut self, prefixes: Tensor<B, 2, Int>) -> Result<Tensor<B, 2>> {
        let [beams, _] = prefixes.dims();
        let vocab_size = self.trace.vocab_size;

        let Some(step) = self.trace.steps.get(self.cursor) else {
            bail!("Trace exhausted after {} steps", self.cursor);
        };
        if step.len() != beams {
            bail!(
                "Trace step {} has {} rows but the search holds {} beams",
                self.cursor + 1,
                step.len(),
                beams
            );
        }
        if let Some(row) = step.iter().position(|r| r.len() != vocab_size) {
            bail!(
                "Trace step {} row {} has {} columns, expected {}",
                self.cursor + 1,
                row,
                step[row].len(),
                vocab_size
            );
        }

        let flat: Vec<f32> = step.iter().flatten().copied().collect();
        self.cursor += 1;

        Ok(Tensor::<B, 2>::from_data(TensorData::new(flat, [beams, vocab_size]), &self.device))
    }

    fn vocabulary(&self) -> Option<&[String]> {
        self.trace.tokens.as_deref()
    }
}

// ─── BigramModel ──────────────────────────────────────────────────────────────
/// `logits[prev][next]`: unnormalised score of `next` following `prev`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BigramTable {
    pub logits: Vec<Vec<f32>>,

    #[serde(default)]
    pub tokens: Option<Vec<String>>,
}

pub struct BigramModel<B: Backend> {
    /// [vocab_size, vocab_size], each row a log-probability distribution
    log_probs:  Tensor<B, 2>,
    vocab_size: usize,
    tokens:     Option<Vec<String>>,
}

impl<B: Backend> BigramModel<B> {
    pub fn from_table(table: BigramTable, device: &B::Device) -> Result<Self> {
        let vocab_size = table.logits.len();
        if vocab_size == 0 {
            bail!("Bigram table is empty");
        }
        if let Some(row) = table.logits.iter().position(|r| r.len() != vocab_size) {
            bail!(
                "Bigram table must be square: row {} has {} columns, expected {}",
                row,
                table.logits[row].len(),
                vocab_size
            );
        }
        if let Some(tokens) = &table.tokens {
            if tokens.len() != vocab_size {
                bail!("Bigram table lists {} tokens for {} rows", tokens.len(), vocab_size);
            }
        }

        let flat: Vec<f32> = table.logits.iter().flatten().copied().collect();
        let logits = Tensor::<B, 2>::from_data(TensorData::new(flat, [vocab_size, vocab_size]), device);

        // Normalise every row into log-probabilities
        let log_probs = log_softmax(logits, 1);

        Ok(Self { log_probs, vocab_size, tokens: table.tokens })
    }
}

impl<B: Backend> SequenceModel<B> for BigramModel<B> {
    fn vocab_size(&self) -> usize {
        self.vocab_size
    }

    fn successor_log_probs(&mut self, prefixes: Tensor<B, 2, Int>) -> Result<Tensor<B, 2>> {
        let [beams, steps] = prefixes.dims();
        if steps == 0 {
            bail!("Bigram model needs at least one prefix token per beam");
        }

        // Last token of every beam → one row of the table each
        let last = prefixes.slice([0..beams, steps - 1..steps]).reshape([beams]);
        Ok(self.log_probs.clone().select(0, last))
    }

    fn vocabulary(&self) -> Option<&[String]> {
        self.tokens.as_deref()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type B = NdArray;

    fn prefixes(ids: Vec<i32>, shape: [usize; 2]) -> Tensor<B, 2, Int> {
        Tensor::<B, 2, Int>::from_data(TensorData::new(ids, shape), &Default::default())
    }

    fn to_rows(t: Tensor<B, 2>) -> Vec<Vec<f32>> {
        let [_, cols] = t.dims();
        let flat = t.into_data().convert::<f32>().to_vec::<f32>().unwrap();
        flat.chunks(cols).map(|c| c.to_vec()).collect()
    }

    fn trace() -> DecodeTrace {
        DecodeTrace {
            vocab_size: 2,
            steps: vec![
                vec![vec![-0.1, -2.0], vec![0.0, 0.0]],
                vec![vec![-0.5, -0.9], vec![-1.0, -0.2]],
            ],
            tokens: None,
        }
    }

    #[test]
    fn test_replay_returns_steps_in_order() {
        let mut model = ReplayModel::<B>::new(trace(), &Default::default()).unwrap();
        let p = prefixes(vec![1, 0], [2, 1]);

        assert_eq!(to_rows(model.successor_log_probs(p.clone()).unwrap())[0], vec![-0.1, -2.0]);
        assert_eq!(to_rows(model.successor_log_probs(p).unwrap())[1], vec![-1.0, -0.2]);
    }

    #[test]
    fn test_replay_errors_when_exhausted() {
        let mut model = ReplayModel::<B>::new(trace(), &Default::default()).unwrap();
        let p = prefixes(vec![1, 0], [2, 1]);
        model.successor_log_probs(p.clone()).unwrap();
        model.successor_log_probs(p.clone()).unwrap();
        assert!(model.successor_log_probs(p).is_err());
    }

    #[test]
    fn test_replay_rejects_beam_count_mismatch() {
        let mut model = ReplayModel::<B>::new(trace(), &Default::default()).unwrap();
        assert!(model.successor_log_probs(prefixes(vec![1, 0, 0], [3, 1])).is_err());
    }

    #[test]
    fn test_replay_rejects_token_count_mismatch() {
        let mut bad = trace();
        bad.tokens = Some(vec!["a".into()]);
        assert!(ReplayModel::<B>::new(bad, &Default::default()).is_err());
    }

    #[test]
    fn test_bigram_rows_are_distributions() {
        let table = BigramTable {
            logits: vec![vec![1.0, 2.0, 3.0], vec![0.0, 0.0, 0.0], vec![5.0, 0.0, 0.0]],
            tokens: None,
        };
        let model = BigramModel::<B>::from_table(table, &Default::default()).unwrap();
        for row in to_rows(model.log_probs.clone()) {
            let total: f32 = row.iter().map(|p| p.exp()).sum();
            assert!((total - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_bigram_conditions_on_last_token() {
        let table = BigramTable {
            logits: vec![vec![0.0, 10.0], vec![10.0, 0.0]],
            tokens: None,
        };
        let mut model = BigramModel::<B>::from_table(table, &Default::default()).unwrap();

        // beam 0 ends on token 1, beam 1 ends on token 0
        let rows = to_rows(model.successor_log_probs(prefixes(vec![0, 1, 1, 0], [2, 2])).unwrap());
        assert!(rows[0][0] > rows[0][1]);
        assert!(rows[1][1] > rows[1][0]);
    }

    #[test]
    fn test_bigram_rejects_ragged_table() {
        let table = BigramTable { logits: vec![vec![0.0, 1.0], vec![0.0]], tokens: None };
        assert!(BigramModel::<B>::from_table(table, &Default::default()).is_err());
    }
}
