// ============================================================
// Layer 5 — Token Beam Searcher
// ============================================================
// Finds the `beam_size` most likely output token sequences for
// one input sequence, one decoding step at a time.
//
// The searcher never calls the model itself. Each step the
// caller:
//   1. feeds current_state() (or the full prefixes) to the model
//   2. hands the resulting [beam_size, vocab_size] matrix of
//      successor log-probabilities to advance()
//   3. re-orders any per-beam state with previous_slot_mapping()
//
// State is kept as two parallel arrays-of-arrays indexed by
// step and slot:
//
//   step_history[t][slot]       token chosen by `slot` at step t
//   ancestry_history[t-1][slot] slot at step t-1 it came from
//
// Slots are reassigned every step (top-k mixes candidates from
// all beams), so a full sequence is only recoverable by walking
// the ancestry links backwards.
//
// Completed beams are never removed. Their rows are masked with
// IMPROBABLE_LOG_PROB so the array shapes stay fixed.
//
// Reference: Sutskever et al. (2014) Sequence to Sequence Learning
//            Rust Book §8 (Vectors)

use burn::prelude::*;
use burn::tensor::{DataError, TensorData};
use thiserror::Error;

use crate::domain::token_beam::{Sentence, TokenBeam};

/// Score given to every successor of a beam that already emitted
/// the end token. The smallest finite f32, so later additions
/// cannot produce NaN.
pub const IMPROBABLE_LOG_PROB: f32 = f32::MIN;

/// Precondition violations when driving a [`BeamSearcher`].
#[derive(Error, Debug)]
pub enum BeamSearchError {
    #[error("Beam size must be at least 1, got {0}")]
    InvalidBeamSize(usize),

    #[error("Successor matrix has {got} rows, expected one per beam ({expected})")]
    RowCountMismatch { expected: usize, got: usize },

    #[error("Successor matrix of {len} values cannot be split into rows of {vocab_size}")]
    MalformedMatrix { len: usize, vocab_size: usize },

    #[error("Vocabulary of {vocab_size} tokens cannot fill {beam_size} beams")]
    VocabularyTooSmall { beam_size: usize, vocab_size: usize },

    #[error("Cannot read successor log-probabilities: {0:?}")]
    TensorRead(DataError),
}

/// One beam search session. Create one per input sequence,
/// advance it until [`BeamSearcher::is_finished`] or a step
/// budget runs out, then extract hypotheses.
#[derive(Debug, Clone)]
pub struct BeamSearcher {
    beam_size: usize,
    eos_id:    u32,

    /// Set once slot 0 (the best beam) has emitted the end token
    top_beam_finished: bool,

    /// Summed log-probability per slot, always `beam_size` long
    cumulative_log_probs: Vec<f32>,

    /// Selected token per slot, one entry per step plus the
    /// initial start-token vector at index 0
    step_history: Vec<Vec<u32>>,

    /// Departed-from slot per slot, one entry per step
    ancestry_history: Vec<Vec<usize>>,

    /// Beams that have emitted the end token, in completion order
    completed: Vec<TokenBeam>,
}

impl BeamSearcher {
    /// Create a searcher with `beam_size` slots.
    ///
    /// Slot 0 starts on `sos_id`; the other slots hold 0 until the
    /// first call to advance() since only slot 0 is expanded then.
    pub fn new(beam_size: usize, sos_id: u32, eos_id: u32) -> Result<Self, BeamSearchError> {
        if beam_size < 1 {
            return Err(BeamSearchError::InvalidBeamSize(beam_size));
        }

        let mut initial = vec![0u32; beam_size];
        initial[0] = sos_id;

        Ok(Self {
            beam_size,
            eos_id,
            top_beam_finished:    false,
            cumulative_log_probs: vec![0.0; beam_size],
            step_history:         vec![initial],
            ancestry_history:     Vec::new(),
            completed:            Vec::new(),
        })
    }

    /// Number of advance() calls made so far
    pub fn depth(&self) -> usize {
        self.ancestry_history.len()
    }

    pub fn cumulative_log_probs(&self) -> &[f32] { &self.cumulative_log_probs }

    pub fn step_history(&self) -> &[Vec<u32>] { &self.step_history }

    pub fn ancestry_history(&self) -> &[Vec<usize>] { &self.ancestry_history }

    pub fn completed(&self) -> &[TokenBeam] { &self.completed }

    pub fn top_beam_finished(&self) -> bool { self.top_beam_finished }

    /// The most recently selected token of every slot.
    pub fn current_state(&self) -> &[u32] {
        self.step_history.last().map(Vec::as_slice).unwrap_or(&[])
    }

    /// current_state() as a `[beam_size, 1]` column, ready to be
    /// concatenated onto the model's prefix tensor.
    pub fn current_state_tensor<B: Backend>(&self, device: &B::Device) -> Tensor<B, 2, Int> {
        let ids: Vec<i32> = self.current_state().iter().map(|&t| t as i32).collect();
        Tensor::<B, 2, Int>::from_data(TensorData::new(ids, [self.beam_size, 1]), device)
    }

    /// For every current slot, the slot of the previous step it
    /// descended from. `None` until the first advance().
    pub fn previous_slot_mapping(&self) -> Option<&[usize]> {
        self.ancestry_history.last().map(Vec::as_slice)
    }

    /// previous_slot_mapping() as an index tensor for
    /// `Tensor::select(0, ..)` on per-beam state.
    pub fn previous_slot_mapping_tensor<B: Backend>(
        &self,
        device: &B::Device,
    ) -> Option<Tensor<B, 1, Int>> {
        self.previous_slot_mapping().map(|mapping| {
            let ids: Vec<i32> = mapping.iter().map(|&s| s as i32).collect();
            Tensor::<B, 1, Int>::from_data(TensorData::new(ids, [self.beam_size]), device)
        })
    }

    /// Advance the search by one step.
    ///
    /// `successor_log_probs` is a row-major `[beam_size, vocab_size]`
    /// matrix: row `i`, column `t` holds log P(t | beam i so far).
    ///
    /// Steps:
    ///   1. Add each beam's running score to its row; rows of beams
    ///      that already ended become IMPROBABLE_LOG_PROB
    ///   2. On the first step only row 0 is a candidate pool, since
    ///      every slot shares the same start token
    ///   3. Keep the `beam_size` best flat indices (ties → lower index)
    ///   4. Split each into (ancestor slot, token)
    ///   5. Record scores, ancestry and tokens
    ///   6. Every slot that picked the end token becomes a completed beam
    ///   7. Slot 0 picking the end token sets top_beam_finished
    pub fn advance(
        &mut self,
        successor_log_probs: &[f32],
        vocab_size:          usize,
    ) -> Result<(), BeamSearchError> {
        let len = successor_log_probs.len();
        if vocab_size == 0 || len % vocab_size != 0 {
            return Err(BeamSearchError::MalformedMatrix { len, vocab_size });
        }
        let rows = len / vocab_size;
        if rows != self.beam_size {
            return Err(BeamSearchError::RowCountMismatch {
                expected: self.beam_size,
                got:      rows,
            });
        }

        // ── Step 1 & 2: build the candidate score pool ───────────────────────
        let scores: Vec<f32> = if self.ancestry_history.is_empty() {
            if vocab_size < self.beam_size {
                return Err(BeamSearchError::VocabularyTooSmall {
                    beam_size: self.beam_size,
                    vocab_size,
                });
            }
            successor_log_probs[..vocab_size]
                .iter()
                .map(|&p| sanitise(p))
                .collect()
        } else {
            let last = self.current_state();
            let mut scores = Vec::with_capacity(len);
            for (row, probs) in successor_log_probs.chunks_exact(vocab_size).enumerate() {
                if last[row] == self.eos_id {
                    // Successors of an end token must never be chosen
                    scores.extend(std::iter::repeat(IMPROBABLE_LOG_PROB).take(vocab_size));
                } else {
                    let base = self.cumulative_log_probs[row];
                    scores.extend(probs.iter().map(|&p| sanitise(base + p)));
                }
            }
            scores
        };

        // ── Step 3 & 4: stable top-k over the flattened matrix ───────────────
        let best = top_k_stable(&scores, self.beam_size);
        let ancestors: Vec<usize> = best.iter().map(|&i| i / vocab_size).collect();
        let tokens:    Vec<u32>   = best.iter().map(|&i| (i % vocab_size) as u32).collect();

        // ── Step 5: record the new step ──────────────────────────────────────
        self.cumulative_log_probs = best.iter().map(|&i| scores[i]).collect();
        let depth = self.step_history.len();

        // ── Step 6 & 7: collect beams that just ended ────────────────────────
        for (slot, &token) in tokens.iter().enumerate() {
            if token == self.eos_id {
                self.completed.push(TokenBeam::new(
                    self.cumulative_log_probs[slot],
                    depth,
                    slot,
                ));
            }
        }
        if tokens[0] == self.eos_id {
            self.top_beam_finished = true;
        }

        tracing::debug!(
            "Beam step {}: tokens={:?} from={:?} completed={}",
            depth, tokens, ancestors, self.completed.len()
        );

        self.ancestry_history.push(ancestors);
        self.step_history.push(tokens);
        Ok(())
    }

    /// advance() for a `[beam_size, vocab_size]` burn tensor.
    /// The tensor is read back to the host once per step.
    pub fn advance_tensor<B: Backend>(
        &mut self,
        successor_log_probs: Tensor<B, 2>,
    ) -> Result<(), BeamSearchError> {
        let [rows, vocab_size] = successor_log_probs.dims();
        if rows != self.beam_size {
            return Err(BeamSearchError::RowCountMismatch {
                expected: self.beam_size,
                got:      rows,
            });
        }

        let values = successor_log_probs
            .into_data()
            .convert::<f32>()
            .to_vec::<f32>()
            .map_err(BeamSearchError::TensorRead)?;

        self.advance(&values, vocab_size)
    }

    /// True once the best beam has ended and at least `beam_size`
    /// beams have completed.
    pub fn is_finished(&self) -> bool {
        self.top_beam_finished && self.completed.len() >= self.beam_size
    }

    /// True if `beam` ended on the end token (as opposed to being
    /// a live slot handed out by final_beams()).
    pub fn is_completed(&self, beam: &TokenBeam) -> bool {
        beam.length > 0
            && self.step_history
                .get(beam.length)
                .and_then(|tokens| tokens.get(beam.beam_index))
                .is_some_and(|&t| t == self.eos_id)
    }

    /// The final list of beams, best first.
    ///
    /// Best effort when the search has not converged:
    ///   - nothing completed → slot 0 at the current depth stands in
    ///   - fewer than `beam_size` → live slots fill the gap, best first
    ///
    /// Always returns between 1 and `beam_size` beams.
    pub fn final_beams(&self) -> Vec<TokenBeam> {
        let depth       = self.depth();
        let synthesised = self.completed.is_empty();

        let mut beams: Vec<TokenBeam> = if synthesised {
            vec![TokenBeam::new(self.cumulative_log_probs[0], depth, 0)]
        } else {
            self.completed.clone()
        };
        sort_best_first(&mut beams);
        beams.truncate(self.beam_size);

        // Before the first step the other slots hold no real beam
        if beams.len() < self.beam_size && depth > 0 {
            let current = self.current_state();
            let mut live: Vec<TokenBeam> = (0..self.beam_size)
                .filter(|&slot| current[slot] != self.eos_id)
                // A synthesised slot 0 is already in `beams`
                .filter(|&slot| !(synthesised && slot == 0))
                .map(|slot| TokenBeam::new(self.cumulative_log_probs[slot], depth, slot))
                .collect();
            sort_best_first(&mut live);
            live.truncate(self.beam_size - beams.len());

            beams.extend(live);
            sort_best_first(&mut beams);
        }

        beams
    }

    /// Rebuild the token sequence of every beam by following the
    /// ancestry links from the beam's depth back to step 1.
    /// A beam of length `d` yields exactly `d` tokens.
    pub fn reconstruct_sequences(&self, beams: &[TokenBeam]) -> Vec<Sentence> {
        beams
            .iter()
            .map(|beam| {
                let depth    = beam.length.min(self.ancestry_history.len());
                let mut slot = beam.beam_index;
                let mut hyp  = Vec::with_capacity(depth);

                for step in (0..depth).rev() {
                    hyp.push(self.step_history[step + 1][slot]);
                    slot = self.ancestry_history[step][slot];
                }

                hyp.reverse();
                hyp
            })
            .collect()
    }

    /// Cut every sequence just before its first end token.
    /// Sequences that never ended are returned whole.
    pub fn truncate_at_terminator(&self, sequences: Vec<Sentence>) -> Vec<Sentence> {
        sequences
            .into_iter()
            .map(|mut sentence| {
                if let Some(end) = sentence.iter().position(|&t| t == self.eos_id) {
                    sentence.truncate(end);
                }
                sentence
            })
            .collect()
    }
}

/// NaN never wins a slot
fn sanitise(score: f32) -> f32 {
    if score.is_nan() { IMPROBABLE_LOG_PROB } else { score }
}

/// Indices of the `k` greatest scores, best first.
/// Equal scores keep ascending index order, so the result is
/// fully determined by the input.
fn top_k_stable(scores: &[f32], k: usize) -> Vec<usize> {
    let by_rank = |a: &usize, b: &usize| {
        scores[*b].total_cmp(&scores[*a]).then_with(|| a.cmp(b))
    };

    let mut indices: Vec<usize> = (0..scores.len()).collect();
    if k < indices.len() {
        indices.select_nth_unstable_by(k - 1, by_rank);
        indices.truncate(k);
    }
    indices.sort_unstable_by(by_rank);
    indices
}

/// Descending score; stable so equal beams keep insertion order
fn sort_best_first(beams: &mut [TokenBeam]) {
    beams.sort_by(|a, b| b.cumulative_log_prob.total_cmp(&a.cumulative_log_prob));
}
