// ============================================================
// Layer 5 — Beam Search Generator
// ============================================================
// Drives one BeamSearcher session against a SequenceModel:
//
//   prefixes = [[sos], [0], ...]                 [k, 1]
//   repeat up to max_steps, until is_finished():
//       log_probs = model(prefixes)              [k, vocab]
//       searcher.advance(log_probs)
//       prefixes  = prefixes.select(0, mapping)  follow ancestry
//       prefixes  = cat(prefixes, current_state) [k, t + 1]
//       model.reorder_beams(mapping)             per-beam caches
//   final_beams → reconstruct → truncate
//
// The select() step matters: after top-k, slot i may continue a
// different beam than the one it held last step, so each row of
// the prefix tensor must be replaced by its ancestor's row before
// the new token is appended.
//
// Reference: Burn Book §3 (Tensor operations)

use anyhow::{Context, Result};
use burn::prelude::*;
use serde::{Deserialize, Serialize};

use crate::application::decode_use_case::DecodeConfig;
use crate::ml::beam_search::BeamSearcher;
use crate::ml::sequence_model::SequenceModel;

/// One ranked output of the search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hypothesis {
    /// 1 = best
    pub rank: usize,

    /// Output token IDs, start token and end token excluded
    pub token_ids: Vec<u32>,

    pub log_prob: f32,

    /// Depth of the beam, counting the start token
    pub length: usize,

    /// False when the beam was handed out without reaching the end token
    pub completed: bool,
}

/// Everything one decode session produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecodeOutput {
    pub hypotheses: Vec<Hypothesis>,
    pub steps:      usize,
    pub converged:  bool,
}

/// Run one beam search session to convergence or to the step budget.
pub fn beam_decode<B: Backend, M: SequenceModel<B>>(
    model:  &mut M,
    cfg:    &DecodeConfig,
    device: &B::Device,
) -> Result<DecodeOutput> {
    let mut searcher = BeamSearcher::new(cfg.beam_size, cfg.sos_id, cfg.eos_id)?;
    let mut prefixes = searcher.current_state_tensor::<B>(device);
    let mut steps    = 0usize;

    while steps < cfg.max_steps && !searcher.is_finished() {
        let log_probs = model
            .successor_log_probs(prefixes.clone())
            .with_context(|| format!("Sequence model failed at step {}", steps + 1))?;

        searcher.advance_tensor(log_probs)?;
        steps += 1;

        if let Some(mapping) = searcher.previous_slot_mapping_tensor::<B>(device) {
            prefixes = prefixes.select(0, mapping.clone());
            model.reorder_beams(mapping)?;
        }
        prefixes = Tensor::cat(vec![prefixes, searcher.current_state_tensor::<B>(device)], 1);
    }

    let converged = searcher.is_finished();
    if converged {
        tracing::debug!("Beam search converged after {} steps", steps);
    } else {
        tracing::debug!(
            "Beam search stopped at the step budget ({}) with {} completed beams",
            cfg.max_steps,
            searcher.completed().len()
        );
    }

    let beams     = searcher.final_beams();
    let sequences = searcher.truncate_at_terminator(searcher.reconstruct_sequences(&beams));

    let hypotheses = beams
        .iter()
        .zip(sequences)
        .enumerate()
        .map(|(i, (beam, token_ids))| Hypothesis {
            rank:      i + 1,
            token_ids,
            log_prob:  beam.cumulative_log_prob,
            length:    beam.length,
            completed: searcher.is_completed(beam),
        })
        .collect();

    Ok(DecodeOutput { hypotheses, steps, converged })
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::sequence_model::{DecodeTrace, ReplayModel};
    use burn::backend::NdArray;

    type B = NdArray;

    fn cfg(beam_size: usize, max_steps: usize) -> DecodeConfig {
        DecodeConfig { beam_size, max_steps, sos_id: 3, eos_id: 2 }
    }

    /// vocabulary {A=0, B=1, EOS=2}; same scenario as the searcher tests
    fn scenario() -> DecodeTrace {
        DecodeTrace {
            vocab_size: 3,
            steps: vec![
                vec![vec![-0.1, -2.0, -5.0],  vec![0.0, 0.0, 0.0]],
                vec![vec![-3.0, -4.0, -0.05], vec![-1.0, -1.5, -3.0]],
                vec![vec![-7.0, -7.0, -7.0],  vec![-0.2, -9.0, -0.3]],
            ],
            tokens: None,
        }
    }

    /// Records every prefix tensor it is shown
    struct PrefixRecorder {
        seen: Vec<Vec<Vec<i64>>>,
    }

    impl SequenceModel<B> for PrefixRecorder {
        fn vocab_size(&self) -> usize { 3 }

        fn successor_log_probs(&mut self, prefixes: Tensor<B, 2, Int>) -> Result<Tensor<B, 2>> {
            let [rows, cols] = prefixes.dims();
            let flat = prefixes.into_data().convert::<i64>().to_vec::<i64>().unwrap();
            self.seen.push(flat.chunks(cols).map(|c| c.to_vec()).collect());

            // Step 1 prefers A then B; afterwards A continues and EOS is unlikely
            let row = if self.seen.len() == 1 { [-0.1, -2.0, -5.0] } else { [-0.5, -0.1, -9.0] };
            let data: Vec<f32> = (0..rows).flat_map(|_| row).collect();
            Ok(Tensor::<B, 2>::from_data(
                burn::tensor::TensorData::new(data, [rows, 3]),
                &Default::default(),
            ))
        }
    }

    #[test]
    fn test_scenario_converges_to_ranked_hypotheses() {
        let device    = Default::default();
        let mut model = ReplayModel::<B>::new(scenario(), &device).unwrap();
        let out       = beam_decode(&mut model, &cfg(2, 10), &device).unwrap();

        assert!(out.converged);
        assert_eq!(out.steps, 3);

        let ids: Vec<Vec<u32>> = out.hypotheses.iter().map(|h| h.token_ids.clone()).collect();
        assert_eq!(ids, vec![vec![0], vec![1, 0]]);
        assert_eq!(out.hypotheses[0].rank, 1);
        assert!(out.hypotheses.iter().all(|h| h.completed));
        assert!((out.hypotheses[0].log_prob - (-0.15)).abs() < 1e-6);
    }

    #[test]
    fn test_step_budget_returns_best_effort() {
        let device    = Default::default();
        let mut model = ReplayModel::<B>::new(scenario(), &device).unwrap();
        let out       = beam_decode(&mut model, &cfg(2, 1), &device).unwrap();

        assert!(!out.converged);
        assert_eq!(out.steps, 1);
        assert_eq!(out.hypotheses.len(), 2);
        assert!(out.hypotheses.iter().all(|h| !h.completed));
        assert!(out.hypotheses[0].log_prob >= out.hypotheses[1].log_prob);
        assert_eq!(out.hypotheses[0].token_ids, vec![0]);
    }

    #[test]
    fn test_prefixes_follow_ancestry() {
        let device    = Default::default();
        let mut model = PrefixRecorder { seen: Vec::new() };
        beam_decode(&mut model, &cfg(2, 3), &device).unwrap();

        // Step 1 sees only the start token column
        assert_eq!(model.seen[0], vec![vec![3], vec![0]]);

        // After step 1 slot 0 holds "S A", slot 1 holds "S B"
        assert_eq!(model.seen[1], vec![vec![3, 0], vec![3, 1]]);

        // Step 2 (scores: S A B=-0.2, S A A=-0.6, S B B=-2.1, ...)
        // both survivors descend from slot 0
        assert_eq!(model.seen[2], vec![vec![3, 0, 1], vec![3, 0, 0]]);
    }

    #[test]
    fn test_model_errors_carry_step_context() {
        let device    = Default::default();
        let mut model = ReplayModel::<B>::new(scenario(), &device).unwrap();
        let err       = beam_decode(&mut model, &cfg(3, 10), &device).unwrap_err();
        assert!(format!("{err:#}").contains("step 1"));
    }
}
