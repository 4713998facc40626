// ============================================================
// Layer 5 — ML / Decoding Layer (Burn)
// ============================================================
// This layer contains ALL Burn framework specific code.
// Other layers only see plain Rust types, except the use cases
// which pick the backend.
//
// What's in this layer:
//
//   beam_search.rs    — The beam search state machine
//                       • top-k over every beam's successors
//                       • masking of finished beams
//                       • ancestry tracking and backtracking
//
//   sequence_model.rs — The model contract the search drives,
//                       plus replay and bigram implementations
//
//   generator.rs      — The decode loop tying the two together
//
//   bleu.rs           — Corpus BLEU for scoring predictions
//
// Reference: Burn Book §3 (Building Blocks)
//            Sutskever et al. (2014) Sequence to Sequence Learning

/// Beam search over per-step successor log-probabilities
pub mod beam_search;

/// Sequence models the searcher can drive
pub mod sequence_model;

/// Decode loop: model → searcher → ranked hypotheses
pub mod generator;

/// Corpus-level BLEU
pub mod bleu;
