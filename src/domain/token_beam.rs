// ============================================================
// Layer 3 — TokenBeam Domain Type
// ============================================================
// A TokenBeam is the decoder's summary of one candidate output
// sequence at a given depth of the search. It holds no tokens
// itself: the tokens are recovered by walking the searcher's
// step history backwards from (length, beam_index).
//
// Example:
//   TokenBeam { cumulative_log_prob: -0.15, length: 2, beam_index: 0 }
//   → "the beam that sat in slot 0 after step 2, scoring -0.15"
//
// Reference: Rust Book §5 (Structs)

use serde::{Deserialize, Serialize};

/// A sequence of output vocabulary token IDs.
/// Either a predicted hypothesis or a ground truth.
pub type Sentence = Vec<u32>;

/// One ranked beam of the token beam search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TokenBeam {
    /// Summed log-probability of every token chosen along this beam
    pub cumulative_log_prob: f32,

    /// Number of non-end-of-sequence tokens on this beam,
    /// counting the start token. Equal to the search depth
    /// at which this record was taken.
    pub length: usize,

    /// The slot this beam occupied at `length`
    pub beam_index: usize,
}

impl TokenBeam {
    pub fn new(cumulative_log_prob: f32, length: usize, beam_index: usize) -> Self {
        Self { cumulative_log_prob, length, beam_index }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialises_field_names() {
        let beam = TokenBeam::new(-0.5, 3, 1);
        let json = serde_json::to_value(beam).unwrap();
        assert_eq!(json["length"], 3);
        assert_eq!(json["beam_index"], 1);
    }
}
