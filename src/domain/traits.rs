// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// Seams between the layers. The application layer only ever
// sees these traits, so a loader or detokeniser can be swapped
// without touching the workflow code:
//   - LineAlignedLoader implements DataPointSource
//   - TokenizerDetokenizer, VocabularyDetokenizer and
//     IdDetokenizer implement Detokenizer
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::Result;
use crate::domain::data_point::RawDataPoint;

// ─── DataPointSource ──────────────────────────────────────────────────────────
/// Any component that can load question/query data points.
pub trait DataPointSource {
    /// Load all available data points, in source order.
    fn load_all(&self) -> Result<Vec<RawDataPoint>>;
}

// ─── Detokenizer ──────────────────────────────────────────────────────────────
/// Turns a hypothesis (output vocabulary IDs) back into text.
pub trait Detokenizer {
    fn detokenize(&self, token_ids: &[u32]) -> Result<String>;
}
