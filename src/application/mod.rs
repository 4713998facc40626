// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// This layer orchestrates all the other layers to accomplish
// a specific goal (decoding a query or scoring predictions).
//
// Rules for this layer:
//   - No search math or model code here
//   - No printing here (that's Layer 1)
//   - No direct file access (that's Layer 4 and 6)
//   - Only workflow coordination
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

// Beam search over a sequence model
pub mod decode_use_case;

// BLEU scoring of predicted queries
pub mod evaluate_use_case;
