// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// This layer handles everything between the text files on disk
// and the evaluation pairs that get scored.
//
// The pipeline flows in this order:
//
//   questions.txt + queries.txt      predictions.txt
//       │                                │
//       ▼                                ▼
//   LineAlignedLoader              load_predictions
//       │                                │
//       │                                ▼
//       │                           Preprocessor → repairs spacing
//       │                                │
//       └──────────────┬─────────────────┘
//                      ▼
//               EvaluationPair
//
// Reference: Rust Book §13 (Iterators and Closures)

/// Loads line-aligned question/query files and prediction files
pub mod loader;

/// Repairs the spacing of detokenised predictions
pub mod preprocessor;
