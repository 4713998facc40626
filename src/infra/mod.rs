// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting concerns that don't belong to one layer:
//
//   model_store.rs      — JSON files the decoder reads and
//                         writes: decode configs, recorded
//                         traces, bigram tables, decode reports
//
//   tokenizer_store.rs  — Loads a HuggingFace tokenizer.json
//                         to turn hypotheses back into text,
//                         with vocabulary / raw-ID fallbacks
//
//   evaluation_store.rs — Writes evaluation pairs to disk
//
//   metrics.rs          — Appends BLEU results to a CSV file
//
// Reference: Rust Book §7 (Modules)
//            Rust Book §9 (Error Handling with anyhow)

/// Decode config, trace and bigram table loading
pub mod model_store;

/// Tokenizer loading and detokenisation
pub mod tokenizer_store;

/// Evaluation pair persistence
pub mod evaluation_store;

/// Evaluation metrics CSV logger
pub mod metrics;
