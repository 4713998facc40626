// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust structs and traits describing what the system
// talks about: beams produced by the decoder, question/query
// data points, and evaluation pairs.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O or network calls
//   - Only plain Rust structs, enums, and traits
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// A ranked beam record and the token sequence type
pub mod token_beam;

// Question/query data points and evaluation pairs
pub mod data_point;

// Core abstractions (traits) that other layers implement
pub mod traits;
