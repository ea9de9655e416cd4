// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust structs and traits describing what the pipeline
// works with: genomic splits, position weight matrices, the
// ground-truth motif set, comparison outcomes and the per-trial
// result records.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO network calls or subprocesses
//   - ndarray is allowed: it is the host-side array type that
//     every other layer converts to and from
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// Train/valid/test arrays as loaded from the dataset bundle
pub mod genomic;

// Position weight matrices extracted from convolutional filters
pub mod pwm;

// Known ground-truth motifs and their database identifiers
pub mod motif_set;

// Outcomes and failures of the external motif comparison
pub mod comparison;

// Fixed-order per-trial result records
pub mod record;

// Core abstractions (traits) that other layers implement
pub mod traits;
