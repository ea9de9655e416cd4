// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Handles everything that touches the filesystem or another
// process on behalf of the other layers:
//
//   checkpoint.rs  — Saving and loading model weights
//                    Uses Burn's CompactRecorder; the model and
//                    training configs are stored next to them.
//
//   metrics.rs     — Per-epoch metrics as CSV rows and as a
//                    JSON dict of per-metric lists.
//
//   meme.rs        — MEME motif files (write, count, read).
//
//   tomtom.rs      — Runs the external motif comparison tool
//                    with a timeout and typed failures.
//
//   layout.rs      — Where every artefact of a trial lives.
//
//   stats_store.rs — Trial records as .npy + JSON sidecar.
//
// Reference: Rust Book §7 (Modules)
//            Rust Book §9 (Error Handling with anyhow)
//            Burn Book §5 (Checkpointing)

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Training metrics CSV / JSON logging
pub mod metrics;

/// MEME motif file format
pub mod meme;

/// External comparison subprocess
pub mod tomtom;

/// Output directory structure
pub mod layout;

/// Per-trial statistics persistence
pub mod stats_store;
