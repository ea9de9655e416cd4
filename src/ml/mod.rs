// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// This layer contains the Burn framework specific code: the
// network, the training loop and everything that needs a
// forward or backward pass.
//
// What's in this layer:
//
//   model.rs     — Configurable CNN front-end with optional
//                  BiLSTM, self-attention or transformer stages
//                  and a multi-label sigmoid head
//
//   callbacks.rs — Learning-rate decay on plateau and early
//                  stopping, both driven by validation AUPR
//
//   evaluator.rs — Loss / AUROC / AUPR over a dataset split
//
//   trainer.rs   — The training loop (Adam, BCE), history
//                  and final checkpoint
//
//   extractor.rs — First-layer filters → position weight
//                  matrices via activation-aligned windows
//
//   saliency.rs  — Gradient × input attribution maps
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)

/// Motif-discovery network and its architecture presets
pub mod model;

/// Plateau LR decay and early stopping
pub mod callbacks;

/// Split-level loss and ranking metrics
pub mod evaluator;

/// Training loop with validation, history and checkpointing
pub mod trainer;

/// Filter → PWM extraction and clipping
pub mod extractor;

/// Input-gradient attribution maps
pub mod saliency;

/// NdArray keeps one RNG for the whole process, so tests that seed
/// it or draw from it take this lock first.
#[cfg(test)]
pub(crate) static BACKEND_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
