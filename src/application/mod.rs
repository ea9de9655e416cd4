// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// This layer orchestrates all the other layers to accomplish
// one pipeline run over the trials of a (category, variant)
// group.
//
// Rules for this layer:
//   - No ML math or model code here
//   - No argument parsing (that's Layer 1)
//   - File formats are delegated to Layer 6
//   - Only workflow coordination
//
// Trials run one after another; the only state they share is
// the dataset, read-only, behind an Arc.
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

// Serialisable hyperparameters of every stage
pub mod config;

// Dataset + output layout shared by the trials of a run
pub mod context;

// Train → extract → compare → score, per trial
pub mod motif_use_case;

// Train → saliency → interpretability scores, per trial
pub mod saliency_use_case;

// Re-score existing comparison output
pub mod analyze_use_case;
