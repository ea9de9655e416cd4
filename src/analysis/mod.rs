// ============================================================
// Layer 4 — Analysis
// ============================================================
// Pure scoring functions over host-side arrays and parsed tool
// output. Nothing here trains, spawns or touches Burn tensors.

// ROC / PR areas over (score, label) pairs
pub mod ranking;

// Tomtom table parsing and ground-truth match statistics
pub mod motif_match;

// Attribution maps scored against the sequence model
pub mod interpretability;
