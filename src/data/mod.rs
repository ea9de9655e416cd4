// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from the remote array bundle to tensor batches:
//
//   HDF5 / .npz bundle (HTTP or local file)
//       │
//       ▼
//   BundleSource      → downloads/reads, transposes to channels-last,
//       │               checks shapes, returns GenomicDataset
//       ▼
//   SequenceDataset   → implements Burn's Dataset trait over one split
//       │
//       ▼
//   SequenceBatcher   → stacks samples into [batch, positions, 4] tensors
//       │
//       ▼
//   DataLoader        → feeds batches to training / evaluation
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Loads the train/valid/test bundle over HTTP or from disk
pub mod loader;

/// Implements Burn's Dataset trait for one split
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;

/// Small deterministic datasets for model and pipeline tests
#[cfg(test)]
pub(crate) mod fixtures;
