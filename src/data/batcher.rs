// ============================================================
// Layer 4 — Sequence Batcher
// ============================================================
// Implements Burn's Batcher trait to stack SequenceSamples into
// tensors.
//
//   Input:  Vec of N samples, each positions × 4 one-hot values
//   Output: sequences [N, positions, 4] (float)
//           targets   [N, classes]      (int, for BCE)
//
// Every sequence in a dataset has the same length, so batching
// is a flatten + reshape with no padding.
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
    tensor::TensorData,
};

use crate::data::dataset::SequenceSample;

/// A batch ready for the model forward pass.
#[derive(Debug, Clone)]
pub struct SequenceBatch<B: Backend> {
    /// One-hot sequences, shape [batch_size, positions, 4]
    pub sequences: Tensor<B, 3>,

    /// 0/1 multi-label targets, shape [batch_size, classes]
    pub targets: Tensor<B, 2, Int>,
}

/// Holds the target device so tensors land on the right GPU/CPU.
#[derive(Clone, Debug)]
pub struct SequenceBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> SequenceBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<SequenceSample, SequenceBatch<B>> for SequenceBatcher<B> {
    fn batch(&self, items: Vec<SequenceSample>) -> SequenceBatch<B> {
        let batch_size = items.len();
        let positions  = items[0].positions;
        let classes    = items[0].num_classes();

        let seq_flat: Vec<f32> = items
            .iter()
            .flat_map(|s| s.sequence.iter().copied())
            .collect();

        // Labels arrive as floats; BCE wants 0/1 integers
        let target_flat: Vec<i64> = items
            .iter()
            .flat_map(|s| s.target.iter().map(|&v| v.round() as i64))
            .collect();

        let sequences = Tensor::<B, 3>::from_data(
            TensorData::new(seq_flat, [batch_size, positions, 4]),
            &self.device,
        );
        let targets = Tensor::<B, 2, Int>::from_data(
            TensorData::new(target_flat, [batch_size, classes]),
            &self.device,
        );

        SequenceBatch { sequences, targets }
    }
}
