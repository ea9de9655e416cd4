// ============================================================
// Layer 5 — Evaluator
// ============================================================
// Runs a model over one dataset split and reports the numbers
// the training loop monitors and the trial records keep:
//
//   loss   mean binary cross-entropy per label
//   auroc  ROC-AUC over every (sequence, class) pair
//   aupr   PR-AUC over every (sequence, class) pair
//
// The ranking metrics treat the multi-label output as one long
// list of binary predictions. An undefined metric (a split with
// a single label value) is reported as NaN.

use anyhow::{anyhow, Result};
use burn::{
    data::dataloader::DataLoaderBuilder,
    nn::loss::BinaryCrossEntropyLossConfig,
    prelude::*,
    tensor::activation::sigmoid,
};
use serde::{Deserialize, Serialize};

use crate::analysis::ranking::{pr_auc, roc_auc};
use crate::data::{batcher::SequenceBatcher, dataset::SequenceDataset};
use crate::ml::model::MotifNet;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub loss:  f64,
    pub auroc: f64,
    pub aupr:  f64,
}

/// Flattened predictions and labels accumulated batch by batch.
#[derive(Debug, Default)]
pub(crate) struct RankingAccumulator {
    scores:     Vec<f64>,
    labels:     Vec<bool>,
    loss_sum:   f64,
    samples:    usize,
}

impl RankingAccumulator {
    /// `loss` is the batch mean; it is re-weighted by the batch size.
    pub(crate) fn add<B: Backend>(
        &mut self,
        logits:  Tensor<B, 2>,
        targets: Tensor<B, 2, Int>,
        loss:    f64,
    ) -> Result<()> {
        let batch_size = logits.dims()[0];
        let probs: Vec<f32> = sigmoid(logits)
            .into_data()
            .convert::<f32>()
            .to_vec()
            .map_err(|e| anyhow!("Cannot read predictions: {e:?}"))?;
        let targets: Vec<i64> = targets
            .into_data()
            .convert::<i64>()
            .to_vec()
            .map_err(|e| anyhow!("Cannot read targets: {e:?}"))?;

        self.scores.extend(probs.into_iter().map(f64::from));
        self.labels.extend(targets.into_iter().map(|t| t == 1));
        self.loss_sum += loss * batch_size as f64;
        self.samples  += batch_size;
        Ok(())
    }

    pub(crate) fn finish(self) -> Evaluation {
        let loss = if self.samples > 0 { self.loss_sum / self.samples as f64 } else { f64::NAN };
        Evaluation {
            loss,
            auroc: roc_auc(&self.scores, &self.labels).unwrap_or(f64::NAN),
            aupr:  pr_auc(&self.scores, &self.labels).unwrap_or(f64::NAN),
        }
    }
}

/// Evaluate on a non-autodiff backend (pass `model.valid()` during training).
pub fn evaluate<B: Backend>(
    model:      &MotifNet<B>,
    dataset:    SequenceDataset,
    batch_size: usize,
    device:     &B::Device,
) -> Result<Evaluation> {
    let loader = DataLoaderBuilder::new(SequenceBatcher::<B>::new(device.clone()))
        .batch_size(batch_size)
        .num_workers(1)
        .build(dataset);
    let loss_fn = BinaryCrossEntropyLossConfig::new()
        .with_logits(true)
        .init(device);

    let mut acc = RankingAccumulator::default();
    for batch in loader.iter() {
        let logits = model.forward_logits(batch.sequences);
        let loss: f64 = loss_fn
            .forward(logits.clone(), batch.targets.clone())
            .into_scalar()
            .elem::<f64>();
        acc.add(logits, batch.targets, loss)?;
    }
    Ok(acc.finish())
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use burn::backend::NdArray;

    use crate::data::fixtures::toy_dataset;
    use crate::domain::genomic::SplitKind;
    use crate::ml::model::{Architecture, ArchitectureParams};
    use crate::ml::BACKEND_LOCK;

    #[test]
    fn test_accumulator_perfect_predictions() {
        let device = Default::default();
        let logits = Tensor::<NdArray, 2>::from_floats([[5.0, -5.0], [-5.0, 5.0]], &device);
        let targets = Tensor::<NdArray, 2, Int>::from_ints([[1, 0], [0, 1]], &device);

        let mut acc = RankingAccumulator::default();
        acc.add(logits, targets, 0.25).unwrap();
        let eval = acc.finish();
        assert_eq!(eval.auroc, 1.0);
        assert_eq!(eval.aupr, 1.0);
        assert_eq!(eval.loss, 0.25);
    }

    #[test]
    fn test_empty_accumulator_is_nan() {
        let eval = RankingAccumulator::default().finish();
        assert!(eval.loss.is_nan());
        assert!(eval.auroc.is_nan());
    }

    #[test]
    fn test_evaluate_untrained_model() {
        let _guard = BACKEND_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let device = Default::default();
        let dataset = Arc::new(toy_dataset(24, 40, 3, 7));
        let params = ArchitectureParams { num_filters: 4, dense_units: 8, num_out: 3, ..Default::default() };
        let model = Architecture::Cnn.config(40, &params).init::<NdArray>(&device);

        let eval = evaluate(&model, SequenceDataset::new(dataset, SplitKind::Valid), 5, &device).unwrap();
        assert!(eval.loss.is_finite() && eval.loss > 0.0);
        assert!((0.0..=1.0).contains(&eval.auroc));
        assert!((0.0..=1.0).contains(&eval.aupr));
    }
}
