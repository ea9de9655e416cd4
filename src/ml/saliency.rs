// ============================================================
// Layer 5 — Saliency Maps
// ============================================================
// Gradient of one output class's probability with respect to
// the one-hot input, taken through the network in inference mode
// (running BatchNorm statistics, no dropout), then reduced to one
// score per position:
//
//   score[n, p] = Σ_c  grad[n, p, c] · x[n, p, c]
//
// For one-hot input this is the gradient at the observed base.

use anyhow::{anyhow, ensure, Result};
use burn::{
    prelude::*,
    tensor::{backend::AutodiffBackend, TensorData},
};
use ndarray::{s, Array2, Array3, ArrayView3, Axis, Zip};

use crate::ml::model::MotifNet;

/// d p(class) / d x for every sequence. Returns [N, L, 4].
pub fn saliency_maps<B: AutodiffBackend>(
    model:       &MotifNet<B>,
    sequences:   ArrayView3<'_, f32>,
    class_index: usize,
    batch_size:  usize,
    device:      &B::Device,
) -> Result<Array3<f32>> {
    let (n, positions, channels) = sequences.dim();
    let mut values: Vec<f32> = Vec::with_capacity(n * positions * channels);

    for start in (0..n).step_by(batch_size.max(1)) {
        let end  = (start + batch_size.max(1)).min(n);
        let rows = end - start;
        let flat: Vec<f32> = sequences.slice(s![start..end, .., ..]).iter().copied().collect();
        let input = Tensor::<B, 3>::from_data(TensorData::new(flat, [rows, positions, channels]), device)
            .require_grad();

        let probs = model.forward_frozen(input.clone());
        let classes = probs.dims()[1];
        ensure!(class_index < classes, "class index {class_index} out of range for {classes} outputs");

        // Samples are independent in inference mode, so the gradient of
        // the batch sum is the per-sample gradient
        let target = probs.slice([0..rows, class_index..class_index + 1]).sum();
        let grads  = target.backward();
        let grad   = input
            .grad(&grads)
            .ok_or_else(|| anyhow!("Input received no gradient"))?;

        let batch: Vec<f32> = grad
            .into_data()
            .convert::<f32>()
            .to_vec()
            .map_err(|e| anyhow!("Cannot read gradients: {e:?}"))?;
        values.extend(batch);
    }

    Array3::from_shape_vec((n, positions, channels), values)
        .map_err(|e| anyhow!("Gradient shape mismatch: {e}"))
}

/// Σ over channels of gradient × input → [N, L].
pub fn grad_times_input(sequences: ArrayView3<'_, f32>, grads: ArrayView3<'_, f32>) -> Array2<f64> {
    assert_eq!(sequences.dim(), grads.dim());
    let mut product = Array3::<f64>::zeros(sequences.dim());
    Zip::from(&mut product)
        .and(&sequences)
        .and(&grads)
        .for_each(|out, &x, &g| *out = x as f64 * g as f64);
    product.sum_axis(Axis(2))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};

    use crate::data::fixtures::toy_dataset;
    use crate::ml::model::{Architecture, ArchitectureParams};
    use crate::ml::BACKEND_LOCK;

    type TB = Autodiff<NdArray>;

    #[test]
    fn test_grad_times_input_picks_observed_base() {
        let mut x = Array3::<f32>::zeros((1, 2, 4));
        x[[0, 0, 2]] = 1.0;
        x[[0, 1, 0]] = 1.0;
        let g = Array3::from_shape_fn((1, 2, 4), |(_, p, c)| (p * 4 + c) as f32);
        let scores = grad_times_input(x.view(), g.view());
        assert_eq!(scores.dim(), (1, 2));
        assert_eq!(scores[[0, 0]], 2.0);
        assert_eq!(scores[[0, 1]], 4.0);
    }

    #[test]
    fn test_saliency_shape_and_batching() {
        let _guard = BACKEND_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let device = Default::default();
        let dataset = toy_dataset(8, 32, 2, 9);
        let params = ArchitectureParams { num_filters: 4, dense_units: 8, num_out: 2, ..Default::default() };
        let model = Architecture::CnnAtt
            .config(32, &ArchitectureParams { heads: 2, key_size: 4, ..params })
            .init::<TB>(&device);

        let x = dataset.test.sequences();
        let whole   = saliency_maps(&model, x, 0, 64, &device).unwrap();
        let batched = saliency_maps(&model, x, 0, 2, &device).unwrap();
        assert_eq!(whole.dim(), x.dim());
        for (a, b) in whole.iter().zip(batched.iter()) {
            assert!((a - b).abs() < 1e-5, "{a} vs {b}");
        }
        assert!(whole.iter().any(|v| *v != 0.0));
    }

    #[test]
    fn test_class_out_of_range() {
        let _guard = BACKEND_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let device = Default::default();
        let params = ArchitectureParams { num_filters: 4, dense_units: 8, num_out: 2, ..Default::default() };
        let model = Architecture::Cnn.config(16, &params).init::<TB>(&device);
        let x = Array3::<f32>::zeros((1, 16, 4));
        assert!(saliency_maps(&model, x.view(), 5, 8, &device).is_err());
    }
}
