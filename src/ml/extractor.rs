// ============================================================
// Layer 5 — Filter Extractor
// ============================================================
// Turns each first-layer convolutional filter into a position
// weight matrix by aligning the input windows that activate it:
//
//   1. run the held-out sequences up to the tagged layer
//      → activations [N, L, F]
//   2. for filter f, keep every (n, p) whose activation exceeds
//      threshold × max over the whole map of f
//   3. cut a `window`-wide slice of sequence n centred on p,
//      dropping windows that would touch either sequence edge
//   4. average the slices → window × 4 frequency matrix
//
// Filters with no surviving window give an empty PWM at their
// index. Clipping then trims each PWM to its informative core.

use anyhow::{anyhow, Result};
use burn::{prelude::*, tensor::TensorData};
use ndarray::{s, Array2, Array3, ArrayView3, Axis};

use crate::application::config::ExtractionConfig;
use crate::domain::pwm::Pwm;
use crate::ml::model::{LayerTag, MotifNet};

/// Tagged-layer output for every sequence, computed batch-wise.
/// `sequences` is [N, L, 4]; the result is [N, L, F].
pub fn layer_activations<B: Backend>(
    model:      &MotifNet<B>,
    sequences:  ArrayView3<'_, f32>,
    tag:        LayerTag,
    batch_size: usize,
    device:     &B::Device,
) -> Result<Array3<f32>> {
    let (n, positions, channels) = sequences.dim();
    let mut values: Vec<f32> = Vec::new();
    let mut features = 0;

    for start in (0..n).step_by(batch_size.max(1)) {
        let end   = (start + batch_size.max(1)).min(n);
        let chunk = sequences.slice(s![start..end, .., ..]);
        let flat: Vec<f32> = chunk.iter().copied().collect();
        let input = Tensor::<B, 3>::from_data(
            TensorData::new(flat, [end - start, positions, channels]),
            device,
        );

        let output = model.tap(input, tag);
        features = output.dims()[2];
        let batch: Vec<f32> = output
            .into_data()
            .convert::<f32>()
            .to_vec()
            .map_err(|e| anyhow!("Cannot read activations: {e:?}"))?;
        values.extend(batch);
    }

    Array3::from_shape_vec((n, positions, features), values)
        .map_err(|e| anyhow!("Activation shape mismatch: {e}"))
}

/// One PWM per filter from activation-aligned windows (steps 2-4).
pub fn filter_activations(
    sequences:   ArrayView3<'_, f32>,
    activations: ArrayView3<'_, f32>,
    window:      usize,
    threshold:   f64,
) -> Vec<Pwm> {
    let (_, positions, channels) = sequences.dim();
    let window_left  = window / 2;
    let window_right = window - window_left;

    activations
        .axis_iter(Axis(2))
        .enumerate()
        .map(|(filter, fmap)| {
            let max = fmap.iter().copied().fold(f32::NEG_INFINITY, f32::max);
            if max.is_nan() || max <= 0.0 {
                tracing::debug!("filter{filter}: no positive activation");
                return Pwm::empty();
            }
            let cutoff = (max as f64 * threshold) as f32;

            let mut sum   = Array2::<f64>::zeros((window, channels));
            let mut count = 0usize;
            for ((n, p), &a) in fmap.indexed_iter() {
                if a <= cutoff || p <= window_left || p + window_right >= positions {
                    continue;
                }
                let seq = sequences.slice(s![n, p - window_left..p + window_right, ..]);
                sum.zip_mut_with(&seq, |acc, &v| *acc += v as f64);
                count += 1;
            }

            if count == 0 {
                tracing::debug!("filter{filter}: no window inside the sequence bounds");
                return Pwm::empty();
            }
            Pwm::from_matrix(sum / count as f64).unwrap_or_else(Pwm::empty)
        })
        .collect()
}

/// Keep rows `[first - pad, last + pad]` around the rows whose
/// information exceeds `threshold`. Uninformative matrices are
/// returned unchanged.
pub fn clip_filter(pwm: &Pwm, threshold: f64, pad: usize) -> Pwm {
    let info = pwm.information();
    let first = info.iter().position(|&i| i > threshold);
    let last  = info.iter().rposition(|&i| i > threshold);

    match (first, last) {
        (Some(first), Some(last)) => {
            let start = first.saturating_sub(pad);
            let end   = (last + pad + 1).min(pwm.len());
            pwm.slice_rows(start, end)
        }
        _ => pwm.clone(),
    }
}

pub fn clip_filters(pwms: &[Pwm], threshold: f64, pad: usize) -> Vec<Pwm> {
    pwms.iter().map(|p| clip_filter(p, threshold, pad)).collect()
}

/// Activations → aligned PWMs → clipped PWMs, one per filter.
pub fn extract_pwms<B: Backend>(
    model:      &MotifNet<B>,
    sequences:  ArrayView3<'_, f32>,
    cfg:        &ExtractionConfig,
    batch_size: usize,
    device:     &B::Device,
) -> Result<Vec<Pwm>> {
    let activations = layer_activations(model, sequences, LayerTag::ConvActivation, batch_size, device)?;
    let pwms = filter_activations(sequences, activations.view(), cfg.window, cfg.threshold);
    let empty = pwms.iter().filter(|p| p.is_empty()).count();
    tracing::info!("Extracted {} filters ({} without activating windows)", pwms.len(), empty);
    Ok(clip_filters(&pwms, cfg.clip_threshold, cfg.pad))
}
