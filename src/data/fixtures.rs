// Random one-hot sequences with a learnable label rule: class 0
// is set when an "ACGT" run was implanted in the middle of the
// sequence, class 1 when the first base is G. Any further
// classes are noise.

use ndarray::{s, Array2, Array3};
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::domain::genomic::{GenomicDataset, Split};

const MOTIF: [usize; 4] = [0, 1, 2, 3];

pub(crate) fn toy_split(rng: &mut StdRng, samples: usize, positions: usize, classes: usize) -> Split {
    let mut x = Array3::<f32>::zeros((samples, positions, 4));
    let mut y = Array2::<f32>::zeros((samples, classes));
    let centre = positions / 2;

    for n in 0..samples {
        for p in 0..positions {
            x[[n, p, rng.gen_range(0..4)]] = 1.0;
        }
        if rng.gen_bool(0.5) && positions >= centre + MOTIF.len() {
            for (offset, &base) in MOTIF.iter().enumerate() {
                x.slice_mut(s![n, centre + offset, ..]).fill(0.0);
                x[[n, centre + offset, base]] = 1.0;
            }
            y[[n, 0]] = 1.0;
        }
        if classes > 1 && x[[n, 0, 2]] == 1.0 {
            y[[n, 1]] = 1.0;
        }
        for c in 2..classes {
            y[[n, c]] = if rng.gen_bool(0.3) { 1.0 } else { 0.0 };
        }
    }
    Split::new(x, y).expect("rows match by construction")
}

pub(crate) fn toy_dataset(samples: usize, positions: usize, classes: usize, seed: u64) -> GenomicDataset {
    let mut rng = StdRng::seed_from_u64(seed);
    GenomicDataset {
        train:        toy_split(&mut rng, samples, positions, classes),
        valid:        toy_split(&mut rng, samples / 2 + 1, positions, classes),
        test:         toy_split(&mut rng, samples / 2 + 1, positions, classes),
        ground_truth: None,
    }
}

/// Like `toy_dataset`, with a `model_test` array: uniform rows
/// everywhere except one-hot rows where the motif was implanted.
pub(crate) fn toy_coded_dataset(samples: usize, positions: usize, seed: u64) -> GenomicDataset {
    let mut dataset = toy_dataset(samples, positions, 2, seed);
    let test = &dataset.test;
    let centre = positions / 2;
    let mut model = Array3::<f32>::from_elem((test.len(), positions, 4), 0.25);
    for n in 0..test.len() {
        if test.labels()[[n, 0]] == 1.0 {
            for (offset, &base) in MOTIF.iter().enumerate() {
                model.slice_mut(s![n, centre + offset, ..]).fill(0.0);
                model[[n, centre + offset, base]] = 1.0;
            }
        }
    }
    dataset.ground_truth = Some(model);
    dataset
}
