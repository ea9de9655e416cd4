// ============================================================
// Layer 5 — Training Callbacks
// ============================================================
// Two monitors fed once per epoch with the validation AUPR
// (higher is better):
//
//   ReduceOnPlateau — after `patience` epochs without an
//                     improvement larger than `min_delta`,
//                     multiply the LR by `factor` (floored at
//                     `min_lr`) and start waiting again
//
//   EarlyStopping   — after `patience` epochs without an
//                     improvement, ask the loop to stop
//
// A NaN metric never counts as an improvement.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReduceOnPlateau {
    pub factor:    f64,
    pub patience:  usize,
    pub min_lr:    f64,
    pub min_delta: f64,
    best: f64,
    wait: usize,
}

impl ReduceOnPlateau {
    pub fn new(factor: f64, patience: usize, min_lr: f64, min_delta: f64) -> Self {
        Self { factor, patience, min_lr, min_delta, best: f64::NEG_INFINITY, wait: 0 }
    }

    /// Feed one epoch's metric and return the learning rate to use next.
    pub fn step(&mut self, metric: f64, lr: f64) -> f64 {
        if metric > self.best + self.min_delta {
            self.best = metric;
            self.wait = 0;
            return lr;
        }

        self.wait += 1;
        if self.wait < self.patience {
            return lr;
        }

        self.wait = 0;
        let reduced = (lr * self.factor).max(self.min_lr);
        if reduced < lr {
            tracing::info!("Validation AUPR plateaued, learning rate {:.2e} → {:.2e}", lr, reduced);
        }
        reduced
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EarlyStopping {
    pub patience: usize,
    best: f64,
    wait: usize,
}

impl EarlyStopping {
    pub fn new(patience: usize) -> Self {
        Self { patience, best: f64::NEG_INFINITY, wait: 0 }
    }

    /// Feed one epoch's metric; true means stop now.
    pub fn should_stop(&mut self, metric: f64) -> bool {
        if metric > self.best {
            self.best = metric;
            self.wait = 0;
            return false;
        }
        self.wait += 1;
        self.wait >= self.patience
    }

    pub fn best(&self) -> f64 {
        self.best
    }
}
