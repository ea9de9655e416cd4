// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Full train + validation loop using Burn's DataLoader and Adam.
//
//   - Training runs on an autodiff backend B
//   - model.valid() returns the model on B::InnerBackend, which
//     is what the evaluator and the extraction code run on
//   - the validation AUPR drives both the plateau LR decay and
//     early stopping
//   - B::seed and the loader's shuffle seed make a trial
//     reproducible on the CPU backend
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use std::sync::Arc;

use anyhow::Result;
use burn::{
    data::dataloader::DataLoaderBuilder,
    module::AutodiffModule,
    nn::loss::BinaryCrossEntropyLossConfig,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::application::config::TrainingConfig;
use crate::data::{batcher::SequenceBatcher, dataset::SequenceDataset};
use crate::domain::genomic::{GenomicDataset, SplitKind};
use crate::infra::checkpoint::CheckpointManager;
use crate::infra::metrics::{EpochMetrics, MetricsLogger, TrainingHistory};
use crate::ml::callbacks::{EarlyStopping, ReduceOnPlateau};
use crate::ml::evaluator::{evaluate, RankingAccumulator};
use crate::ml::model::{MotifNet, MotifNetConfig};

/// The trained model and the per-epoch record of how it got there.
pub struct TrainingOutcome<B: AutodiffBackend> {
    pub model:   MotifNet<B>,
    pub history: TrainingHistory,
}

/// Train one trial and persist its weights, configs and history.
pub fn run_training<B: AutodiffBackend>(
    model_cfg:  &MotifNetConfig,
    cfg:        &TrainingConfig,
    dataset:    Arc<GenomicDataset>,
    device:     &B::Device,
    checkpoint: &CheckpointManager,
    logger:     Option<&MetricsLogger>,
) -> Result<TrainingOutcome<B>> {
    checkpoint.save_config(model_cfg, cfg)?;
    let outcome = train_loop::<B>(model_cfg, cfg, dataset, device, logger)?;
    checkpoint.save_model(&outcome.model)?;
    tracing::info!("Weights saved to '{}'", checkpoint.stem().display());
    Ok(outcome)
}

pub fn train_loop<B: AutodiffBackend>(
    model_cfg: &MotifNetConfig,
    cfg:       &TrainingConfig,
    dataset:   Arc<GenomicDataset>,
    device:    &B::Device,
    logger:    Option<&MetricsLogger>,
) -> Result<TrainingOutcome<B>> {
    model_cfg.validate()?;

    // ── Build model ───────────────────────────────────────────────────────────
    // Seed before init so the initial weights depend on the trial seed only
    B::seed(cfg.seed);
    let mut model: MotifNet<B> = model_cfg.init(device);
    tracing::info!(
        "Model ready: {} filters × {}, seed={}",
        model_cfg.num_filters, model_cfg.kernel_size, cfg.seed,
    );

    // ── Adam optimiser ────────────────────────────────────────────────────────
    let mut optim = AdamConfig::new().with_epsilon(1e-7).init();
    let loss_fn = BinaryCrossEntropyLossConfig::new()
        .with_logits(true)
        .init(device);

    // ── Training data loader (AutodiffBackend) ────────────────────────────────
    let train_loader = DataLoaderBuilder::new(SequenceBatcher::<B>::new(device.clone()))
        .batch_size(cfg.batch_size)
        .shuffle(cfg.seed)
        .num_workers(1)
        .build(SequenceDataset::new(dataset.clone(), SplitKind::Train));

    let mut plateau = ReduceOnPlateau::new(cfg.lr_factor, cfg.lr_patience, cfg.min_lr, cfg.min_delta);
    let mut stopper = EarlyStopping::new(cfg.stop_patience);
    let mut history = TrainingHistory::default();
    let mut lr = cfg.lr;

    // ── Epoch loop ────────────────────────────────────────────────────────────
    for epoch in 1..=cfg.epochs {

        // ── Training phase ────────────────────────────────────────────────────
        let mut train = RankingAccumulator::default();
        for batch in train_loader.iter() {
            let logits = model.forward_logits(batch.sequences);
            let loss   = loss_fn.forward(logits.clone(), batch.targets.clone());

            let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();
            train.add(logits.detach(), batch.targets, loss_val)?;

            // Backward pass + Adam update
            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(lr, model, grads);
        }
        let train = train.finish();

        // ── Validation phase ──────────────────────────────────────────────────
        // model.valid() → MotifNet<B::InnerBackend>: running BN stats, no dropout
        let val = evaluate(
            &model.valid(),
            SequenceDataset::new(dataset.clone(), SplitKind::Valid),
            cfg.batch_size,
            device,
        )?;

        let metrics = EpochMetrics {
            epoch,
            train_loss:  train.loss,
            train_auroc: train.auroc,
            train_aupr:  train.aupr,
            val_loss:    val.loss,
            val_auroc:   val.auroc,
            val_aupr:    val.aupr,
            lr,
        };
        history.push(&metrics);
        if let Some(logger) = logger {
            logger.log(&metrics)?;
        }

        println!(
            "Epoch {:>3}/{} | loss={:.4} | auroc={:.4} | aupr={:.4} | val_loss={:.4} | val_auroc={:.4} | val_aupr={:.4} | lr={:.1e}",
            epoch, cfg.epochs, train.loss, train.auroc, train.aupr,
            val.loss, val.auroc, val.aupr, lr,
        );

        // ── Callbacks ─────────────────────────────────────────────────────────
        if cfg.early_stopping && stopper.should_stop(val.aupr) {
            tracing::info!(
                "Early stopping at epoch {}: no val_aupr gain for {} epochs (best {:.4})",
                epoch, cfg.stop_patience, stopper.best(),
            );
            break;
        }
        lr = plateau.step(val.aupr, lr);
    }

    tracing::info!("Training complete after {} epochs", history.epochs());
    Ok(TrainingOutcome { model, history })
}
