// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the three subcommands: `motifs`, `saliency` and
// `analyze`, and all their configurable flags.
//
// Flags shared by the two training pipelines are grouped into
// structs and flattened into each subcommand.
//
// clap's derive macros automatically generate:
//   - help text (--help)
//   - error messages for missing args
//   - type conversion (string → usize, f64, enums, etc.)
//
// Reference: Rust Book §12 (Building a CLI Program)

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use crate::analysis::{
    interpretability::{DEFAULT_INFO_THRESHOLD, DEFAULT_TOP_K},
    motif_match::DEFAULT_Q_THRESHOLD,
};
use crate::application::config::{ExtractionConfig, RunConfig, SaliencyConfig, TrainingConfig};
use crate::infra::layout::OutputLayout;
use crate::ml::model::{Architecture, ArchitectureParams, ConvActivation};

/// The three top-level subcommands available to the user
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train, extract filter motifs and compare them against the motif database
    Motifs(MotifsArgs),

    /// Train and score saliency maps against the ground-truth sequence models
    Saliency(SaliencyArgs),

    /// Re-score an existing motif file and comparison directory
    Analyze(AnalyzeArgs),
}

// ─── Shared groups ───────────────────────────────────────────────────────────

/// Where the data comes from and where results go
#[derive(Args, Debug)]
pub struct DataArgs {
    /// URL or local path of the HDF5 (.h5) or .npz dataset bundle
    #[arg(long)]
    pub dataset: String,

    /// Root directory of every output
    #[arg(long, default_value = "results")]
    pub baseline: PathBuf,

    /// Experiment group, e.g. the dataset name
    #[arg(long, default_value = "synthetic")]
    pub category: String,

    /// Model variant name used in paths and record identifiers
    #[arg(long)]
    pub variant: String,
}

impl DataArgs {
    pub fn layout(&self) -> OutputLayout {
        OutputLayout::new(&self.baseline, &self.category, &self.variant)
    }
}

/// Network family and first-layer settings
#[derive(Args, Debug)]
pub struct ModelArgs {
    #[arg(long, value_enum, default_value_t = ArchitectureArg::Cnn)]
    pub architecture: ArchitectureArg,

    /// First-layer activation
    #[arg(long, value_enum, default_value_t = ActivationArg::Relu)]
    pub activation: ActivationArg,

    /// Number of first-layer filters (= number of extracted motifs)
    #[arg(long, default_value_t = 32)]
    pub num_filters: usize,

    /// First-layer max-pool width
    #[arg(long, default_value_t = 4)]
    pub pool_size: usize,

    /// Skip batch normalisation after the first convolution
    #[arg(long)]
    pub no_batch_norm: bool,
}

/// Trial count, optimisation and hardware
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Independently seeded trials to run
    #[arg(long, default_value_t = 5)]
    pub trials: usize,

    /// Trial n is seeded with base_seed + n
    #[arg(long, default_value_t = 0)]
    pub base_seed: u64,

    /// Maximum number of passes through the training split
    #[arg(long, default_value_t = 75)]
    pub epochs: usize,

    #[arg(long, default_value_t = 100)]
    pub batch_size: usize,

    /// Initial Adam learning rate
    #[arg(long, default_value_t = 5e-4)]
    pub lr: f64,

    /// Train for all epochs regardless of validation AUPR
    #[arg(long)]
    pub no_early_stop: bool,

    #[arg(long, value_enum, default_value_t = DeviceArg::Cpu)]
    pub device: DeviceArg,
}

// ─── Subcommand arguments ────────────────────────────────────────────────────

#[derive(Args, Debug)]
pub struct MotifsArgs {
    #[command(flatten)]
    pub data: DataArgs,

    #[command(flatten)]
    pub model: ModelArgs,

    #[command(flatten)]
    pub train: TrainArgs,

    /// Comparison program, called as `<program> <motif_file> <output_dir>`
    #[arg(long, default_value = "scripts/motif_comparison.sh")]
    pub comparator: PathBuf,

    /// Seconds before the comparison program is killed
    #[arg(long, default_value_t = 3600)]
    pub comparator_timeout: u64,

    /// q-value cut-off for a significant match
    #[arg(long, default_value_t = DEFAULT_Q_THRESHOLD)]
    pub q_threshold: f64,

    /// Sequence window aligned on each activating position
    #[arg(long, default_value_t = 20)]
    pub window: usize,

    /// Fraction of a filter's maximum activation a window must reach
    #[arg(long, default_value_t = 0.5)]
    pub activation_threshold: f64,
}

#[derive(Args, Debug)]
pub struct SaliencyArgs {
    #[command(flatten)]
    pub data: DataArgs,

    #[command(flatten)]
    pub model: ModelArgs,

    #[command(flatten)]
    pub train: TrainArgs,

    /// Output class whose score is attributed
    #[arg(long, default_value_t = 0)]
    pub class_index: usize,

    /// Maximum number of positive test sequences explained per trial
    #[arg(long, default_value_t = 500)]
    pub num_analyze: usize,

    /// Ground-truth information (bits) marking a motif position
    #[arg(long, default_value_t = DEFAULT_INFO_THRESHOLD)]
    pub info_threshold: f64,

    /// Background scores averaged into the noise level
    #[arg(long, default_value_t = DEFAULT_TOP_K)]
    pub top_k: usize,
}

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// MEME file written by the motifs pipeline
    #[arg(long)]
    pub motif_file: PathBuf,

    /// Directory holding the comparison table
    #[arg(long)]
    pub tomtom_dir: PathBuf,

    #[arg(long, default_value_t = DEFAULT_Q_THRESHOLD)]
    pub q_threshold: f64,

    /// Where to save the summary as JSON
    #[arg(long)]
    pub output: Option<PathBuf>,
}

// ─── Value enums ─────────────────────────────────────────────────────────────
// Mirrors of the ml-layer enums so that layer stays free of clap.

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArchitectureArg {
    Cnn,
    CnnAtt,
    CnnLstm,
    CnnLstmAtt,
    CnnTrans,
    CnnLstmTrans,
}

impl From<ArchitectureArg> for Architecture {
    fn from(a: ArchitectureArg) -> Self {
        match a {
            ArchitectureArg::Cnn          => Architecture::Cnn,
            ArchitectureArg::CnnAtt       => Architecture::CnnAtt,
            ArchitectureArg::CnnLstm      => Architecture::CnnLstm,
            ArchitectureArg::CnnLstmAtt   => Architecture::CnnLstmAtt,
            ArchitectureArg::CnnTrans     => Architecture::CnnTrans,
            ArchitectureArg::CnnLstmTrans => Architecture::CnnLstmTrans,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActivationArg {
    Relu,
    Exponential,
}

impl From<ActivationArg> for ConvActivation {
    fn from(a: ActivationArg) -> Self {
        match a {
            ActivationArg::Relu        => ConvActivation::Relu,
            ActivationArg::Exponential => ConvActivation::Exponential,
        }
    }
}

/// `cpu` runs on the ndarray backend, `gpu` on wgpu
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceArg {
    Cpu,
    Gpu,
}

// ─── Conversions into application configs ───────────────────────────────────
// This is the boundary between Layer 1 and Layer 2:
// the application layer never sees clap types.

pub fn run_config(model: &ModelArgs, train: &TrainArgs) -> RunConfig {
    let params = ArchitectureParams {
        num_filters: model.num_filters,
        batch_norm:  !model.no_batch_norm,
        activation:  model.activation.into(),
        pool_size:   model.pool_size,
        ..ArchitectureParams::default()
    };
    let training = TrainingConfig {
        epochs:         train.epochs,
        batch_size:     train.batch_size,
        lr:             train.lr,
        early_stopping: !train.no_early_stop,
        ..TrainingConfig::default()
    };
    RunConfig {
        architecture: model.architecture.into(),
        params,
        training,
        trials:       train.trials,
        base_seed:    train.base_seed,
    }
}

impl From<&MotifsArgs> for ExtractionConfig {
    fn from(a: &MotifsArgs) -> Self {
        ExtractionConfig {
            window:      a.window,
            threshold:   a.activation_threshold,
            q_threshold: a.q_threshold,
            ..ExtractionConfig::default()
        }
    }
}

impl From<&SaliencyArgs> for SaliencyConfig {
    fn from(a: &SaliencyArgs) -> Self {
        SaliencyConfig {
            class_index:    a.class_index,
            num_analyze:    a.num_analyze,
            info_threshold: a.info_threshold,
            top_k:          a.top_k,
        }
    }
}
