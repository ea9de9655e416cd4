// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// This is the entry point for all user interaction.
// It uses the `clap` crate to parse command line arguments.
// All business logic is delegated to Layer 2 (application).
//
// Three commands are supported:
//   1. `motifs`   — trains N trials and scores their filter motifs
//   2. `saliency` — trains N trials and scores their saliency maps
//   3. `analyze`  — re-scores comparison output already on disk
//
// The backend is picked here, once, from `--device`:
//   cpu → Autodiff<NdArray>,  gpu → Autodiff<Wgpu>
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

// Declare the commands submodule
pub mod commands;

use std::time::Duration;

use anyhow::Result;
use burn::backend::{ndarray::NdArrayDevice, wgpu::WgpuDevice, Autodiff, NdArray, Wgpu};
use clap::Parser;
use commands::{run_config, AnalyzeArgs, Commands, DeviceArg, MotifsArgs, SaliencyArgs};

use crate::application::{
    analyze_use_case::AnalyzeUseCase,
    context::PipelineContext,
    motif_use_case::MotifUseCase,
    saliency_use_case::SaliencyUseCase,
};
use crate::data::loader::{BundleLocation, BundleSource};
use crate::domain::motif_set::TrueMotifSet;
use crate::infra::tomtom::ExternalComparator;

type CpuBackend = Autodiff<NdArray>;
type GpuBackend = Autodiff<Wgpu>;

/// The main CLI struct. clap reads the fields and generates
/// argument parsing code automatically via the Parser derive macro.
#[derive(Parser, Debug)]
#[command(
    name = "motif-pipeline",
    version = "0.1.0",
    about = "Train CNN/attention models on genomic sequences, extract filter motifs and score them against known motifs."
)]
pub struct Cli {
    /// The subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch to the correct use case.
    /// This keeps the CLI layer thin: it only routes, never computes.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Motifs(args)   => run_motifs(args),
            Commands::Saliency(args) => run_saliency(args),
            Commands::Analyze(args)  => run_analyze(args),
        }
    }
}

/// Handles the `motifs` subcommand.
fn run_motifs(args: MotifsArgs) -> Result<()> {
    let source  = BundleSource::new(BundleLocation::parse(&args.data.dataset));
    let context = PipelineContext::load(&source, args.data.layout())?;
    let comparator = ExternalComparator::new(
        args.comparator.clone(),
        Duration::from_secs(args.comparator_timeout),
    );
    let use_case = MotifUseCase::new(
        &context,
        comparator,
        TrueMotifSet::synthetic(),
        run_config(&args.model, &args.train),
        (&args).into(),
    );

    let records = match args.train.device {
        DeviceArg::Cpu => use_case.execute::<CpuBackend>(&NdArrayDevice::Cpu)?,
        DeviceArg::Gpu => use_case.execute::<GpuBackend>(&WgpuDevice::default())?,
    };

    println!("\n{:<28} {:>8} {:>8} {:>8} {:>8} {:>8}  comparison", "trial", "loss", "auroc", "aupr", "match", "false");
    for r in &records {
        println!(
            "{:<28} {:>8.4} {:>8.4} {:>8.4} {:>8.3} {:>8.3}  {:?}",
            r.identifier, r.loss, r.auroc, r.aupr, r.match_fraction, r.false_fraction, r.comparison_status,
        );
    }
    println!("Results saved under '{}'.", context.layout.baseline().display());
    Ok(())
}

/// Handles the `saliency` subcommand.
fn run_saliency(args: SaliencyArgs) -> Result<()> {
    let source  = BundleSource::new(BundleLocation::parse(&args.data.dataset));
    let context = PipelineContext::load(&source, args.data.layout())?;
    let use_case = SaliencyUseCase::new(
        &context,
        run_config(&args.model, &args.train),
        (&args).into(),
    );

    let records = match args.train.device {
        DeviceArg::Cpu => use_case.execute::<CpuBackend>(&NdArrayDevice::Cpu)?,
        DeviceArg::Gpu => use_case.execute::<GpuBackend>(&WgpuDevice::default())?,
    };

    println!("\n{:<28} {:>8} {:>8} {:>8} {:>8} {:>8} {:>8}", "trial", "loss", "auroc", "aupr", "sal_roc", "sal_pr", "snr");
    for r in &records {
        println!(
            "{:<28} {:>8.4} {:>8.4} {:>8.4} {:>8.4} {:>8.4} {:>8.3}",
            r.identifier, r.loss, r.auroc, r.aupr, r.saliency_roc, r.saliency_pr, r.snr,
        );
    }
    println!("Results saved under '{}'.", context.layout.baseline().display());
    Ok(())
}

/// Handles the `analyze` subcommand.
fn run_analyze(args: AnalyzeArgs) -> Result<()> {
    let use_case = AnalyzeUseCase {
        motif_file:  args.motif_file,
        tomtom_dir:  args.tomtom_dir,
        q_threshold: args.q_threshold,
        truth:       TrueMotifSet::synthetic(),
        output:      args.output,
    };
    let summary = use_case.execute()?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
