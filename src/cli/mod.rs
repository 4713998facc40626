// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// This is the entry point for all user interaction.
// It uses the `clap` crate to parse command line arguments.
// All business logic is delegated to Layer 2 (application).
//
// Two commands are supported:
//   1. `decode`   — beam searches a sequence model
//   2. `evaluate` — scores predictions with corpus BLEU
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::{anyhow, Result};
use burn::backend::{ndarray::NdArrayDevice, wgpu::WgpuDevice, NdArray, Wgpu};
use clap::Parser;
use commands::{Commands, DecodeArgs, DeviceArg, EvaluateArgs};

use crate::application::decode_use_case::{DecodeReport, DecodeUseCase};

#[derive(Parser, Debug)]
#[command(
    name = "kbqa-decode",
    version = "0.1.0",
    about = "Beam search decoding and BLEU evaluation for question-to-query models."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch to the correct use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Decode(args)   => run_decode(args),
            Commands::Evaluate(args) => run_evaluate(args),
        }
    }
}

fn run_decode(args: DecodeArgs) -> Result<()> {
    let source = args
        .source()
        .ok_or_else(|| anyhow!("Either --trace or --bigram is required"))?;

    let use_case = DecodeUseCase {
        source,
        config_path: args.config.clone(),
        overrides:   args.overrides(),
        tokenizer:   args.tokenizer.clone(),
        output:      args.output.clone(),
    };

    let report = match args.device {
        DeviceArg::Cpu => {
            tracing::info!("Using NdArray (CPU) backend");
            use_case.execute::<NdArray>(&NdArrayDevice::default())?
        }
        DeviceArg::Wgpu => {
            tracing::info!("Using Wgpu backend");
            use_case.execute::<Wgpu>(&WgpuDevice::default())?
        }
    };

    print_report(&report);
    Ok(())
}

fn print_report(report: &DecodeReport) {
    let status = if report.converged { "converged" } else { "step budget reached" };
    println!("\n{} steps ({})", report.steps, status);
    for q in &report.queries {
        let marker = if q.completed { ' ' } else { '*' };
        println!("{:>3}.{} [{:>10.4}] {}", q.rank, marker, q.log_prob, q.text);
    }
}

fn run_evaluate(args: EvaluateArgs) -> Result<()> {
    use crate::application::evaluate_use_case::EvaluateUseCase;

    let metrics = EvaluateUseCase::new(args.into()).execute()?;
    println!("\n{} BLEU: {:.2} ({} pairs)", metrics.stage.as_str(), metrics.bleu, metrics.pairs);
    Ok(())
}
