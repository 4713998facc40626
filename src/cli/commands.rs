// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands: `decode` and `evaluate`
// and all their configurable flags.
//
// clap's derive macros automatically generate:
//   - help text (--help)
//   - error messages for missing args
//   - type conversion (string → usize, PathBuf, enums)
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{ArgGroup, Args, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::application::{
    decode_use_case::{DecodeOverrides, ModelSource},
    evaluate_use_case::EvaluateConfig,
};
use crate::domain::data_point::EvaluationStage;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Beam search a sequence model and print the ranked queries
    Decode(DecodeArgs),

    /// Score predicted queries against the ground truth with BLEU
    Evaluate(EvaluateArgs),
}

/// Burn backend to run the tensors on
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceArg {
    Cpu,
    Wgpu,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageArg {
    Validate,
    Test,
}

impl From<StageArg> for EvaluationStage {
    fn from(s: StageArg) -> Self {
        match s {
            StageArg::Validate => EvaluationStage::Validate,
            StageArg::Test     => EvaluationStage::Test,
        }
    }
}

/// All arguments for the `decode` command.
/// Exactly one of --trace or --bigram selects the model.
#[derive(Args, Debug)]
#[command(group(ArgGroup::new("model").required(true).args(["trace", "bigram"])))]
pub struct DecodeArgs {
    /// Recorded per-step log-probabilities (JSON)
    #[arg(long)]
    pub trace: Option<PathBuf>,

    /// Bigram logit table (JSON)
    #[arg(long)]
    pub bigram: Option<PathBuf>,

    /// Decode config (JSON); defaults are used when omitted
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Number of beams kept alive every step
    #[arg(long)]
    pub beam_size: Option<usize>,

    /// Give up after this many steps
    #[arg(long)]
    pub max_steps: Option<usize>,

    /// Start token id
    #[arg(long)]
    pub sos_id: Option<u32>,

    /// End token id
    #[arg(long)]
    pub eos_id: Option<u32>,

    /// HuggingFace tokenizer.json used to turn ids back into text
    #[arg(long)]
    pub tokenizer: Option<PathBuf>,

    /// Write the ranked queries to this JSON file
    #[arg(long)]
    pub output: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = DeviceArg::Cpu)]
    pub device: DeviceArg,
}

impl DecodeArgs {
    pub fn source(&self) -> Option<ModelSource> {
        match (&self.trace, &self.bigram) {
            (Some(path), _) => Some(ModelSource::Trace(path.clone())),
            (_, Some(path)) => Some(ModelSource::Bigram(path.clone())),
            _               => None,
        }
    }

    pub fn overrides(&self) -> DecodeOverrides {
        DecodeOverrides {
            beam_size: self.beam_size,
            max_steps: self.max_steps,
            sos_id:    self.sos_id,
            eos_id:    self.eos_id,
        }
    }
}

/// All arguments for the `evaluate` command
#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// Natural language questions, one per line
    #[arg(long)]
    pub questions: PathBuf,

    /// Ground truth queries, line-aligned with --questions
    #[arg(long)]
    pub queries: PathBuf,

    /// Predicted queries, line-aligned with --questions
    #[arg(long)]
    pub predictions: PathBuf,

    /// Where the evaluation pairs and evaluation.csv are written
    #[arg(long, default_value = "evaluation")]
    pub out_dir: PathBuf,

    #[arg(long, value_enum, default_value_t = StageArg::Test)]
    pub stage: StageArg,
}

/// Convert CLI EvaluateArgs into the application-layer EvaluateConfig.
/// The application layer never sees clap types.
impl From<EvaluateArgs> for EvaluateConfig {
    fn from(a: EvaluateArgs) -> Self {
        EvaluateConfig {
            questions:   a.questions,
            queries:     a.queries,
            predictions: a.predictions,
            out_dir:     a.out_dir,
            stage:       a.stage.into(),
        }
    }
}
