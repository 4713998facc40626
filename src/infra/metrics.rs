// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Records one row per evaluation run to a CSV file so BLEU
// scores across checkpoints and stages can be compared.
//
// Metrics recorded per run:
//   - stage: validate or test
//   - pairs: number of evaluation pairs scored
//   - bleu:  corpus BLEU, between 0 and 100
//
// Output file: {out_dir}/evaluation.csv
//
// Example CSV output:
//   stage,pairs,bleu
//   validate,2000,61.204100
//   test,4000,59.870300
//
// Reference: Rust Book §12 (I/O and File Handling)

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};
use serde::{Deserialize, Serialize};

use crate::domain::data_point::EvaluationStage;

/// One row of evaluation results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationMetrics {
    pub stage: EvaluationStage,

    /// Number of (prediction, ground truth) pairs scored
    pub pairs: usize,

    /// Corpus BLEU ×100. Higher is better.
    pub bleu: f64,
}

impl EvaluationMetrics {
    pub fn new(stage: EvaluationStage, pairs: usize, bleu: f64) -> Self {
        Self { stage, pairs, bleu }
    }
}

/// Appends evaluation metrics to a CSV file.
pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Create a new MetricsLogger.
    /// Writes the CSV header if the file doesn't exist yet.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create '{}'", dir.display()))?;

        let csv_path = dir.join("evaluation.csv");

        // Header only for a new file, so runs accumulate
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)?;
            writeln!(f, "stage,pairs,bleu")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    /// Append one run as a new CSV row.
    pub fn log(&self, m: &EvaluationMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)?;

        writeln!(f, "{},{},{:.6}", m.stage.as_str(), m.pairs, m.bleu)?;

        tracing::debug!(
            "Logged {} metrics: pairs={}, bleu={:.4}",
            m.stage.as_str(),
            m.pairs,
            m.bleu,
        );

        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_appends_rows_under_one_header() {
        let dir = tempfile::tempdir().unwrap();

        let logger = MetricsLogger::new(dir.path()).unwrap();
        logger.log(&EvaluationMetrics::new(EvaluationStage::Validate, 2, 50.0)).unwrap();

        // A second logger on the same directory must not rewrite the header
        let logger = MetricsLogger::new(dir.path()).unwrap();
        logger.log(&EvaluationMetrics::new(EvaluationStage::Test, 3, 25.5)).unwrap();

        let csv = fs::read_to_string(logger.csv_path()).unwrap();
        assert_eq!(csv, "stage,pairs,bleu\nvalidate,2,50.000000\ntest,3,25.500000\n");
    }
}
