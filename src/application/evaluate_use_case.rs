// ============================================================
// Layer 2 — EvaluateUseCase
// ============================================================
// Scores a file of predicted queries against the ground truth:
//
//   Step 1: Load question/query data points  (Layer 4 - data)
//   Step 2: Load predictions                 (Layer 4 - data)
//   Step 3: Normalise prediction spacing     (Layer 4 - data)
//   Step 4: Build evaluation pairs           (Layer 3 - domain)
//   Step 5: Save pairs for inspection        (Layer 6 - infra)
//   Step 6: Corpus BLEU                      (Layer 5 - ml)
//   Step 7: Append to evaluation.csv         (Layer 6 - infra)
//
// Reference: Papineni et al. (2002) BLEU

use anyhow::{bail, Result};
use std::path::PathBuf;

use crate::data::{
    loader::{load_predictions, LineAlignedLoader},
    preprocessor::Preprocessor,
};
use crate::domain::{
    data_point::{EvaluationPair, EvaluationStage},
    traits::DataPointSource,
};
use crate::infra::{
    evaluation_store::EvaluationStore,
    metrics::{EvaluationMetrics, MetricsLogger},
};
use crate::ml::bleu::corpus_bleu;

#[derive(Debug, Clone)]
pub struct EvaluateConfig {
    pub questions:   PathBuf,
    pub queries:     PathBuf,
    pub predictions: PathBuf,
    pub out_dir:     PathBuf,
    pub stage:       EvaluationStage,
}

pub struct EvaluateUseCase {
    config: EvaluateConfig,
}

impl EvaluateUseCase {
    pub fn new(config: EvaluateConfig) -> Self {
        Self { config }
    }

    /// Score the predictions; the returned BLEU is ×100
    pub fn execute(&self) -> Result<EvaluationMetrics> {
        let cfg = &self.config;

        // ── Step 1 + 2: Load ─────────────────────────────────────────────────
        let data_points = LineAlignedLoader::new(&cfg.questions, &cfg.queries).load_all()?;
        let predictions = load_predictions(&cfg.predictions)?;

        if predictions.len() != data_points.len() {
            bail!(
                "{} predictions for {} data points",
                predictions.len(),
                data_points.len()
            );
        }

        // ── Step 3 + 4: Normalise and pair ───────────────────────────────────
        let preprocessor = Preprocessor::new()?;
        let pairs: Vec<EvaluationPair> = data_points
            .iter()
            .zip(&predictions)
            .map(|(point, prediction)| {
                EvaluationPair::new(
                    point.idx,
                    &preprocessor.clean(prediction),
                    &[point.query_language.as_str()],
                )
            })
            .collect();

        // ── Step 5: Save ─────────────────────────────────────────────────────
        EvaluationStore::new(&cfg.out_dir)?.save_pairs(cfg.stage, &pairs)?;

        // ── Step 6: Score ────────────────────────────────────────────────────
        let bleu = corpus_bleu(&pairs) * 100.0;
        tracing::info!("{} BLEU over {} pairs: {:.4}", cfg.stage.as_str(), pairs.len(), bleu);

        // ── Step 7: Record ───────────────────────────────────────────────────
        let metrics = EvaluationMetrics::new(cfg.stage, pairs.len(), bleu);
        let logger = MetricsLogger::new(&cfg.out_dir)?;
        logger.log(&metrics)?;
        tracing::info!("Recorded metrics in '{}'", logger.csv_path().display());

        Ok(metrics)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn setup(predictions: &str) -> (tempfile::TempDir, EvaluateConfig) {
        let dir = tempfile::tempdir().unwrap();
        let p   = dir.path();
        fs::write(p.join("nl.txt"), "who wrote it\nwhere is it\n").unwrap();
        fs::write(
            p.join("ql.txt"),
            "ask wd:Q1 wdt:P50 wd:Q5 end\nask wd:Q2 wdt:P131 wd:Q7 end\n",
        ).unwrap();
        fs::write(p.join("pred.txt"), predictions).unwrap();

        let cfg = EvaluateConfig {
            questions:   p.join("nl.txt"),
            queries:     p.join("ql.txt"),
            predictions: p.join("pred.txt"),
            out_dir:     p.join("out"),
            stage:       EvaluationStage::Test,
        };
        (dir, cfg)
    }

    #[test]
    fn test_normalised_predictions_score_perfectly() {
        // Detokeniser output with spaces around ':'
        let (_dir, cfg) = setup(
            "ask wd : Q1 wdt : P50 wd : Q5 end\nask wd : Q2 wdt : P131 wd : Q7 end\n",
        );
        let metrics = EvaluateUseCase::new(cfg.clone()).execute().unwrap();

        assert!((metrics.bleu - 100.0).abs() < 1e-9);
        assert_eq!(metrics.pairs, 2);

        let predicted = fs::read_to_string(cfg.out_dir.join("test-predicted.txt")).unwrap();
        assert!(predicted.starts_with("0\task wd:Q1 wdt:P50"));
        let csv = fs::read_to_string(cfg.out_dir.join("evaluation.csv")).unwrap();
        assert!(csv.ends_with("test,2,100.000000\n"));
    }

    #[test]
    fn test_prediction_count_must_match() {
        let (_dir, cfg) = setup("ask wd:Q1 wdt:P50 wd:Q5 end\n");
        assert!(EvaluateUseCase::new(cfg).execute().is_err());
    }
}
