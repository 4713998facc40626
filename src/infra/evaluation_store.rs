// ============================================================
// Layer 6 — Evaluation Store
// ============================================================
// Writes evaluation pairs to two line-aligned text files so a
// run can be inspected (or re-scored) later:
//
//   {stage}-predicted.txt     idx \t predicted sentence
//   {stage}-ground-truth.txt  idx \t reference ||| reference ...
//
// Example (test stage):
//   test-predicted.txt:     "0\tselect distinct ?obj where { ... }"
//   test-ground-truth.txt:  "0\tselect distinct ?obj where { ... }"
//
// Reference: Rust Book §12 (I/O and File Handling)

use anyhow::{Context, Result};
use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use crate::domain::data_point::{EvaluationPair, EvaluationStage};

/// Separates multiple ground truths of one data point
pub const GROUND_TRUTH_SEPARATOR: &str = " ||| ";

pub struct EvaluationStore {
    dir: PathBuf,
}

impl EvaluationStore {
    /// Create the store, creating its directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn predicted_path(&self, stage: EvaluationStage) -> PathBuf {
        self.dir.join(format!("{}-predicted.txt", stage.as_str()))
    }

    pub fn ground_truth_path(&self, stage: EvaluationStage) -> PathBuf {
        self.dir.join(format!("{}-ground-truth.txt", stage.as_str()))
    }

    /// Save both halves of every pair, one line per pair.
    pub fn save_pairs(&self, stage: EvaluationStage, pairs: &[EvaluationPair]) -> Result<()> {
        let predicted_path    = self.predicted_path(stage);
        let ground_truth_path = self.ground_truth_path(stage);

        let mut predicted    = create(&predicted_path)?;
        let mut ground_truth = create(&ground_truth_path)?;

        for pair in pairs {
            let references: Vec<String> = pair.references
                .iter()
                .map(|r| r.join(" "))
                .collect();

            writeln!(predicted, "{}\t{}", pair.idx, pair.predicted.join(" "))?;
            writeln!(ground_truth, "{}\t{}", pair.idx, references.join(GROUND_TRUTH_SEPARATOR))?;
        }

        predicted.flush()?;
        ground_truth.flush()?;

        tracing::info!(
            "Saved {} evaluation pairs to '{}' and '{}'",
            pairs.len(),
            predicted_path.display(),
            ground_truth_path.display()
        );
        Ok(())
    }
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    let file = File::create(path)
        .with_context(|| format!("Cannot create '{}'", path.display()))?;
    Ok(BufWriter::new(file))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writes_line_aligned_files() {
        let dir   = tempfile::tempdir().unwrap();
        let store = EvaluationStore::new(dir.path().join("results")).unwrap();

        let pairs = vec![
            EvaluationPair::new(0, "select ?x", &["select ?x"]),
            EvaluationPair::new(1, "ask { }", &["ask { a }", "ask { b }"]),
        ];
        store.save_pairs(EvaluationStage::Validate, &pairs).unwrap();

        let predicted = fs::read_to_string(store.predicted_path(EvaluationStage::Validate)).unwrap();
        assert_eq!(predicted, "0\tselect ?x\n1\task { }\n");

        let truth = fs::read_to_string(store.ground_truth_path(EvaluationStage::Validate)).unwrap();
        assert_eq!(truth, "0\tselect ?x\n1\task { a } ||| ask { b }\n");
    }
}
