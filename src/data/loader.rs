// ============================================================
// Layer 4 — Line-Aligned Data Point Loader
// ============================================================
// Loads question/query data points from two plain text files
// where line N of one file pairs with line N of the other:
//
//   questions.txt                     queries.txt
//   ──────────────                    ───────────
//   Who wrote Max Havelaar?           select ?ans where { ... }
//   What is the capital of ...?       select ?ans where { ... }
//
// Lines are trimmed; a trailing newline does not add a data
// point. The files must hold the same number of lines.
//
// Reference: Rust Book §12 (Reading a File)
//            Rust Book §13 (Iterators)

use anyhow::{bail, Context, Result};
use std::{fs, path::{Path, PathBuf}};

use crate::domain::{data_point::RawDataPoint, traits::DataPointSource};

/// Loads data points from a natural language file and a
/// query language file.
pub struct LineAlignedLoader {
    natural_language_file: PathBuf,
    query_language_file:   PathBuf,
}

impl LineAlignedLoader {
    pub fn new(
        natural_language_file: impl Into<PathBuf>,
        query_language_file:   impl Into<PathBuf>,
    ) -> Self {
        Self {
            natural_language_file: natural_language_file.into(),
            query_language_file:   query_language_file.into(),
        }
    }
}

impl DataPointSource for LineAlignedLoader {
    fn load_all(&self) -> Result<Vec<RawDataPoint>> {
        let questions = read_lines(&self.natural_language_file)?;
        let queries   = read_lines(&self.query_language_file)?;

        if questions.len() != queries.len() {
            bail!(
                "'{}' has {} lines but '{}' has {}",
                self.natural_language_file.display(),
                questions.len(),
                self.query_language_file.display(),
                queries.len()
            );
        }

        let data_points: Vec<RawDataPoint> = questions
            .into_iter()
            .zip(queries)
            .enumerate()
            .map(|(idx, (question, query))| RawDataPoint::new(idx, question, query))
            .collect();

        tracing::info!(
            "Loaded {} data points from '{}'",
            data_points.len(),
            self.natural_language_file.display()
        );
        Ok(data_points)
    }
}

/// Read one predicted sentence per line.
pub fn load_predictions(path: &Path) -> Result<Vec<String>> {
    read_lines(path)
}

fn read_lines(path: &Path) -> Result<Vec<String>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Cannot read '{}'", path.display()))?;
    Ok(text.lines().map(|l| l.trim().to_string()).collect())
}
