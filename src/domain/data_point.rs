// ============================================================
// Layer 3 — Data Point Domain Types
// ============================================================
// A data point pairs a natural language question with the
// formal query that answers it against the knowledge base:
//
//   Question: "What is the capital of the Netherlands?"
//   Query:    "select distinct ?obj where { wd:Q55 wdt:P36 ?obj }"
//
// During evaluation each predicted query is paired with its
// ground truth(s) so a corpus-level BLEU score can be taken.
//
// Reference: Papineni et al. (2002) BLEU
//            Rust Book §5 (Structs), §6 (Enums)

use serde::{Deserialize, Serialize};

/// A "raw" question/query pair, before any tokenisation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDataPoint {
    /// Zero-based line index in the source files
    pub idx: usize,

    /// The question, e.g. "Who wrote Max Havelaar?"
    pub natural_language: String,

    /// The formal query the question maps to
    pub query_language: String,
}

impl RawDataPoint {
    pub fn new(
        idx:              usize,
        natural_language: impl Into<String>,
        query_language:   impl Into<String>,
    ) -> Self {
        Self {
            idx,
            natural_language: natural_language.into(),
            query_language:   query_language.into(),
        }
    }
}

/// A predicted sentence paired with one or more ground truths.
/// Both sides are already split into whitespace tokens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationPair {
    pub idx:        usize,
    pub predicted:  Vec<String>,
    pub references: Vec<Vec<String>>,
}

impl EvaluationPair {
    pub fn new(idx: usize, predicted: &str, references: &[&str]) -> Self {
        Self {
            idx,
            predicted:  split_words(predicted),
            references: references.iter().map(|r| split_words(r)).collect(),
        }
    }
}

fn split_words(sentence: &str) -> Vec<String> {
    sentence.split_whitespace().map(str::to_string).collect()
}

/// The machine learning stage an evaluation belongs to.
/// Training-stage data is never evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvaluationStage {
    Validate,
    Test,
}

impl EvaluationStage {
    /// File name prefix used for saved evaluation pairs
    pub fn as_str(&self) -> &'static str {
        match self {
            EvaluationStage::Validate => "validate",
            EvaluationStage::Test     => "test",
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evaluation_pair_splits_on_whitespace() {
        let pair = EvaluationPair::new(4, "  select ?x  where ", &["select ?y"]);
        assert_eq!(pair.predicted, vec!["select", "?x", "where"]);
        assert_eq!(pair.references, vec![vec!["select".to_string(), "?y".to_string()]]);
    }

    #[test]
    fn test_stage_prefixes() {
        assert_eq!(EvaluationStage::Validate.as_str(), "validate");
        assert_eq!(EvaluationStage::Test.as_str(), "test");
    }
}
