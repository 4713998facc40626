// ============================================================
// Layer 4 — Prediction Normaliser
// ============================================================
// Repairs the spacing of a detokenised query before it is
// compared against its ground truth.
//
// Why do we need this?
//   Subword tokenizers put spaces around punctuation when they
//   decode: "wd:Q55" comes back as "wd : Q55", "<obj>" as
//   "< obj >". The ground truths are written without those
//   spaces, so every such token would count as a BLEU miss.
//
// Rules (applied in order):
//   1. Trim the sentence
//   2. "< " → "<" and " >" → ">"
//   3. Drop single spaces on either side of ASCII punctuation
//   4. Put back the spaces the query language does need:
//        "attr_close>" → "attr_close >"
//        "_attr_open"  → "_ attr_open"
//        " [ " → " ["   and   " ] " → "] "
//        "_obd_" → " _obd_ "   and   "_oba_" → " _oba_ "
//
// Reference: regex crate documentation

use anyhow::{Context, Result};
use regex::Regex;

pub struct Preprocessor {
    punctuation: Regex,
}

impl Preprocessor {
    pub fn new() -> Result<Self> {
        let punctuation = Regex::new(r##" ?([!"#$%&'()’*+,\-./:;=?@\\^_`{|}~]) ?"##)
            .context("Invalid punctuation pattern")?;
        Ok(Self { punctuation })
    }

    /// Normalise one predicted sentence.
    pub fn clean(&self, prediction: &str) -> String {
        let step1 = prediction
            .trim()
            .replace("< ", "<")
            .replace(" >", ">");

        let step2 = self.punctuation.replace_all(&step1, "$1");

        step2
            .replace("attr_close>", "attr_close >")
            .replace("_attr_open", "_ attr_open")
            .replace(" [ ", " [")
            .replace(" ] ", "] ")
            .replace("_obd_", " _obd_ ")
            .replace("_oba_", " _oba_ ")
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_removes_spaces_around_punctuation() {
        let p = Preprocessor::new().unwrap();
        assert_eq!(p.clean("a , b"), "a,b");
        assert_eq!(p.clean("wd : Q55"), "wd:Q55");
    }

    #[test]
    fn test_closes_angle_brackets() {
        let p = Preprocessor::new().unwrap();
        assert_eq!(p.clean("< value >"), "<value>");
    }

    #[test]
    fn test_trims_edges() {
        let p = Preprocessor::new().unwrap();
        assert_eq!(p.clean("  select  "), "select");
    }

    #[test]
    fn test_square_brackets_keep_outer_spaces() {
        let p = Preprocessor::new().unwrap();
        assert_eq!(p.clean("p [ a ] b"), "p [a] b");
    }

    #[test]
    fn test_spaces_masking_markers() {
        let p = Preprocessor::new().unwrap();
        assert_eq!(p.clean("x_oba_y"), "x _oba_ y");
    }

    #[test]
    fn test_empty_string() {
        let p = Preprocessor::new().unwrap();
        assert_eq!(p.clean(""), "");
    }
}
