// ============================================================
// Layer 5 — Corpus BLEU
// ============================================================
// Scores predicted queries against their ground truths the way
// machine translation is scored:
//
//   p_n  = Σ clipped n-gram matches / Σ predicted n-grams
//          (summed over the whole corpus, n = 1..4)
//   BP   = 1                  if c > r
//          exp(1 - r / c)     otherwise
//   BLEU = BP · exp(¼ Σ ln p_n)
//
// c is the total predicted length and r the total length of the
// reference closest in length to each prediction (the shorter
// one on a tie). A match is "clipped" to the largest number of
// times the n-gram occurs in any single reference.
//
// No smoothing: if any p_n is zero the score is zero.
//
// Reference: Papineni et al. (2002) BLEU: a Method for Automatic
//            Evaluation of Machine Translation

use std::collections::HashMap;

use crate::domain::data_point::EvaluationPair;

const MAX_ORDER: usize = 4;

/// Corpus BLEU between 0 and 1
pub fn corpus_bleu(pairs: &[EvaluationPair]) -> f64 {
    let mut matches    = [0usize; MAX_ORDER];
    let mut totals     = [0usize; MAX_ORDER];
    let mut hyp_length = 0usize;
    let mut ref_length = 0usize;

    for pair in pairs {
        for n in 1..=MAX_ORDER {
            let (m, t) = modified_precision(&pair.predicted, &pair.references, n);
            matches[n - 1] += m;
            totals[n - 1]  += t;
        }
        hyp_length += pair.predicted.len();
        ref_length += closest_reference_length(&pair.references, pair.predicted.len());
    }

    if matches.iter().any(|&m| m == 0) {
        return 0.0;
    }

    let log_precision: f64 = matches
        .iter()
        .zip(&totals)
        .map(|(&m, &t)| (m as f64 / t as f64).ln())
        .sum::<f64>()
        / MAX_ORDER as f64;

    brevity_penalty(ref_length, hyp_length) * log_precision.exp()
}

/// (clipped matches, predicted n-gram count). The count is at
/// least 1 so a prediction shorter than n still weighs in.
fn modified_precision(predicted: &[String], references: &[Vec<String>], n: usize) -> (usize, usize) {
    let counts = ngram_counts(predicted, n);

    let mut max_ref_counts: HashMap<&[String], usize> = HashMap::new();
    for reference in references {
        for (gram, count) in ngram_counts(reference, n) {
            let entry = max_ref_counts.entry(gram).or_insert(0);
            *entry = (*entry).max(count);
        }
    }

    let clipped: usize = counts
        .iter()
        .map(|(gram, &count)| count.min(max_ref_counts.get(gram).copied().unwrap_or(0)))
        .sum();
    let total: usize = counts.values().sum();

    (clipped, total.max(1))
}

fn ngram_counts(tokens: &[String], n: usize) -> HashMap<&[String], usize> {
    let mut counts = HashMap::new();
    if tokens.len() >= n {
        for gram in tokens.windows(n) {
            *counts.entry(gram).or_insert(0) += 1;
        }
    }
    counts
}

fn closest_reference_length(references: &[Vec<String>], hyp_len: usize) -> usize {
    references
        .iter()
        .map(Vec::len)
        .min_by_key(|&len| (len.abs_diff(hyp_len), len))
        .unwrap_or(0)
}

fn brevity_penalty(ref_length: usize, hyp_length: usize) -> f64 {
    if hyp_length > ref_length {
        1.0
    } else if hyp_length == 0 {
        0.0
    } else {
        (1.0 - ref_length as f64 / hyp_length as f64).exp()
    }
}
