//! Heuristic consensus engine.
//!
//! A deterministic, synchronous, pure function over the completed response
//! set. Responses qualify when they carry non-empty text and ended in
//! `Completed` or `Timeout` (a timed-out stream with partial output still
//! contributes).
//!
//! The merge works in four steps:
//!
//! 1. Build the *dominant keyword set*: tokenize all qualifying text,
//!    drop short words and stop words, keep the most frequent recurring
//!    terms.
//! 2. Score each response on four weighted factors (keyword agreement,
//!    log-saturated length, structural markup, latency) and normalize the
//!    scores into contributor weights.
//! 3. Extract *key convergences*: deduplicated sentences inside a length
//!    band, ranked by dominant-keyword hits.
//! 4. Compose the final text from the dominant keywords, the convergent
//!    sentences, and the primary (highest-scoring) response's full text.
//!
//! All scoring constants are empirically chosen and kept as configurable
//! fields of [`HeuristicParams`].

use crate::consensus::result::Contributor;
use crate::core::backend::BackendId;
use crate::response::ModelResponse;
use std::collections::HashMap;

/// Convex combination weights for the four scoring factors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FactorWeights {
    pub agreement: f64,
    pub length: f64,
    pub structure: f64,
    pub latency: f64,
}

impl Default for FactorWeights {
    fn default() -> Self {
        Self {
            agreement: 0.4,
            length: 0.3,
            structure: 0.2,
            latency: 0.1,
        }
    }
}

/// Tunable constants of the heuristic merge.
#[derive(Debug, Clone, PartialEq)]
pub struct HeuristicParams {
    pub weights: FactorWeights,
    /// Dominant keyword set size cap.
    pub keyword_limit: usize,
    /// A term must occur this many times across the pool to qualify.
    pub min_term_count: usize,
    /// Tokens shorter than this are dropped before counting.
    pub min_token_len: usize,
    /// Maximum number of key convergence sentences kept.
    pub convergence_limit: usize,
    /// Sentence length band for convergence extraction (filters noise and
    /// walls of text).
    pub sentence_min_len: usize,
    pub sentence_max_len: usize,
    /// Latency bonus reaches zero at this response time.
    pub latency_ceiling_ms: u64,
    /// Structure bonus for a fenced code block.
    pub code_block_bonus: f64,
    /// Smaller structure bonus for list markup.
    pub list_bonus: f64,
    /// Added to the primary contributor's weight to form the confidence.
    pub confidence_bonus: f64,
}

impl Default for HeuristicParams {
    fn default() -> Self {
        Self {
            weights: FactorWeights::default(),
            keyword_limit: 15,
            min_term_count: 2,
            min_token_len: 4,
            convergence_limit: 4,
            sentence_min_len: 40,
            sentence_max_len: 280,
            latency_ceiling_ms: 10_000,
            code_block_bonus: 0.6,
            list_bonus: 0.4,
            confidence_bonus: 0.2,
        }
    }
}

/// Output of the heuristic merge.
#[derive(Debug, Clone, PartialEq)]
pub struct HeuristicConsensus {
    /// Composed answer: header, convergences, consolidated body.
    pub text: String,
    /// `min(0.99, primary weight + confidence bonus)`.
    pub confidence: f64,
    /// Normalized weights in registration order, summing to 1.
    pub contributors: Vec<Contributor>,
    /// Highest-scoring backend; ties resolve to the first registered.
    pub primary: BackendId,
    /// The dominant keyword set, most frequent first.
    pub keywords: Vec<String>,
}

/// Per-response factor breakdown, exposed for inspection and tests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FactorScores {
    pub agreement: f64,
    pub length: f64,
    pub structure: f64,
    pub latency: f64,
}

impl FactorScores {
    pub fn combined(&self, w: &FactorWeights) -> f64 {
        w.agreement * self.agreement
            + w.length * self.length
            + w.structure * self.structure
            + w.latency * self.latency
    }
}

const STOP_WORDS: &[&str] = &[
    "about", "after", "again", "also", "been", "because", "before", "being", "between", "both",
    "cannot", "could", "does", "doing", "during", "each", "every", "from", "have", "having",
    "into", "just", "like", "more", "most", "much", "only", "other", "over", "same", "should",
    "some", "such", "than", "that", "their", "them", "then", "there", "these", "they", "this",
    "those", "through", "under", "very", "what", "when", "where", "which", "while", "will",
    "with", "would", "your",
];

/// Lower-case, strip punctuation, drop short words and stop words.
pub fn tokenize(text: &str, min_token_len: usize) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .map(|w| w.to_lowercase())
        .filter(|w| w.len() >= min_token_len)
        .filter(|w| !STOP_WORDS.contains(&w.as_str()))
        .collect()
}

/// Extract the dominant keyword set from the qualifying texts.
///
/// Terms are ranked by total frequency across the pool; ties break on
/// first occurrence so the result is deterministic. Terms occurring fewer
/// than `min_term_count` times never qualify.
fn dominant_keywords(token_sets: &[Vec<String>], params: &HeuristicParams) -> Vec<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut first_seen: HashMap<&str, usize> = HashMap::new();
    let mut order = 0usize;

    for tokens in token_sets {
        for token in tokens {
            *counts.entry(token.as_str()).or_insert(0) += 1;
            first_seen.entry(token.as_str()).or_insert_with(|| {
                order += 1;
                order
            });
        }
    }

    let mut ranked: Vec<(&str, usize)> = counts
        .into_iter()
        .filter(|(_, count)| *count >= params.min_term_count)
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(first_seen[a.0].cmp(&first_seen[b.0])));
    ranked
        .into_iter()
        .take(params.keyword_limit)
        .map(|(term, _)| term.to_string())
        .collect()
}

fn agreement_score(tokens: &[String], keywords: &[String]) -> f64 {
    if keywords.is_empty() {
        return 0.0;
    }
    let hits = keywords
        .iter()
        .filter(|k| tokens.iter().any(|t| t == *k))
        .count();
    hits as f64 / keywords.len() as f64
}

/// Logarithmic saturation of length relative to the pool mean: diminishing
/// returns on verbosity, 1.0 reached at twice the mean.
fn length_score(len: usize, mean_len: f64) -> f64 {
    if len == 0 || mean_len <= 0.0 {
        return 0.0;
    }
    let ratio = len as f64 / mean_len;
    ((1.0 + ratio).ln() / 3f64.ln()).min(1.0)
}

fn has_list_markup(text: &str) -> bool {
    text.lines().any(|line| {
        let line = line.trim_start();
        line.starts_with("- ")
            || line.starts_with("* ")
            || line
                .split_once(". ")
                .is_some_and(|(head, _)| !head.is_empty() && head.chars().all(|c| c.is_ascii_digit()))
    })
}

fn structure_score(text: &str, params: &HeuristicParams) -> f64 {
    let mut score = 0.0;
    if text.contains("```") {
        score += params.code_block_bonus;
    }
    if has_list_markup(text) {
        score += params.list_bonus;
    }
    score.min(1.0)
}

/// Linearly decreasing bonus, clamped to zero at the ceiling.
fn latency_score(latency_ms: u64, ceiling_ms: u64) -> f64 {
    if latency_ms >= ceiling_ms {
        return 0.0;
    }
    1.0 - latency_ms as f64 / ceiling_ms as f64
}

/// Score one response against the dominant keyword set.
pub fn score_response(
    response: &ModelResponse,
    tokens: &[String],
    keywords: &[String],
    mean_len: f64,
    params: &HeuristicParams,
) -> FactorScores {
    FactorScores {
        agreement: agreement_score(tokens, keywords),
        length: length_score(response.text.len(), mean_len),
        structure: structure_score(&response.text, params),
        latency: latency_score(response.latency_ms, params.latency_ceiling_ms),
    }
}

/// Split into trimmed sentences on terminal punctuation and line breaks.
fn sentences(text: &str) -> Vec<String> {
    text.split(['.', '!', '?', '\n'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Deduplicated sentences within the length band, ranked by dominant
/// keyword hits (stable), capped at the convergence limit.
fn key_convergences(
    qualifying: &[&ModelResponse],
    keywords: &[String],
    params: &HeuristicParams,
) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut candidates: Vec<(String, usize)> = Vec::new();

    for response in qualifying {
        for sentence in sentences(&response.text) {
            if sentence.len() < params.sentence_min_len || sentence.len() > params.sentence_max_len
            {
                continue;
            }
            if seen.contains_key(&sentence) {
                continue;
            }
            let tokens = tokenize(&sentence, params.min_token_len);
            let hits = keywords
                .iter()
                .filter(|k| tokens.iter().any(|t| t == *k))
                .count();
            seen.insert(sentence.clone(), hits);
            candidates.push((sentence, hits));
        }
    }

    // Stable sort keeps encounter order among equal-hit sentences.
    candidates.sort_by(|a, b| b.1.cmp(&a.1));
    candidates
        .into_iter()
        .take(params.convergence_limit)
        .map(|(sentence, _)| sentence)
        .collect()
}

fn compose(
    primary: &ModelResponse,
    source_count: usize,
    keywords: &[String],
    convergences: &[String],
) -> String {
    let mut text = format!(
        "Consensus synthesized from {} source{} (primary: {}).\n",
        source_count,
        if source_count == 1 { "" } else { "s" },
        primary.backend,
    );
    if !keywords.is_empty() {
        text.push_str(&format!("Dominant signals: {}\n", keywords.join(", ")));
    }
    if !convergences.is_empty() {
        text.push_str("\nKey convergences:\n");
        for sentence in convergences {
            text.push_str(&format!("- {sentence}\n"));
        }
    }
    text.push_str(&format!(
        "\nConsolidated answer (from {}):\n{}",
        primary.backend, primary.text
    ));
    text
}

/// Merge the qualifying responses into a single consensus.
///
/// `responses` must be in backend registration order; ties in score resolve
/// to the earlier entry. Returns `None` when no response qualifies — the
/// caller must surface an explicit "no data" state, never fabricated text.
pub fn merge(responses: &[ModelResponse], params: &HeuristicParams) -> Option<HeuristicConsensus> {
    let qualifying: Vec<&ModelResponse> = responses
        .iter()
        .filter(|r| r.qualifies_for_consensus())
        .collect();
    if qualifying.is_empty() {
        return None;
    }

    let token_sets: Vec<Vec<String>> = qualifying
        .iter()
        .map(|r| tokenize(&r.text, params.min_token_len))
        .collect();
    let keywords = dominant_keywords(&token_sets, params);

    let mean_len = qualifying.iter().map(|r| r.text.len()).sum::<usize>() as f64
        / qualifying.len() as f64;

    let raw_scores: Vec<f64> = qualifying
        .iter()
        .zip(&token_sets)
        .map(|(r, tokens)| score_response(r, tokens, &keywords, mean_len, params).combined(&params.weights))
        .collect();

    let total: f64 = raw_scores.iter().sum();
    let contributors: Vec<Contributor> = if total > f64::EPSILON {
        qualifying
            .iter()
            .zip(&raw_scores)
            .map(|(r, score)| Contributor {
                backend: r.backend.clone(),
                weight: score / total,
            })
            .collect()
    } else {
        // Degenerate pool: split evenly so weights still sum to 1.
        qualifying
            .iter()
            .map(|r| Contributor {
                backend: r.backend.clone(),
                weight: 1.0 / qualifying.len() as f64,
            })
            .collect()
    };

    // Strictly-greater comparison keeps the first registered backend on ties.
    let mut primary_idx = 0;
    for (idx, score) in raw_scores.iter().enumerate() {
        if *score > raw_scores[primary_idx] {
            primary_idx = idx;
        }
    }
    let primary = qualifying[primary_idx];

    let convergences = key_convergences(&qualifying, &keywords, params);
    let text = compose(primary, qualifying.len(), &keywords, &convergences);
    let confidence = (contributors[primary_idx].weight + params.confidence_bonus).min(0.99);

    Some(HeuristicConsensus {
        text,
        confidence,
        contributors,
        primary: primary.backend.clone(),
        keywords,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::BackendStatus;

    fn completed(id: &str, text: &str, latency_ms: u64) -> ModelResponse {
        let mut r = ModelResponse::idle(BackendId::new(id));
        r.status = BackendStatus::Completed;
        r.text = text.to_string();
        r.latency_ms = latency_ms;
        r
    }

    #[test]
    fn tokenize_drops_short_and_stop_words() {
        let tokens = tokenize("This is the BEST answer, with mammals!", 4);
        assert_eq!(tokens, vec!["best", "answer", "mammals"]);
    }

    #[test]
    fn no_qualifying_responses_yields_none() {
        let mut errored = completed("a", "text", 0);
        errored.status = BackendStatus::Error;
        let empty = completed("b", "   ", 0);
        assert!(merge(&[errored, empty], &HeuristicParams::default()).is_none());
    }

    #[test]
    fn weights_sum_to_one() {
        let responses = vec![
            completed("a", "Rust ownership prevents data races through borrowing", 900),
            completed("b", "Ownership and borrowing are checked at compile time", 1200),
            completed("c", "The borrow checker enforces ownership rules", 400),
        ];
        let consensus = merge(&responses, &HeuristicParams::default()).unwrap();
        let sum: f64 = consensus.contributors.iter().map(|c| c.weight).sum();
        assert!((sum - 1.0).abs() < 1e-6, "weights summed to {sum}");
        assert_eq!(consensus.contributors.len(), 3);
    }

    #[test]
    fn shared_vocabulary_outranks_the_outlier() {
        // Worked example: A and B share "cats"; B adds length. Expected
        // weight ordering: B >= A > C.
        let responses = vec![
            completed("a", "cats are mammals", 500),
            completed("b", "cats are small mammals", 500),
            completed("c", "dogs are mammals", 500),
        ];
        let consensus = merge(&responses, &HeuristicParams::default()).unwrap();
        assert!(consensus.keywords.contains(&"mammals".to_string()));
        assert!(consensus.keywords.contains(&"cats".to_string()));

        let weight = |id: &str| {
            consensus
                .contributors
                .iter()
                .find(|c| c.backend.as_str() == id)
                .unwrap()
                .weight
        };
        assert!(weight("b") >= weight("a"));
        assert!(weight("a") > weight("c"));
        assert_eq!(consensus.primary.as_str(), "b");
    }

    #[test]
    fn single_timed_out_backend_still_produces_an_answer() {
        let mut partial = completed("solo", "Result: 4", 60_000);
        partial.status = BackendStatus::Timeout;

        let consensus = merge(&[partial], &HeuristicParams::default()).unwrap();
        assert!(!consensus.text.is_empty());
        assert!(consensus.text.contains("Result: 4"));
        assert_eq!(consensus.contributors.len(), 1);
        assert!((consensus.contributors[0].weight - 1.0).abs() < 1e-9);
        assert_eq!(consensus.primary.as_str(), "solo");
    }

    #[test]
    fn score_ties_resolve_to_first_registered() {
        let responses = vec![
            completed("first", "identical answer text here", 100),
            completed("second", "identical answer text here", 100),
        ];
        let consensus = merge(&responses, &HeuristicParams::default()).unwrap();
        assert_eq!(consensus.primary.as_str(), "first");
    }

    #[test]
    fn structure_bonus_detects_code_and_lists() {
        let params = HeuristicParams::default();
        assert_eq!(structure_score("plain text", &params), 0.0);
        assert_eq!(structure_score("```rust\nfn main() {}\n```", &params), 0.6);
        assert_eq!(structure_score("- first\n- second", &params), 0.4);
        assert_eq!(
            structure_score("```code```\n1. step one", &params),
            (0.6f64 + 0.4).min(1.0)
        );
    }

    #[test]
    fn latency_bonus_clamps_at_ceiling() {
        assert_eq!(latency_score(0, 10_000), 1.0);
        assert_eq!(latency_score(5_000, 10_000), 0.5);
        assert_eq!(latency_score(10_000, 10_000), 0.0);
        assert_eq!(latency_score(60_000, 10_000), 0.0);
    }

    #[test]
    fn convergences_respect_band_and_cap() {
        let long_sentence =
            "The borrow checker statically verifies every reference before the program compiles";
        let text = format!("Too short. {long_sentence}. {long_sentence}.");
        let responses = vec![
            completed("a", &text, 100),
            completed("b", &text, 100),
        ];
        let params = HeuristicParams::default();
        let qualifying: Vec<&ModelResponse> = responses.iter().collect();
        let keywords = vec!["borrow".to_string()];
        let convergences = key_convergences(&qualifying, &keywords, &params);
        // Duplicate sentences collapse, short ones are filtered out.
        assert_eq!(convergences, vec![long_sentence.to_string()]);
    }

    #[test]
    fn confidence_is_capped() {
        let solo = completed("a", "a perfectly confident single response", 0);
        let consensus = merge(&[solo], &HeuristicParams::default()).unwrap();
        assert!(consensus.confidence <= 0.99);
        assert!(consensus.confidence > 0.9); // weight 1.0 + bonus, capped
    }
}
