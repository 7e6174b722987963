//! Retrieval-quality scoring against one or two loaded index versions.
//!
//! Evaluation runs the vector side only: every question is embedded with
//! the index's own model and searched with `max(k, 10)` candidates for
//! headroom before truncating to `k`. Reports are derived values, never
//! persisted next to the index.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

use ragdex_core::error::{Error, Result};
use ragdex_core::traits::Embedder;
use ragdex_store::LoadedIndex;

use crate::metrics::{mean, ndcg_binary, reciprocal_rank};

/// Sentinel rank delta for a question that a compare run moved from hit to
/// miss (`+999`) or miss to hit (`-999`).
pub const DELTA_HIT_TO_MISS: i64 = 999;
pub const DELTA_MISS_TO_HIT: i64 = -999;

const MIN_FETCH: usize = 10;

/// One labeled query; the gold set is external read-only input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoldRow {
    pub question: String,
    pub expected_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuestionOutcome {
    pub question: String,
    pub expected_id: String,
    pub found: bool,
    /// 1-based position within the top-k, absent on a miss.
    pub rank: Option<usize>,
    pub top_ids: Vec<String>,
    pub top_scores: Vec<f32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EvalReport {
    pub k: usize,
    pub total: usize,
    #[serde(rename = "recall@k")]
    pub recall_at_k: f64,
    pub mrr: f64,
    pub ndcg: f64,
    pub per_question: Vec<QuestionOutcome>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompareOutcome {
    pub question: String,
    pub expected_id: String,
    pub left_rank: Option<usize>,
    pub right_rank: Option<usize>,
    /// `right_rank - left_rank` when both found, a `±999` sentinel when
    /// exactly one side found, absent when both missed.
    pub delta: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompareReport {
    pub k: usize,
    pub total: usize,
    pub left: EvalReport,
    pub right: EvalReport,
    pub regressions: usize,
    pub improvements: usize,
    pub changed: usize,
    pub per_question: Vec<CompareOutcome>,
}

/// Reads a gold set from a JSON array of `{question, expected_id}` rows.
pub fn load_gold(path: &Path) -> Result<Vec<GoldRow>> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::NotFound(format!("gold set {}", path.display()))
        } else {
            Error::Operation(format!("read {}: {e}", path.display()))
        }
    })?;
    serde_json::from_str(&raw)
        .map_err(|e| Error::Corrupted(format!("unreadable gold set {}: {e}", path.display())))
}

pub fn evaluate(
    loaded: &LoadedIndex,
    embedder: &Arc<dyn Embedder>,
    gold: &[GoldRow],
    k: usize,
) -> Result<EvalReport> {
    let k = k.max(1);
    let fetch = k.max(MIN_FETCH);
    let mut per_question = Vec::with_capacity(gold.len());
    let mut recalls = Vec::with_capacity(gold.len());
    let mut mrrs = Vec::with_capacity(gold.len());
    let mut ndcgs = Vec::with_capacity(gold.len());

    for row in gold {
        let outcome = score_question(loaded, embedder, row, k, fetch)?;
        recalls.push(if outcome.found { 1.0 } else { 0.0 });
        mrrs.push(reciprocal_rank(outcome.rank));
        ndcgs.push(ndcg_binary(outcome.rank));
        per_question.push(outcome);
    }
    tracing::debug!(questions = gold.len(), k, "evaluation finished");
    Ok(EvalReport {
        k,
        total: gold.len(),
        recall_at_k: mean(&recalls),
        mrr: mean(&mrrs),
        ndcg: mean(&ndcgs),
        per_question,
    })
}

/// Evaluates both sides over the same gold set and classifies each
/// question's rank movement.
pub fn compare(
    left_loaded: &LoadedIndex,
    left_embedder: &Arc<dyn Embedder>,
    right_loaded: &LoadedIndex,
    right_embedder: &Arc<dyn Embedder>,
    gold: &[GoldRow],
    k: usize,
) -> Result<CompareReport> {
    let left = evaluate(left_loaded, left_embedder, gold, k)?;
    let right = evaluate(right_loaded, right_embedder, gold, k)?;

    let mut per_question = Vec::with_capacity(gold.len());
    let mut regressions = 0;
    let mut improvements = 0;
    let mut changed = 0;
    for (l, r) in left.per_question.iter().zip(&right.per_question) {
        let delta = match (l.rank, r.rank) {
            (Some(lr), Some(rr)) => Some(rr as i64 - lr as i64),
            (Some(_), None) => Some(DELTA_HIT_TO_MISS),
            (None, Some(_)) => Some(DELTA_MISS_TO_HIT),
            (None, None) => None,
        };
        match delta {
            Some(d) if d > 0 => {
                regressions += 1;
                changed += 1;
            }
            Some(d) if d < 0 => {
                improvements += 1;
                changed += 1;
            }
            _ => {}
        }
        per_question.push(CompareOutcome {
            question: l.question.clone(),
            expected_id: l.expected_id.clone(),
            left_rank: l.rank,
            right_rank: r.rank,
            delta,
        });
    }
    Ok(CompareReport {
        k,
        total: gold.len(),
        left,
        right,
        regressions,
        improvements,
        changed,
        per_question,
    })
}

fn score_question(
    loaded: &LoadedIndex,
    embedder: &Arc<dyn Embedder>,
    row: &GoldRow,
    k: usize,
    fetch: usize,
) -> Result<QuestionOutcome> {
    // An empty index contributes a zero-candidate outcome; the question
    // still counts toward every denominator.
    let ranked = if loaded.index.is_empty() {
        Vec::new()
    } else {
        let embedded = embedder
            .embed_batch(&[row.question.clone()])
            .map_err(|e| Error::Operation(format!("embed question: {e}")))?;
        let q = embedded
            .into_iter()
            .next()
            .ok_or_else(|| Error::Operation("embedder returned no query vector".into()))?;
        let mut ranked = loaded.index.search(&q, fetch, loaded.manifest.params.nprobe)?;
        ranked.truncate(k);
        ranked
    };

    let top_ids: Vec<String> = ranked.iter().map(|&(pos, _)| loaded.ids[pos].clone()).collect();
    let top_scores: Vec<f32> = ranked.iter().map(|&(_, score)| score).collect();
    let rank = top_ids.iter().position(|id| *id == row.expected_id).map(|p| p + 1);
    Ok(QuestionOutcome {
        question: row.question.clone(),
        expected_id: row.expected_id.clone(),
        found: rank.is_some(),
        rank,
        top_ids,
        top_scores,
    })
}
