//! Okapi BM25 with the usual k1/b defaults and a +1-smoothed idf so terms
//! appearing in most documents never score negative.
//!
//! Zero-score documents are excluded from results, unlike rankers that pad
//! the top-k with zero-score documents in corpus order. A document sharing
//! no term with the query carries no lexical evidence, and padded positions
//! would feed arbitrary ranks into downstream rank fusion; a term-free
//! query therefore returns no lexical candidates at all.

use std::collections::HashMap;

const K1: f32 = 1.5;
const B: f32 = 0.75;

/// Lowercase whitespace tokenization, applied identically to documents
/// and queries.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase().split_whitespace().map(str::to_string).collect()
}

pub struct Bm25Index {
    /// term -> (doc position, term frequency in that doc)
    postings: HashMap<String, Vec<(usize, f32)>>,
    doc_lens: Vec<f32>,
    avg_doc_len: f32,
    n_docs: usize,
}

impl Bm25Index {
    /// Builds the ranking structure over the full corpus snapshot.
    pub fn fit(corpus: &[String]) -> Bm25Index {
        let mut postings: HashMap<String, Vec<(usize, f32)>> = HashMap::new();
        let mut doc_lens = Vec::with_capacity(corpus.len());
        for (pos, text) in corpus.iter().enumerate() {
            let tokens = tokenize(text);
            doc_lens.push(tokens.len() as f32);
            let mut tf: HashMap<String, f32> = HashMap::new();
            for t in tokens {
                *tf.entry(t).or_insert(0.0) += 1.0;
            }
            for (term, freq) in tf {
                postings.entry(term).or_default().push((pos, freq));
            }
        }
        let n_docs = corpus.len();
        let avg_doc_len = if n_docs == 0 {
            0.0
        } else {
            doc_lens.iter().sum::<f32>() / n_docs as f32
        };
        Bm25Index { postings, doc_lens, avg_doc_len, n_docs }
    }

    /// Top-`k` `(position, score)` pairs by descending BM25 score; ties are
    /// broken by original corpus order (stable sort).
    pub fn search(&self, query: &str, k: usize) -> Vec<(usize, f32)> {
        if self.n_docs == 0 {
            return Vec::new();
        }
        let mut scores = vec![0f32; self.n_docs];
        for term in tokenize(query) {
            let Some(posting) = self.postings.get(&term) else { continue };
            let df = posting.len() as f32;
            let idf = ((self.n_docs as f32 - df + 0.5) / (df + 0.5) + 1.0).ln();
            for &(pos, tf) in posting {
                let len_norm = 1.0 - B + B * self.doc_lens[pos] / self.avg_doc_len.max(1e-6);
                scores[pos] += idf * tf * (K1 + 1.0) / (tf + K1 * len_norm);
            }
        }
        let mut ranked: Vec<(usize, f32)> =
            scores.into_iter().enumerate().filter(|&(_, s)| s > 0.0).collect();
        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal).then(a.0.cmp(&b.0))
        });
        ranked.truncate(k);
        ranked
    }
}
