use ragdex_text::{tokenize, Bm25Index};

fn corpus(texts: &[&str]) -> Vec<String> {
    texts.iter().map(|s| s.to_string()).collect()
}

#[test]
fn tokenize_is_lowercase_whitespace() {
    assert_eq!(tokenize("Hello  WORLD\tfoo"), vec!["hello", "world", "foo"]);
    assert!(tokenize("   ").is_empty());
}

#[test]
fn matching_documents_rank_above_unrelated_ones() {
    let index = Bm25Index::fit(&corpus(&[
        "the cat sat on the mat",
        "dogs chase cats in the yard",
        "quantum chromodynamics lecture notes",
    ]));
    let hits = index.search("cat mat", 3);
    assert_eq!(hits[0].0, 0);
    assert!(hits.iter().all(|&(pos, _)| pos != 2), "unrelated doc must not match");
}

#[test]
fn rare_terms_outweigh_common_ones() {
    let index = Bm25Index::fit(&corpus(&[
        "common common rare",
        "common common common",
        "common word salad",
    ]));
    let hits = index.search("rare", 3);
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].0, 0);
}

#[test]
fn ties_break_by_corpus_order() {
    let index = Bm25Index::fit(&corpus(&["same text", "same text", "same text"]));
    let hits = index.search("same", 3);
    let positions: Vec<usize> = hits.iter().map(|&(p, _)| p).collect();
    assert_eq!(positions, vec![0, 1, 2]);
}

#[test]
fn truncates_to_k() {
    let index = Bm25Index::fit(&corpus(&["a b", "a c", "a d", "a e"]));
    let hits = index.search("a", 2);
    assert_eq!(hits.len(), 2);
}

#[test]
fn empty_corpus_and_empty_query_yield_nothing() {
    let empty = Bm25Index::fit(&[]);
    assert!(empty.search("anything", 5).is_empty());

    let index = Bm25Index::fit(&corpus(&["something here"]));
    assert!(index.search("", 5).is_empty());
    assert!(index.search("unknownterm", 5).is_empty());
}

#[test]
fn zero_score_documents_never_pad_the_results() {
    // Only one of three documents matches; the other two must not be
    // appended to fill k.
    let index = Bm25Index::fit(&corpus(&["alpha beta", "gamma delta", "epsilon zeta"]));
    let hits = index.search("gamma", 3);
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].0, 1);
    assert!(hits[0].1 > 0.0);
}
