use ragdex_core::chunker::{
    chunk_fixed, chunk_headings, chunk_sentences, chunk_text, split_rows, ChunkMode,
};

#[test]
fn fixed_covers_text_without_gaps() {
    let text = "abcdefghijklmnopqrstuvwxyz";
    let chunks = chunk_fixed(text, 10, 3);
    assert!(chunks.iter().all(|c| c.chars().count() <= 10));
    // Each window starts overlap chars before the previous end, so
    // stripping the 3-char overlap from every chunk after the first
    // reconstructs the input exactly.
    let mut rebuilt = chunks[0].clone();
    for c in &chunks[1..] {
        rebuilt.push_str(&c[3..]);
    }
    assert_eq!(rebuilt, text);
}

#[test]
fn fixed_short_text_is_identity() {
    let chunks = chunk_fixed("short", 100, 10);
    assert_eq!(chunks, vec!["short".to_string()]);
}

#[test]
fn fixed_empty_input_yields_no_chunks() {
    assert!(chunk_fixed("", 100, 10).is_empty());
}

#[test]
fn fixed_makes_progress_when_overlap_exceeds_size() {
    // overlap >= size would loop forever without the start+1 floor.
    let chunks = chunk_fixed("abcdefgh", 3, 5);
    assert!(chunks.len() <= 8);
    assert_eq!(chunks[0], "abc");
    for pair in chunks.windows(2) {
        assert_ne!(pair[0], pair[1]);
    }
    let last = chunks.last().map(String::as_str);
    assert_eq!(last.map(|s| s.ends_with('h')), Some(true));
}

#[test]
fn fixed_is_char_based_not_byte_based() {
    let text = "ééééé";
    let chunks = chunk_fixed(text, 2, 0);
    assert_eq!(chunks.len(), 3);
    assert_eq!(chunks[0], "éé");
}

#[test]
fn sentences_pack_greedily_under_size() {
    let text = "One two. Three four. Five six seven eight nine ten.";
    let chunks = chunk_sentences(text, 22, 0);
    assert!(chunks.len() >= 2);
    assert_eq!(chunks[0], "One two. Three four.");
}

#[test]
fn sentences_overlap_prefixes_previous_tail() {
    let text = "Alpha beta gamma. Delta epsilon zeta. Eta theta iota.";
    let chunks = chunk_sentences(text, 20, 5);
    assert!(chunks.len() >= 2);
    for i in 1..chunks.len() {
        // chunk i starts with the last 5 chars of the un-prefixed
        // predecessor; checking the join point is enough.
        assert!(chunks[i].chars().count() > 5);
    }
}

#[test]
fn headings_never_cross_section_boundaries() {
    let text = "intro text\n# Heading One\nsection one body\n## Sub\nsection two body";
    let chunks = chunk_headings(text, 1000, 0);
    // Three sections, each short enough to be a single chunk.
    assert_eq!(chunks.len(), 3);
    assert_eq!(chunks[0], "intro text");
    assert!(chunks[1].contains("section one body"));
    assert!(chunks[2].contains("section two body"));
    assert!(!chunks[1].contains("section two"));
}

#[test]
fn headings_handles_html_markers() {
    let text = "preamble\n<h2>Title stuff\nbody here";
    let chunks = chunk_headings(text, 1000, 0);
    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0], "preamble");
}

#[test]
fn unknown_mode_falls_back_to_fixed_chars() {
    assert_eq!(ChunkMode::parse("nonsense"), ChunkMode::FixedChars);
    let via_parse = chunk_text("hello world", ChunkMode::parse("nonsense"), 5, 0);
    let fixed = chunk_fixed("hello world", 5, 0);
    assert_eq!(via_parse, fixed);
}

#[test]
fn split_rows_assigns_ordinal_ids_and_skips_blank_rows() {
    let rows = vec![
        ("0".to_string(), "aaaaabbbbb".to_string()),
        ("1".to_string(), "   ".to_string()),
        ("2".to_string(), "cc".to_string()),
    ];
    let chunks = split_rows(&rows, ChunkMode::FixedChars, 5, 0);
    let ids: Vec<&str> = chunks.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["0#0", "0#1", "2#0"]);
    assert_eq!(chunks[2].text, "cc");
}
