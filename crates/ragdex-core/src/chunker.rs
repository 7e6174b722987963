//! Text chunking strategies.
//!
//! All window arithmetic is in characters, not bytes, so multi-byte text
//! never lands on a broken boundary. Every strategy returns an empty list
//! for empty input and never panics on pathological parameters; callers
//! clamp `size >= 1` before invoking (see `ChunkingSpec::clamped`).

use regex::Regex;
use std::sync::OnceLock;

use crate::types::Chunk;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkMode {
    FixedChars,
    Sentences,
    Headings,
}

impl ChunkMode {
    /// Unknown mode strings fall back to fixed-char chunking rather than
    /// failing the build.
    pub fn parse(s: &str) -> ChunkMode {
        match s {
            "sentences" => ChunkMode::Sentences,
            "headings" => ChunkMode::Headings,
            _ => ChunkMode::FixedChars,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChunkMode::FixedChars => "fixed_chars",
            ChunkMode::Sentences => "sentences",
            ChunkMode::Headings => "headings",
        }
    }
}

fn sentence_break_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[.!?]\s+").unwrap_or_else(|e| panic!("sentence regex: {e}")))
}

fn heading_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\n\s*(#+|<h[1-3]>|</h[1-3]>)").unwrap_or_else(|e| panic!("heading regex: {e}"))
    })
}

pub fn chunk_text(text: &str, mode: ChunkMode, size: usize, overlap: usize) -> Vec<String> {
    match mode {
        ChunkMode::FixedChars => chunk_fixed(text, size, overlap),
        ChunkMode::Sentences => chunk_sentences(text, size, overlap),
        ChunkMode::Headings => chunk_headings(text, size, overlap),
    }
}

/// Successive windows of at most `size` chars covering the whole input.
///
/// The next window starts at `max(end - overlap, start + 1)`, so progress is
/// guaranteed even when `overlap >= size`. The last window may be shorter.
pub fn chunk_fixed(text: &str, size: usize, overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let n = chars.len();
    let mut out = Vec::new();
    let mut i = 0usize;
    while i < n {
        let j = usize::min(i + size, n);
        out.push(chars[i..j].iter().collect());
        if j == n {
            break;
        }
        i = usize::max(j.saturating_sub(overlap), i + 1);
    }
    out
}

/// Greedily packs sentences into chunks of at most `size` chars. With
/// `overlap > 0` each chunk after the first is prefixed with the last
/// `overlap` chars of its predecessor; continuity is approximate, the
/// prefix is not aligned to a sentence boundary.
pub fn chunk_sentences(text: &str, size: usize, overlap: usize) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let mut cur = String::new();
    for sentence in split_sentences(text) {
        if char_len(&cur) + char_len(sentence) + 1 <= size {
            cur = format!("{cur} {sentence}").trim().to_string();
        } else {
            if !cur.is_empty() {
                out.push(std::mem::take(&mut cur));
            }
            cur = sentence.to_string();
        }
    }
    if !cur.is_empty() {
        out.push(cur);
    }
    if overlap > 0 && out.len() > 1 {
        let mut with_overlap = Vec::with_capacity(out.len());
        with_overlap.push(out[0].clone());
        for i in 1..out.len() {
            with_overlap.push(format!("{}{}", tail_chars(&out[i - 1], overlap), out[i]));
        }
        out = with_overlap;
    }
    out
}

/// Splits the document into sections at heading markers (Markdown `#` lines
/// or HTML h1-h3 tags), then chunks each section independently; a chunk
/// never crosses a heading boundary.
pub fn chunk_headings(text: &str, size: usize, overlap: usize) -> Vec<String> {
    let mut sections: Vec<&str> = Vec::new();
    let mut last = 0usize;
    for m in heading_re().find_iter(text) {
        let section = text[last..m.start()].trim();
        if !section.is_empty() {
            sections.push(section);
        }
        last = m.end();
    }
    let tail = text[last..].trim();
    if !tail.is_empty() {
        sections.push(tail);
    }
    sections
        .into_iter()
        .flat_map(|s| chunk_fixed(s, size, overlap))
        .collect()
}

/// Expands `(row_id, text)` pairs into chunks with `"{row_id}#{ordinal}"`
/// ids. Whitespace-only rows are skipped.
pub fn split_rows(
    rows: &[(String, String)],
    mode: ChunkMode,
    size: usize,
    overlap: usize,
) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    for (row_id, text) in rows {
        if text.trim().is_empty() {
            continue;
        }
        for (j, piece) in chunk_text(text, mode, size, overlap).into_iter().enumerate() {
            chunks.push(Chunk { id: format!("{row_id}#{j}"), text: piece });
        }
    }
    chunks
}

/// Sentence boundaries: a `.`, `!` or `?` followed by whitespace. The
/// terminator stays with its sentence, the whitespace run is dropped.
fn split_sentences(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut last = 0usize;
    for m in sentence_break_re().find_iter(text) {
        // The punctuation class is single-byte ASCII.
        let end = m.start() + 1;
        out.push(&text[last..end]);
        last = m.end();
    }
    if last < text.len() {
        out.push(&text[last..]);
    }
    out
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn tail_chars(s: &str, n: usize) -> &str {
    let total = s.chars().count();
    if total <= n {
        return s;
    }
    let skip = total - n;
    match s.char_indices().nth(skip) {
        Some((byte, _)) => &s[byte..],
        None => s,
    }
}
