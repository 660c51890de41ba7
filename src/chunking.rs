//! Recursive character splitting of long documents into overlapping chunks.
//!
//! Text is split on the coarsest separator that occurs in it (paragraphs,
//! then lines, then words, then characters). Pieces shorter than the chunk
//! size are merged back together greedily; pieces that are still too long
//! are split again with the next separator. Each piece keeps its leading
//! separator so merging never invents or loses whitespace, and every
//! emitted chunk is trimmed.
//!
//! All sizes are measured in characters, not bytes, so multi-byte text is
//! never cut in the middle of a code point.

use std::collections::VecDeque;

/// Separators tried in order, coarsest first. The empty separator splits
/// into single characters and always succeeds.
const SEPARATORS: &[&str] = &["\n\n", "\n", " ", ""];

/// Size and overlap of the chunks produced by [`split_text`].
///
/// # Examples
///
/// ```
/// use docchat::chunking::{split_text, SplitterConfig};
///
/// let config = SplitterConfig::new(1000, 200);
/// let chunks = split_text("Hello, world!", config);
/// assert_eq!(chunks, vec!["Hello, world!".to_string()]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitterConfig {
    /// Maximum chunk size in characters.
    pub chunk_size: usize,
    /// Characters carried over from the end of one chunk into the next.
    pub chunk_overlap: usize,
}

impl SplitterConfig {
    pub const fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
        }
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Split `text` into trimmed, non-empty chunks of at most
/// `config.chunk_size` characters.
///
/// Identical input and configuration always yield identical output.
pub fn split_text(text: &str, config: SplitterConfig) -> Vec<String> {
    let config = SplitterConfig {
        chunk_size: config.chunk_size.max(1),
        chunk_overlap: config.chunk_overlap.min(config.chunk_size),
    };
    split_recursive(text, SEPARATORS, config)
}

fn split_recursive(
    text: &str,
    separators: &[&str],
    config: SplitterConfig,
) -> Vec<String> {
    let (separator, finer) = pick_separator(text, separators);

    let mut chunks = Vec::new();
    let mut short_pieces: Vec<&str> = Vec::new();

    for piece in split_keeping_separator(text, separator) {
        if char_len(piece) < config.chunk_size {
            short_pieces.push(piece);
            continue;
        }

        if !short_pieces.is_empty() {
            chunks.extend(merge_pieces(&short_pieces, config));
            short_pieces.clear();
        }

        if finer.is_empty() {
            if let Some(chunk) = join_pieces([piece]) {
                chunks.push(chunk);
            }
        } else {
            chunks.extend(split_recursive(piece, finer, config));
        }
    }

    if !short_pieces.is_empty() {
        chunks.extend(merge_pieces(&short_pieces, config));
    }

    chunks
}

/// The first separator present in `text`, and the finer separators left to
/// try on pieces that are still too long.
fn pick_separator<'s>(
    text: &str,
    separators: &'s [&'s str],
) -> (&'s str, &'s [&'s str]) {
    for (i, separator) in separators.iter().enumerate() {
        if separator.is_empty() {
            return (separator, &[]);
        }
        if text.contains(separator) {
            return (separator, &separators[i + 1..]);
        }
    }
    (separators.last().copied().unwrap_or(""), &[])
}

/// Split on `separator`, attaching each separator to the piece after it.
/// Empty pieces are dropped.
fn split_keeping_separator<'t>(text: &'t str, separator: &str) -> Vec<&'t str> {
    if separator.is_empty() {
        return text
            .char_indices()
            .map(|(i, c)| &text[i..i + c.len_utf8()])
            .collect();
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    for (idx, _) in text.match_indices(separator) {
        if idx > start {
            pieces.push(&text[start..idx]);
        }
        start = idx;
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }
    pieces
}

/// Greedily merge pieces into chunks no longer than `chunk_size`, starting
/// each new chunk with the trailing pieces of the previous one that fit in
/// `chunk_overlap`.
fn merge_pieces(pieces: &[&str], config: SplitterConfig) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut window: VecDeque<(&str, usize)> = VecDeque::new();
    let mut total = 0;

    for &piece in pieces {
        let len = char_len(piece);

        if total + len > config.chunk_size && !window.is_empty() {
            if let Some(chunk) = join_pieces(window.iter().map(|(p, _)| *p)) {
                chunks.push(chunk);
            }

            while total > config.chunk_overlap
                || (total + len > config.chunk_size && total > 0)
            {
                let Some((_, first_len)) = window.pop_front() else {
                    break;
                };
                total -= first_len;
            }
        }

        window.push_back((piece, len));
        total += len;
    }

    if let Some(chunk) = join_pieces(window.iter().map(|(p, _)| *p)) {
        chunks.push(chunk);
    }

    chunks
}

fn join_pieces<'a>(
    pieces: impl IntoIterator<Item = &'a str>,
) -> Option<String> {
    let joined: String = pieces.into_iter().collect();
    let trimmed = joined.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
