//! Text chunking for ingestion
//!
//! Splits text into ~800 character segments with a 200 character overlap,
//! preferring sentence boundaries, then word boundaries:
//!
//! ```text
//! [0-800] [600-1400] [1200-2000] ...
//! ```

/// Chunk configuration for fixed-size chunking
#[derive(Debug, Clone)]
pub struct ChunkConfig {
    /// Target chunk size in bytes
    pub chunk_size: usize,
    /// Overlap between consecutive chunks in bytes
    pub overlap: usize,
    /// Minimum chunk size; smaller trailing pieces merge into the previous chunk
    pub min_chunk_size: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: 800,
            overlap: 200,
            min_chunk_size: 200,
        }
    }
}

impl ChunkConfig {
    /// Build a config, clamping overlap and minimum size below `chunk_size`
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        let chunk_size = chunk_size.max(16);
        Self {
            chunk_size,
            overlap: overlap.min(chunk_size / 2),
            min_chunk_size: (chunk_size / 4).max(1),
        }
    }
}

/// Nearest char boundary at or before `index`
#[inline]
fn floor_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    let mut i = index;
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

/// Nearest char boundary at or after `index`
#[inline]
fn ceil_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    let mut i = index;
    while i < s.len() && !s.is_char_boundary(i) {
        i += 1;
    }
    i
}

/// Split `text` into overlapping chunks.
///
/// Whitespace-only input yields no chunks; input shorter than one chunk
/// yields exactly one (trimmed) chunk.
pub fn chunk_text(text: &str, config: &ChunkConfig) -> Vec<String> {
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }
    if text.len() <= config.chunk_size {
        return vec![text.to_string()];
    }

    let total = text.len();
    let mut chunks: Vec<String> = Vec::new();
    let mut start = 0;

    while start < total {
        let mut end = floor_char_boundary(text, (start + config.chunk_size).min(total));

        if end < total {
            end = floor_char_boundary(text, find_break_point(text, start, end, config.min_chunk_size));
        }

        start = ceil_char_boundary(text, start);
        if start >= end {
            break;
        }

        let chunk = text[start..end].trim();
        if chunk.len() >= config.min_chunk_size || chunks.is_empty() {
            chunks.push(chunk.to_string());
        } else if let Some(last) = chunks.last_mut() {
            last.push(' ');
            last.push_str(chunk);
        }

        if end >= total {
            break;
        }

        let next = ceil_char_boundary(text, end.saturating_sub(config.overlap));
        // Always make progress, even with a large overlap
        start = if next <= start { end } else { next };
    }

    chunks
}

/// Last sentence boundary (`.`, `!`, `?` followed by whitespace) past
/// `min_size`, else last whitespace past `min_size`, else `ideal_end`
fn find_break_point(text: &str, start: usize, ideal_end: usize, min_size: usize) -> usize {
    let window = &text[start..ideal_end];

    let sentence_end = window
        .char_indices()
        .filter(|(offset, c)| matches!(c, '.' | '!' | '?') && *offset >= min_size)
        .filter_map(|(offset, c)| {
            let after = offset + c.len_utf8();
            window[after..]
                .chars()
                .next()
                .is_none_or(char::is_whitespace)
                .then_some(start + after)
        })
        .last();
    if let Some(boundary) = sentence_end {
        return boundary;
    }

    window
        .char_indices()
        .filter(|(offset, c)| c.is_whitespace() && *offset >= min_size)
        .map(|(offset, _)| start + offset)
        .last()
        .unwrap_or(ideal_end)
}
