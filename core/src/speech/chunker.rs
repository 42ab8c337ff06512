//! Split markup into provider-sized pieces on sentence boundaries
//!
//! A sentence ends at `.`, `!` or `?` followed by whitespace. Sentences are
//! packed greedily; a single sentence longer than the limit is kept whole
//! rather than cut. Joining the chunks with single spaces gives back the
//! document with its sentence-boundary whitespace collapsed.

/// Sentences of `doc`, trimmed, in order
pub fn sentences(doc: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start: Option<usize> = None;
    let mut chars = doc.char_indices().peekable();

    while let Some((idx, c)) = chars.next() {
        if start.is_none() {
            if c.is_whitespace() {
                continue;
            }
            start = Some(idx);
        }
        if matches!(c, '.' | '!' | '?') {
            let at_boundary = chars
                .peek()
                .map_or(false, |&(_, next)| next.is_whitespace());
            if at_boundary {
                if let Some(s) = start.take() {
                    out.push(&doc[s..idx + c.len_utf8()]);
                }
            }
        }
    }
    if let Some(s) = start {
        let tail = doc[s..].trim_end();
        if !tail.is_empty() {
            out.push(tail);
        }
    }
    out
}

/// Pack sentences into chunks of at most `max_len` characters.
///
/// Returns the trimmed document unchanged when it already fits. Never
/// returns an empty chunk; a blank document yields no chunks.
pub fn chunk(doc: &str, max_len: usize) -> Vec<String> {
    let doc = doc.trim();
    if doc.is_empty() {
        return Vec::new();
    }
    if doc.chars().count() <= max_len {
        return vec![doc.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for sentence in sentences(doc) {
        let len = sentence.chars().count();
        if current_len > 0 && current_len + 1 + len > max_len {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if current_len > 0 {
            current.push(' ');
            current_len += 1;
        }
        current.push_str(sentence);
        current_len += len;
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}
