//! Word-group chunking for simulated incremental delivery

/// Split `text` on single spaces into groups of `words_per_chunk` words,
/// each group followed by one space
///
/// Newlines stay inside the words, so concatenating the chunks gives back
/// `text` plus one trailing space. A zero group size is treated as one.
pub fn chunk_words(text: &str, words_per_chunk: usize) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }

    let size = words_per_chunk.max(1);
    let words: Vec<&str> = text.split(' ').collect();

    words
        .chunks(size)
        .map(|group| format!("{} ", group.join(" ")))
        .collect()
}
