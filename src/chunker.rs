//! Word-aligned splitting of narration text for the speech endpoint.

/// Splits `text` into chunks of at most `max_chars` characters.
///
/// Words are accumulated greedily and joined with single spaces. A word that
/// is longer than `max_chars` on its own becomes a chunk by itself; words are
/// never cut.
pub fn split(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();
        if current.is_empty() {
            current.push_str(word);
            current_len = word_len;
            continue;
        }

        if current_len + 1 + word_len <= max_chars {
            current.push(' ');
            current.push_str(word);
            current_len += 1 + word_len;
        } else {
            chunks.push(std::mem::take(&mut current));
            current.push_str(word);
            current_len = word_len;
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}
