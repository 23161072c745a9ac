/// Returns the byte offset of the `char_index`-th character of `text`. The
/// index one past the last character maps to `text.len()`. Returns `None`
/// for indices beyond that.
pub fn byte_offset(text: &str, char_index: usize) -> Option<usize> {
    if char_index == 0 {
        return Some(0);
    }

    text.char_indices()
        .map(|(offset, _)| offset)
        .chain(std::iter::once(text.len()))
        .nth(char_index)
}

/// Number of characters in `text`.
pub fn char_len(text: &str) -> usize { text.chars().count() }

/// Returns the characters of `text` in `[start, end)`, clamped to the end of
/// the text.
pub fn char_slice(text: &str, start: usize, end: usize) -> &str {
    let end = end.max(start);
    let start_byte = byte_offset(text, start).unwrap_or(text.len());
    let end_byte = byte_offset(text, end).unwrap_or(text.len());

    &text[start_byte..end_byte]
}

/// Splits `text` after `char_index` characters. An index past the end keeps
/// the whole text on the left.
pub fn split_at_char(text: &str, char_index: usize) -> (&str, &str) {
    text.split_at(byte_offset(text, char_index).unwrap_or(text.len()))
}

/// Returns a copy of `text` with `inserted` spliced in before the
/// `char_index`-th character.
pub fn inject(text: &str, char_index: usize, inserted: &str) -> String {
    let (before, after) = split_at_char(text, char_index);

    let mut result = String::with_capacity(text.len() + inserted.len());
    result.push_str(before);
    result.push_str(inserted);
    result.push_str(after);
    result
}
