//! Wake word handling

use crate::error::{LalaError, LalaResult};

pub const MIN_WAKE_WORD_CHARS: usize = 2;

/// Reject wake words that are empty or shorter than two characters
pub fn validate_wake_word(wake_word: &str) -> LalaResult<()> {
    if wake_word.chars().count() < MIN_WAKE_WORD_CHARS {
        return Err(LalaError::InvalidWakeWord(wake_word.to_string()));
    }
    Ok(())
}

/// Command that follows the first case-insensitive occurrence of
/// `wake_word`, trimmed. Text without the wake word is returned whole.
pub fn strip_wake_word<'a>(text: &'a str, wake_word: &str) -> &'a str {
    let needle: Vec<char> = wake_word.chars().flat_map(char::to_lowercase).collect();
    if needle.is_empty() {
        return text;
    }

    text.char_indices()
        .find_map(|(start, _)| match_end(text, start, &needle))
        .map_or(text, |end| text[end..].trim())
}

/// Byte offset just past `needle` if it matches `haystack` at `start`
fn match_end(haystack: &str, start: usize, needle: &[char]) -> Option<usize> {
    let mut wanted = needle.iter();
    let mut next = wanted.next();

    for (offset, c) in haystack[start..].char_indices() {
        for lower in c.to_lowercase() {
            match next {
                Some(&w) if w == lower => next = wanted.next(),
                _ => return None,
            }
        }
        if next.is_none() {
            return Some(start + offset + c.len_utf8());
        }
    }
    None
}
