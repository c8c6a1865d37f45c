//! Word normalization and rhyme pattern derivation
//!
//! Lyrics are noisy free text, so raw whitespace-delimited tokens go through
//! a total normalization function that either produces a canonical lowercase
//! ASCII word or rejects the token. Rejection is an expected high-frequency
//! outcome, not an error. Accepted words are then keyed by their 2-4
//! character endings, which serve as coarse orthographic rhyme patterns.

use crate::Word;

/// Shortest accepted word length
pub const MIN_WORD_LEN: usize = 2;

/// Longest accepted word length
///
/// Anything longer is more likely an unseparated run of words or other junk
/// than a rhymable dictionary word.
pub const MAX_WORD_LEN: usize = 15;

/// Longest word ending used as a rhyme pattern
pub const MAX_PATTERN_LEN: usize = 4;

/// Normalize a raw lyrics token into a canonical word, or reject it
///
/// Lowercases the token and deletes every character that is not a lowercase
/// ASCII letter. Interior punctuation and digits are deleted rather than
/// treated as separators: "Don't!!" becomes "dont". Tokens that end up
/// shorter than [`MIN_WORD_LEN`] or longer than [`MAX_WORD_LEN`] are
/// rejected, never coerced.
pub fn normalize(token: &str) -> Option<Word> {
    let cleaned = token
        .chars()
        .filter_map(|c| {
            let c = c.to_ascii_lowercase();
            c.is_ascii_lowercase().then_some(c)
        })
        .collect::<String>();
    (MIN_WORD_LEN..=MAX_WORD_LEN)
        .contains(&cleaned.len())
        .then(|| cleaned.into())
}

/// Enumerate the rhyme patterns a normalized word belongs to, shortest first
///
/// For a word of length n, yields its endings of length 2 through
/// min(4, n): a 5-letter word contributes its 2-, 3- and 4-letter endings,
/// a 2-letter word contributes itself only. Byte slicing is safe here
/// because [`normalize`] only emits ASCII.
pub fn suffix_patterns(word: &str) -> impl Iterator<Item = &str> {
    (MIN_WORD_LEN..=MAX_PATTERN_LEN.min(word.len())).map(move |len| &word[word.len() - len..])
}

/// Ending of a word at a given length, or None when the word is too short
pub fn ending(word: &str, len: usize) -> Option<&str> {
    (word.len() >= len).then(|| &word[word.len() - len..])
}
