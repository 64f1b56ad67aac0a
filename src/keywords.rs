//! Keyword tokenizer.
//!
//! Titles, stored keyword strings and search queries all go through
//! [`normalize`], so a stored keyword string is always a space-joined list of
//! lowercase tokens that re-normalizes to itself.

/// Characters that separate words. Runs of them collapse.
pub const WORD_SEPARATORS: &[char] = &[
    ' ', '\n', '\t', ':', ',', ';', '.', '-', '+', '=', '[', ']', '!', '?', '(', ')', '$', '%',
    '^', '&', '*', '<', '>', '"', '`',
];

/// Lowercase `text` and split it into tokens, dropping empty ones.
///
/// ```
/// assert_eq!(
///     rehost::keywords::normalize("Hello, World!  foo-bar"),
///     ["hello", "world", "foo", "bar"]
/// );
/// ```
pub fn normalize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(WORD_SEPARATORS)
        .filter(|word| !word.is_empty())
        .map(str::to_string)
        .collect()
}

/// The stored form of a keyword list: normalized tokens joined by spaces.
pub fn title_to_keywords(title: &str) -> String {
    normalize(title).join(" ")
}

/// Normalize query words as typed on a command line or in a form field.
///
/// Each argument may itself contain several words (`["red panda"]`).
pub fn normalize_query<S: AsRef<str>>(words: &[S]) -> Vec<String> {
    words
        .iter()
        .flat_map(|word| normalize(word.as_ref()))
        .collect()
}
