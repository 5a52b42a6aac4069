// crates/placedex-core/src/text.rs

//! # Text Normalization
//!
//! One tokenizer serves both sides of the index: the harvester splits place
//! names with it and the autocomplete engine splits queries with it, so the
//! prefix keys they compute always agree.

/// Longest prefix ever written to (or looked up in) the prefix index.
pub const MAX_PREFIX_LEN: usize = 30;

/// Convert a string into a folded key suitable for indexing and comparison.
///
/// This performs:
/// 1\) Transliterate Unicode → ASCII (e.g. `Łódź` -> `Lodz`)
/// 2\) Normalize to lowercase
///
/// # Examples
///
/// ```rust
/// use placedex_core::text::fold_key;
///
/// assert_eq!(fold_key("Łódź"), "lodz");
/// assert_eq!(fold_key("Washington"), "washington");
/// ```
pub fn fold_key(s: &str) -> String {
    deunicode::deunicode(s).to_lowercase()
}

/// Split free text into ordered, lowercase words.
///
/// Folds the text, drops commas, trims, collapses whitespace runs and splits
/// on the single spaces left over. Empty input yields one empty word; callers
/// that need "no words" must check for it.
///
/// ```rust
/// use placedex_core::text::tokenize;
///
/// assert_eq!(tokenize("  New   York, "), vec!["new", "york"]);
/// assert_eq!(tokenize(""), vec![""]);
/// ```
pub fn tokenize(text: &str) -> Vec<String> {
    let folded = fold_key(text).replace(',', "");
    let mut collapsed = String::with_capacity(folded.len());
    let mut last_was_space = false;
    for ch in folded.trim().chars() {
        if ch.is_whitespace() {
            if !last_was_space {
                collapsed.push(' ');
            }
            last_was_space = true;
        } else {
            collapsed.push(ch);
            last_was_space = false;
        }
    }
    collapsed.split(' ').map(str::to_owned).collect()
}

/// All leading substrings of `word`, shortest first, capped at `max_len` chars.
pub fn prefixes(word: &str, max_len: usize) -> impl Iterator<Item = &str> + '_ {
    word.char_indices()
        .skip(1)
        .map(|(i, _)| i)
        .chain(std::iter::once(word.len()))
        .take(max_len)
        .filter(move |_| !word.is_empty())
        .map(move |end| &word[..end])
}

/// Truncate `word` to at most `max_len` characters.
pub fn truncate_chars(word: &str, max_len: usize) -> &str {
    match word.char_indices().nth(max_len) {
        Some((i, _)) => &word[..i],
        None => word,
    }
}
