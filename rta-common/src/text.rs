//! Response text normalization
//!
//! Both the current submission and historical answers pass through the same
//! cleaning step before any comparison, so metrics are computed on
//! comparable strings.

/// ASCII punctuation removed during cleaning
pub const STRIPPED_PUNCTUATION: &str = "!\"#$%&'()*+,-./:;<=>?@[\\]^_`{|}~";

/// Clean a free-text response for duplicate matching
///
/// Lower-cases, replaces newlines with spaces and strips ASCII punctuation.
/// Other whitespace (including `\r` and tabs) is kept as-is.
pub fn clean_response(raw: &str) -> String {
    raw.to_lowercase()
        .chars()
        .filter_map(|c| match c {
            '\n' => Some(' '),
            c if STRIPPED_PUNCTUATION.contains(c) => None,
            c => Some(c),
        })
        .collect()
}
