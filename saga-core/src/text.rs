//! Text clean-up shared by directive parsing and name sanitizing.

/// Collapse every run of whitespace into one space and trim both ends.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Remove markup tags (`<b>`, `</i>`, `<!-- -->`), keeping the text between them.
///
/// A `<` only opens a tag when a letter, `/` or `!` follows it and a `>` closes
/// it later on, so prose such as `3 < 5` survives untouched.
pub fn strip_markup(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(open) = rest.find('<') {
        let after = &rest[open + 1..];
        let opens_tag = after
            .chars()
            .next()
            .is_some_and(|c| c.is_alphabetic() || c == '/' || c == '!');

        match after.find('>') {
            Some(close) if opens_tag => {
                out.push_str(&rest[..open]);
                rest = &after[close + 1..];
            }
            _ => {
                out.push_str(&rest[..=open]);
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

/// Keep at most `max` characters of `text`.
pub fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}
