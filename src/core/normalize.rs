//! Text canonicalisation for fuzzy header and name matching

/// Lower-case and drop everything that is not an ASCII letter or digit
///
/// `"Customer  No."` and `"customer_no"` both become `"customerno"`.
pub fn normalize(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

/// True when both headers are non-empty and normalise to the same text
pub fn headers_match(a: &str, b: &str) -> bool {
    let a = normalize(a);
    !a.is_empty() && a == normalize(b)
}

/// Key used for product-name lookups: trimmed, lower-cased, `.0` removed
///
/// Product names are matched less aggressively than headers; punctuation
/// and inner spacing are significant.
pub fn lookup_key(text: &str) -> String {
    text.trim().to_lowercase().replace(".0", "")
}
