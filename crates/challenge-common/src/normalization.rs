use unicode_normalization::UnicodeNormalization;

/// Normalize text: trim, collapse whitespace runs to a single U+0020, Unicode NFC, BOM removal.
pub fn normalize_text(text: &str) -> String {
    let no_bom = text.replace('\u{FEFF}', "");
    let nfc: String = no_bom.nfc().collect();
    let mut result = String::with_capacity(nfc.len());
    let mut prev_space = false;
    for c in nfc.chars() {
        if c.is_whitespace() {
            if !prev_space {
                result.push(' ');
                prev_space = true;
            }
        } else {
            result.push(c);
            prev_space = false;
        }
    }
    result.trim().to_string()
}

/// Canonical hashtag: NFKC, lowercase, one optional leading `#` stripped.
///
/// Two hashtags collide exactly when their canonical forms are equal, so the
/// uniqueness index is keyed on this value.
pub fn normalize_hashtag(tag: &str) -> String {
    let trimmed = tag.trim();
    let bare = trimmed.strip_prefix('#').unwrap_or(trimmed);
    bare.nfkc().flat_map(char::to_lowercase).collect()
}

/// Check a canonical hashtag: non-empty, at most `max_chars` characters, and
/// only letters, digits, and `_`.
pub fn hashtag_problem(canonical: &str, max_chars: usize) -> Option<&'static str> {
    if canonical.is_empty() {
        return Some("must not be empty");
    }
    if canonical.chars().count() > max_chars {
        return Some("is too long");
    }
    if !canonical.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return Some("may only contain letters, digits and underscores");
    }
    None
}

/// Number of characters, counted after normalization.
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}
