//! Column header sanitization
//!
//! Raw CSV headers become storage identifiers: lower-case ASCII
//! alphanumerics joined by single underscores, never starting with a digit,
//! never a reserved word and never longer than [`MAX_HEADER_LENGTH`].

use datastore_common::digest::short_digest;

use crate::reserved::is_reserved;

/// Maximum identifier length accepted by the storage backends
pub const MAX_HEADER_LENGTH: usize = 64;

/// Hex characters of the digest appended to truncated identifiers
pub const HASH_SUFFIX_LENGTH: usize = 4;

/// Convert a raw column name into a storage-safe identifier.
///
/// ```
/// use datastore_import::header::sanitize_header;
///
/// assert_eq!(sanitize_header("Column Name  with\nspaces"), "column_name_with_spaces");
/// assert_eq!(sanitize_header("accessible"), "_accessible");
/// assert_eq!(sanitize_header("1"), "_1");
/// ```
pub fn sanitize_header(raw: &str) -> String {
    let mut name = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() {
            name.push(ch.to_ascii_lowercase());
        } else if !name.ends_with('_') {
            name.push('_');
        }
    }

    let mut name = name.trim_matches('_').to_string();

    let leading_digit = name.starts_with(|c: char| c.is_ascii_digit());
    if name.is_empty() || leading_digit || is_reserved(&name) {
        name.insert(0, '_');
    }

    truncate_header(&name)
}

/// Truncate `name` to [`MAX_HEADER_LENGTH`] characters.
///
/// See [`truncate_header_to`].
pub fn truncate_header(name: &str) -> String {
    truncate_header_to(name, MAX_HEADER_LENGTH)
}

/// Truncate `name` to at most `max_len` characters.
///
/// Names that fit are returned unchanged. Longer names keep their first
/// `max_len - 5` characters followed by `_` and the first four hex digits of
/// the SHA-256 of the full name, so headers sharing a long prefix still get
/// distinct identifiers.
pub fn truncate_header_to(name: &str, max_len: usize) -> String {
    if name.chars().count() <= max_len {
        return name.to_string();
    }

    let keep = max_len.saturating_sub(HASH_SUFFIX_LENGTH + 1);
    let mut truncated: String = name.chars().take(keep).collect();
    truncated.push('_');
    truncated.push_str(&short_digest(name, HASH_SUFFIX_LENGTH));
    truncated
}

/// Normalize free text used as a field description.
///
/// Line breaks (`\r\n`, `\r`, `\n`, and runs of them) become a single
/// space; every other character is preserved.
pub fn sanitize_description(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_break = false;
    for ch in text.chars() {
        if ch == '\n' || ch == '\r' {
            if !in_break {
                out.push(' ');
                in_break = true;
            }
        } else {
            out.push(ch);
            in_break = false;
        }
    }
    out
}
