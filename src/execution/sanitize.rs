//! Target filename normalization
//!
//! Illegal characters are removed rather than substituted, whitespace and
//! hyphen runs collapse into a single hyphen, and the original extension is
//! always re-applied. The same rules apply to model suggestions and to
//! names typed by the user.

use super::RenameError;
use once_cell::sync::Lazy;
use regex::Regex;

/// Longest stem kept, in characters
pub const MAX_STEM_CHARS: usize = 100;

static SEPARATOR_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\s\-]+").expect("valid separator regex"));

fn is_forbidden(c: char) -> bool {
    matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*') || c.is_control()
}

/// Clean a filename stem
///
/// Returns an empty string when nothing usable is left.
pub fn sanitize_stem(name: &str) -> String {
    let stripped: String = name.chars().filter(|&c| !is_forbidden(c)).collect();
    let collapsed = SEPARATOR_RUN.replace_all(&stripped, "-");
    // Leading dots would hide the file
    let trimmed = collapsed.trim_matches('-').trim_start_matches('.');

    let capped: String = trimmed.chars().take(MAX_STEM_CHARS).collect();
    capped.trim_end_matches(['-', '.']).to_string()
}

/// Turn a requested name into the final filename for a file with extension
/// `original_ext`
///
/// An extension the requester already added is dropped first so the
/// result never ends in `.pdf.pdf`.
pub fn normalize_target(requested: &str, original_ext: Option<&str>) -> Result<String, RenameError> {
    let requested = requested.trim();
    let stem = match original_ext {
        Some(ext) => strip_extension(requested, ext),
        None => requested,
    };

    let clean = sanitize_stem(stem);
    if clean.is_empty() {
        return Err(RenameError::InvalidName(requested.to_string()));
    }

    Ok(match original_ext {
        Some(ext) if !ext.is_empty() => format!("{}.{}", clean, ext),
        _ => clean,
    })
}

fn strip_extension<'a>(name: &'a str, ext: &str) -> &'a str {
    match name.rsplit_once('.') {
        Some((stem, found)) if found.eq_ignore_ascii_case(ext) => stem,
        _ => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_stem_removes_forbidden() {
        assert_eq!(sanitize_stem("Deep: Learning? <Review>"), "Deep-Learning-Review");
        assert_eq!(sanitize_stem("a/b\\c|d*e\"f"), "abcdef");
    }

    #[test]
    fn test_sanitize_stem_collapses_separators() {
        assert_eq!(sanitize_stem("  Smith -- Topic   2020 - "), "Smith-Topic-2020");
    }

    #[test]
    fn test_sanitize_stem_no_hidden_files() {
        assert_eq!(sanitize_stem("..hidden"), "hidden");
        assert_eq!(sanitize_stem("..."), "");
    }

    #[test]
    fn test_sanitize_stem_length_cap() {
        let long = format!("{}-{}", "a".repeat(99), "b".repeat(20));
        let clean = sanitize_stem(&long);
        assert_eq!(clean, "a".repeat(99));
    }

    #[test]
    fn test_normalize_target_keeps_original_extension() {
        assert_eq!(
            normalize_target("Smith-Topic-2020", Some("pdf")).unwrap(),
            "Smith-Topic-2020.pdf"
        );
        assert_eq!(
            normalize_target("Smith-Topic-2020.PDF", Some("pdf")).unwrap(),
            "Smith-Topic-2020.pdf"
        );
        assert_eq!(
            normalize_target("Smith-Topic-2020.pdf", Some("PDF")).unwrap(),
            "Smith-Topic-2020.PDF"
        );
    }

    #[test]
    fn test_normalize_target_keeps_version_dots() {
        assert_eq!(
            normalize_target("Release-Notes-2.0", Some("pdf")).unwrap(),
            "Release-Notes-2.0.pdf"
        );
    }

    #[test]
    fn test_normalize_target_rejects_empty() {
        assert!(matches!(
            normalize_target("  ???  ", Some("pdf")),
            Err(RenameError::InvalidName(_))
        ));
        assert!(matches!(
            normalize_target(".pdf", Some("pdf")),
            Err(RenameError::InvalidName(_))
        ));
    }
}
