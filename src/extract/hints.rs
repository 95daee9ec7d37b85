//! Focused metadata hints
//!
//! Cheap signals pulled from the extracted text and the raw PDF bytes that
//! help the model find author, title and year: years printed in the text,
//! e-mail addresses near the byline, the first-page header, and whatever
//! the document info dictionary claims.

use crate::models::DocumentMetadata;
use chrono::Datelike;
use once_cell::sync::Lazy;
use regex::bytes::Regex as BytesRegex;
use regex::Regex;

const MAX_YEAR_HINTS: usize = 5;
const MAX_EMAIL_HINTS: usize = 3;
const MAX_INFO_FIELD_LEN: usize = 300;

static YEAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(19\d{2}|20\d{2})\b").expect("valid year regex"));

/// Keys read from the document info dictionary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfoKey {
    Title,
    Author,
    Subject,
}

fn info_regex(key: &str) -> BytesRegex {
    let pattern = format!(
        r"(?s-u)/{}\s*\(((?:[^()\\]|\\.){{1,{}}})\)",
        key, MAX_INFO_FIELD_LEN
    );
    BytesRegex::new(&pattern).expect("valid info field regex")
}

static TITLE_RE: Lazy<BytesRegex> = Lazy::new(|| info_regex("Title"));
static AUTHOR_RE: Lazy<BytesRegex> = Lazy::new(|| info_regex("Author"));
static SUBJECT_RE: Lazy<BytesRegex> = Lazy::new(|| info_regex("Subject"));

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").expect("valid email regex")
});

/// Build metadata from the cleaned text and the raw file bytes
pub fn collect_metadata(text: &str, raw: &[u8], header_chars: usize) -> DocumentMetadata {
    let header: String = text.chars().take(header_chars).collect();

    DocumentMetadata {
        title: info_field(raw, InfoKey::Title),
        author: info_field(raw, InfoKey::Author),
        subject: info_field(raw, InfoKey::Subject),
        word_count: Some(text.split_whitespace().count() as u32),
        year_hints: year_hints(text),
        email_hints: email_hints(text),
        header_text: (!header.is_empty()).then_some(header),
    }
}

/// Distinct plausible years, first appearance first
///
/// Years after next year are ignored; they are page numbers or ids.
pub fn year_hints(text: &str) -> Vec<u16> {
    let latest = (chrono::Utc::now().year() + 1) as u16;
    let mut years = Vec::new();

    for cap in YEAR_RE.captures_iter(text) {
        let Ok(year) = cap[1].parse::<u16>() else {
            continue;
        };
        if year > latest || years.contains(&year) {
            continue;
        }
        years.push(year);
        if years.len() == MAX_YEAR_HINTS {
            break;
        }
    }

    years
}

pub fn email_hints(text: &str) -> Vec<String> {
    let mut emails: Vec<String> = Vec::new();

    for m in EMAIL_RE.find_iter(text) {
        let email = m.as_str().trim_end_matches('.').to_string();
        if !emails.contains(&email) {
            emails.push(email);
        }
        if emails.len() == MAX_EMAIL_HINTS {
            break;
        }
    }

    emails
}

/// Read a literal-string entry such as `/Title (Deep Learning)` from the
/// document info dictionary
///
/// Only uncompressed literal strings are understood; hex strings and
/// entries inside object streams yield `None`.
pub fn info_field(raw: &[u8], key: InfoKey) -> Option<String> {
    let re: &BytesRegex = match key {
        InfoKey::Title => &TITLE_RE,
        InfoKey::Author => &AUTHOR_RE,
        InfoKey::Subject => &SUBJECT_RE,
    };
    let cap = re.captures(raw)?;
    let value = decode_literal(&unescape_literal(&cap[1]));
    let value = value.trim().to_string();
    (!value.is_empty()).then_some(value)
}

/// Undo PDF literal-string escapes (`\(`, `\)`, `\\`, `\n`, ...)
fn unescape_literal(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len());
    let mut iter = bytes.iter().copied();

    while let Some(b) = iter.next() {
        if b != b'\\' {
            out.push(b);
            continue;
        }
        match iter.next() {
            Some(b'n') => out.push(b'\n'),
            Some(b'r') => out.push(b'\r'),
            Some(b't') => out.push(b'\t'),
            Some(other) => out.push(other),
            None => {}
        }
    }

    out
}

/// Literal strings are either UTF-16BE with a BOM or a byte encoding
fn decode_literal(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }

    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        // PDFDocEncoding is close enough to Latin-1 for hints
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}
