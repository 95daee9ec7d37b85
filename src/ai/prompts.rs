use crate::models::ExtractedContent;

/// Characters of text used by the low-confidence second pass (about two pages)
pub const SECOND_PASS_CHARS: usize = 4000;

/// System prompt for filename suggestions
pub const RENAME_SYSTEM_PROMPT: &str = r#"You name academic papers and technical documents. Read the extracted PDF text and propose one concise, descriptive filename.

FORMAT: Author-Topic-Year
Example: Smith-Neural-Networks-Deep-Learning-2020

WHERE TO LOOK:
1. AUTHOR
   - The title area of the first page, and the byline right under the title
   - E-mail addresses usually sit next to author names
   - With several authors use only the first author's last name
2. TOPIC
   - The largest text at the top of the first page, or the abstract
   - Condense long titles to 3-6 distinctive words
   - Drop filler such as "A Study of", "An Analysis of", "Introduction to"
3. YEAR
   - Copyright lines, dates near the title, conference or journal citations
   - Only include a year that is clearly printed. Never guess.

PDF metadata (title, author, subject) is often missing or wrong. When it disagrees with the document text, trust the text.

FILENAME RULES:
- Hyphens between all words, no spaces or underscores
- Title case
- No colons, quotes, commas or parentheses
- No file extension
- Aim for 60-100 characters

GOOD EXAMPLES:
- Hinton-Deep-Learning-Review-2015
- Vapnik-Support-Vector-Networks-1995
- Hochreiter-Long-Short-Term-Memory-1997

CONFIDENCE:
- high: author, title and year all found in the text
- medium: title plus author or year
- low: text is unclear or only partial information was found

Respond with ONLY a JSON object:
{"filename": "...", "confidence": "high|medium|low", "reasoning": "one short sentence"}"#;

/// Build the first-pass user prompt
pub fn build_rename_prompt(original_name: &str, content: &ExtractedContent) -> String {
    let meta = &content.metadata;
    let mut prompt = format!("Original filename: {}", original_name);

    if let Some(title) = &meta.title {
        prompt.push_str(&format!("\nPDF Title metadata (may be unreliable): {}", title));
    }
    if let Some(author) = &meta.author {
        prompt.push_str(&format!("\nPDF Author metadata (may be unreliable): {}", author));
    }
    if let Some(subject) = &meta.subject {
        prompt.push_str(&format!("\nPDF Subject metadata (may be unreliable): {}", subject));
    }

    if !meta.year_hints.is_empty() {
        let years: Vec<String> = meta.year_hints.iter().map(|y| y.to_string()).collect();
        prompt.push_str(&format!("\nYears found in document: {}", years.join(", ")));
    }
    if !meta.email_hints.is_empty() {
        let emails: Vec<&str> = meta.email_hints.iter().take(2).map(String::as_str).collect();
        prompt.push_str(&format!(
            "\nEmail addresses found (often near authors): {}",
            emails.join(", ")
        ));
    }
    if let Some(header) = &meta.header_text {
        prompt.push_str(&format!(
            "\nStart of first page (likely title/author area):\n{}",
            header
        ));
    }

    prompt.push_str(&format!(
        "\n\nDocument text excerpt:\n---\n{}\n---",
        content.text
    ));

    prompt
}

/// Build the focused prompt used when the first pass came back low confidence
pub fn build_second_pass_prompt(original_name: &str, content: &ExtractedContent) -> String {
    let first_pages: String = content.text.chars().take(SECOND_PASS_CHARS).collect();

    format!(
        r#"SECOND PASS: the first answer had low confidence. Look again, more carefully.

Original filename: {}

Concentrate on the first pages, where title, authors and year live:
1. The largest text on page 1 is usually the title
2. The lines right after the title are usually authors and affiliations
3. Dates, copyright notices or publication info on page 1
4. Running headers and footers

First pages:
---
{}
---

Only state what you can find with certainty. If author or year cannot be found, give the best title you can."#,
        original_name, first_pages
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DocumentMetadata;

    fn content(text: &str, metadata: DocumentMetadata) -> ExtractedContent {
        ExtractedContent {
            text: text.to_string(),
            metadata,
        }
    }

    #[test]
    fn test_rename_prompt_includes_hints() {
        let meta = DocumentMetadata {
            title: Some("Untitled".into()),
            year_hints: vec![2017, 2018],
            email_hints: vec!["a@x.org".into(), "b@y.org".into(), "c@z.org".into()],
            ..Default::default()
        };
        let prompt = build_rename_prompt("scan.pdf", &content("Body text", meta));

        assert!(prompt.contains("Original filename: scan.pdf"));
        assert!(prompt.contains("(may be unreliable): Untitled"));
        assert!(prompt.contains("Years found in document: 2017, 2018"));
        assert!(prompt.contains("a@x.org, b@y.org"));
        assert!(!prompt.contains("c@z.org"));
        assert!(prompt.contains("Body text"));
    }

    #[test]
    fn test_rename_prompt_omits_missing_metadata() {
        let prompt = build_rename_prompt("a.pdf", &content("x", DocumentMetadata::default()));
        assert!(!prompt.contains("metadata"));
        assert!(!prompt.contains("Years found"));
    }

    #[test]
    fn test_second_pass_prompt_is_limited() {
        let text = "a".repeat(SECOND_PASS_CHARS + 500);
        let prompt = build_second_pass_prompt("a.pdf", &content(&text, DocumentMetadata::default()));
        assert!(prompt.contains(&"a".repeat(SECOND_PASS_CHARS)));
        assert!(!prompt.contains(&"a".repeat(SECOND_PASS_CHARS + 1)));
    }
}
