//! Helpers for model responses

/// Extract a JSON object from a response that might contain markdown or other text
///
/// Handles:
/// - ```json code blocks
/// - Plain ``` code blocks
/// - Raw JSON objects surrounded by prose
pub fn extract_json_object(text: &str) -> Option<&str> {
    if let Some(start) = text.find("```json") {
        let json_start = start + 7;
        if let Some(end) = text[json_start..].find("```") {
            return Some(text[json_start..json_start + end].trim());
        }
    }

    if let Some(start) = text.find("```") {
        let block_start = start + 3;
        let content_start = text[block_start..]
            .find('\n')
            .map(|i| block_start + i + 1)
            .unwrap_or(block_start);
        if let Some(end) = text[content_start..].find("```") {
            let block = text[content_start..content_start + end].trim();
            if block.starts_with('{') {
                return Some(block);
            }
        }
    }

    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}
