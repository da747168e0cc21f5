use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use thiserror::Error;

const PREVIEW_CHARS: usize = 200;

static TRAILING_OBJECT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)\{.*\}\s*$").expect("trailing object pattern is valid")
});

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("no object found in model output")]
    NoObject,
    #[error("unbalanced braces in model output")]
    Unbalanced,
    #[error("unrecoverable model output: {preview}")]
    Unrecoverable { preview: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionMethod {
    Direct,
    BalancedScan,
    /// Regex over the tail of the text. Can pick the wrong span on odd input.
    RegexFallback,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub value: Value,
    pub method: ExtractionMethod,
}

/// Recovered object as compact JSON text.
#[cfg(test)]
pub fn normalize(raw: &str) -> Result<String, ExtractionError> {
    let extraction = extract(raw)?;
    Ok(extraction.value.to_string())
}

// Attempts run in order; the first parse that yields an object wins.
pub fn extract(raw: &str) -> Result<Extraction, ExtractionError> {
    if let Some(value) = parse_object(raw.trim()) {
        return Ok(Extraction { value, method: ExtractionMethod::Direct });
    }

    let start = raw.find('{').ok_or(ExtractionError::NoObject)?;
    let end = matching_brace(raw, start).ok_or(ExtractionError::Unbalanced)?;
    let candidate = &raw[start..=end];

    if let Some(value) = parse_object(candidate).or_else(|| parse_object(&repair_escapes(candidate))) {
        return Ok(Extraction { value, method: ExtractionMethod::BalancedScan });
    }

    let repaired = repair_escapes(raw);
    for text in [raw, repaired.as_str()] {
        if let Some(found) = TRAILING_OBJECT.find(text) {
            if let Some(value) = parse_object(found.as_str().trim_end()) {
                return Ok(Extraction { value, method: ExtractionMethod::RegexFallback });
            }
        }
    }

    Err(ExtractionError::Unrecoverable { preview: preview(raw) })
}

fn parse_object(text: &str) -> Option<Value> {
    match serde_json::from_str::<Value>(text) {
        Ok(value) if value.is_object() => Some(value),
        _ => None,
    }
}

/// Byte index of the `}` closing the object opened at `start`.
fn matching_brace(text: &str, start: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (offset, byte) in text.as_bytes()[start..].iter().enumerate() {
        match byte {
            b'{' => depth += 1,
            b'}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(start + offset);
                }
            }
            _ => {}
        }
    }
    None
}

fn repair_escapes(text: &str) -> String {
    text.replace("\\n", " ").replace("\\\"", "\"").replace("\\\\", "\\")
}

/// First `PREVIEW_CHARS` characters, cut on a char boundary.
pub fn preview(text: &str) -> String {
    match text.char_indices().nth(PREVIEW_CHARS) {
        Some((idx, _)) => format!("{}...[{} chars total]", &text[..idx], text.chars().count()),
        None => text.to_string(),
    }
}
