//! Turns raw oracle text into JSON values.
//!
//! Generation is routinely cut off by the output budget or wrapped in prose
//! and code fences. Parsing goes from strict to lenient: the text as-is, the
//! text with decoration stripped, every self-contained object inside the
//! target array, and finally the outermost `{...}` span. Nothing is ever
//! synthesised; a recovered value is always a verbatim slice of the input.

use crate::domain::pipeline::ResponseState;
use crate::infrastructure::response::normalize_structured_text;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub enum StructuredOutput {
    /// The whole response, or a complete object inside it, parsed.
    Complete(Value),
    /// Objects salvaged from a truncated or malformed array, in input order.
    Partial(Vec<Value>),
    Unrecoverable,
}

/// Parser output plus the untouched response text for diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedResponse {
    pub output: StructuredOutput,
    pub raw: String,
}

impl ParsedResponse {
    pub fn state(&self) -> ResponseState {
        match self.output {
            StructuredOutput::Complete(_) => ResponseState::Complete,
            StructuredOutput::Partial(_) => ResponseState::Partial,
            StructuredOutput::Unrecoverable => ResponseState::Unrecoverable,
        }
    }

    /// Top-level object, when the response parsed to one.
    pub fn object(&self) -> Option<&Map<String, Value>> {
        match &self.output {
            StructuredOutput::Complete(Value::Object(map)) => Some(map),
            _ => None,
        }
    }

    /// List items for `key`. A complete object without that key yields its
    /// first non-empty array; a bare array is taken as the list itself.
    pub fn items(&self, key: &str) -> Option<Vec<Value>> {
        match &self.output {
            StructuredOutput::Complete(Value::Array(items)) => Some(items.clone()),
            StructuredOutput::Complete(Value::Object(map)) => match map.get(key) {
                Some(Value::Array(items)) => Some(items.clone()),
                _ => map.values().find_map(|value| match value {
                    Value::Array(items) if !items.is_empty() => Some(items.clone()),
                    _ => None,
                }),
            },
            StructuredOutput::Complete(_) => None,
            StructuredOutput::Partial(items) => Some(items.clone()),
            StructuredOutput::Unrecoverable => None,
        }
    }
}

/// Parses `raw`, recovering the items of `array_key` when the text is broken.
pub fn parse_structured(raw: &str, array_key: Option<&str>) -> ParsedResponse {
    ParsedResponse {
        output: parse_output(raw, array_key),
        raw: raw.to_string(),
    }
}

fn parse_output(raw: &str, array_key: Option<&str>) -> StructuredOutput {
    if let Ok(value) = serde_json::from_str::<Value>(raw) {
        return StructuredOutput::Complete(value);
    }

    let text = normalize_structured_text(raw);
    if text != raw {
        if let Ok(value) = serde_json::from_str::<Value>(&text) {
            debug!("Parsed response after stripping decoration");
            return StructuredOutput::Complete(value);
        }
    }

    // Fence markers inside string values would cut the normalised text short,
    // so the untouched response is scanned first.
    match recover(raw, array_key) {
        StructuredOutput::Unrecoverable if text != raw => recover(&text, array_key),
        output => output,
    }
}

/// Objects of the array under `"key": [`, without falling back to other
/// arrays. `None` when the key is absent or nothing inside it closed.
pub fn recover_keyed_array(raw: &str, key: &str) -> Option<Vec<Value>> {
    let scan = |text: &str| {
        let start = find_keyed_array(text, key)?;
        let recovered = recover_objects(text, start);
        (!recovered.is_empty()).then_some(recovered)
    };
    scan(raw).or_else(|| scan(&normalize_structured_text(raw)))
}

/// Numeric value of the first `"key": n` (or `"key": "n"`) in a broken response.
pub fn recover_number_field(raw: &str, key: &str) -> Option<f64> {
    let pattern = Regex::new(&format!(
        r#""{}"\s*:\s*"?(-?\d+(?:\.\d+)?)"#,
        regex::escape(key)
    ))
    .ok()?;
    pattern.captures(raw)?.get(1)?.as_str().parse().ok()
}

fn recover(text: &str, array_key: Option<&str>) -> StructuredOutput {
    let object_first = matches!(first_structural(text), Some('{'));
    let array_start = match array_key {
        Some(key) => find_keyed_array(text, key).or_else(|| text.find('[')),
        None if !object_first => text.find('['),
        None => None,
    };

    if let Some(start) = array_start {
        let recovered = recover_objects(text, start);
        if !recovered.is_empty() {
            debug!(count = recovered.len(), "Recovered objects from broken array");
            return StructuredOutput::Partial(recovered);
        }
    }

    if let Some(value) = outermost_object(text) {
        debug!("Parsed outermost object span");
        return StructuredOutput::Complete(value);
    }

    if array_key.is_none() && object_first {
        if let Some(start) = text.find('[') {
            let recovered = recover_objects(text, start);
            if !recovered.is_empty() {
                debug!(count = recovered.len(), "Recovered nested objects");
                return StructuredOutput::Partial(recovered);
            }
        }
    }

    StructuredOutput::Unrecoverable
}

fn first_structural(text: &str) -> Option<char> {
    text.chars().find(|c| *c == '{' || *c == '[')
}

/// Byte offset of the `[` that opens `"key": [`.
fn find_keyed_array(text: &str, key: &str) -> Option<usize> {
    let pattern = Regex::new(&format!(r#""{}"\s*:\s*\["#, regex::escape(key))).ok()?;
    let found = pattern.find(text)?;
    Some(found.end() - 1)
}

fn outermost_object(text: &str) -> Option<Value> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str::<Value>(&text[start..=end])
        .ok()
        .filter(Value::is_object)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    OutsideStructure,
    /// `nesting` counts open brackets, so a nested array does not end the scan.
    InArray { nesting: usize },
    InObject { depth: usize },
    /// `depth` is the brace depth to return to; zero means inside the array.
    InString { depth: usize, nesting: usize },
    InStringEscaped { depth: usize, nesting: usize },
}

/// Collects every object that closes cleanly in the array opening at `start`.
/// Braces and brackets inside string literals are ignored, escapes included.
fn recover_objects(text: &str, start: usize) -> Vec<Value> {
    let mut recovered = Vec::new();
    let mut state = ScanState::OutsideStructure;
    let mut object_start = 0usize;
    let mut nesting_at_object = 1usize;

    for (offset, c) in text[start..].char_indices() {
        let index = start + offset;
        state = match state {
            ScanState::OutsideStructure => match c {
                '[' => ScanState::InArray { nesting: 1 },
                _ => ScanState::OutsideStructure,
            },
            ScanState::InArray { nesting } => match c {
                '{' => {
                    object_start = index;
                    nesting_at_object = nesting;
                    ScanState::InObject { depth: 1 }
                }
                '"' => ScanState::InString { depth: 0, nesting },
                '[' => ScanState::InArray {
                    nesting: nesting + 1,
                },
                ']' if nesting == 1 => break,
                ']' => ScanState::InArray {
                    nesting: nesting - 1,
                },
                _ => ScanState::InArray { nesting },
            },
            ScanState::InObject { depth } => match c {
                '"' => ScanState::InString {
                    depth,
                    nesting: nesting_at_object,
                },
                '{' => ScanState::InObject { depth: depth + 1 },
                '}' if depth == 1 => {
                    let span = &text[object_start..=index];
                    match serde_json::from_str::<Value>(span) {
                        Ok(value) => recovered.push(value),
                        Err(err) => debug!(error = %err, "Discarded unparsable object span"),
                    }
                    ScanState::InArray {
                        nesting: nesting_at_object,
                    }
                }
                '}' => ScanState::InObject { depth: depth - 1 },
                _ => ScanState::InObject { depth },
            },
            ScanState::InString { depth, nesting } => match c {
                '\\' => ScanState::InStringEscaped { depth, nesting },
                '"' if depth == 0 => ScanState::InArray { nesting },
                '"' => ScanState::InObject { depth },
                _ => ScanState::InString { depth, nesting },
            },
            ScanState::InStringEscaped { depth, nesting } => {
                ScanState::InString { depth, nesting }
            }
        };
    }

    recovered
}
