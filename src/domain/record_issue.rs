use serde::{Deserialize, Serialize};

/// An item the oracle returned that could not be turned into a typed record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordIssue {
    /// Zero-based position in the list the item came from.
    pub index: usize,
    pub reason: String,
}

impl RecordIssue {
    pub fn new(index: usize, reason: impl Into<String>) -> Self {
        Self {
            index,
            reason: reason.into(),
        }
    }
}

/// Decodes each item independently; failures are collected, not fatal.
pub fn decode_each<T, F>(items: Vec<serde_json::Value>, mut decode: F) -> (Vec<T>, Vec<RecordIssue>)
where
    F: FnMut(serde_json::Value, usize) -> Result<T, String>,
{
    let mut decoded = Vec::with_capacity(items.len());
    let mut issues = Vec::new();
    for (index, item) in items.into_iter().enumerate() {
        match decode(item, index) {
            Ok(value) => decoded.push(value),
            Err(reason) => issues.push(RecordIssue::new(index, reason)),
        }
    }
    (decoded, issues)
}

pub fn decode_serde<T: serde::de::DeserializeOwned>(
    items: Vec<serde_json::Value>,
) -> (Vec<T>, Vec<RecordIssue>) {
    decode_each(items, |item, _| {
        serde_json::from_value::<T>(item).map_err(|err| err.to_string())
    })
}
