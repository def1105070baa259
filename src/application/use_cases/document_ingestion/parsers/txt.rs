use super::super::DocumentIngestion;
use crate::domain::error::{AppError, Result};
use std::path::Path;

impl DocumentIngestion {
    /// UTF-8 first; anything else is read as Windows-1252, which never fails.
    pub(in crate::application::use_cases::document_ingestion) fn parse_txt(
        &self,
        path: &Path,
    ) -> Result<String> {
        let bytes = std::fs::read(path)
            .map_err(|e| AppError::IoError(format!("Failed to read text file: {}", e)))?;
        Ok(decode_text(&bytes))
    }
}

fn decode_text(bytes: &[u8]) -> String {
    let (text, _, had_errors) = encoding_rs::UTF_8.decode(bytes);
    if !had_errors {
        return text.into_owned();
    }
    let (fallback, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
    fallback.into_owned()
}
