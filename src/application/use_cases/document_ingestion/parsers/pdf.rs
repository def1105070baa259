use super::super::DocumentIngestion;
use crate::domain::error::{AppError, Result};
use std::path::Path;
use tracing::debug;

impl DocumentIngestion {
    /// Text layer of every page, pages joined by newlines. Scanned PDFs
    /// without a text layer come back empty.
    pub(in crate::application::use_cases::document_ingestion) fn parse_pdf(
        &self,
        path: &Path,
    ) -> Result<String> {
        let document = lopdf::Document::load(path)
            .map_err(|e| AppError::Internal(format!("Failed to load PDF: {}", e)))?;

        let mut pages = Vec::new();
        for page_number in document.get_pages().keys() {
            match document.extract_text(&[*page_number]) {
                Ok(text) => {
                    let trimmed = text.trim();
                    if !trimmed.is_empty() {
                        pages.push(trimmed.to_string());
                    }
                }
                Err(err) => debug!(page = page_number, error = %err, "No text on PDF page"),
            }
        }

        Ok(pages.join("\n"))
    }
}
