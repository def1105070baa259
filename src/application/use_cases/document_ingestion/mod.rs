use crate::domain::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

mod parsers;

const BANNER_WIDTH: usize = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Docx,
    Pdf,
    Spreadsheet,
    PlainText,
}

impl DocumentFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase())
            .unwrap_or_default();
        match extension.as_str() {
            "docx" => Ok(DocumentFormat::Docx),
            "pdf" => Ok(DocumentFormat::Pdf),
            "xlsx" | "xls" => Ok(DocumentFormat::Spreadsheet),
            "txt" | "md" => Ok(DocumentFormat::PlainText),
            "" => Err(AppError::UnsupportedFileType(format!(
                "{} has no extension",
                path.display()
            ))),
            other => Err(AppError::UnsupportedFileType(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedFile {
    pub file_name: String,
    pub reason: String,
}

/// Combined text of a batch plus what could not be read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestionReport {
    pub text: String,
    pub files: Vec<String>,
    pub skipped: Vec<SkippedFile>,
}

/// Reads requirement documents into plain text. Holds no state.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentIngestion;

impl DocumentIngestion {
    pub fn new() -> Self {
        Self
    }

    pub fn extract(&self, path: &Path) -> Result<String> {
        let format = DocumentFormat::from_path(path)?;
        if !path.exists() {
            return Err(AppError::NotFound(format!(
                "File not found: {}",
                path.display()
            )));
        }
        match format {
            DocumentFormat::Docx => self.parse_docx(path),
            DocumentFormat::Pdf => self.parse_pdf(path),
            DocumentFormat::Spreadsheet => self.parse_spreadsheet(path),
            DocumentFormat::PlainText => self.parse_txt(path),
        }
    }

    /// Concatenates every readable file under a banner with its name. A file
    /// that fails is skipped with a warning; the batch always completes.
    pub fn ingest_batch<P: AsRef<Path>>(&self, paths: &[P]) -> IngestionReport {
        let mut report = IngestionReport::default();
        let mut sections = Vec::new();

        for path in paths {
            let path = path.as_ref();
            let file_name = path
                .file_name()
                .and_then(|name| name.to_str())
                .unwrap_or("unknown")
                .to_string();

            match self.extract(path) {
                Ok(text) => {
                    info!(file = %file_name, chars = text.len(), "Extracted document text");
                    sections.push(file_section(&file_name, &text));
                    report.files.push(file_name);
                }
                Err(err) => {
                    warn!(file = %file_name, error = %err, "Skipping document");
                    report.skipped.push(SkippedFile {
                        file_name,
                        reason: err.to_string(),
                    });
                }
            }
        }

        report.text = sections.join("\n");
        report
    }
}

fn file_section(file_name: &str, text: &str) -> String {
    let rule = "=".repeat(BANNER_WIDTH);
    format!("\n{rule}\nFILE: {file_name}\n{rule}\n{text}\n")
}
