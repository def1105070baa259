use super::super::DocumentIngestion;
use crate::domain::error::{AppError, Result};
use calamine::{open_workbook_auto, DataType, Reader};
use std::path::Path;

impl DocumentIngestion {
    /// Every sheet in workbook order, each under a `--- Sheet: name ---` line.
    pub(in crate::application::use_cases::document_ingestion) fn parse_spreadsheet(
        &self,
        path: &Path,
    ) -> Result<String> {
        let mut workbook = open_workbook_auto(path)
            .map_err(|e| AppError::Internal(format!("Failed to open Excel file: {}", e)))?;

        let mut sections = Vec::new();
        for sheet_name in workbook.sheet_names() {
            let range = workbook.worksheet_range(&sheet_name).map_err(|e| {
                AppError::Internal(format!("Failed to read sheet {}: {}", sheet_name, e))
            })?;

            let mut lines = vec![format!("--- Sheet: {} ---", sheet_name)];
            for row in range.rows() {
                let cells: Vec<String> = row
                    .iter()
                    .map(|cell| {
                        cell.as_string()
                            .unwrap_or_else(|| format!("{}", cell))
                            .trim()
                            .to_string()
                    })
                    .collect();
                if cells.iter().any(|cell| !cell.is_empty()) {
                    lines.push(cells.join(" | "));
                }
            }
            sections.push(lines.join("\n"));
        }

        Ok(sections.join("\n\n"))
    }
}
