use crate::domain::error::{AppError, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use std::path::Path;

/// Screenshot bytes ready to attach to a vision request. Pixels are never
/// decoded; only the container format is sniffed for the MIME type.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageInput {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl ImageInput {
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        let format = ::image::guess_format(&bytes)
            .map_err(|e| AppError::UnsupportedFileType(format!("Unrecognised image data: {}", e)))?;
        Ok(Self {
            mime_type: format.to_mime_type().to_string(),
            bytes,
        })
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(bytes)
    }

    pub fn to_base64(&self) -> String {
        BASE64.encode(&self.bytes)
    }

    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.to_base64())
    }
}
