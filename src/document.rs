// src/document.rs

use crate::ocr::{Ocr, OcrConfig, OcrError};
use crate::pdf_extract::{PdfContent, extract_text_from_pdf};
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Where a document's text came from. The analysis ignores it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TextSource {
    /// Text layer of a PDF.
    Native,
    Ocr,
    /// Plain text file.
    Plain,
}

#[derive(Debug)]
pub struct AcquiredText {
    pub text: String,
    pub source: TextSource,
}

#[derive(Debug, thiserror::Error)]
pub enum AcquireError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("unsupported document type: {0}")]
    Unsupported(PathBuf),
    #[error("{0}")]
    Pdf(String),
    #[error(transparent)]
    Ocr(#[from] OcrError),
}

const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "tif", "tiff"];

/// Turn a document on disk into text: native PDF text when there is a text
/// layer, OCR for scans and images, plain reads for `.txt`.
pub fn acquire_text(path: &Path, ocr: &OcrConfig) -> Result<AcquiredText, AcquireError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match ext.as_deref() {
        Some("txt") => {
            let text = fs::read_to_string(path).map_err(|source| AcquireError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            Ok(AcquiredText {
                text,
                source: TextSource::Plain,
            })
        }
        Some("pdf") => acquire_pdf(path, ocr),
        Some(ext) if IMAGE_EXTENSIONS.contains(&ext) => {
            let text = Ocr::new(ocr)?.image_to_text(path)?;
            Ok(AcquiredText {
                text,
                source: TextSource::Ocr,
            })
        }
        _ => Err(AcquireError::Unsupported(path.to_path_buf())),
    }
}

fn acquire_pdf(path: &Path, ocr: &OcrConfig) -> Result<AcquiredText, AcquireError> {
    let bytes = fs::read(path).map_err(|source| AcquireError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    match extract_text_from_pdf(&bytes) {
        PdfContent::Text(text) => Ok(AcquiredText {
            text,
            source: TextSource::Native,
        }),
        PdfContent::ScannedImage => {
            info!("PDF is scanned — running OCR");
            let text = Ocr::new(ocr)?.pdf_to_text(path)?;
            Ok(AcquiredText {
                text,
                source: TextSource::Ocr,
            })
        }
        PdfContent::Error(e) => {
            if !ocr.enabled {
                return Err(AcquireError::Pdf(e));
            }
            warn!(error = %e, "PDF text extraction failed — trying OCR");
            let text = Ocr::new(ocr)?.pdf_to_text(path)?;
            Ok(AcquiredText {
                text,
                source: TextSource::Ocr,
            })
        }
    }
}
