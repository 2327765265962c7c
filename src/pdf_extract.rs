// src/pdf_extract.rs

use lopdf::{Dictionary, Document};
use tracing::{info, warn};

/// Result of attempting to extract text from a PDF.
#[derive(Debug)]
pub enum PdfContent {
    /// The PDF contains extractable text.
    Text(String),
    /// No usable text layer; the pages have to go through OCR.
    ScannedImage,
    /// Something went wrong during extraction.
    Error(String),
}

/// Minimum number of non-whitespace characters we expect from a
/// "real" text PDF. Below this threshold we treat it as scanned.
const MIN_TEXT_CHARS: usize = 30;

/// Share of image-only pages above which the whole document is scanned.
const SCANNED_PAGE_RATIO: f64 = 0.8;

/// Takes raw PDF bytes and returns the native text, if there is any.
pub fn extract_text_from_pdf(pdf_bytes: &[u8]) -> PdfContent {
    let doc = match Document::load_mem(pdf_bytes) {
        Ok(d) => d,
        Err(e) => return PdfContent::Error(format!("Failed to parse PDF: {e}")),
    };

    if looks_like_scanned(&doc) {
        info!("PDF structural check: likely scanned / image-only");
        return PdfContent::ScannedImage;
    }

    match pdf_extract::extract_text_from_mem(pdf_bytes) {
        Ok(text) => classify_text(text),
        Err(e) => {
            warn!(error = %e, "pdf-extract failed — may be scanned or corrupted");
            PdfContent::ScannedImage
        }
    }
}

fn classify_text(text: String) -> PdfContent {
    let meaningful = text.chars().filter(|c| !c.is_whitespace()).count();
    if meaningful < MIN_TEXT_CHARS {
        info!(
            chars = meaningful,
            "Extracted text too short — treating as scanned"
        );
        PdfContent::ScannedImage
    } else {
        info!(chars = meaningful, "Text extracted successfully");
        PdfContent::Text(text)
    }
}

/// Whether the page's `Resources` has a non-empty sub-dictionary `kind`
/// (`Font`, `XObject`), following indirect references.
fn has_resource(doc: &Document, page: &Dictionary, kind: &[u8]) -> bool {
    page.get(b"Resources")
        .ok()
        .and_then(|r| doc.dereference(r).ok())
        .and_then(|(_, resolved)| resolved.as_dict().ok())
        .and_then(|res| res.get(kind).ok())
        .and_then(|obj| doc.dereference(obj).ok())
        .and_then(|(_, resolved)| resolved.as_dict().ok())
        .is_some_and(|dict| !dict.is_empty())
}

/// A page with images but no fonts is almost certainly a scan.
fn looks_like_scanned(doc: &Document) -> bool {
    let pages = doc.get_pages();
    if pages.is_empty() {
        return false; // let text extraction decide
    }

    let image_only_pages = pages
        .values()
        .filter_map(|id| doc.get_object(*id).ok())
        .filter_map(|obj| obj.as_dict().ok())
        .filter(|page| has_resource(doc, page, b"XObject") && !has_resource(doc, page, b"Font"))
        .count();

    let ratio = image_only_pages as f64 / pages.len() as f64;
    info!(
        total_pages = pages.len(),
        image_only = image_only_pages,
        ratio = format!("{ratio:.2}"),
        "Scanned-page analysis"
    );
    ratio >= SCANNED_PAGE_RATIO
}
