// src/ocr.rs
//
// Optical character recognition through external commands: `tesseract` for
// images, `pdftoppm` to rasterise scanned PDFs first.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use tracing::{debug, info};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    pub enabled: bool,
    pub tesseract: String,
    pub pdftoppm: String,
    /// Tesseract language pack.
    pub lang: String,
    /// Rasterisation resolution for scanned PDFs.
    pub dpi: u32,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            tesseract: "tesseract".to_string(),
            pdftoppm: "pdftoppm".to_string(),
            lang: "por".to_string(),
            dpi: 300,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OcrError {
    #[error("OCR is disabled in the configuration")]
    Disabled,
    #[error("failed to run {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("{command} exited with {status}: {stderr}")]
    Failed {
        command: String,
        status: ExitStatus,
        stderr: String,
    },
    #[error("temporary page directory: {0}")]
    Io(#[from] io::Error),
    #[error("no pages rasterised from {0}")]
    NoPages(PathBuf),
}

pub struct Ocr<'a> {
    cfg: &'a OcrConfig,
}

impl<'a> Ocr<'a> {
    pub fn new(cfg: &'a OcrConfig) -> Result<Self, OcrError> {
        if cfg.enabled {
            Ok(Self { cfg })
        } else {
            Err(OcrError::Disabled)
        }
    }

    pub fn image_to_text(&self, image: &Path) -> Result<String, OcrError> {
        let mut cmd = Command::new(&self.cfg.tesseract);
        cmd.arg(image).arg("stdout").arg("-l").arg(&self.cfg.lang);
        let text = run(&mut cmd)?;
        debug!(image = %image.display(), chars = text.len(), "OCR page done");
        Ok(text)
    }

    /// Rasterise every page, then OCR the pages in order.
    pub fn pdf_to_text(&self, pdf: &Path) -> Result<String, OcrError> {
        let dir = tempfile::tempdir()?;
        let prefix = dir.path().join("page");

        let mut cmd = Command::new(&self.cfg.pdftoppm);
        cmd.arg("-r")
            .arg(self.cfg.dpi.to_string())
            .arg("-png")
            .arg(pdf)
            .arg(&prefix);
        run(&mut cmd)?;

        let pages = page_images(dir.path())?;
        if pages.is_empty() {
            return Err(OcrError::NoPages(pdf.to_path_buf()));
        }
        info!(pages = pages.len(), dpi = self.cfg.dpi, "Rasterised scanned PDF");

        let mut text = String::new();
        for page in &pages {
            text.push_str(&self.image_to_text(page)?);
            text.push('\n');
        }
        Ok(text)
    }
}

/// PNG files in `dir`, in page order (`pdftoppm` zero-pads page numbers).
fn page_images(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut pages: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "png"))
        .collect();
    pages.sort();
    Ok(pages)
}

fn run(cmd: &mut Command) -> Result<String, OcrError> {
    let command = cmd.get_program().to_string_lossy().into_owned();
    let output = cmd.output().map_err(|source| OcrError::Spawn {
        command: command.clone(),
        source,
    })?;
    if !output.status.success() {
        return Err(OcrError::Failed {
            command,
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
