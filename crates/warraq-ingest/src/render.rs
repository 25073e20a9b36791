//! Page rasterization for the OCR fallback.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use warraq_core::{Error, Result};

use crate::TRACING_TARGET;

/// Base raster resolution at scale 1.0.
const BASE_DPI: f32 = 72.0;

/// Renders one PDF page to a PNG raster.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// Renders the 1-based `page_number` of the PDF at `path`, upscaled by
    /// `scale`, returning PNG bytes.
    async fn render_page(&self, path: &Path, page_number: u32, scale: f32) -> Result<Vec<u8>>;
}

/// Renderer shelling out to poppler's `pdftoppm`.
///
/// One page is rendered at a time into a scratch directory, keeping a
/// single raster alive per document.
#[derive(Debug, Clone)]
pub struct PdftoppmRenderer {
    binary: PathBuf,
}

impl PdftoppmRenderer {
    /// Uses `pdftoppm` from `PATH`.
    pub fn new() -> Self {
        Self {
            binary: PathBuf::from("pdftoppm"),
        }
    }

    /// Uses an explicit binary path.
    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for PdftoppmRenderer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PageRenderer for PdftoppmRenderer {
    async fn render_page(&self, path: &Path, page_number: u32, scale: f32) -> Result<Vec<u8>> {
        let scratch = tempfile::tempdir()
            .map_err(|e| Error::extraction(format!("failed to create scratch dir: {e}")))?;
        let prefix = scratch.path().join("page");

        let dpi = (BASE_DPI * scale).round() as u32;
        let page = page_number.to_string();

        let output = tokio::process::Command::new(&self.binary)
            .arg("-png")
            .arg("-singlefile")
            .args(["-f", page.as_str(), "-l", page.as_str()])
            .args(["-r", dpi.to_string().as_str()])
            .arg(path)
            .arg(&prefix)
            .output()
            .await
            .map_err(|e| Error::extraction(format!("failed to run pdftoppm: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::extraction(format!(
                "pdftoppm exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let png_path = prefix.with_extension("png");
        let bytes = tokio::fs::read(&png_path)
            .await
            .map_err(|e| Error::extraction(format!("failed to read rendered page: {e}")))?;

        tracing::debug!(
            target: TRACING_TARGET,
            page = page_number,
            dpi,
            bytes = bytes.len(),
            "rendered page raster"
        );

        Ok(bytes)
    }
}
