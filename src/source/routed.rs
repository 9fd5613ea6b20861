use super::{
    pdftotext::PdfTextSource, plain::PlainTextSource, SourceDiag, SourceKind, SourceText,
    TextSource,
};
use crate::config::Config;
use anyhow::{bail, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct RoutedSource {
    pdf: PdfTextSource,
    prefer_sidecar_text: bool,
    text_extensions: Vec<String>,
    pdf_extensions: Vec<String>,
}

impl RoutedSource {
    pub fn new(cfg: &Config) -> Self {
        Self {
            pdf: PdfTextSource::new(cfg),
            prefer_sidecar_text: cfg.source.prefer_sidecar_text,
            text_extensions: lowercase(&cfg.source.text_extensions),
            pdf_extensions: lowercase(&cfg.source.pdf_extensions),
        }
    }

    pub fn accepts(&self, path: &Path) -> bool {
        let ext = extension(path);
        self.text_extensions.contains(&ext) || self.pdf_extensions.contains(&ext)
    }

    pub fn is_sidecar(&self, path: &Path) -> bool {
        self.prefer_sidecar_text
            && self.text_extensions.contains(&extension(path))
            && self
                .pdf_extensions
                .iter()
                .any(|ext| path.with_extension(ext).is_file())
    }

    fn sidecar(&self, pdf: &Path) -> Option<PathBuf> {
        self.text_extensions
            .iter()
            .map(|ext| pdf.with_extension(ext))
            .find(|p| p.is_file())
    }
}

impl TextSource for RoutedSource {
    fn doctor(&self) -> Result<Vec<SourceDiag>> {
        let mut out = PlainTextSource.doctor()?;
        out.extend(self.pdf.doctor()?);
        Ok(out)
    }

    fn extract_text(&self, path: &Path) -> Result<SourceText> {
        let ext = extension(path);
        if self.text_extensions.contains(&ext) {
            return PlainTextSource.extract_text(path);
        }
        if self.pdf_extensions.contains(&ext) {
            if self.prefer_sidecar_text {
                if let Some(side) = self.sidecar(path) {
                    debug!("using sidecar text {} for {}", side.display(), path.display());
                    return PlainTextSource::read(&side, SourceKind::Sidecar);
                }
            }
            return self.pdf.extract_text(path);
        }
        bail!("unsupported input type: {}", path.display())
    }
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_ascii_lowercase())
        .unwrap_or_default()
}

fn lowercase(exts: &[String]) -> Vec<String> {
    exts.iter()
        .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
        .collect()
}
