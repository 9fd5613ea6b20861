use super::{SourceDiag, SourceKind, SourceText, TextSource};
use anyhow::{Context, Result};
use std::path::Path;

pub struct PlainTextSource;

impl PlainTextSource {
    pub fn read(path: &Path, kind: SourceKind) -> Result<SourceText> {
        let bytes =
            std::fs::read(path).with_context(|| format!("reading text: {}", path.display()))?;
        Ok(SourceText {
            kind,
            origin: path.to_path_buf(),
            text: String::from_utf8_lossy(&bytes).into_owned(),
        })
    }
}

impl TextSource for PlainTextSource {
    fn doctor(&self) -> Result<Vec<SourceDiag>> {
        Ok(vec![SourceDiag {
            name: "plain_text".into(),
            ok: true,
            version: None,
            error: None,
        }])
    }

    fn extract_text(&self, path: &Path) -> Result<SourceText> {
        Self::read(path, SourceKind::PlainText)
    }
}
