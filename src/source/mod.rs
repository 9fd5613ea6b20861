pub mod pdftotext;
pub mod plain;
pub mod routed;
pub mod types;

use anyhow::Result;
use std::path::Path;

pub use types::{SourceDiag, SourceKind, SourceText};

/// Something that turns a report file into text.
pub trait TextSource {
    fn doctor(&self) -> Result<Vec<SourceDiag>>;
    fn extract_text(&self, path: &Path) -> Result<SourceText>;
}
