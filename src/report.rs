use crate::{date::DateSource, source::SourceKind};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobReport {
    pub metrics: Vec<String>,
    pub processed: usize,
    pub failed: usize,
    pub files: Vec<FileReport>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileReport {
    pub file: String,
    pub path: String,
    pub ok: bool,
    #[serde(default)]
    pub source: Option<SourceKind>,
    #[serde(default)]
    pub origin: Option<String>,
    #[serde(default)]
    pub date_source: Option<DateSource>,
    pub found: Vec<String>,
    pub missing: Vec<String>,
    #[serde(default)]
    pub error: Option<String>,
}
