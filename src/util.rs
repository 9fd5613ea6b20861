use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::path::Path;
use time::format_description::well_known::Rfc3339;

pub fn ensure_dir(p: &Path) -> Result<()> {
    std::fs::create_dir_all(p).with_context(|| format!("create_dir_all {}", p.display()))
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut h = Sha256::new();
    h.update(bytes);
    format!("{:x}", h.finalize())
}

pub fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

/// Unreadable or oversized inputs hash as a marker instead of their bytes.
pub fn job_id(cfg_normalized: &str, inputs: &[impl AsRef<Path>], max_bytes: u64) -> String {
    let mut h = Sha256::new();
    h.update(sha256_hex(cfg_normalized.as_bytes()).as_bytes());
    for p in inputs {
        let p = p.as_ref();
        let digest = match std::fs::metadata(p) {
            Ok(meta) if meta.len() > max_bytes => format!("oversized:{}", meta.len()),
            Ok(_) => match std::fs::read(p) {
                Ok(bytes) => sha256_hex(&bytes),
                Err(err) => format!("unreadable:{:?}", err.kind()),
            },
            Err(err) => format!("unreadable:{:?}", err.kind()),
        };
        h.update(b"\n");
        h.update(file_name(p).as_bytes());
        h.update(b":");
        h.update(digest.as_bytes());
    }
    format!("{:x}", h.finalize())
}

pub fn file_name(p: &Path) -> String {
    p.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| p.display().to_string())
}

pub fn looks_like_url(s: &str) -> bool {
    let s = s.to_ascii_lowercase();
    s.starts_with("http://") || s.starts_with("https://") || s.starts_with("file://")
}
