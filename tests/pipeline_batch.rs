use anyhow::{anyhow, Result};
use labtab::{
    config::Config,
    date::DateSource,
    metrics::{builtin_metrics, MetricCatalog},
    pipeline::Pipeline,
    source::{SourceDiag, SourceKind, SourceText, TextSource},
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use time::macros::date;

struct MemorySource(HashMap<PathBuf, String>);

impl TextSource for MemorySource {
    fn doctor(&self) -> Result<Vec<SourceDiag>> {
        Ok(Vec::new())
    }

    fn extract_text(&self, path: &Path) -> Result<SourceText> {
        let text = self
            .0
            .get(path)
            .ok_or_else(|| anyhow!("no text for {}", path.display()))?;
        Ok(SourceText {
            kind: SourceKind::PlainText,
            origin: path.to_path_buf(),
            text: text.clone(),
        })
    }
}

fn pipeline() -> Pipeline<MemorySource> {
    let docs = HashMap::from([
        (PathBuf::from("cbc_210501.txt"), "PLT 250\n".to_string()),
        (
            PathBuf::from("march.txt"),
            "Date 05/03/2021\nPLT 245\nWBC 7,2\n".to_string(),
        ),
    ]);
    let metrics = MetricCatalog::new(builtin_metrics())
        .resolve(&["PLT", "WBC"])
        .unwrap();
    Pipeline::new(&Config::default(), metrics, MemorySource(docs))
}

#[test]
fn failing_file_does_not_stop_the_batch() {
    let inputs = vec![
        PathBuf::from("cbc_210501.txt"),
        PathBuf::from("broken.pdf"),
        PathBuf::from("march.txt"),
    ];
    let out = pipeline().run(&inputs).unwrap();

    assert_eq!(out.report.processed, 2);
    assert_eq!(out.report.failed, 1);
    assert!(!out.report.files[1].ok);
    assert!(out.report.files[1]
        .error
        .as_deref()
        .unwrap()
        .contains("no text for broken.pdf"));

    let files: Vec<&str> = out.table.rows.iter().map(|r| r.file.as_str()).collect();
    assert_eq!(files, vec!["march.txt", "cbc_210501.txt"]);

    let march = &out.table.rows[0];
    assert_eq!(march.date, Some(date!(2021 - 03 - 05)));
    assert_eq!(march.values.get("PLT"), Some(&245.0));
    assert_eq!(march.values.get("WBC"), Some(&7.2));

    let named = &out.table.rows[1];
    assert_eq!(named.date_source, DateSource::FileName);
    assert!(!named.values.contains_key("WBC"));

    assert_eq!(out.debug.rows.len(), 4);
    assert_eq!(out.report.files[0].missing, vec!["WBC".to_string()]);
}

#[test]
fn single_file_extraction() {
    let fx = pipeline()
        .extract_file(Path::new("march.txt"))
        .unwrap();
    assert_eq!(fx.file, "march.txt");
    assert_eq!(fx.date_source, DateSource::Text);
    assert_eq!(fx.date_text.as_deref(), Some("2021-03-05"));
    assert_eq!(fx.extraction.traces.len(), 2);
}

#[test]
fn nothing_extracted_is_not_an_error() {
    let out = pipeline().run(&[PathBuf::from("missing.txt")]).unwrap();
    assert!(out.table.is_empty());
    assert_eq!(out.report.failed, 1);
    assert_eq!(out.table.columns(), vec!["Date", "File"]);
}
