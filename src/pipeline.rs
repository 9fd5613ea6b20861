use crate::{
    config::Config,
    date::{detect_date, DateSource},
    extract::{extract_metrics, Extraction},
    metrics::MetricDef,
    report::{FileReport, JobReport},
    source::{SourceKind, TextSource},
    table::{DebugTable, LabTable, ReportRow},
    util::file_name,
};
use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use time::Date;
use tracing::{info, warn};

pub struct Pipeline<S: TextSource> {
    cfg: Config,
    metrics: Vec<MetricDef>,
    source: S,
}

pub struct JobOutput {
    pub table: LabTable,
    pub debug: DebugTable,
    pub report: JobReport,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileExtraction {
    pub file: String,
    pub source: SourceKind,
    pub origin: PathBuf,
    #[serde(skip)]
    pub date: Option<Date>,
    pub date_text: Option<String>,
    pub date_source: DateSource,
    #[serde(flatten)]
    pub extraction: Extraction,
}

impl<S: TextSource> Pipeline<S> {
    pub fn new(cfg: &Config, metrics: Vec<MetricDef>, source: S) -> Self {
        Self {
            cfg: cfg.clone(),
            metrics,
            source,
        }
    }

    pub fn extract_file(&self, path: &Path) -> Result<FileExtraction> {
        let file = file_name(path);
        let max = self.cfg.security.max_input_file_bytes;
        if let Ok(meta) = std::fs::metadata(path) {
            if meta.len() > max {
                bail!("input exceeds max_input_file_bytes ({} > {max})", meta.len());
            }
        }
        let src = self
            .source
            .extract_text(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let extraction = extract_metrics(&self.cfg, &self.metrics, &src.text)
            .with_context(|| format!("parsing {}", path.display()))?;
        let (date, date_source) = detect_date(&src.text, &file);

        Ok(FileExtraction {
            file,
            source: src.kind,
            origin: src.origin,
            date,
            date_text: date.map(|d| d.to_string()),
            date_source,
            extraction,
        })
    }

    pub fn run(&self, inputs: &[PathBuf]) -> Result<JobOutput> {
        let mut table = LabTable::new(&self.metrics);
        let mut debug = DebugTable::default();
        let mut files = Vec::with_capacity(inputs.len());

        for (i, path) in inputs.iter().enumerate() {
            info!("file {}/{} {}", i + 1, inputs.len(), path.display());

            match self.extract_file(path) {
                Ok(fx) => {
                    let (found, missing): (Vec<_>, Vec<_>) = self
                        .metrics
                        .iter()
                        .map(|m| m.name.clone())
                        .partition(|n| fx.extraction.values.contains_key(n));
                    info!(
                        "file {} date={:?} source={:?} found={:?} missing={:?}",
                        fx.file, fx.date, fx.source, found, missing
                    );

                    debug.extend(&fx.file, fx.date, &fx.extraction.traces);
                    files.push(FileReport {
                        file: fx.file.clone(),
                        path: path.display().to_string(),
                        ok: true,
                        source: Some(fx.source),
                        origin: Some(fx.origin.display().to_string()),
                        date_source: Some(fx.date_source),
                        found,
                        missing,
                        error: None,
                    });
                    table.push(ReportRow {
                        file: fx.file,
                        date: fx.date,
                        date_source: fx.date_source,
                        values: fx.extraction.values,
                    });
                }
                Err(err) => {
                    warn!("skipping {}: {:#}", path.display(), err);
                    files.push(FileReport {
                        file: file_name(path),
                        path: path.display().to_string(),
                        ok: false,
                        source: None,
                        origin: None,
                        date_source: None,
                        found: Vec::new(),
                        missing: self.metrics.iter().map(|m| m.name.clone()).collect(),
                        error: Some(format!("{err:#}")),
                    });
                }
            }
        }

        table.sort_by_date();

        let failed = files.iter().filter(|f| !f.ok).count();
        let report = JobReport {
            metrics: self.metrics.iter().map(|m| m.name.clone()).collect(),
            processed: files.len() - failed,
            failed,
            files,
        };

        Ok(JobOutput {
            table,
            debug,
            report,
        })
    }
}
