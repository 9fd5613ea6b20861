use crate::metrics::{builtin_metrics, MetricDef};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub global: Global,
    #[serde(default)]
    pub paths: Paths,
    #[serde(default)]
    pub text: Text,
    #[serde(default)]
    pub extraction: Extraction,
    #[serde(default)]
    pub selection: Selection,
    #[serde(default)]
    pub source: Source,
    #[serde(default)]
    pub output: Output,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub debug: Debug,
    #[serde(default)]
    pub security: Security,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub metrics: Vec<MetricDef>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        let cfg: Config = toml::from_str(&raw).with_context(|| "parsing TOML")?;
        Ok(cfg)
    }

    pub fn normalized_for_hash(&self) -> String {
        toml::to_string(self).unwrap_or_default()
    }

    pub fn catalog(&self) -> Vec<MetricDef> {
        if self.metrics.is_empty() {
            builtin_metrics()
        } else {
            self.metrics.clone()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Global {
    pub job_name: String,
    pub overwrite_existing: bool,
    pub print_summary: bool,
}
impl Default for Global {
    fn default() -> Self {
        Self {
            job_name: "default".into(),
            overwrite_existing: true,
            print_summary: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paths {
    pub out_dir: String,
}
impl Default for Paths {
    fn default() -> Self {
        Self {
            out_dir: "out".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Text {
    pub normalize_unicode: bool,
    pub normalize_newlines: bool,
    pub strip_control_chars: bool,
    pub noise_line_patterns: Vec<String>,
}
impl Default for Text {
    fn default() -> Self {
        Self {
            normalize_unicode: true,
            normalize_newlines: true,
            strip_control_chars: true,
            noise_line_patterns: vec![
                r"(?i)^(page|σελίδα|σελ\.)\s*\d+(\s*(of|από|/)\s*\d+)?$".into(),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Extraction {
    pub lookahead_lines: usize,
    pub year_guard_min: f64,
    pub year_guard_max: f64,
    pub integer_tolerance: f64,
}
impl Default for Extraction {
    fn default() -> Self {
        Self {
            lookahead_lines: 6,
            year_guard_min: 1990.0,
            year_guard_max: 2030.0,
            integer_tolerance: 1e-6,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Selection {
    pub metrics: Vec<String>,
}
impl Default for Selection {
    fn default() -> Self {
        Self {
            metrics: vec!["PLT".into()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    pub pdftotext_exe: String,
    pub pdftotext_layout: bool,
    pub timeout_seconds: u64,
    pub prefer_sidecar_text: bool,
    pub text_extensions: Vec<String>,
    pub pdf_extensions: Vec<String>,
}
impl Default for Source {
    fn default() -> Self {
        Self {
            pdftotext_exe: "pdftotext".into(),
            pdftotext_layout: true,
            timeout_seconds: 60,
            prefer_sidecar_text: true,
            text_extensions: vec!["txt".into(), "text".into()],
            pdf_extensions: vec!["pdf".into()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Output {
    pub write_csv: bool,
    pub write_markdown: bool,
    pub write_json: bool,
    pub write_series: bool,
    pub write_debug: bool,
    pub write_report_json: bool,
    pub write_index_json: bool,
    pub csv_filename: String,
    pub markdown_filename: String,
    pub json_filename: String,
    pub series_filename: String,
    pub debug_filename: String,
    pub report_filename: String,
    pub date_format: String,
}
impl Default for Output {
    fn default() -> Self {
        Self {
            write_csv: true,
            write_markdown: true,
            write_json: true,
            write_series: true,
            write_debug: true,
            write_report_json: true,
            write_index_json: true,
            csv_filename: "table.csv".into(),
            markdown_filename: "table.md".into(),
            json_filename: "table.json".into(),
            series_filename: "series.json".into(),
            debug_filename: "debug.csv".into(),
            report_filename: "report.json".into(),
            date_format: "[day]/[month]/[year]".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Logging {
    pub level: String,
    pub json: bool,
    pub write_to_file: bool,
    pub file_path: String,
}
impl Default for Logging {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
            write_to_file: true,
            file_path: "".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Debug {
    pub dump_effective_config: bool,
    pub log_traces: bool,
}
impl Default for Debug {
    fn default() -> Self {
        Self {
            dump_effective_config: true,
            log_traces: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Security {
    pub reject_url_inputs: bool,
    pub max_input_file_bytes: u64,
}
impl Default for Security {
    fn default() -> Self {
        Self {
            reject_url_inputs: true,
            max_input_file_bytes: 64 * 1024 * 1024,
        }
    }
}
