use crate::{date::DateSource, extract::MetricTrace, metrics::MetricDef};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use time::{format_description::OwnedFormatItem, Date};

pub const DATE_HEADER: &str = "Date";
pub const FILE_HEADER: &str = "File";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    pub file: String,
    #[serde(with = "iso_date")]
    pub date: Option<Date>,
    pub date_source: DateSource,
    pub values: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricColumn {
    pub name: String,
    pub label: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LabTable {
    pub metrics: Vec<MetricColumn>,
    pub rows: Vec<ReportRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    #[serde(with = "iso_date")]
    pub date: Option<Date>,
    pub file: String,
    pub metric: String,
    pub value: f64,
}

impl LabTable {
    pub fn new(metrics: &[MetricDef]) -> Self {
        Self {
            metrics: metrics
                .iter()
                .map(|d| MetricColumn {
                    name: d.name.clone(),
                    label: d.display_label().to_string(),
                })
                .collect(),
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: ReportRow) {
        self.rows.push(row);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Oldest first; undated rows keep their order at the end.
    pub fn sort_by_date(&mut self) {
        self.rows.sort_by_key(|r| (r.date.is_none(), r.date));
    }

    pub fn metric(&self, name_or_label: &str) -> Option<&MetricColumn> {
        let wanted = name_or_label.trim().to_uppercase();
        self.metrics
            .iter()
            .find(|m| m.name.to_uppercase() == wanted || m.label.to_uppercase() == wanted)
    }

    pub fn present_metrics(&self) -> Vec<&MetricColumn> {
        self.metrics
            .iter()
            .filter(|m| self.rows.iter().any(|r| r.values.contains_key(&m.name)))
            .collect()
    }

    pub fn columns(&self) -> Vec<String> {
        let mut cols = vec![DATE_HEADER.to_string(), FILE_HEADER.to_string()];
        cols.extend(self.present_metrics().iter().map(|m| m.label.clone()));
        cols
    }

    fn display_rows(&self, date_format: &str) -> Result<Vec<Vec<String>>> {
        let fmt = parse_date_format(date_format)?;
        let present = self.present_metrics();
        self.rows
            .iter()
            .map(|r| {
                let mut cells = vec![format_date(r.date, &fmt)?, r.file.clone()];
                cells.extend(
                    present
                        .iter()
                        .map(|m| r.values.get(&m.name).map(|v| v.to_string()).unwrap_or_default()),
                );
                Ok(cells)
            })
            .collect()
    }

    pub fn to_csv(&self, date_format: &str) -> Result<String> {
        let mut out = csv_line(&self.columns());
        for cells in self.display_rows(date_format)? {
            out.push_str(&csv_line(&cells));
        }
        Ok(out)
    }

    pub fn to_markdown(&self, date_format: &str) -> Result<String> {
        let cols = self.columns();
        let mut out = md_line(&cols);
        out.push_str(&format!("|{}\n", "---|".repeat(cols.len())));
        for cells in self.display_rows(date_format)? {
            out.push_str(&md_line(&cells));
        }
        Ok(out)
    }

    pub fn series(&self) -> Vec<SeriesPoint> {
        let mut points = Vec::new();
        for r in &self.rows {
            for m in &self.metrics {
                if let Some(&value) = r.values.get(&m.name) {
                    points.push(SeriesPoint {
                        date: r.date,
                        file: r.file.clone(),
                        metric: m.label.clone(),
                        value,
                    });
                }
            }
        }
        points
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DebugTable {
    pub rows: Vec<DebugRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebugRow {
    #[serde(with = "iso_date")]
    pub date: Option<Date>,
    pub file: String,
    #[serde(flatten)]
    pub trace: MetricTrace,
}

impl DebugTable {
    pub fn extend(&mut self, file: &str, date: Option<Date>, traces: &[MetricTrace]) {
        self.rows.extend(traces.iter().map(|t| DebugRow {
            date,
            file: file.to_string(),
            trace: t.clone(),
        }));
    }

    pub fn to_csv(&self, date_format: &str) -> Result<String> {
        let fmt = parse_date_format(date_format)?;
        let header = ["Date", "File", "Metric", "MatchedLine", "Candidates", "Picked"];
        let mut out = csv_line(&header.map(String::from));
        for r in &self.rows {
            let candidates = r
                .trace
                .candidates
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            out.push_str(&csv_line(&[
                format_date(r.date, &fmt)?,
                r.file.clone(),
                r.trace.metric.clone(),
                r.trace.matched_line.clone(),
                candidates,
                r.trace.picked.map(|v| v.to_string()).unwrap_or_default(),
            ]));
        }
        Ok(out)
    }
}

fn parse_date_format(raw: &str) -> Result<OwnedFormatItem> {
    time::format_description::parse_owned::<2>(raw)
        .with_context(|| format!("invalid output.date_format: {raw}"))
}

fn format_date(date: Option<Date>, fmt: &OwnedFormatItem) -> Result<String> {
    match date {
        Some(d) => d.format(fmt).with_context(|| format!("formatting date {d}")),
        None => Ok(String::new()),
    }
}

fn csv_field(s: &str) -> String {
    if s.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

fn csv_line(cells: &[String]) -> String {
    let mut line = cells.iter().map(|c| csv_field(c)).collect::<Vec<_>>().join(",");
    line.push('\n');
    line
}

fn md_line(cells: &[String]) -> String {
    let escaped: Vec<String> = cells.iter().map(|c| c.replace('|', "\\|")).collect();
    format!("| {} |\n", escaped.join(" | "))
}

mod iso_date {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use time::{macros::format_description, Date};

    const FORMAT: &[time::format_description::BorrowedFormatItem<'static>] =
        format_description!("[year]-[month]-[day]");

    pub fn serialize<S: Serializer>(date: &Option<Date>, s: S) -> Result<S::Ok, S::Error> {
        let text = match date {
            Some(d) => Some(d.format(FORMAT).map_err(serde::ser::Error::custom)?),
            None => None,
        };
        text.serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Date>, D::Error> {
        let text: Option<String> = Option::deserialize(d)?;
        text.map(|t| Date::parse(&t, FORMAT).map_err(serde::de::Error::custom))
            .transpose()
    }
}
