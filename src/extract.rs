use crate::{
    config::Config,
    keyword::Keyword,
    metrics::{apply_year_guard, pick_best_value, MetricDef},
    normalize::{find_all_numbers, prepare_text},
};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricTrace {
    pub metric: String,
    pub matched_line: String,
    pub candidates: Vec<f64>,
    pub picked: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Extraction {
    pub values: BTreeMap<String, f64>,
    pub traces: Vec<MetricTrace>,
}

struct Compiled<'a> {
    def: &'a MetricDef,
    keywords: Vec<Keyword>,
}

impl Compiled<'_> {
    fn hits(&self, line_upper: &str) -> bool {
        self.keywords.iter().any(|k| k.hit(line_upper))
    }

    fn owns(&self, alias_upper: &str) -> bool {
        self.keywords.iter().any(|k| k.text() == alias_upper)
    }
}

pub fn extract_metrics(cfg: &Config, metrics: &[MetricDef], text: &str) -> Result<Extraction> {
    let lines = prepare_text(&cfg.text, text)?;
    let upper: Vec<String> = lines.iter().map(|l| l.to_uppercase()).collect();
    Ok(extract_from_lines(cfg, metrics, &lines, &upper))
}

fn extract_from_lines(
    cfg: &Config,
    metrics: &[MetricDef],
    lines: &[String],
    upper: &[String],
) -> Extraction {
    let compiled: Vec<Compiled<'_>> = metrics
        .iter()
        .map(|def| Compiled {
            def,
            keywords: def
                .aliases
                .iter()
                .map(|a| Keyword::new(a))
                .filter(|k| !k.text().is_empty())
                .collect(),
        })
        .collect();

    // Every alias of every selected metric; a hit from another metric ends a lookahead.
    let mut stop_words: Vec<&Keyword> = Vec::new();
    for c in &compiled {
        for k in &c.keywords {
            if !stop_words.iter().any(|s| s.text() == k.text()) {
                stop_words.push(k);
            }
        }
    }

    let mut out = Extraction::default();

    for metric in &compiled {
        let def = metric.def;
        let mut trace = MetricTrace {
            metric: def.name.clone(),
            matched_line: String::new(),
            candidates: Vec::new(),
            picked: None,
        };

        if let Some(i) = upper.iter().position(|u| metric.hits(u)) {
            trace.matched_line = lines[i].clone();
            trace.candidates.extend(find_all_numbers(&lines[i]));

            let window = def.lookahead_lines(&cfg.extraction);
            for (line, line_upper) in lines.iter().zip(upper).skip(i + 1).take(window) {
                let other_starts = stop_words
                    .iter()
                    .any(|k| !metric.owns(k.text()) && k.hit(line_upper));
                if other_starts {
                    break;
                }
                trace.candidates.extend(find_all_numbers(line));
            }

            let picked = pick_best_value(&cfg.extraction, def, &trace.candidates);
            trace.picked = apply_year_guard(&cfg.extraction, def, picked);
            if let Some(v) = trace.picked {
                out.values.insert(def.name.clone(), v);
            }
        }

        if cfg.debug.log_traces {
            debug!(
                metric = %trace.metric,
                line = %trace.matched_line,
                candidates = ?trace.candidates,
                picked = ?trace.picked,
                "metric trace"
            );
        }
        out.traces.push(trace);
    }

    out
}
