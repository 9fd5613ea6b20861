use crate::config::Extraction;
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricDef {
    pub name: String,
    #[serde(default)]
    pub label: String,
    pub aliases: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default)]
    pub prefer_integer: bool,
    #[serde(default = "default_true")]
    pub year_guard: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lookahead: Option<usize>,
}

fn default_true() -> bool {
    true
}

impl MetricDef {
    fn new(name: &str, label: &str, aliases: &[&str]) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
            min: None,
            max: None,
            prefer_integer: false,
            year_guard: true,
            lookahead: None,
        }
    }

    fn range(mut self, min: f64, max: f64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    pub fn display_label(&self) -> &str {
        if self.label.is_empty() {
            &self.name
        } else {
            &self.label
        }
    }

    pub fn in_range(&self, v: f64) -> bool {
        self.min.is_none_or(|lo| v >= lo) && self.max.is_none_or(|hi| v <= hi)
    }

    pub fn has_range(&self) -> bool {
        self.min.is_some() || self.max.is_some()
    }

    pub fn lookahead_lines(&self, cfg: &Extraction) -> usize {
        self.lookahead.unwrap_or(cfg.lookahead_lines)
    }

    fn matches_name(&self, wanted: &str) -> bool {
        let wanted = wanted.trim();
        self.name.eq_ignore_ascii_case(wanted)
            || (!self.label.is_empty() && self.label.to_uppercase() == wanted.to_uppercase())
    }
}

pub fn builtin_metrics() -> Vec<MetricDef> {
    let mut plt = MetricDef::new("PLT", "PLT (Αιμοπετάλια)", &["PLT", "Platelets", "Αιμοπετάλια"])
        .range(10.0, 2000.0);
    plt.prefer_integer = true;

    let mut rbc = MetricDef::new(
        "RBC",
        "RBC (Ερυθρά)",
        &["RBC", "R.B.C", "ERY", "ER", "Ερυθρά", "Ερυθροκύτταρα", "Ερυθροκυτταρ"],
    )
    .range(1.0, 8.0);
    rbc.lookahead = Some(9);

    let mut b12 = MetricDef::new("B12", "Βιταμίνη B12", &["B12", "Vitamin B12", "Βιταμίνη B12"]);
    b12.year_guard = false;

    vec![
        plt,
        MetricDef::new("WBC", "WBC (Λευκά)", &["WBC", "Λευκά"]).range(0.1, 30.0),
        rbc,
        MetricDef::new("HGB", "HGB (Αιμοσφαιρίνη)", &["HGB", "H.B.G", "Αιμοσφαιρίνη"])
            .range(5.0, 25.0),
        MetricDef::new("HCT", "HCT (Αιματοκρίτης)", &["HCT", "Αιματοκρίτης"]).range(10.0, 70.0),
        MetricDef::new("MCV", "MCV", &["MCV"]),
        MetricDef::new("MCH", "MCH", &["MCH"]),
        MetricDef::new("MCHC", "MCHC", &["MCHC"]),
        MetricDef::new("RDW", "RDW", &["RDW"]),
        MetricDef::new("MPV", "MPV", &["MPV"]),
        MetricDef::new("PCT", "PCT", &["PCT"]),
        MetricDef::new("PDW", "PDW", &["PDW"]),
        MetricDef::new("GLU", "Σάκχαρο (GLU)", &["GLU", "GLUCOSE", "Σάκχαρο"]),
        MetricDef::new("CRP", "CRP", &["CRP", "Ποσοτική"]),
        b12,
    ]
}

#[derive(Debug, Clone)]
pub struct MetricCatalog {
    defs: Vec<MetricDef>,
}

impl MetricCatalog {
    pub fn new(defs: Vec<MetricDef>) -> Self {
        Self { defs }
    }

    pub fn all(&self) -> &[MetricDef] {
        &self.defs
    }

    pub fn get(&self, name: &str) -> Option<&MetricDef> {
        self.defs.iter().find(|d| d.matches_name(name))
    }

    pub fn resolve<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<MetricDef>> {
        let mut out: Vec<MetricDef> = Vec::with_capacity(names.len());
        for n in names {
            let n = n.as_ref();
            let def = self.get(n).ok_or_else(|| {
                let known: Vec<&str> = self.defs.iter().map(|d| d.name.as_str()).collect();
                anyhow!("unknown metric: {n} (known: {})", known.join(", "))
            })?;
            if !out.iter().any(|d| d.name == def.name) {
                out.push(def.clone());
            }
        }
        Ok(out)
    }
}

pub fn pick_best_value(cfg: &Extraction, def: &MetricDef, candidates: &[f64]) -> Option<f64> {
    let first = *candidates.first()?;
    if !def.has_range() {
        return Some(first);
    }

    let in_range: Vec<f64> = candidates.iter().copied().filter(|&v| def.in_range(v)).collect();
    if def.prefer_integer {
        if let Some(v) = in_range
            .iter()
            .copied()
            .find(|v| (v - v.round()).abs() < cfg.integer_tolerance)
        {
            return Some(v);
        }
    }
    in_range.first().copied()
}

pub fn apply_year_guard(cfg: &Extraction, def: &MetricDef, picked: Option<f64>) -> Option<f64> {
    match picked {
        Some(v) if def.year_guard && v > cfg.year_guard_min && v < cfg.year_guard_max => None,
        other => other,
    }
}
