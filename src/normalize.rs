use crate::config::Text;
use anyhow::{Context, Result};
use regex::Regex;
use std::sync::LazyLock;
use unicode_normalization::UnicodeNormalization;

static NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"-?\d{1,3}(?:[.,]\d{3})*(?:[.,]\d+)?|-?\d+(?:[.,]\d+)?")
        .expect("number pattern is valid")
});

pub fn prepare_text(cfg: &Text, raw: &str) -> Result<Vec<String>> {
    let mut text = if cfg.normalize_newlines {
        raw.replace("\r\n", "\n").replace('\r', "\n")
    } else {
        raw.to_string()
    };

    if cfg.normalize_unicode {
        text = text.nfkc().collect::<String>();
    }

    if cfg.strip_control_chars {
        text = strip_control_chars(&text);
    }

    let noise: Vec<Regex> = cfg
        .noise_line_patterns
        .iter()
        .map(|p| Regex::new(p).with_context(|| format!("noise pattern: {p}")))
        .collect::<Result<Vec<_>>>()?;

    Ok(text
        .lines()
        .map(normalize_line)
        .filter(|l| !l.is_empty())
        .filter(|l| !noise.iter().any(|r| r.is_match(l)))
        .collect())
}

fn strip_control_chars(s: &str) -> String {
    // Keep structural whitespace so lines survive.
    s.chars()
        .filter(|&ch| ch == '\n' || ch == '\t' || !ch.is_control())
        .collect()
}

pub fn normalize_line(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

// OCR noise first, then the decimal separator: the last of `,`/`.` wins.
pub fn clean_number(raw: &str) -> Option<f64> {
    let mut s: String = raw
        .trim()
        .chars()
        .filter_map(|ch| match ch {
            '"' | '\'' | ':' | '*' | '$' | '≤' | '≥' | '<' | '>' => None,
            'O' | 'o' => Some('0'),
            '–' | '−' => Some('-'),
            c if c.is_ascii_digit() || c == ',' || c == '.' || c == '-' => Some(c),
            _ => None,
        })
        .collect();

    match (s.rfind(','), s.rfind('.')) {
        (Some(comma), Some(dot)) if comma > dot => {
            s = s.replace('.', "").replace(',', ".");
        }
        (Some(_), Some(_)) => {
            s = s.replace(',', "");
        }
        (Some(_), None) => {
            s = s.replace(',', ".");
        }
        _ => {}
    }

    let dashes = s.matches('-').count();
    if dashes > 1 || (dashes == 1 && !s.starts_with('-')) {
        s = s.replace('-', "");
    }

    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

pub fn find_all_numbers(s: &str) -> Vec<f64> {
    if s.is_empty() {
        return Vec::new();
    }
    let cleaned = s.replace(['"', '\'', ':'], " ");
    NUMBER_RE
        .find_iter(&cleaned)
        .filter_map(|m| clean_number(m.as_str()))
        .collect()
}
