use regex::Regex;
use unicode_normalization::UnicodeNormalization;

// Latin and Greek capitals plus digits count as "inside a word".
const WORD_CLASS: &str = "A-Z0-9Α-Ω";

#[derive(Debug, Clone)]
pub struct Keyword {
    upper: String,
    bounded: Option<Regex>,
    spaced: Option<Regex>,
}

impl Keyword {
    pub fn new(alias: &str) -> Self {
        let upper = alias.trim().nfkc().collect::<String>().to_uppercase();
        if upper.is_empty() || upper.contains(' ') {
            return Self {
                upper,
                bounded: None,
                spaced: None,
            };
        }

        let bounded = Regex::new(&bounded_pattern(&regex::escape(&upper))).ok();

        let short_ascii = (2..=5).contains(&upper.len())
            && upper.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit());
        let spaced = if short_ascii {
            let joined = upper
                .chars()
                .map(|c| regex::escape(&c.to_string()))
                .collect::<Vec<_>>()
                .join(r"\W*");
            Regex::new(&bounded_pattern(&joined)).ok()
        } else {
            None
        };

        Self {
            upper,
            bounded,
            spaced,
        }
    }

    pub fn text(&self) -> &str {
        &self.upper
    }

    pub fn hit(&self, line_upper: &str) -> bool {
        if self.upper.is_empty() {
            return false;
        }
        if self.upper.contains(' ') {
            return line_upper.contains(&self.upper);
        }
        if self.spaced.as_ref().is_some_and(|r| r.is_match(line_upper)) {
            return true;
        }
        self.bounded.as_ref().is_some_and(|r| r.is_match(line_upper))
    }
}

fn bounded_pattern(inner: &str) -> String {
    format!("(?:^|[^{WORD_CLASS}]){inner}(?:$|[^{WORD_CLASS}])")
}

pub fn keyword_hit(line_upper: &str, alias: &str) -> bool {
    Keyword::new(alias).hit(line_upper)
}
