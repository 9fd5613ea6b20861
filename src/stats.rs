use crate::table::LabTable;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const METHOD_NOTES: &str = "\
Method: Pearson correlation coefficient (r)

Measures the linear association between two continuous variables, r in [-1, +1].
r > 0 is a positive association, r < 0 a negative one, r near 0 no linear association.

Significance: H0 is rho = 0. The two-sided p-value comes from the t distribution
with n - 2 degrees of freedom; p < 0.05 suggests a significant correlation.

Caveats: sensitive to outliers; with small n the p-value is unstable; for
monotonic but non-linear relationships a rank-based method (Spearman) fits better.
";

#[derive(Debug, Error, PartialEq)]
pub enum CorrelationError {
    #[error("unknown metric: {0}")]
    UnknownMetric(String),
    #[error("pick two different metrics (got {0} twice)")]
    SameMetric(String),
    #[error("need at least 3 paired measurements (found {found})")]
    TooFewSamples { found: usize },
    #[error("constant value for {0} (zero variance)")]
    ZeroVariance(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Correlation {
    pub x: String,
    pub y: String,
    pub n: usize,
    pub r: f64,
    pub p_value: f64,
    pub pairs: Vec<(f64, f64)>,
}

/// Pearson r between two metric columns, over rows where both are present.
pub fn pearson(table: &LabTable, x: &str, y: &str) -> Result<Correlation, CorrelationError> {
    let mx = table
        .metric(x)
        .ok_or_else(|| CorrelationError::UnknownMetric(x.to_string()))?;
    let my = table
        .metric(y)
        .ok_or_else(|| CorrelationError::UnknownMetric(y.to_string()))?;
    if mx.name == my.name {
        return Err(CorrelationError::SameMetric(mx.name.clone()));
    }

    let pairs: Vec<(f64, f64)> = table
        .rows
        .iter()
        .filter_map(|r| Some((*r.values.get(&mx.name)?, *r.values.get(&my.name)?)))
        .collect();

    let (r, p_value) = pearson_pairs(&pairs).map_err(|e| match e {
        PairError::TooFew(found) => CorrelationError::TooFewSamples { found },
        PairError::ConstantX => CorrelationError::ZeroVariance(mx.label.clone()),
        PairError::ConstantY => CorrelationError::ZeroVariance(my.label.clone()),
    })?;

    Ok(Correlation {
        x: mx.label.clone(),
        y: my.label.clone(),
        n: pairs.len(),
        r,
        p_value,
        pairs,
    })
}

enum PairError {
    TooFew(usize),
    ConstantX,
    ConstantY,
}

fn pearson_pairs(pairs: &[(f64, f64)]) -> Result<(f64, f64), PairError> {
    let n = pairs.len();
    if n < 3 {
        return Err(PairError::TooFew(n));
    }
    let nf = n as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / nf;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / nf;

    let (mut sxx, mut syy, mut sxy) = (0.0, 0.0, 0.0);
    for &(x, y) in pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        sxx += dx * dx;
        syy += dy * dy;
        sxy += dx * dy;
    }
    if sxx == 0.0 {
        return Err(PairError::ConstantX);
    }
    if syy == 0.0 {
        return Err(PairError::ConstantY);
    }

    let r = (sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0);
    Ok((r, two_sided_p(r, n)))
}

/// P(|T| >= |t|) for t = r * sqrt(df / (1 - r^2)), df = n - 2.
fn two_sided_p(r: f64, n: usize) -> f64 {
    let df = (n - 2) as f64;
    let one_minus_r2 = 1.0 - r * r;
    if one_minus_r2 <= 0.0 {
        return 0.0;
    }
    regularized_incomplete_beta(df / 2.0, 0.5, one_minus_r2).clamp(0.0, 1.0)
}

fn ln_gamma(x: f64) -> f64 {
    // Lanczos approximation, g = 7.
    const COEF: [f64; 9] = [
        0.999_999_999_999_809_9,
        676.520_368_121_885_1,
        -1_259.139_216_722_402_8,
        771.323_428_777_653_1,
        -176.615_029_162_140_6,
        12.507_343_278_686_905,
        -0.138_571_095_265_720_12,
        9.984_369_578_019_572e-6,
        1.505_632_735_149_311_6e-7,
    ];
    if x < 0.5 {
        let pi = std::f64::consts::PI;
        return (pi / (pi * x).sin()).ln() - ln_gamma(1.0 - x);
    }
    let x = x - 1.0;
    let mut a = COEF[0];
    let t = x + 7.5;
    for (i, c) in COEF.iter().enumerate().skip(1) {
        a += c / (x + i as f64);
    }
    0.5 * (2.0 * std::f64::consts::PI).ln() + (x + 0.5) * t.ln() - t + a.ln()
}

fn regularized_incomplete_beta(a: f64, b: f64, x: f64) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    if x >= 1.0 {
        return 1.0;
    }
    let ln_front = ln_gamma(a + b) - ln_gamma(a) - ln_gamma(b) + a * x.ln() + b * (1.0 - x).ln();
    let front = ln_front.exp();
    if x < (a + 1.0) / (a + b + 2.0) {
        front * beta_continued_fraction(a, b, x) / a
    } else {
        1.0 - front * beta_continued_fraction(b, a, 1.0 - x) / b
    }
}

fn beta_continued_fraction(a: f64, b: f64, x: f64) -> f64 {
    const MAX_ITER: usize = 300;
    const EPS: f64 = 1e-15;
    const TINY: f64 = 1e-300;

    let qab = a + b;
    let qap = a + 1.0;
    let qam = a - 1.0;
    let mut c = 1.0;
    let mut d = 1.0 - qab * x / qap;
    if d.abs() < TINY {
        d = TINY;
    }
    d = 1.0 / d;
    let mut h = d;

    for m in 1..=MAX_ITER {
        let m = m as f64;
        let m2 = 2.0 * m;

        let aa = m * (b - m) * x / ((qam + m2) * (a + m2));
        d = 1.0 + aa * d;
        if d.abs() < TINY {
            d = TINY;
        }
        c = 1.0 + aa / c;
        if c.abs() < TINY {
            c = TINY;
        }
        d = 1.0 / d;
        h *= d * c;

        let aa = -(a + m) * (qab + m) * x / ((a + m2) * (qap + m2));
        d = 1.0 + aa * d;
        if d.abs() < TINY {
            d = TINY;
        }
        c = 1.0 + aa / c;
        if c.abs() < TINY {
            c = TINY;
        }
        d = 1.0 / d;
        let del = d * c;
        h *= del;
        if (del - 1.0).abs() < EPS {
            break;
        }
    }
    h
}
