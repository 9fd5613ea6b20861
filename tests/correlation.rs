use labtab::{
    date::DateSource,
    metrics::{builtin_metrics, MetricCatalog},
    stats::{pearson, CorrelationError},
    table::{LabTable, ReportRow},
};

fn table(pairs: &[(Option<f64>, Option<f64>)]) -> LabTable {
    let metrics = MetricCatalog::new(builtin_metrics())
        .resolve(&["PLT", "WBC"])
        .unwrap();
    let mut t = LabTable::new(&metrics);
    for (i, (plt, wbc)) in pairs.iter().enumerate() {
        let mut values = std::collections::BTreeMap::new();
        if let Some(v) = plt {
            values.insert("PLT".to_string(), *v);
        }
        if let Some(v) = wbc {
            values.insert("WBC".to_string(), *v);
        }
        t.push(ReportRow {
            file: format!("r{i}.pdf"),
            date: None,
            date_source: DateSource::None,
            values,
        });
    }
    t
}

fn full(xs: &[f64], ys: &[f64]) -> LabTable {
    let pairs: Vec<_> = xs.iter().zip(ys).map(|(x, y)| (Some(*x), Some(*y))).collect();
    table(&pairs)
}

#[test]
fn moderate_positive_correlation() {
    let t = full(&[1.0, 2.0, 3.0, 4.0, 5.0], &[2.0, 4.0, 5.0, 4.0, 5.0]);
    let c = pearson(&t, "PLT", "WBC").unwrap();
    assert_eq!(c.n, 5);
    assert!((c.r - 0.774_596_669_2).abs() < 1e-9);
    assert!((c.p_value - 0.124_027_062_66).abs() < 1e-9);
    assert_eq!(c.x, "PLT (Αιμοπετάλια)");
}

#[test]
fn strong_correlation_small_p() {
    let t = full(
        &[150.0, 210.0, 180.0, 260.0, 230.0, 199.0],
        &[5.1, 7.2, 6.0, 9.8, 8.1, 6.5],
    );
    let c = pearson(&t, "plt", "wbc").unwrap();
    assert!((c.r - 0.986_269_824_4).abs() < 1e-9);
    assert!((c.p_value - 0.000_281_482_39).abs() < 1e-10);
}

#[test]
fn perfect_negative_correlation() {
    let t = full(&[1.0, 2.0, 3.0, 4.0], &[4.0, 3.0, 2.0, 1.0]);
    let c = pearson(&t, "PLT", "WBC").unwrap();
    assert!((c.r + 1.0).abs() < 1e-12);
    assert_eq!(c.p_value, 0.0);
}

#[test]
fn only_complete_pairs_are_used() {
    let t = table(&[
        (Some(200.0), Some(6.0)),
        (Some(250.0), None),
        (None, Some(7.0)),
        (Some(300.0), Some(8.0)),
    ]);
    assert_eq!(
        pearson(&t, "PLT", "WBC").unwrap_err(),
        CorrelationError::TooFewSamples { found: 2 }
    );
}

#[test]
fn constant_metric_has_no_correlation() {
    let t = full(&[1.0, 2.0, 3.0], &[5.0, 5.0, 5.0]);
    assert_eq!(
        pearson(&t, "PLT", "WBC").unwrap_err(),
        CorrelationError::ZeroVariance("WBC (Λευκά)".into())
    );
}

#[test]
fn same_or_unknown_metric() {
    let t = full(&[1.0, 2.0, 3.0], &[1.0, 2.0, 4.0]);
    assert_eq!(
        pearson(&t, "PLT", "PLT (Αιμοπετάλια)").unwrap_err(),
        CorrelationError::SameMetric("PLT".into())
    );
    assert_eq!(
        pearson(&t, "PLT", "ALT").unwrap_err(),
        CorrelationError::UnknownMetric("ALT".into())
    );
}
