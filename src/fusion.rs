//! Candidate fusion: threshold filter, per-date merge, ordering.
//!
//! Detection and fusion are independently testable: detectors emit
//! candidates, this reducer decides what survives.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::types::Anomaly;

/// Filter sub-threshold candidates, collapse to one record per date, and
/// order by severity then deviation, both descending.
pub fn filter_and_merge(candidates: Vec<Anomaly>, alert_threshold: f64) -> Vec<Anomaly> {
    let threshold_pct = alert_threshold * 100.0;

    let mut by_date: BTreeMap<NaiveDate, Vec<Anomaly>> = BTreeMap::new();
    for anomaly in candidates {
        if anomaly.deviation_percentage >= threshold_pct {
            by_date.entry(anomaly.date).or_default().push(anomaly);
        }
    }

    let mut merged: Vec<Anomaly> = by_date.into_values().map(merge_date_group).collect();

    merged.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then_with(|| b.deviation_percentage.total_cmp(&a.deviation_percentage))
    });
    merged
}

/// Collapse all candidates for one date into a single record.
///
/// The highest-confidence candidate becomes the representative; its
/// method and factors are rewritten as the union of everything that
/// fired for the date.
fn merge_date_group(mut group: Vec<Anomaly>) -> Anomaly {
    if group.len() == 1 {
        return group.remove(0);
    }

    // Union in first-seen order keeps the result deterministic.
    let mut methods: Vec<String> = Vec::new();
    let mut factors: Vec<String> = Vec::new();
    for anomaly in &group {
        for method in anomaly.detection_method.split('+') {
            if !methods.iter().any(|m| m == method) {
                methods.push(method.to_string());
            }
        }
        for factor in &anomaly.contributing_factors {
            if !factors.contains(factor) {
                factors.push(factor.clone());
            }
        }
    }

    let mut best = 0;
    for (i, anomaly) in group.iter().enumerate() {
        if anomaly.confidence_score > group[best].confidence_score {
            best = i;
        }
    }

    let mut merged = group.swap_remove(best);
    merged.anomaly_id = format!("combined-{}", merged.date);
    merged.detection_method = methods.join("+");
    merged.contributing_factors = factors;
    merged
}
