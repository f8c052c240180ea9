//! Descriptive summary over the final anomaly list.

use std::collections::BTreeMap;

use crate::types::{Anomaly, AnomalyDateRange, CostSample, Summary};

/// Excess cost above which the narrative calls out the dollar figure.
const EXCESS_COST_CALLOUT: f64 = 100.0;

/// Anomaly rate above which the narrative flags a systemic problem.
const SYSTEMIC_RATE: f64 = 0.2;

/// Aggregate the final anomaly list into descriptive statistics and
/// operator-facing narrative insights.
pub fn summarize(anomalies: &[Anomaly], series: &[CostSample]) -> Summary {
    if anomalies.is_empty() {
        return Summary {
            total_anomalies: 0,
            anomaly_rate: 0.0,
            total_excess_cost: 0.0,
            severity_breakdown: BTreeMap::new(),
            most_common_factors: Vec::new(),
            date_range: None,
            insights: vec![
                "No significant cost anomalies detected in the analysis period".to_string(),
            ],
        };
    }

    let total_anomalies = anomalies.len();
    let anomaly_rate = if series.is_empty() {
        0.0
    } else {
        total_anomalies as f64 / series.len() as f64
    };

    let total_excess_cost: f64 = anomalies
        .iter()
        .map(|a| (a.actual_cost - a.expected_cost).max(0.0))
        .sum();

    let mut severity_breakdown = BTreeMap::new();
    for anomaly in anomalies {
        *severity_breakdown.entry(anomaly.severity).or_insert(0) += 1;
    }

    // Rank factors by frequency; name order breaks ties deterministically.
    let mut factor_counts: BTreeMap<&str, usize> = BTreeMap::new();
    for anomaly in anomalies {
        for factor in &anomaly.contributing_factors {
            *factor_counts.entry(factor.as_str()).or_insert(0) += 1;
        }
    }
    let mut ranked: Vec<(&str, usize)> = factor_counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    let most_common_factors: Vec<String> =
        ranked.iter().take(5).map(|(f, _)| f.to_string()).collect();

    let first = anomalies.iter().map(|a| a.date).min();
    let last = anomalies.iter().map(|a| a.date).max();
    let date_range = match (first, last) {
        (Some(first_anomaly), Some(last_anomaly)) => Some(AnomalyDateRange {
            first_anomaly,
            last_anomaly,
        }),
        _ => None,
    };

    let mut insights = vec![format!(
        "Detected {total_anomalies} cost anomalies over the analysis period"
    )];
    if total_excess_cost > EXCESS_COST_CALLOUT {
        insights.push(format!(
            "Anomalies resulted in approximately ${total_excess_cost:.2} in excess costs"
        ));
    }
    if anomaly_rate > SYSTEMIC_RATE {
        insights.push("High anomaly rate suggests systematic cost control issues".to_string());
    }
    if let Some((top_factor, _)) = ranked.first() {
        insights.push(format!("Most common contributing factor: {top_factor}"));
    }

    Summary {
        total_anomalies,
        anomaly_rate,
        total_excess_cost,
        severity_breakdown,
        most_common_factors,
        date_range,
        insights,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Severity;
    use chrono::NaiveDate;

    fn sample(day: u32) -> CostSample {
        CostSample {
            date: NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
            cost: 10.0,
            query_count: 100,
            unique_users: 5,
            avg_duration_ms: 1200.0,
            max_single_query_cost: 2.0,
            day_of_week: 1,
        }
    }

    fn anomaly(day: u32, actual: f64, expected: f64, severity: Severity, factor: &str) -> Anomaly {
        Anomaly {
            anomaly_id: format!("stat-2024-03-{day:02}"),
            date: NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
            actual_cost: actual,
            expected_cost: expected,
            deviation_percentage: 100.0,
            severity,
            confidence_score: 0.9,
            detection_method: "statistical_z_score".to_string(),
            contributing_factors: vec![factor.to_string()],
            affected_resources: vec!["warehouse".to_string()],
            remediation_steps: Vec::new(),
        }
    }

    #[test]
    fn test_empty_anomaly_list() {
        let series: Vec<CostSample> = (1..=14).map(sample).collect();
        let summary = summarize(&[], &series);
        assert_eq!(summary.total_anomalies, 0);
        assert_eq!(summary.anomaly_rate, 0.0);
        assert!(summary.date_range.is_none());
        assert_eq!(summary.insights.len(), 1);
        assert!(summary.insights[0].contains("No significant"));
    }

    #[test]
    fn test_summary_statistics() {
        let series: Vec<CostSample> = (1..=10).map(sample).collect();
        let anomalies = vec![
            anomaly(2, 60.0, 10.0, Severity::High, "statistical_deviation"),
            anomaly(5, 120.0, 10.0, Severity::Critical, "statistical_deviation"),
            // Below-expected day contributes zero excess.
            anomaly(8, 5.0, 10.0, Severity::Medium, "trend_deviation"),
        ];
        let summary = summarize(&anomalies, &series);

        assert_eq!(summary.total_anomalies, 3);
        assert!((summary.anomaly_rate - 0.3).abs() < 1e-12);
        assert!((summary.total_excess_cost - 160.0).abs() < 1e-12);
        assert_eq!(summary.severity_breakdown[&Severity::Critical], 1);
        assert_eq!(summary.severity_breakdown[&Severity::High], 1);
        assert_eq!(summary.severity_breakdown[&Severity::Medium], 1);
        assert_eq!(summary.most_common_factors[0], "statistical_deviation");

        let range = summary.date_range.unwrap();
        assert_eq!(range.first_anomaly, NaiveDate::from_ymd_opt(2024, 3, 2).unwrap());
        assert_eq!(range.last_anomaly, NaiveDate::from_ymd_opt(2024, 3, 8).unwrap());
    }

    #[test]
    fn test_narrative_thresholds() {
        let series: Vec<CostSample> = (1..=10).map(sample).collect();
        let anomalies = vec![
            anomaly(1, 200.0, 10.0, Severity::Critical, "statistical_deviation"),
            anomaly(2, 200.0, 10.0, Severity::Critical, "statistical_deviation"),
            anomaly(3, 200.0, 10.0, Severity::Critical, "statistical_deviation"),
        ];
        let summary = summarize(&anomalies, &series);

        // Excess 570 > 100 and rate 0.3 > 0.2 both fire, plus the count
        // line and the top-factor line.
        assert_eq!(summary.insights.len(), 4);
        assert!(summary.insights.iter().any(|i| i.contains("excess costs")));
        assert!(summary
            .insights
            .iter()
            .any(|i| i.contains("systematic cost control")));
    }
}
