//! Forward-looking risk projection.
//!
//! Independent of the anomaly list's enrichment: recent trend, recent
//! anomaly frequency, and overall volatility each add weighted points.

use std::collections::BTreeSet;

use chrono::NaiveDate;

use crate::config::RiskPolicy;
use crate::stats;
use crate::types::{Anomaly, CostSample, CostTrend, RiskAssessment, RiskLevel};

/// Score the risk of near-future cost anomalies.
pub fn project_risk(
    series: &[CostSample],
    anomalies: &[Anomaly],
    policy: &RiskPolicy,
) -> RiskAssessment {
    let costs: Vec<f64> = series.iter().map(|s| s.cost).collect();
    let recent_start = series.len().saturating_sub(policy.recent_window);
    let recent_avg = stats::mean(&costs[recent_start..]);
    let overall_avg = stats::mean(&costs);

    let mut risk_factors: Vec<String> = Vec::new();
    let mut risk_score: u32 = 0;

    if recent_avg > overall_avg * policy.upward_trend_ratio {
        risk_factors.push("costs_trending_upward".to_string());
        risk_score += policy.upward_trend_points;
    }

    let recent_dates: BTreeSet<NaiveDate> =
        series[recent_start..].iter().map(|s| s.date).collect();
    let recent_anomaly_count = anomalies
        .iter()
        .filter(|a| recent_dates.contains(&a.date))
        .count();
    if recent_anomaly_count > policy.recent_anomaly_count {
        risk_factors.push("recent_anomaly_frequency".to_string());
        risk_score += policy.recent_anomaly_points;
    }

    if costs.len() > 1 {
        let volatility = stats::coefficient_of_variation(&costs);
        if volatility > policy.volatility_threshold {
            risk_factors.push("high_cost_volatility".to_string());
            risk_score += policy.volatility_points;
        }
    }

    let risk_level = if risk_score >= policy.high_score {
        RiskLevel::High
    } else if risk_score >= policy.medium_score {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    };

    let mut recommendations: Vec<String> = Vec::new();
    if matches!(risk_level, RiskLevel::Medium | RiskLevel::High) {
        recommendations.extend([
            "Implement proactive cost monitoring and alerts".to_string(),
            "Review recent changes in data processing workflows".to_string(),
            "Consider setting up automated cost controls".to_string(),
        ]);
    }
    if risk_factors.iter().any(|f| f == "costs_trending_upward") {
        recommendations.push("Investigate root causes of cost increases".to_string());
    }
    if risk_factors.iter().any(|f| f == "high_cost_volatility") {
        recommendations.push("Implement more predictable query scheduling".to_string());
    }

    let cost_trend = if recent_avg > overall_avg * policy.trend_label_ratio {
        CostTrend::Increasing
    } else {
        CostTrend::Stable
    };

    RiskAssessment {
        risk_level,
        risk_score,
        risk_factors,
        recommendations,
        predicted_weekly_cost: recent_avg * 7.0,
        cost_trend,
    }
}
