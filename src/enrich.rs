//! Root-cause enrichment for surviving anomalies.
//!
//! Each anomaly gets a per-date breakdown lookup; rule hits append
//! contributing factors and targeted remediation. A failed or empty
//! lookup degrades that one anomaly to generic remediation without
//! touching the rest of the result.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::config::EnrichmentThresholds;
use crate::provider::{BreakdownProvider, DateBreakdown};
use crate::types::{Anomaly, WAREHOUSE_RESOURCE};

/// Fallback steps when no specific root cause is identified.
fn generic_remediation() -> Vec<String> {
    vec![
        "Review usage audit logs for the anomaly date".to_string(),
        "Check for scheduled batch jobs or ETL processes".to_string(),
        "Verify if data volume changes occurred in source tables".to_string(),
        "Contact users with high usage on the anomaly date".to_string(),
    ]
}

/// Applies breakdown-driven enrichment rules to anomalies.
#[derive(Clone)]
pub struct Enricher {
    provider: Arc<dyn BreakdownProvider>,
    thresholds: EnrichmentThresholds,
    /// Mean query count over the analyzed series
    mean_query_count: f64,
}

impl Enricher {
    pub fn new(
        provider: Arc<dyn BreakdownProvider>,
        thresholds: EnrichmentThresholds,
        mean_query_count: f64,
    ) -> Self {
        Self {
            provider,
            thresholds,
            mean_query_count,
        }
    }

    /// Fetch the breakdown for a date, degrading provider failure to
    /// "no breakdown" so one bad lookup never aborts the run.
    pub async fn lookup(&self, date: NaiveDate) -> Option<DateBreakdown> {
        match self.provider.fetch_breakdown(date).await {
            Ok(breakdown) => breakdown,
            Err(error) => {
                warn!(
                    date = %date,
                    %error,
                    "breakdown lookup failed; falling back to generic remediation"
                );
                None
            }
        }
    }

    /// Apply the enrichment rules in place.
    ///
    /// Only appends factors and sets remediation/affected resources;
    /// severity, confidence, and detection method are never changed.
    pub fn apply(&self, anomaly: &mut Anomaly, breakdown: Option<&DateBreakdown>) {
        let mut factors: Vec<String> = Vec::new();
        let mut remediation: Vec<String> = Vec::new();
        let mut affected = vec![WAREHOUSE_RESOURCE.to_string()];

        if let Some(breakdown) = breakdown {
            if breakdown.top_user_cost > self.thresholds.top_user_cost {
                factors.push("high_cost_single_user".to_string());
                remediation.push(format!(
                    "Review queries from top user: {}",
                    breakdown.top_user
                ));
            }

            let volume_cutoff = self.mean_query_count * self.thresholds.query_volume_multiplier;
            if breakdown.query_count as f64 > volume_cutoff {
                factors.push("unusual_query_volume".to_string());
                remediation.push(
                    "Investigate increased query volume - possible automated process"
                        .to_string(),
                );
            }

            if breakdown.max_query_cost > self.thresholds.expensive_query_cost {
                factors.push("expensive_single_query".to_string());
                remediation.push("Optimize expensive individual queries".to_string());
            }

            if breakdown.dataset_concentration > self.thresholds.dataset_concentration {
                factors.push("dataset_concentration".to_string());
                affected.extend(breakdown.top_datasets.iter().cloned());
                remediation.push("Review queries on concentrated datasets".to_string());
            }

            debug!(
                date = %anomaly.date,
                factors = factors.len(),
                "breakdown enrichment applied"
            );
        }

        if remediation.is_empty() {
            remediation = generic_remediation();
        }

        anomaly.contributing_factors.extend(factors);
        anomaly.affected_resources = affected;
        anomaly.remediation_steps = remediation;
    }
}
