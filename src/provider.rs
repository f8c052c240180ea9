//! External collaborator contracts.
//!
//! The engine reaches the billing feed, the per-date breakdown source,
//! and the notification channel only through these traits; callers
//! supply implementations backed by their warehouse and delivery stack.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::{Anomaly, CostSample, Severity};

/// Error from an external provider.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The provider could not be reached or rejected the request
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    /// Any other provider-side failure
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Supplies the daily cost series for a lookback window.
#[async_trait]
pub trait CostSeriesProvider: Send + Sync {
    /// Fetch up to `days` of daily samples for `source`, ascending by
    /// date with at most one record per calendar day. Zero-activity days
    /// may be absent.
    async fn fetch_daily_costs(
        &self,
        source: &str,
        days: u32,
    ) -> Result<Vec<CostSample>, ProviderError>;
}

/// Detailed cost breakdown for a single date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DateBreakdown {
    /// Total cost recorded for the date
    pub total_cost: f64,
    /// Queries executed on the date
    pub query_count: u64,
    /// Highest-spending user
    pub top_user: String,
    /// That user's spend
    pub top_user_cost: f64,
    /// Cost of the single most expensive query
    pub max_query_cost: f64,
    /// Top datasets by cost, highest first
    pub top_datasets: Vec<String>,
    /// Top dataset's share of the date's total cost
    pub dataset_concentration: f64,
}

/// Supplies per-date breakdowns for enrichment.
#[async_trait]
pub trait BreakdownProvider: Send + Sync {
    /// Fetch the breakdown for `date`; `Ok(None)` is the explicit
    /// "nothing recorded for that date".
    async fn fetch_breakdown(
        &self,
        date: NaiveDate,
    ) -> Result<Option<DateBreakdown>, ProviderError>;
}

/// Counts of alerts delivered, by severity bucket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertReceipt {
    /// Total alerts delivered
    pub alerts_sent: usize,
    /// Alerts for CRITICAL anomalies
    pub critical_alerts: usize,
    /// Alerts for HIGH anomalies
    pub high_priority_alerts: usize,
}

/// Hands finished detections to a notification channel.
#[async_trait]
pub trait AlertDispatcher: Send + Sync {
    /// Deliver alerts for the anomaly list. A failure here is surfaced
    /// as a secondary status on the result, never as overall failure.
    async fn dispatch(
        &self,
        anomalies: &[Anomaly],
        severity_breakdown: &BTreeMap<Severity, usize>,
    ) -> Result<AlertReceipt, ProviderError>;
}
