//! Core types for the cost anomaly detection engine.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::config::SensitivityLevel;
use crate::provider::{AlertReceipt, ProviderError};

/// Base resource attached to every anomaly before enrichment.
pub const WAREHOUSE_RESOURCE: &str = "warehouse";

/// One calendar day of aggregated cost and usage figures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostSample {
    /// Calendar date of the sample
    pub date: NaiveDate,
    /// Total cost for the day (USD)
    pub cost: f64,
    /// Number of queries executed
    pub query_count: u64,
    /// Distinct users active on the day
    pub unique_users: u64,
    /// Average query duration in milliseconds
    pub avg_duration_ms: f64,
    /// Cost of the single most expensive query
    pub max_single_query_cost: f64,
    /// Day of week, 1 = Sunday through 7 = Saturday
    pub day_of_week: u8,
}

/// Severity of a detected anomaly, ranked ascending.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    /// Deviation below the low band boundary
    Low,
    /// Deviation in the medium band
    Medium,
    /// Deviation in the high band
    High,
    /// Deviation above the critical boundary (open-ended)
    Critical,
}

impl Severity {
    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
        }
    }
}

/// A detected cost anomaly.
///
/// Created by exactly one detector, possibly merged with same-date
/// duplicates during fusion, then enriched with root-cause context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Anomaly {
    /// Deterministic identifier: `{prefix}-{date}`, or `combined-{date}`
    /// after a merge
    pub anomaly_id: String,
    /// Date the anomaly occurred
    pub date: NaiveDate,
    /// Observed cost for the date
    pub actual_cost: f64,
    /// Baseline cost the detector expected
    pub expected_cost: f64,
    /// |actual - expected| / expected, as a percentage
    pub deviation_percentage: f64,
    /// Severity band containing the deviation
    pub severity: Severity,
    /// Normalized anomaly strength, clamped to [0, 1]
    pub confidence_score: f64,
    /// Detector tag, or several joined with `+` after a merge
    pub detection_method: String,
    /// Factors explaining the deviation
    pub contributing_factors: Vec<String>,
    /// Resources implicated in the excess spend
    pub affected_resources: Vec<String>,
    /// Suggested operator follow-ups
    pub remediation_steps: Vec<String>,
}

/// First and last anomaly dates in a detection result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalyDateRange {
    pub first_anomaly: NaiveDate,
    pub last_anomaly: NaiveDate,
}

/// Descriptive statistics over the final anomaly list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
    /// Number of anomalies reported
    pub total_anomalies: usize,
    /// Anomalies per analyzed sample
    pub anomaly_rate: f64,
    /// Sum of max(0, actual - expected) over all anomalies
    pub total_excess_cost: f64,
    /// Anomaly counts per severity
    pub severity_breakdown: BTreeMap<Severity, usize>,
    /// Up to five most frequent contributing factors
    pub most_common_factors: Vec<String>,
    /// Earliest and latest anomaly dates, when any exist
    pub date_range: Option<AnomalyDateRange>,
    /// Narrative insight strings for operators
    pub insights: Vec<String>,
}

/// Forward-looking risk bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
        }
    }
}

/// Direction of the recent cost trend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostTrend {
    Increasing,
    Stable,
}

/// Forward-looking assessment of near-future anomaly risk.
///
/// Computed independently of the anomaly list's enrichment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// Risk bucket derived from the score
    pub risk_level: RiskLevel,
    /// Weighted sum of fired risk factors
    pub risk_score: u32,
    /// Which risk conditions fired
    pub risk_factors: Vec<String>,
    /// Suggested preventive actions
    pub recommendations: Vec<String>,
    /// Naive forecast: recent daily mean times seven
    pub predicted_weekly_cost: f64,
    /// Trend label comparing recent to overall mean
    pub cost_trend: CostTrend,
}

/// Metadata describing one detection run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisMetadata {
    /// Requested lookback window in days
    pub analysis_period_days: u32,
    /// Sensitivity level the run used
    pub sensitivity: SensitivityLevel,
    /// Minimum fractional deviation for reporting
    pub alert_threshold: f64,
    /// Method tags of the detectors that executed
    pub detection_methods: Vec<String>,
    /// Number of samples the provider returned
    pub total_data_points: usize,
    /// Wall-clock completion time
    pub analyzed_at: DateTime<Utc>,
}

/// Outcome of handing the result to the alert dispatcher.
///
/// Dispatch failure is surfaced here, never as overall failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AlertOutcome {
    /// Alerts were delivered
    Sent(AlertReceipt),
    /// The dispatcher failed; the detection result is unaffected
    Failed { error: String },
}

/// Successful detection result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionReport {
    /// Always true
    pub success: bool,
    /// Final anomaly list, ordered by (severity, deviation) descending
    pub anomalies_detected: Vec<Anomaly>,
    /// Descriptive statistics
    pub summary: Summary,
    /// Forward-looking risk projection
    pub risk_assessment: RiskAssessment,
    /// Run metadata
    pub analysis_metadata: AnalysisMetadata,
    /// Dispatch outcome, when alerting was requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert_outcome: Option<AlertOutcome>,
}

/// Classification attached to a failure envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Validation,
    InsufficientData,
    Provider,
}

/// Failed detection result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionFailure {
    /// Always false
    pub success: bool,
    /// Human-readable failure description
    pub error: String,
    /// Failure classification
    pub error_kind: FailureKind,
    /// Samples actually available, for the insufficient-data case
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_points_available: Option<usize>,
}

impl DetectionFailure {
    /// Build the failure envelope for an engine error.
    pub fn from_error(error: &EngineError) -> Self {
        let (error_kind, data_points_available) = match error {
            EngineError::Validation(_) => (FailureKind::Validation, None),
            EngineError::InsufficientData { available, .. } => {
                (FailureKind::InsufficientData, Some(*available))
            }
            EngineError::Series(_) => (FailureKind::Provider, None),
        };
        Self {
            success: false,
            error: error.to_string(),
            error_kind,
            data_points_available,
        }
    }
}

/// Uniform serializable envelope over both detection outcomes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DetectionResponse {
    Completed(DetectionReport),
    Failed(DetectionFailure),
}

impl DetectionResponse {
    /// Whether detection completed.
    pub fn is_success(&self) -> bool {
        matches!(self, DetectionResponse::Completed(_))
    }

    /// The report, when detection completed.
    pub fn report(&self) -> Option<&DetectionReport> {
        match self {
            DetectionResponse::Completed(report) => Some(report),
            DetectionResponse::Failed(_) => None,
        }
    }

    /// The failure envelope, when it did not.
    pub fn failure(&self) -> Option<&DetectionFailure> {
        match self {
            DetectionResponse::Completed(_) => None,
            DetectionResponse::Failed(failure) => Some(failure),
        }
    }
}

/// Error types for the detection engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Request parameters rejected before any computation
    #[error("validation error: {0}")]
    Validation(String),

    /// Too few samples to model a baseline
    #[error(
        "insufficient data for anomaly detection ({available} of {minimum} required data points)"
    )]
    InsufficientData { available: usize, minimum: usize },

    /// The primary series provider failed; the whole request aborts
    #[error("cost series provider error: {0}")]
    Series(#[from] ProviderError),
}

pub type Result<T> = std::result::Result<T, EngineError>;
