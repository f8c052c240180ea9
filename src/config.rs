//! Configuration for the detection engine.
//!
//! Band boundaries, thresholds, and risk weights are policy values, not
//! intrinsic constants; everything here is named, overridable, and
//! round-trips through YAML.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::Severity;

/// Detection sensitivity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensitivityLevel {
    Low,
    Medium,
    High,
}

impl SensitivityLevel {
    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            SensitivityLevel::Low => "low",
            SensitivityLevel::Medium => "medium",
            SensitivityLevel::High => "high",
        }
    }
}

/// Unrecognized sensitivity value.
#[derive(Debug, thiserror::Error)]
#[error("sensitivity must be 'low', 'medium', or 'high' (got '{0}')")]
pub struct UnknownSensitivity(String);

impl FromStr for SensitivityLevel {
    type Err = UnknownSensitivity;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "low" => Ok(SensitivityLevel::Low),
            "medium" => Ok(SensitivityLevel::Medium),
            "high" => Ok(SensitivityLevel::High),
            other => Err(UnknownSensitivity(other.to_string())),
        }
    }
}

/// Dual thresholds a candidate must clear at one sensitivity level.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SensitivityThresholds {
    /// Minimum z-score against the baseline
    pub z_score: f64,
    /// Minimum fractional deviation from the baseline
    pub deviation: f64,
}

/// Per-level dual thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityBands {
    pub low: SensitivityThresholds,
    pub medium: SensitivityThresholds,
    pub high: SensitivityThresholds,
}

impl SensitivityBands {
    /// Thresholds for a sensitivity level.
    pub fn thresholds(&self, level: SensitivityLevel) -> SensitivityThresholds {
        match level {
            SensitivityLevel::Low => self.low,
            SensitivityLevel::Medium => self.medium,
            SensitivityLevel::High => self.high,
        }
    }
}

impl Default for SensitivityBands {
    fn default() -> Self {
        Self {
            low: SensitivityThresholds {
                z_score: 2.5,
                deviation: 0.5,
            },
            medium: SensitivityThresholds {
                z_score: 2.0,
                deviation: 0.3,
            },
            high: SensitivityThresholds {
                z_score: 1.5,
                deviation: 0.2,
            },
        }
    }
}

/// Contiguous deviation-percentage bands mapping to severity.
///
/// Bands are half-open: [0, low_max) is LOW, [low_max, medium_max) is
/// MEDIUM, [medium_max, high_max) is HIGH, and everything at or above
/// high_max is CRITICAL.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SeverityBands {
    /// Upper bound (exclusive) of the LOW band, percent
    pub low_max: f64,
    /// Upper bound (exclusive) of the MEDIUM band, percent
    pub medium_max: f64,
    /// Upper bound (exclusive) of the HIGH band, percent
    pub high_max: f64,
}

impl SeverityBands {
    /// Map a deviation percentage to its severity band.
    pub fn classify(&self, deviation_percentage: f64) -> Severity {
        if deviation_percentage < self.low_max {
            Severity::Low
        } else if deviation_percentage < self.medium_max {
            Severity::Medium
        } else if deviation_percentage < self.high_max {
            Severity::High
        } else {
            Severity::Critical
        }
    }
}

impl Default for SeverityBands {
    fn default() -> Self {
        Self {
            low_max: 30.0,
            medium_max: 60.0,
            high_max: 100.0,
        }
    }
}

/// Thresholds for the enrichment rules.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EnrichmentThresholds {
    /// Single-user spend above this flags `high_cost_single_user`
    pub top_user_cost: f64,
    /// Query count above this multiple of the series mean flags
    /// `unusual_query_volume`
    pub query_volume_multiplier: f64,
    /// Single-query cost above this flags `expensive_single_query`
    pub expensive_query_cost: f64,
    /// Top-dataset share above this flags `dataset_concentration`
    pub dataset_concentration: f64,
}

impl Default for EnrichmentThresholds {
    fn default() -> Self {
        Self {
            top_user_cost: 50.0,
            query_volume_multiplier: 2.0,
            expensive_query_cost: 25.0,
            dataset_concentration: 0.8,
        }
    }
}

/// Weights and cutoffs for the forward-looking risk projection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskPolicy {
    /// Samples counted as "recent"
    pub recent_window: usize,
    /// Recent mean above this multiple of the overall mean fires
    /// `costs_trending_upward`
    pub upward_trend_ratio: f64,
    /// Points added by the upward trend factor
    pub upward_trend_points: u32,
    /// More than this many recent anomalies fires
    /// `recent_anomaly_frequency`
    pub recent_anomaly_count: usize,
    /// Points added by the recent anomaly factor
    pub recent_anomaly_points: u32,
    /// Coefficient of variation above this fires `high_cost_volatility`
    pub volatility_threshold: f64,
    /// Points added by the volatility factor
    pub volatility_points: u32,
    /// Minimum score for HIGH risk
    pub high_score: u32,
    /// Minimum score for MEDIUM risk
    pub medium_score: u32,
    /// Recent mean above this multiple of the overall mean labels the
    /// trend "increasing"
    pub trend_label_ratio: f64,
}

impl Default for RiskPolicy {
    fn default() -> Self {
        Self {
            recent_window: 7,
            upward_trend_ratio: 1.2,
            upward_trend_points: 2,
            recent_anomaly_count: 2,
            recent_anomaly_points: 3,
            volatility_threshold: 0.4,
            volatility_points: 2,
            high_score: 5,
            medium_score: 3,
            trend_label_ratio: 1.1,
        }
    }
}

/// Bounds on the requested lookback window.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LookbackLimits {
    /// Minimum lookback days accepted
    pub min_days: u32,
    /// Maximum lookback days accepted
    pub max_days: u32,
    /// Minimum samples required to run detection
    pub min_samples: usize,
}

impl Default for LookbackLimits {
    fn default() -> Self {
        Self {
            min_days: 7,
            max_days: 90,
            min_samples: 7,
        }
    }
}

/// Configuration for one detection engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Per-level dual thresholds for the detectors
    pub sensitivity: SensitivityBands,
    /// Deviation-to-severity band boundaries
    pub severity: SeverityBands,
    /// Enrichment rule thresholds
    pub enrichment: EnrichmentThresholds,
    /// Risk projection weights
    pub risk: RiskPolicy,
    /// Lookback window bounds
    pub lookback: LookbackLimits,
    /// Budget for a single breakdown lookup during enrichment (ms)
    pub enrichment_timeout_ms: u64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            sensitivity: SensitivityBands::default(),
            severity: SeverityBands::default(),
            enrichment: EnrichmentThresholds::default(),
            risk: RiskPolicy::default(),
            lookback: LookbackLimits::default(),
            enrichment_timeout_ms: 30_000,
        }
    }
}

impl AnalysisConfig {
    /// Load config from YAML.
    pub fn from_yaml(yaml: &str) -> std::result::Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// Serialize to YAML.
    pub fn to_yaml(&self) -> std::result::Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }
}
