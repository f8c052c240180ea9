//! Anomaly detectors.
//!
//! Three independent baseline models scan the same series:
//! - **Global**: z-score against the whole-series mean
//! - **Rolling**: trailing-window local baseline
//! - **Seasonal**: day-of-week bucket baseline

mod global;
mod rolling;
mod seasonal;

pub use global::GlobalZScoreDetector;
pub use rolling::RollingWindowDetector;
pub use seasonal::SeasonalDetector;

use crate::config::{AnalysisConfig, SensitivityLevel, SensitivityThresholds};
use crate::types::{Anomaly, CostSample};

/// A pure detector mapping (series, config) to candidate anomalies.
///
/// Detectors never touch providers and hold no state; running the same
/// series twice yields the same candidates.
pub trait CostDetector: Send + Sync {
    /// Method tag attached to every candidate this detector emits.
    fn name(&self) -> &'static str;

    /// Scan the series and return zero or more candidates.
    fn detect(
        &self,
        series: &[CostSample],
        config: &AnalysisConfig,
        level: SensitivityLevel,
    ) -> Vec<Anomaly>;
}

/// A sample's measured departure from a baseline.
#[derive(Debug, Clone, Copy)]
pub(crate) struct BaselineExcursion {
    /// |actual - expected| / baseline stdev
    pub z_score: f64,
    /// |actual - expected| / expected, fractional (0 when expected is 0)
    pub deviation: f64,
}

/// Dual-threshold test shared by all detectors.
///
/// A candidate must be both statistically unusual (z-score) and materially
/// large (relative deviation): a big relative move inside high variance
/// must not fire, nor a statistically unusual but tiny relative move.
/// Returns `None` for a zero-stdev baseline.
pub(crate) fn dual_threshold(
    actual: f64,
    expected: f64,
    stdev: f64,
    thresholds: SensitivityThresholds,
) -> Option<BaselineExcursion> {
    if stdev <= 0.0 {
        return None;
    }
    let z_score = (actual - expected).abs() / stdev;
    let deviation = if expected > 0.0 {
        (actual - expected).abs() / expected
    } else {
        0.0
    };
    if z_score >= thresholds.z_score && deviation >= thresholds.deviation {
        Some(BaselineExcursion { z_score, deviation })
    } else {
        None
    }
}

/// Build a candidate anomaly from a baseline excursion.
///
/// Confidence is z/3 capped per detector type, which keeps it inside
/// [0, 1] by construction.
pub(crate) fn candidate(
    anomaly_id: String,
    sample: &CostSample,
    expected: f64,
    excursion: BaselineExcursion,
    confidence_cap: f64,
    method: &str,
    contributing_factors: Vec<String>,
    config: &AnalysisConfig,
) -> Anomaly {
    let deviation_percentage = excursion.deviation * 100.0;
    Anomaly {
        anomaly_id,
        date: sample.date,
        actual_cost: sample.cost,
        expected_cost: expected,
        deviation_percentage,
        severity: config.severity.classify(deviation_percentage),
        confidence_score: (excursion.z_score / 3.0).min(confidence_cap),
        detection_method: method.to_string(),
        contributing_factors,
        affected_resources: vec![crate::types::WAREHOUSE_RESOURCE.to_string()],
        remediation_steps: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SensitivityThresholds;

    const MEDIUM: SensitivityThresholds = SensitivityThresholds {
        z_score: 2.0,
        deviation: 0.3,
    };

    #[test]
    fn test_zero_stdev_never_fires() {
        assert!(dual_threshold(100.0, 10.0, 0.0, MEDIUM).is_none());
    }

    #[test]
    fn test_both_thresholds_required() {
        // Statistically unusual but relatively tiny: z = 5, deviation = 0.05
        assert!(dual_threshold(105.0, 100.0, 1.0, MEDIUM).is_none());
        // Relatively large but statistically mundane: z = 1, deviation = 1.0
        assert!(dual_threshold(20.0, 10.0, 10.0, MEDIUM).is_none());
        // Both clear
        let excursion = dual_threshold(30.0, 10.0, 5.0, MEDIUM).unwrap();
        assert_eq!(excursion.z_score, 4.0);
        assert_eq!(excursion.deviation, 2.0);
    }

    #[test]
    fn test_zero_expected_has_zero_deviation() {
        // Deviation is defined as 0 when the baseline is 0, so the
        // deviation threshold suppresses the candidate.
        assert!(dual_threshold(50.0, 0.0, 5.0, MEDIUM).is_none());
    }
}
