//! Rolling-window detector.
//!
//! Tests each day against a trailing local baseline so sustained trend
//! shifts the global mean would absorb still stand out.

use tracing::debug;

use crate::config::{AnalysisConfig, SensitivityLevel};
use crate::detector::{candidate, dual_threshold, CostDetector};
use crate::stats;
use crate::types::{Anomaly, CostSample};

/// Minimum series length for a meaningful trailing window.
const MIN_SAMPLES: usize = 10;

/// Maximum trailing window size (days).
const MAX_WINDOW: usize = 7;

/// Confidence cap for rolling-window candidates.
const CONFIDENCE_CAP: f64 = 0.9;

/// Detector using a trailing window as a local baseline.
pub struct RollingWindowDetector;

impl CostDetector for RollingWindowDetector {
    fn name(&self) -> &'static str {
        "moving_average"
    }

    fn detect(
        &self,
        series: &[CostSample],
        config: &AnalysisConfig,
        level: SensitivityLevel,
    ) -> Vec<Anomaly> {
        if series.len() < MIN_SAMPLES {
            return Vec::new();
        }

        let costs: Vec<f64> = series.iter().map(|s| s.cost).collect();
        let window = MAX_WINDOW.min(costs.len() / 3);
        let thresholds = config.sensitivity.thresholds(level);
        let mut anomalies = Vec::new();

        for i in window..series.len() {
            // Trailing baseline excludes the sample under test.
            let trailing = &costs[i - window..i];
            let moving_avg = stats::mean(trailing);
            let moving_std = stats::sample_stdev(trailing);

            if let Some(excursion) =
                dual_threshold(costs[i], moving_avg, moving_std, thresholds)
            {
                let sample = &series[i];
                debug!(
                    date = %sample.date,
                    z_score = excursion.z_score,
                    window,
                    "trailing baseline excursion"
                );
                anomalies.push(candidate(
                    format!("mavg-{}", sample.date),
                    sample,
                    moving_avg,
                    excursion,
                    CONFIDENCE_CAP,
                    self.name(),
                    vec!["trend_deviation".to_string()],
                    config,
                ));
            }
        }

        anomalies
    }
}
