//! Whole-series statistical detector.
//!
//! Flags days whose cost is a z-score outlier against the mean and sample
//! standard deviation of the entire lookback window.

use tracing::debug;

use crate::config::{AnalysisConfig, SensitivityLevel};
use crate::detector::{candidate, dual_threshold, CostDetector};
use crate::stats;
use crate::types::{Anomaly, CostSample};

/// Confidence cap for global statistical candidates.
const CONFIDENCE_CAP: f64 = 1.0;

/// Detector using the whole series as its baseline.
pub struct GlobalZScoreDetector;

impl CostDetector for GlobalZScoreDetector {
    fn name(&self) -> &'static str {
        "statistical_z_score"
    }

    fn detect(
        &self,
        series: &[CostSample],
        config: &AnalysisConfig,
        level: SensitivityLevel,
    ) -> Vec<Anomaly> {
        let costs: Vec<f64> = series.iter().map(|s| s.cost).collect();
        let mean = stats::mean(&costs);
        let stdev = stats::sample_stdev(&costs);

        if stdev == 0.0 {
            // Constant series carries no statistical signal.
            return Vec::new();
        }

        let thresholds = config.sensitivity.thresholds(level);
        let mut anomalies = Vec::new();

        for sample in series {
            if let Some(excursion) = dual_threshold(sample.cost, mean, stdev, thresholds) {
                debug!(
                    date = %sample.date,
                    z_score = excursion.z_score,
                    "global baseline excursion"
                );
                anomalies.push(candidate(
                    format!("stat-{}", sample.date),
                    sample,
                    mean,
                    excursion,
                    CONFIDENCE_CAP,
                    self.name(),
                    vec!["statistical_deviation".to_string()],
                    config,
                ));
            }
        }

        anomalies
    }
}
