//! Day-of-week seasonal detector.
//!
//! A day with inherently higher traffic (a weekly batch run, say) is
//! judged against its own weekday's history instead of the global mean.

use tracing::debug;

use crate::config::{AnalysisConfig, SensitivityLevel};
use crate::detector::{candidate, dual_threshold, CostDetector};
use crate::stats;
use crate::types::{Anomaly, CostSample};

/// Observations a weekday bucket needs before it gets a baseline.
const MIN_BUCKET_OBSERVATIONS: usize = 2;

/// Confidence cap for seasonal candidates.
const CONFIDENCE_CAP: f64 = 0.8;

/// Lowercase weekday names indexed by day_of_week - 1 (1 = Sunday).
const DAY_NAMES: [&str; 7] = [
    "sunday",
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
];

/// Detector using per-weekday buckets as baselines.
pub struct SeasonalDetector;

impl CostDetector for SeasonalDetector {
    fn name(&self) -> &'static str {
        "seasonal_day_of_week"
    }

    fn detect(
        &self,
        series: &[CostSample],
        config: &AnalysisConfig,
        level: SensitivityLevel,
    ) -> Vec<Anomaly> {
        let mut buckets: [Vec<f64>; 7] = Default::default();
        for sample in series {
            if (1..=7).contains(&sample.day_of_week) {
                buckets[sample.day_of_week as usize - 1].push(sample.cost);
            }
        }

        // A weekday only gets a baseline once it has enough history.
        let baselines: Vec<Option<(f64, f64)>> = buckets
            .iter()
            .map(|costs| {
                if costs.len() >= MIN_BUCKET_OBSERVATIONS {
                    Some((stats::mean(costs), stats::sample_stdev(costs)))
                } else {
                    None
                }
            })
            .collect();

        let thresholds = config.sensitivity.thresholds(level);
        let mut anomalies = Vec::new();

        for sample in series {
            if !(1..=7).contains(&sample.day_of_week) {
                continue;
            }
            let dow = sample.day_of_week as usize - 1;
            let Some((expected, stdev)) = baselines[dow] else {
                continue;
            };
            if expected <= 0.0 {
                continue;
            }

            if let Some(excursion) = dual_threshold(sample.cost, expected, stdev, thresholds) {
                let day_name = DAY_NAMES[dow];
                debug!(
                    date = %sample.date,
                    day = day_name,
                    z_score = excursion.z_score,
                    "weekday baseline excursion"
                );
                anomalies.push(candidate(
                    format!("seasonal-{}-dow{}", sample.date, sample.day_of_week),
                    sample,
                    expected,
                    excursion,
                    CONFIDENCE_CAP,
                    self.name(),
                    vec![format!("unusual_{day_name}_pattern")],
                    config,
                ));
            }
        }

        anomalies
    }
}
