//! The detection engine - one stateless pass per request.
//!
//! Validate, fetch the series, run the detector ensemble, fuse the
//! candidates, enrich each survivor, summarize, project risk, and
//! optionally dispatch alerts. Nothing is retained between invocations.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{AnalysisConfig, SensitivityLevel};
use crate::detector::{
    CostDetector, GlobalZScoreDetector, RollingWindowDetector, SeasonalDetector,
};
use crate::enrich::Enricher;
use crate::fusion;
use crate::insight;
use crate::provider::{AlertDispatcher, BreakdownProvider, CostSeriesProvider};
use crate::stats;
use crate::types::{
    AlertOutcome, AnalysisMetadata, Anomaly, CostSample, DetectionFailure, DetectionReport,
    DetectionResponse, EngineError, Result, Severity,
};

/// Default minimum fractional deviation for reporting.
pub const DEFAULT_ALERT_THRESHOLD: f64 = 0.25;

/// Parameters for one detection request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRequest {
    /// Billing source identifier, passed through to the series provider
    pub source: String,
    /// Lookback window in days
    pub days: u32,
    /// "low", "medium", or "high"
    #[serde(default = "default_sensitivity")]
    pub sensitivity: String,
    /// Minimum fractional deviation for an anomaly to be reported
    #[serde(default = "default_alert_threshold")]
    pub alert_threshold: f64,
    /// Hand results to the alert dispatcher when anomalies are found
    #[serde(default)]
    pub dispatch_alerts: bool,
}

fn default_sensitivity() -> String {
    SensitivityLevel::Medium.as_str().to_string()
}

fn default_alert_threshold() -> f64 {
    DEFAULT_ALERT_THRESHOLD
}

impl AnalysisRequest {
    /// Create a request with default sensitivity and threshold.
    pub fn new(source: impl Into<String>, days: u32) -> Self {
        Self {
            source: source.into(),
            days,
            sensitivity: default_sensitivity(),
            alert_threshold: DEFAULT_ALERT_THRESHOLD,
            dispatch_alerts: false,
        }
    }

    /// Set the sensitivity level.
    pub fn with_sensitivity(mut self, sensitivity: impl Into<String>) -> Self {
        self.sensitivity = sensitivity.into();
        self
    }

    /// Set the alert threshold.
    pub fn with_alert_threshold(mut self, alert_threshold: f64) -> Self {
        self.alert_threshold = alert_threshold;
        self
    }

    /// Request alert dispatch for detected anomalies.
    pub fn with_dispatch(mut self) -> Self {
        self.dispatch_alerts = true;
        self
    }
}

/// The cost anomaly detection engine.
///
/// Holds the provider seams and the policy configuration; each call to
/// [`DetectionEngine::detect`] is an independent pass over a freshly
/// fetched series.
pub struct DetectionEngine {
    config: AnalysisConfig,
    series_provider: Arc<dyn CostSeriesProvider>,
    breakdown_provider: Arc<dyn BreakdownProvider>,
    dispatcher: Option<Arc<dyn AlertDispatcher>>,
    detectors: Vec<Box<dyn CostDetector>>,
}

impl DetectionEngine {
    /// Create an engine with default configuration.
    pub fn new(
        series_provider: Arc<dyn CostSeriesProvider>,
        breakdown_provider: Arc<dyn BreakdownProvider>,
    ) -> Self {
        Self {
            config: AnalysisConfig::default(),
            series_provider,
            breakdown_provider,
            dispatcher: None,
            detectors: vec![
                Box::new(GlobalZScoreDetector),
                Box::new(RollingWindowDetector),
                Box::new(SeasonalDetector),
            ],
        }
    }

    /// Replace the policy configuration.
    pub fn with_config(mut self, config: AnalysisConfig) -> Self {
        self.config = config;
        self
    }

    /// Attach an alert dispatcher.
    pub fn with_dispatcher(mut self, dispatcher: Arc<dyn AlertDispatcher>) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    /// Run detection, returning the uniform serializable envelope.
    ///
    /// Top-level failures are mapped into the envelope instead of
    /// propagating past the engine boundary.
    pub async fn run(&self, request: &AnalysisRequest) -> DetectionResponse {
        match self.detect(request).await {
            Ok(report) => DetectionResponse::Completed(report),
            Err(error) => {
                warn!(%error, "cost anomaly detection failed");
                DetectionResponse::Failed(DetectionFailure::from_error(&error))
            }
        }
    }

    /// Run detection, propagating engine errors to the caller.
    pub async fn detect(&self, request: &AnalysisRequest) -> Result<DetectionReport> {
        let level = self.validate(request)?;

        info!(
            source = %request.source,
            days = request.days,
            sensitivity = level.as_str(),
            "starting cost anomaly detection"
        );

        let series = self
            .series_provider
            .fetch_daily_costs(&request.source, request.days)
            .await?;

        let minimum = self.config.lookback.min_samples;
        if series.len() < minimum {
            return Err(EngineError::InsufficientData {
                available: series.len(),
                minimum,
            });
        }

        // Every detector scans the same immutable series.
        let mut candidates = Vec::new();
        for detector in &self.detectors {
            let found = detector.detect(&series, &self.config, level);
            debug!(
                detector = detector.name(),
                candidates = found.len(),
                "detector pass complete"
            );
            candidates.extend(found);
        }

        let anomalies = fusion::filter_and_merge(candidates, request.alert_threshold);
        let anomalies = self.enrich_all(anomalies, &series).await;

        let summary = insight::summarize(&anomalies, &series);
        let risk_assessment = insight::project_risk(&series, &anomalies, &self.config.risk);

        let alert_outcome = if request.dispatch_alerts && !anomalies.is_empty() {
            self.dispatch_alerts(&anomalies, &summary.severity_breakdown)
                .await
        } else {
            None
        };

        info!(
            anomalies = anomalies.len(),
            "cost anomaly detection completed"
        );

        Ok(DetectionReport {
            success: true,
            anomalies_detected: anomalies,
            summary,
            risk_assessment,
            analysis_metadata: AnalysisMetadata {
                analysis_period_days: request.days,
                sensitivity: level,
                alert_threshold: request.alert_threshold,
                detection_methods: self
                    .detectors
                    .iter()
                    .map(|d| d.name().to_string())
                    .collect(),
                total_data_points: series.len(),
                analyzed_at: Utc::now(),
            },
            alert_outcome,
        })
    }

    /// Reject bad parameters before any fetch or computation.
    fn validate(&self, request: &AnalysisRequest) -> Result<SensitivityLevel> {
        let limits = &self.config.lookback;
        if request.days < limits.min_days || request.days > limits.max_days {
            return Err(EngineError::Validation(format!(
                "days must be between {} and {} (got {})",
                limits.min_days, limits.max_days, request.days
            )));
        }
        request
            .sensitivity
            .parse::<SensitivityLevel>()
            .map_err(|error| EngineError::Validation(error.to_string()))
    }

    /// Enrich every anomaly concurrently.
    ///
    /// Each lookup is isolated: a failure or timeout degrades only its
    /// own anomaly to the generic fallback. Output order is preserved.
    async fn enrich_all(&self, anomalies: Vec<Anomaly>, series: &[CostSample]) -> Vec<Anomaly> {
        if anomalies.is_empty() {
            return anomalies;
        }

        let query_counts: Vec<f64> = series.iter().map(|s| s.query_count as f64).collect();
        let enricher = Enricher::new(
            Arc::clone(&self.breakdown_provider),
            self.config.enrichment,
            stats::mean(&query_counts),
        );
        let timeout = Duration::from_millis(self.config.enrichment_timeout_ms);

        join_all(anomalies.into_iter().map(|mut anomaly| {
            let enricher = enricher.clone();
            async move {
                match tokio::time::timeout(timeout, enricher.lookup(anomaly.date)).await {
                    Ok(breakdown) => enricher.apply(&mut anomaly, breakdown.as_ref()),
                    Err(_) => {
                        warn!(
                            date = %anomaly.date,
                            "breakdown lookup timed out; using fallback remediation"
                        );
                        enricher.apply(&mut anomaly, None);
                    }
                }
                anomaly
            }
        }))
        .await
    }

    /// Hand the result to the dispatcher, degrading failure to a
    /// secondary status.
    async fn dispatch_alerts(
        &self,
        anomalies: &[Anomaly],
        severity_breakdown: &BTreeMap<Severity, usize>,
    ) -> Option<AlertOutcome> {
        let Some(dispatcher) = self.dispatcher.as_ref() else {
            debug!("alert dispatch requested but no dispatcher configured");
            return None;
        };

        match dispatcher.dispatch(anomalies, severity_breakdown).await {
            Ok(receipt) => {
                info!(alerts = receipt.alerts_sent, "anomaly alerts dispatched");
                Some(AlertOutcome::Sent(receipt))
            }
            Err(error) => {
                warn!(%error, "alert dispatch failed; detection result is unaffected");
                Some(AlertOutcome::Failed {
                    error: error.to_string(),
                })
            }
        }
    }
}
