//! Cost anomaly detection for metered data-warehouse spend.
//!
//! Runs an ensemble of three pure statistical detectors over a daily
//! cost/usage series, fuses their candidates into at most one anomaly
//! per date, enriches each survivor with root-cause context, and reports
//! a summary plus a forward-looking risk assessment:
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                     DetectionEngine                        │
//! │                                                            │
//! │  ┌───────┐  ┌──────────┐  ┌──────┐  ┌────────┐             │
//! │  │ Fetch │──│ Detect x3│──│ Fuse │──│ Enrich │             │
//! │  └───────┘  └──────────┘  └──────┘  └────────┘             │
//! │                                │                           │
//! │                     ┌──────────▼──────────┐                │
//! │                     │   Summary + Risk    │                │
//! │                     └─────────────────────┘                │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! The engine is stateless per invocation; persistence and delivery
//! belong to the caller, reached through the traits in [`provider`].

pub mod config;
pub mod detector;
pub mod engine;
pub mod enrich;
pub mod fusion;
pub mod insight;
pub mod provider;
pub mod stats;
pub mod types;

// Re-export main types
pub use config::{AnalysisConfig, SensitivityLevel};
pub use engine::{AnalysisRequest, DetectionEngine};
pub use provider::{
    AlertDispatcher, AlertReceipt, BreakdownProvider, CostSeriesProvider, DateBreakdown,
    ProviderError,
};
pub use types::*;
