//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Router dispatch / SubmissionStore produce:
//!     → stats.rs (per-route count + average, served at /stats)
//!     → metrics.rs (counters, gauges, histograms for Prometheus)
//!     → logging.rs (structured tracing events)
//! ```
//!
//! # Design Decisions
//! - `/stats` is part of the HTTP contract; Prometheus metrics are optional
//! - Metric updates are cheap no-ops until a recorder is installed

pub mod logging;
pub mod metrics;
pub mod stats;

pub use stats::{StatSummary, StatsTracker};
