//! API layer
//!
//! HTTP handlers for:
//! - Reports, votes, comments, history
//! - Admin status changes
//! - Statistics dashboards
//! - Metrics (Prometheus)

mod admin;
mod dto;
pub mod metrics;
mod reports;
mod stats;

pub use dto::*;

pub use admin::admin_router;
pub use metrics::metrics_router;
pub use reports::reports_router;
pub use stats::stats_router;
