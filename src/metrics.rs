//! Prometheus metrics registry and instruments.
//!
//! This module is framework-agnostic and can be used from any layer.

use lazy_static::lazy_static;
use prometheus::{HistogramOpts, IntCounterVec, IntGauge, Opts, Registry};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // HTTP Metrics
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("jackemate_http_requests_total", "Total number of HTTP requests"),
        &["method", "endpoint", "status"]
    ).expect("metric can be created");
    pub static ref HTTP_REQUEST_DURATION_SECONDS: prometheus::HistogramVec = prometheus::HistogramVec::new(
        HistogramOpts::new(
            "jackemate_http_request_duration_seconds",
            "HTTP request duration in seconds"
        ).buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        &["method", "endpoint"]
    ).expect("metric can be created");

    // Database Metrics
    pub static ref DB_QUERIES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("jackemate_db_queries_total", "Total number of database queries"),
        &["operation", "table"]
    ).expect("metric can be created");
    pub static ref DB_QUERY_DURATION_SECONDS: prometheus::HistogramVec = prometheus::HistogramVec::new(
        HistogramOpts::new(
            "jackemate_db_query_duration_seconds",
            "Database query duration in seconds"
        ).buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]),
        &["operation", "table"]
    ).expect("metric can be created");

    // Domain Metrics
    pub static ref REPORTS_TOTAL: IntGauge = IntGauge::new(
        "jackemate_reports_total",
        "Total number of visible reports"
    ).expect("metric can be created");
    pub static ref VOTES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("jackemate_votes_total", "Total number of votes cast"),
        &["kind"]
    ).expect("metric can be created");
    pub static ref COMMENTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("jackemate_comments_total", "Total number of comment operations"),
        &["operation"]
    ).expect("metric can be created");
    pub static ref STATUS_TRANSITIONS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("jackemate_status_transitions_total", "Total number of report status transitions"),
        &["new_status", "trigger"]
    ).expect("metric can be created");
    pub static ref POINTS_DELTAS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("jackemate_points_deltas_total", "Total number of points ledger deltas applied"),
        &["reason"]
    ).expect("metric can be created");

    // Storage/Email Metrics
    pub static ref PHOTO_UPLOADS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("jackemate_photo_uploads_total", "Total number of report photo uploads"),
        &["status"]
    ).expect("metric can be created");
    pub static ref EMAILS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("jackemate_emails_total", "Total number of outbound notification emails"),
        &["kind", "status"]
    ).expect("metric can be created");

    // Application Metrics
    pub static ref USERS_TOTAL: IntGauge = IntGauge::new(
        "jackemate_users_total",
        "Total number of registered users"
    ).expect("metric can be created");

    // Error Metrics
    pub static ref ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("jackemate_errors_total", "Total number of errors"),
        &["error_type", "endpoint"]
    ).expect("metric can be created");
}

/// Initialize metrics registry.
pub fn init_metrics() {
    REGISTRY
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .expect("HTTP_REQUESTS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()))
        .expect("HTTP_REQUEST_DURATION_SECONDS can be registered");
    REGISTRY
        .register(Box::new(DB_QUERIES_TOTAL.clone()))
        .expect("DB_QUERIES_TOTAL can be registered");
    REGISTRY
        .register(Box::new(DB_QUERY_DURATION_SECONDS.clone()))
        .expect("DB_QUERY_DURATION_SECONDS can be registered");
    REGISTRY
        .register(Box::new(REPORTS_TOTAL.clone()))
        .expect("REPORTS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(VOTES_TOTAL.clone()))
        .expect("VOTES_TOTAL can be registered");
    REGISTRY
        .register(Box::new(COMMENTS_TOTAL.clone()))
        .expect("COMMENTS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(STATUS_TRANSITIONS_TOTAL.clone()))
        .expect("STATUS_TRANSITIONS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(POINTS_DELTAS_TOTAL.clone()))
        .expect("POINTS_DELTAS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(PHOTO_UPLOADS_TOTAL.clone()))
        .expect("PHOTO_UPLOADS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(EMAILS_TOTAL.clone()))
        .expect("EMAILS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(USERS_TOTAL.clone()))
        .expect("USERS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(ERRORS_TOTAL.clone()))
        .expect("ERRORS_TOTAL can be registered");

    tracing::info!("Metrics registry initialized");
}
