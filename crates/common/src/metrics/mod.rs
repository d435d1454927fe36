//! Metrics and observability utilities
//!
//! Records through the `metrics` facade with standardized naming. Nothing
//! here installs an exporter; without a recorder every call is a no-op.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all Carbonserver metrics
pub const METRICS_PREFIX: &str = "carbonserver";

/// Register all metric descriptions
pub fn register_metrics() {
    // Request metrics
    describe_counter!(
        format!("{}_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of HTTP requests"
    );

    describe_histogram!(
        format!("{}_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "HTTP request latency in seconds"
    );

    // Ingestion metrics
    describe_counter!(
        format!("{}_records_ingested_total", METRICS_PREFIX),
        Unit::Count,
        "Experiments, runs and emissions accepted from agents"
    );

    // Token metrics
    describe_counter!(
        format!("{}_token_verifications_total", METRICS_PREFIX),
        Unit::Count,
        "Project token verifications by outcome"
    );

    describe_counter!(
        format!("{}_tokens_issued_total", METRICS_PREFIX),
        Unit::Count,
        "Project tokens issued"
    );

    // Report metrics
    describe_histogram!(
        format!("{}_report_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Aggregation report latency in seconds"
    );

    // Provisioning metrics
    describe_counter!(
        format!("{}_users_provisioned_total", METRICS_PREFIX),
        Unit::Count,
        "Users created on first login"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record request metrics
pub struct RequestMetrics {
    start: Instant,
    endpoint: String,
    method: String,
}

impl RequestMetrics {
    /// Start tracking a request
    pub fn start(method: &str, endpoint: &str) -> Self {
        Self {
            start: Instant::now(),
            endpoint: endpoint.to_string(),
            method: method.to_string(),
        }
    }

    /// Record request completion
    pub fn finish(self, status: u16) {
        let duration = self.start.elapsed().as_secs_f64();

        counter!(
            format!("{}_requests_total", METRICS_PREFIX),
            "method" => self.method.clone(),
            "endpoint" => self.endpoint.clone(),
            "status" => status.to_string()
        )
        .increment(1);

        histogram!(
            format!("{}_request_duration_seconds", METRICS_PREFIX),
            "method" => self.method,
            "endpoint" => self.endpoint
        )
        .record(duration);
    }
}

/// Record one accepted ingestion record (`experiment`, `run` or `emission`)
pub fn record_ingestion(kind: &'static str) {
    counter!(
        format!("{}_records_ingested_total", METRICS_PREFIX),
        "kind" => kind
    )
    .increment(1);
}

/// Record the outcome of a project token verification
pub fn record_token_verification(outcome: &'static str) {
    counter!(
        format!("{}_token_verifications_total", METRICS_PREFIX),
        "outcome" => outcome
    )
    .increment(1);
}

/// Record a freshly issued project token
pub fn record_token_issued() {
    counter!(format!("{}_tokens_issued_total", METRICS_PREFIX)).increment(1);
}

/// Record a user created on first login
pub fn record_user_provisioned() {
    counter!(format!("{}_users_provisioned_total", METRICS_PREFIX)).increment(1);
}

/// Helper to time a report query
pub struct ReportTimer {
    start: Instant,
    report: &'static str,
}

impl ReportTimer {
    pub fn start(report: &'static str) -> Self {
        Self {
            start: Instant::now(),
            report,
        }
    }

    pub fn finish(self) {
        histogram!(
            format!("{}_report_duration_seconds", METRICS_PREFIX),
            "report" => self.report
        )
        .record(self.start.elapsed().as_secs_f64());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder() {
        register_metrics();
        let metrics = RequestMetrics::start("POST", "/emissions");
        metrics.finish(201);
        record_ingestion("emission");
        record_token_verification("accepted");
        ReportTimer::start("project_sums").finish();
    }
}
