//! Application metrics for Prometheus monitoring.
//!
//! This module provides:
//! - Prometheus metrics recorder initialization
//! - Job lifecycle metric definitions
//! - Helper functions for recording metrics

use std::sync::OnceLock;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use slidegen_core::{JobKind, JobStatus};

/// Global Prometheus handle for rendering metrics.
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the Prometheus metrics recorder.
///
/// This should be called once at application startup, before any metrics are recorded.
/// Returns `true` if initialization succeeded, `false` if already initialized.
pub fn init_metrics() -> bool {
    if PROMETHEUS_HANDLE.get().is_some() {
        return false;
    }

    let recorder = PrometheusBuilder::new().build_recorder();
    let handle = recorder.handle();

    if metrics::set_global_recorder(recorder).is_err() {
        tracing::warn!("Failed to set global metrics recorder (already set)");
        return false;
    }

    if PROMETHEUS_HANDLE.set(handle).is_err() {
        tracing::warn!("Failed to store Prometheus handle (already set)");
    }

    describe_metrics();

    tracing::info!("Prometheus metrics initialized");
    true
}

fn describe_metrics() {
    describe_counter!("jobs_submitted_total", "Jobs handed to the scheduler, by kind");
    describe_counter!(
        "jobs_finished_total",
        "Jobs that reached a terminal status inside their body, by kind and status"
    );
    describe_counter!(
        "jobs_orphaned_total",
        "Jobs failed on poll because no worker held them"
    );
    describe_histogram!(
        "job_duration_seconds",
        "Wall time from job start to its terminal write"
    );
    describe_gauge!("jobs_active", "Jobs queued or running in the scheduler");
}

/// Render current metrics in Prometheus text format.
///
/// Returns `None` if metrics are not initialized.
pub fn render_metrics() -> Option<String> {
    PROMETHEUS_HANDLE.get().map(|h| h.render())
}

pub fn record_job_submitted(kind: JobKind, active: usize) {
    counter!("jobs_submitted_total", "kind" => kind.as_db_str()).increment(1);
    gauge!("jobs_active").set(active as f64);
}

/// Record a job body reaching `status`.
pub fn record_job_finished(kind: JobKind, status: JobStatus, duration: Duration) {
    counter!("jobs_finished_total", "kind" => kind.as_db_str(), "status" => status.as_db_str())
        .increment(1);
    histogram!("job_duration_seconds", "kind" => kind.as_db_str()).record(duration.as_secs_f64());
}

pub fn record_job_orphaned(kind: JobKind) {
    counter!("jobs_orphaned_total", "kind" => kind.as_db_str()).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder_is_a_no_op() {
        record_job_submitted(JobKind::GenerateImages, 1);
        record_job_finished(JobKind::GenerateImages, JobStatus::Completed, Duration::from_millis(5));
        record_job_orphaned(JobKind::ExportPptx);
    }

    #[test]
    fn test_render_after_init() {
        if init_metrics() {
            record_job_orphaned(JobKind::ExportPptx);
            let output = render_metrics().unwrap();
            assert!(output.contains("jobs_orphaned_total"));
        }
    }
}
