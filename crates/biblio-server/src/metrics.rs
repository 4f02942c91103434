// Prometheus metrics for the lending service
// Counters are recorded in biblio-lock and biblio-lending; this module installs the
// recorder and describes them.

use std::sync::OnceLock;

use actix_web::{HttpResponse, get};
use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn describe_metrics() {
    // Lock metrics
    describe_counter!("lock_acquisitions_total", "Total number of locks acquired");
    describe_counter!(
        "lock_contended_attempts_total",
        "Acquisition attempts that found the lock already held"
    );
    describe_counter!(
        "lock_acquire_timeouts_total",
        "Acquisitions that gave up after the wait bound"
    );
    describe_counter!("lock_releases_total", "Total number of locks released");
    describe_counter!(
        "lock_not_owner_releases_total",
        "Releases that found the lock expired or owned by another holder"
    );

    // Lending metrics
    describe_counter!(
        "lending_transitions_total",
        "Borrow and return transitions by operation and outcome"
    );
    describe_histogram!(
        "lending_transition_duration_seconds",
        "Borrow and return duration in seconds, lock wait included"
    );

    // Cache metrics
    describe_counter!("cache_lookups_total", "Read cache lookups by cache and result");
}

/// Install the global Prometheus recorder.
///
/// Calling it again returns the already installed handle.
pub fn init_metrics() -> anyhow::Result<PrometheusHandle> {
    if let Some(handle) = PROMETHEUS_HANDLE.get() {
        return Ok(handle.clone());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    describe_metrics();

    let handle = PROMETHEUS_HANDLE.get_or_init(|| handle).clone();
    tracing::info!("Prometheus metrics recorder initialized");
    Ok(handle)
}

pub fn prometheus_handle() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get().cloned()
}

#[get("/metrics")]
pub async fn serve_metrics() -> HttpResponse {
    match prometheus_handle() {
        Some(handle) => HttpResponse::Ok()
            .content_type("text/plain; version=0.0.4; charset=utf-8")
            .body(handle.render()),
        None => HttpResponse::ServiceUnavailable()
            .content_type("text/plain; charset=utf-8")
            .body("Metrics not initialized"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_metrics_is_idempotent() {
        let first = init_metrics().unwrap();
        let second = init_metrics().unwrap();

        metrics::counter!("lock_acquisitions_total").increment(1);

        assert!(prometheus_handle().is_some());
        assert!(first.render().contains("lock_acquisitions_total"));
        assert!(second.render().contains("lock_acquisitions_total"));
    }
}
