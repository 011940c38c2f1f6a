//! Prometheus metrics for the API server.

use std::sync::OnceLock;
use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use regex_lite::Regex;

/// Initialize the Prometheus metrics recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "grabq_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "grabq_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "grabq_http_requests_in_flight";

    // Queue metrics
    pub const JOBS_SUBMITTED_TOTAL: &str = "grabq_jobs_submitted_total";
    pub const QUEUE_DEPTH: &str = "grabq_queue_depth";
    pub const SUBMISSIONS_REJECTED_TOTAL: &str = "grabq_submissions_rejected_total";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record an accepted submission.
pub fn record_job_submitted(mode: &str) {
    let labels = [("mode", mode.to_string())];
    counter!(names::JOBS_SUBMITTED_TOTAL, &labels).increment(1);
}

/// Record a submission refused at validation.
pub fn record_submission_rejected() {
    counter!(names::SUBMISSIONS_REJECTED_TOTAL).increment(1);
}

/// Update queue depth gauge.
pub fn set_queue_depth(depth: usize) {
    gauge!(names::QUEUE_DEPTH).set(depth as f64);
}

/// Sanitize path for metrics labels.
fn sanitize_path(path: &str) -> String {
    static TASK_ID: OnceLock<Regex> = OnceLock::new();
    let re = TASK_ID.get_or_init(|| Regex::new(r"^/task_status/[^/]+").expect("valid regex"));
    re.replace(path, "/task_status/:id").to_string()
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);
    let response = next.run(request).await;
    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    record_http_request(&method, &path, response.status().as_u16(), start.elapsed().as_secs_f64());

    response
}
