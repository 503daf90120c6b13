//! Prometheus metrics for the API server.

use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

/// Initialize the Prometheus metrics recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "vtrim_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "vtrim_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "vtrim_http_requests_in_flight";

    // Upload intake
    pub const UPLOAD_BYTES_TOTAL: &str = "vtrim_upload_bytes_total";
    pub const UPLOADS_REJECTED_TOTAL: &str = "vtrim_uploads_rejected_total";
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

/// Record bytes written for a stored upload.
pub fn record_upload_bytes(bytes: u64) {
    counter!(names::UPLOAD_BYTES_TOTAL).increment(bytes);
}

/// Record an upload turned away before a job was created.
pub fn record_upload_rejected(status: u16) {
    let labels = [("status", status.to_string())];
    counter!(names::UPLOADS_REJECTED_TOTAL, &labels).increment(1);
}

/// Collapse per-resource path segments so label cardinality stays bounded.
fn sanitize_path(path: &str) -> String {
    let mut segments = path.split('/');
    let mut sanitized = Vec::new();
    while let Some(segment) = segments.next() {
        sanitized.push(segment.to_string());
        match segment {
            "jobs" => {
                if segments.next().is_some() {
                    sanitized.push(":job_id".to_string());
                }
            }
            "files" => {
                if segments.next().is_some() {
                    sanitized.push(":filename".to_string());
                }
                break;
            }
            _ => {}
        }
    }
    sanitized.join("/")
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);

    let response = next.run(request).await;

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    let status = response.status().as_u16();
    let duration = start.elapsed().as_secs_f64();

    record_http_request(&method, &path, status, duration);

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_path() {
        assert_eq!(
            sanitize_path("/jobs/550e8400-e29b-41d4-a716-446655440000"),
            "/jobs/:job_id"
        );
        assert_eq!(sanitize_path("/files/Intro-1712-0.mp4"), "/files/:filename");
        assert_eq!(sanitize_path("/files/nested/x.mp4"), "/files/:filename");
        assert_eq!(sanitize_path("/clips"), "/clips");
        assert_eq!(sanitize_path("/process-video"), "/process-video");
    }
}
