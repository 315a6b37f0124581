use axum::{
    Router,
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
    routing::get,
};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::{Duration, Instant};
use tracing::warn;

static OBSERVABILITY_ENABLED: OnceLock<bool> = OnceLock::new();

/// `OBSERVABILITY_ENABLED` (default on)
pub fn is_observability_enabled() -> bool {
    *OBSERVABILITY_ENABLED.get_or_init(|| {
        std::env::var("OBSERVABILITY_ENABLED")
            .map(|v| v.to_lowercase() != "false" && v != "0")
            .unwrap_or(true)
    })
}

/// Installs the Prometheus recorder and spawns its upkeep task.
/// Returns `None` when observability is disabled or a recorder is already
/// installed.
pub fn init_metrics() -> Option<PrometheusHandle> {
    if !is_observability_enabled() {
        return None;
    }

    let builder = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("http_request_duration_seconds".to_string()),
            &[
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ],
        )
        .map_err(|e| warn!(error = %e, "Invalid histogram buckets"))
        .ok()?;

    let handle = builder
        .install_recorder()
        .map_err(|e| warn!(error = %e, "Failed to install Prometheus recorder"))
        .ok()?;

    let upkeep_handle = handle.clone();
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(Duration::from_secs(5)).await;
            upkeep_handle.run_upkeep();
        }
    });

    Some(handle)
}

pub async fn metrics_middleware(req: Request, next: Next) -> Response {
    if !is_observability_enabled() {
        return next.run(req).await;
    }

    let start = Instant::now();
    let method = req.method().as_str().to_owned();
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| "unmatched".to_owned());

    gauge!("http_requests_active").increment(1.0);

    let response = next.run(req).await;

    let latency = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    counter!("http_requests_total", "method" => method.clone(), "path" => path.clone(), "status" => status).increment(1);
    histogram!("http_request_duration_seconds", "method" => method, "path" => path).record(latency);

    gauge!("http_requests_active").decrement(1.0);

    response
}

/// Router for the metrics listener
pub fn metrics_app(handle: PrometheusHandle) -> Router {
    Router::new().route("/metrics", get(move || async move { handle.render() }))
}

// Business metrics

pub fn track_login(role: &str, success: bool) {
    if !is_observability_enabled() {
        return;
    }
    let status = if success { "success" } else { "failure" };
    counter!("staff_logins_total", "role" => role.to_string(), "status" => status).increment(1);
}

pub fn track_jwt_issued() {
    if !is_observability_enabled() {
        return;
    }
    counter!("jwt_tokens_issued_total").increment(1);
}

pub fn track_school_created() {
    if !is_observability_enabled() {
        return;
    }
    counter!("schools_created_total").increment(1);
}

pub fn track_staff_created(role: &str) {
    if !is_observability_enabled() {
        return;
    }
    counter!("staff_created_total", "role" => role.to_string()).increment(1);
}

pub fn track_students_promoted(promoted: u64, graduated: u64) {
    if !is_observability_enabled() {
        return;
    }
    counter!("students_promoted_total").increment(promoted);
    counter!("students_graduated_total").increment(graduated);
}

pub fn track_enrollment() {
    if !is_observability_enabled() {
        return;
    }
    counter!("enrollments_total").increment(1);
}

pub fn track_auto_assign(resource: &str, assigned: usize, dry_run: bool) {
    if !is_observability_enabled() {
        return;
    }
    let mode = if dry_run { "dry_run" } else { "applied" };
    counter!("schedule_assignments_total", "resource" => resource.to_string(), "mode" => mode)
        .increment(assigned as u64);
}

pub fn track_attendance_recorded(count: usize) {
    if !is_observability_enabled() {
        return;
    }
    counter!("attendance_records_total").increment(count as u64);
}

pub fn track_incident_reported(severity: &str) {
    if !is_observability_enabled() {
        return;
    }
    counter!("behavior_incidents_total", "severity" => severity.to_string()).increment(1);
}

pub fn track_nurse_visit(disposition: &str) {
    if !is_observability_enabled() {
        return;
    }
    counter!("nurse_visits_total", "disposition" => disposition.to_string()).increment(1);
}

pub fn track_fee_payment(method: &str, amount_cents: i64) {
    if !is_observability_enabled() {
        return;
    }
    counter!("fee_payments_total", "method" => method.to_string()).increment(1);
    counter!("fee_payments_cents_total", "method" => method.to_string())
        .increment(amount_cents.max(0) as u64);
}

pub fn track_meal_transaction(kind: &str, meal_type: Option<&str>) {
    if !is_observability_enabled() {
        return;
    }
    counter!(
        "meal_transactions_total",
        "kind" => kind.to_string(),
        "meal_type" => meal_type.unwrap_or("none").to_string()
    )
    .increment(1);
}

pub fn track_cache_lookup(report: &'static str, hit: bool) {
    if !is_observability_enabled() {
        return;
    }
    let result = if hit { "hit" } else { "miss" };
    counter!("report_cache_lookups_total", "report" => report, "result" => result).increment(1);
}
