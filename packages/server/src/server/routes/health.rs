use std::time::Duration;

use axum::{extract::Extension, http::StatusCode, Json};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::warn;

use crate::kernel::jobs::WorkerHeartbeat;
use crate::server::app::AppState;

/// A worker counts as alive if it checked in within this window.
pub const WORKER_HEARTBEAT_WINDOW_SECS: i64 = 30;

const DB_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    pub database: bool,
    pub workers: bool,
    pub status: &'static str,
}

/// GET /
pub async fn root_handler() -> Json<Value> {
    Json(json!({ "ok": true, "service": "ai-course-builder-api" }))
}

/// GET /health and GET /system/healthz
///
/// Liveness only: the process is up and serving requests.
pub async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// GET /system/readyz
///
/// Checks:
/// - Database connectivity (`SELECT 1` within 5s)
/// - At least one job worker heartbeat in the last 30s
///
/// Returns 200 OK when both pass, 503 Service Unavailable otherwise.
pub async fn readiness_handler(
    Extension(state): Extension<AppState>,
) -> (StatusCode, Json<ReadinessResponse>) {
    let database = match tokio::time::timeout(
        DB_CHECK_TIMEOUT,
        sqlx::query("SELECT 1").execute(&state.db_pool),
    )
    .await
    {
        Ok(Ok(_)) => true,
        Ok(Err(e)) => {
            warn!(error = %e, "readiness database check failed");
            false
        }
        Err(_) => {
            warn!("readiness database check timed out");
            false
        }
    };

    let workers = database
        && match WorkerHeartbeat::find_recent(WORKER_HEARTBEAT_WINDOW_SECS, &state.db_pool).await {
            Ok(heartbeats) => !heartbeats.is_empty(),
            Err(e) => {
                warn!(error = %e, "readiness worker check failed");
                false
            }
        };

    let ready = database && workers;
    let status_code = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status_code,
        Json(ReadinessResponse {
            database,
            workers,
            status: if ready { "ok" } else { "unavailable" },
        }),
    )
}
