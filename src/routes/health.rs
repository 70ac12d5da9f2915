use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;
use sqlx::SqlitePool;

/// GET /health - Liveness probe
pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({"status": "ok"})))
}

/// GET /ready - Readiness probe
///
/// Ready once the database answers and the meal plan table is migrated.
pub async fn ready(State(pool): State<SqlitePool>) -> impl IntoResponse {
    let schema: Result<Option<(i64,)>, _> =
        sqlx::query_as("SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?")
            .bind("meal_plan_week")
            .fetch_optional(&pool)
            .await;

    let reason = match schema {
        Ok(Some(_)) => return (StatusCode::OK, Json(json!({"status": "ready"}))),
        Ok(None) => {
            tracing::warn!("Readiness check failed: migrations not applied");
            "schema_missing"
        }
        Err(e) => {
            tracing::error!("Readiness check failed: database unavailable - {}", e);
            "database_unavailable"
        }
    };

    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({
            "status": "not_ready",
            "reason": reason
        })),
    )
}
