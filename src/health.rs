//! The liveness probe.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use serde_json::json;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use crate::AppState;

/// The state needed for the health check endpoint.
#[derive(Debug, Clone)]
pub struct HealthState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for HealthState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Report whether the application and its database are reachable.
///
/// Returns 200 with `"status": "healthy"` when a trivial query succeeds, and
/// 500 with `"status": "unhealthy"` otherwise.
pub async fn get_health(State(state): State<HealthState>) -> Response {
    let database_ok = match state.db_connection.lock() {
        Ok(connection) => connection
            .query_row("SELECT 1", (), |row| row.get::<_, i64>(0))
            .is_ok(),
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            false
        }
    };

    let timestamp = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default();

    let (status_code, status) = if database_ok {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::INTERNAL_SERVER_ERROR, "unhealthy")
    };

    (
        status_code,
        Json(json!({
            "status": status,
            "timestamp": timestamp,
            "version": env!("CARGO_PKG_VERSION"),
        })),
    )
        .into_response()
}
