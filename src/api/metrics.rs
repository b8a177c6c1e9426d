//! Prometheus metrics endpoint.

use axum::{extract::State, http::StatusCode, response::IntoResponse};

use crate::metrics;
use crate::redis::CircuitState;
use crate::server::AppState;

/// GET /metrics - Prometheus metrics endpoint
pub async fn prometheus_metrics(State(state): State<AppState>) -> impl IntoResponse {
    update_metrics_from_state(&state).await;

    match metrics::encode_metrics() {
        Ok(output) => (
            StatusCode::OK,
            [(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
            output,
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode Prometheus metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(axum::http::header::CONTENT_TYPE, "text/plain")],
                format!("Failed to encode metrics: {}", e),
            )
        }
    }
}

/// Refresh scrape-time gauges from AppState
async fn update_metrics_from_state(state: &AppState) {
    match state.registry.count().await {
        Ok(count) => metrics::CONNECTIONS_REGISTERED.set(count as i64),
        Err(e) => tracing::debug!(error = %e, "Skipping registered connections gauge"),
    }

    if let Some(local) = &state.local_transport {
        metrics::SOCKETS_ATTACHED.set(local.attached_count() as i64);
    }

    if let Some(pool) = &state.redis_pool {
        let cb_state = match pool.circuit_state() {
            CircuitState::Closed => 0,
            CircuitState::Open => 1,
            CircuitState::HalfOpen => 2,
        };
        metrics::STORE_CIRCUIT_STATE.set(cb_state);
    }
}
