//! Health check and statistics endpoints.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::broadcast::BroadcastStatsSnapshot;
use crate::dispatcher::DispatcherStatsSnapshot;
use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub store: StoreHealthResponse,
    pub transport: String,
}

#[derive(Debug, Serialize)]
pub struct StoreHealthResponse {
    pub backend: String,
    pub reachable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub circuit_breaker_state: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub connections: ConnectionStats,
    pub deliveries: DispatcherStatsSnapshot,
    pub broadcasts: BroadcastStatsSnapshot,
}

#[derive(Debug, Serialize)]
pub struct ConnectionStats {
    /// `None` when the store could not be read
    pub registered: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attached_sockets: Option<usize>,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let check = match &state.redis_pool {
        Some(pool) => pool.ping().await.map_err(|e| e.to_string()),
        None => state.registry.count().await.map(|_| ()).map_err(|e| e.to_string()),
    };
    let reachable = match check {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Health check could not reach the store");
            false
        }
    };

    let circuit_breaker_state = state
        .redis_pool
        .as_ref()
        .map(|pool| pool.circuit_state().as_str().to_string());

    let status = if reachable { "healthy" } else { "degraded" };

    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        store: StoreHealthResponse {
            backend: state.registry.backend_name().to_string(),
            reachable,
            circuit_breaker_state,
        },
        transport: state.dispatcher.transport_name().to_string(),
    })
}

pub async fn stats(State(state): State<AppState>) -> Json<StatsResponse> {
    let registered = state.registry.count().await.ok();
    let attached_sockets = state
        .local_transport
        .as_ref()
        .map(|local| local.attached_count());

    Json(StatsResponse {
        connections: ConnectionStats {
            registered,
            attached_sockets,
        },
        deliveries: state.dispatcher.stats(),
        broadcasts: state.broadcaster.stats(),
    })
}
