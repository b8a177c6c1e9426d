//! Connection listing endpoint.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::error::Result;
use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct ConnectionListResponse {
    pub connections: Vec<String>,
    pub total: usize,
}

/// GET /api/v1/connections - Snapshot of registered connection ids
pub async fn list_connections(
    State(state): State<AppState>,
) -> Result<Json<ConnectionListResponse>> {
    let mut connections = state.registry.list_all().await?;
    connections.sort_unstable();
    let total = connections.len();

    Ok(Json(ConnectionListResponse { connections, total }))
}
