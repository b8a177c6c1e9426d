use axum::{
    routing::{get, post},
    Router,
};

use crate::server::AppState;

use super::connection::list_connections;
use super::events::{broadcast, connect, direct_reply, disconnect};
use super::health::{health, stats};
use super::metrics::prometheus_metrics;

pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health & Stats
        .route("/health", get(health))
        .route("/stats", get(stats))
        .route("/metrics", get(prometheus_metrics))
        .nest(
            "/api/v1",
            Router::new()
                // Lifecycle events
                .route("/events/connect", post(connect))
                .route("/events/disconnect", post(disconnect))
                // Relay
                .route("/relay/reply", post(direct_reply))
                .route("/relay/broadcast", post(broadcast))
                .route("/connections", get(list_connections)),
        )
}
