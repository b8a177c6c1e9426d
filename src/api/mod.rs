//! API layer - HTTP endpoint handlers organized by concern.

mod connection;
mod events;
mod health;
mod metrics;
mod routes;

pub use connection::{list_connections, ConnectionListResponse};
pub use events::{broadcast, connect, direct_reply, disconnect};
pub use health::{health, stats};
pub use metrics::prometheus_metrics;
pub use routes::api_routes;
