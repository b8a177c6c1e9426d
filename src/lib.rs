// Shared infrastructure
pub mod config;
pub mod error;
pub mod metrics;
pub mod redis;

// Core relay components, leaves first
pub mod store;
pub mod registry;
pub mod transport;
pub mod dispatcher;
pub mod broadcast;
pub mod router;

// Application layer
pub mod api;
pub mod server;
pub mod websocket;

// Supporting modules
pub mod tasks;
