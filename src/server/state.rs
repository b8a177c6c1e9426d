use std::sync::Arc;
use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::broadcast::Broadcaster;
use crate::config::Settings;
use crate::dispatcher::Dispatcher;
use crate::error::{AppError, Result};
use crate::redis::{CircuitBreaker, CircuitBreakerConfig, RedisPool};
use crate::registry::Registry;
use crate::router::InboundRouter;
use crate::store::{create_connection_store, ConnectionStore, ScopedConnectionStore};
use crate::transport::{create_transport, LocalTransport, Transport};

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub registry: Registry,
    pub dispatcher: Arc<Dispatcher>,
    pub broadcaster: Arc<Broadcaster>,
    pub router: InboundRouter,
    /// Socket table behind `/ws`; `None` when an external gateway owns the sockets
    pub local_transport: Option<Arc<LocalTransport>>,
    pub redis_pool: Option<Arc<RedisPool>>,
    pub start_time: Instant,
}

impl AppState {
    /// Build the full component graph from configuration
    pub fn new(settings: Settings) -> Result<Self> {
        let redis_pool = if settings.store.backend == "redis" {
            let circuit_breaker = Arc::new(CircuitBreaker::new(CircuitBreakerConfig::default()));
            let pool = RedisPool::new(&settings.store.redis_url, circuit_breaker)
                .map_err(|e| AppError::Internal(e.to_string()))?;
            Some(Arc::new(pool))
        } else {
            None
        };

        let local = Arc::new(LocalTransport::new(settings.transport.channel_buffer));
        let transport = create_transport(&settings.transport, local.clone())?;
        let local_transport = (transport.name() == "local").then_some(local);

        let mut store = create_connection_store(&settings.store, redis_pool.clone());
        // Other instances share the Redis store but not our socket table
        if redis_pool.is_some() && local_transport.is_some() {
            let scope = instance_scope(settings.store.instance_id.as_deref())?;
            tracing::info!(scope = %scope, "Scoping connection store to this instance");
            store = Arc::new(ScopedConnectionStore::new(store, &scope));
        }

        let mut state = Self::with_components(settings, store, transport);
        state.local_transport = local_transport;
        state.redis_pool = redis_pool;
        Ok(state)
    }

    /// Wire a state around an explicit store and transport
    pub fn with_components(
        settings: Settings,
        store: Arc<dyn ConnectionStore>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let registry = Registry::new(store);
        let dispatcher = Arc::new(Dispatcher::new(
            transport,
            Duration::from_millis(settings.transport.send_timeout_ms),
        ));
        let broadcaster = Arc::new(Broadcaster::new(
            registry.clone(),
            dispatcher.clone(),
            settings.broadcast.max_concurrent_sends,
        ));
        let router = InboundRouter::new(
            registry.clone(),
            dispatcher.clone(),
            broadcaster.clone(),
            settings.broadcast.default_message.clone(),
        );

        Self {
            settings: Arc::new(settings),
            registry,
            dispatcher,
            broadcaster,
            router,
            local_transport: None,
            redis_pool: None,
            start_time: Instant::now(),
        }
    }
}

/// Configured instance id, or a fresh one for this run
fn instance_scope(configured: Option<&str>) -> Result<String> {
    match configured.map(str::trim) {
        Some(id) if id.is_empty() || id.contains(':') => Err(AppError::Validation(format!(
            "store.instance_id must be non-empty and must not contain ':': {:?}",
            id
        ))),
        Some(id) => Ok(id.to_string()),
        None => Ok(Uuid::new_v4().to_string()),
    }
}
