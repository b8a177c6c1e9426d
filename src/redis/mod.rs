//! Redis connection handling for the durable connection store.
//!
//! - `RedisPool`: shared multiplexed connection, re-established lazily
//! - `CircuitBreaker`: fails store calls fast while Redis is unreachable

mod circuit_breaker;
mod pool;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use pool::{PoolError, RedisPool};

pub(crate) fn current_time_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
