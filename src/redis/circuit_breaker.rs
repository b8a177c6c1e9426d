//! Circuit breaker guarding store round-trips to Redis

use std::sync::atomic::{AtomicI64, AtomicU32, AtomicU8, Ordering};

use super::current_time_ms;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CircuitState {
    /// Calls flow through
    Closed = 0,
    /// Calls are rejected without touching Redis
    Open = 1,
    /// Cooldown elapsed, probe calls allowed
    HalfOpen = 2,
}

impl From<u8> for CircuitState {
    fn from(value: u8) -> Self {
        match value {
            1 => CircuitState::Open,
            2 => CircuitState::HalfOpen,
            _ => CircuitState::Closed,
        }
    }
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that open the circuit
    pub failure_threshold: u32,
    /// Successful probes needed to close it again
    pub success_threshold: u32,
    /// How long the circuit stays open before probing (ms)
    pub cooldown_ms: u64,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            cooldown_ms: 10_000,
        }
    }
}

pub struct CircuitBreaker {
    state: AtomicU8,
    consecutive_failures: AtomicU32,
    probe_successes: AtomicU32,
    opened_at_ms: AtomicI64,
    config: CircuitBreakerConfig,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            state: AtomicU8::new(CircuitState::Closed as u8),
            consecutive_failures: AtomicU32::new(0),
            probe_successes: AtomicU32::new(0),
            opened_at_ms: AtomicI64::new(0),
            config,
        }
    }

    /// Current state, moving Open -> HalfOpen once the cooldown has passed
    pub fn state(&self) -> CircuitState {
        let raw = CircuitState::from(self.state.load(Ordering::Acquire));
        if raw != CircuitState::Open {
            return raw;
        }

        let elapsed = current_time_ms() - self.opened_at_ms.load(Ordering::Acquire);
        if elapsed < self.config.cooldown_ms as i64 {
            return CircuitState::Open;
        }

        if self
            .state
            .compare_exchange(
                CircuitState::Open as u8,
                CircuitState::HalfOpen as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
        {
            self.probe_successes.store(0, Ordering::Release);
            tracing::info!("Store circuit half-open, probing Redis");
        }
        CircuitState::from(self.state.load(Ordering::Acquire))
    }

    pub fn allow_request(&self) -> bool {
        self.state() != CircuitState::Open
    }

    pub fn record_success(&self) {
        match CircuitState::from(self.state.load(Ordering::Acquire)) {
            CircuitState::Closed => {
                self.consecutive_failures.store(0, Ordering::Release);
            }
            CircuitState::HalfOpen => {
                let probes = self.probe_successes.fetch_add(1, Ordering::AcqRel) + 1;
                if probes >= self.config.success_threshold {
                    self.consecutive_failures.store(0, Ordering::Release);
                    self.state
                        .store(CircuitState::Closed as u8, Ordering::Release);
                    tracing::info!("Store circuit closed, Redis recovered");
                }
            }
            CircuitState::Open => {}
        }
    }

    pub fn record_failure(&self) {
        match CircuitState::from(self.state.load(Ordering::Acquire)) {
            CircuitState::Closed => {
                let failures = self.consecutive_failures.fetch_add(1, Ordering::AcqRel) + 1;
                if failures >= self.config.failure_threshold {
                    self.open();
                    tracing::warn!(failures, "Store circuit opened");
                }
            }
            CircuitState::HalfOpen => {
                self.open();
                tracing::warn!("Store circuit reopened, probe failed");
            }
            CircuitState::Open => {
                self.opened_at_ms.store(current_time_ms(), Ordering::Release);
            }
        }
    }

    fn open(&self) {
        self.opened_at_ms.store(current_time_ms(), Ordering::Release);
        self.probe_successes.store(0, Ordering::Release);
        self.state.store(CircuitState::Open as u8, Ordering::Release);
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}
