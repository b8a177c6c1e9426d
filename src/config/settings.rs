use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub transport: TransportConfig,
    #[serde(default)]
    pub broadcast: BroadcastConfig,
    #[serde(default)]
    pub heartbeat: HeartbeatConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

/// Where connection records live
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// "memory" or "redis"
    #[serde(default = "default_store_backend")]
    pub backend: String,
    #[serde(default = "default_redis_url")]
    pub redis_url: String,
    /// Key prefix for connection records in Redis
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
    /// COUNT hint passed to SCAN
    #[serde(default = "default_scan_count")]
    pub scan_count: usize,
    /// Scope for this instance's records in a shared store. Random per run
    /// when unset; set it to a stable name so a restart prunes its own leftovers.
    #[serde(default)]
    pub instance_id: Option<String>,
}

/// How payloads reach a connection
#[derive(Debug, Clone, Deserialize)]
pub struct TransportConfig {
    /// "local" (sockets terminated by this process) or "http" (management API)
    #[serde(default = "default_transport_backend")]
    pub backend: String,
    /// Management API base URL (host + stage), required for the http backend
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default = "default_send_timeout_ms")]
    pub send_timeout_ms: u64,
    /// Outbound buffer per local socket
    #[serde(default = "default_channel_buffer")]
    pub channel_buffer: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BroadcastConfig {
    #[serde(default = "default_max_concurrent_sends")]
    pub max_concurrent_sends: usize,
    /// Used when a broadcast request carries an empty message
    #[serde(default = "default_broadcast_message")]
    pub default_message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HeartbeatConfig {
    #[serde(default = "default_heartbeat_enabled")]
    pub enabled: bool,
    /// Heartbeat interval in seconds
    #[serde(default = "default_heartbeat_interval")]
    pub interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// "pretty" or "json"
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8081
}

fn default_store_backend() -> String {
    "memory".to_string()
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_key_prefix() -> String {
    "relay".to_string()
}

fn default_scan_count() -> usize {
    100
}

fn default_transport_backend() -> String {
    "local".to_string()
}

fn default_send_timeout_ms() -> u64 {
    5000
}

fn default_channel_buffer() -> usize {
    32
}

fn default_max_concurrent_sends() -> usize {
    100
}

fn default_broadcast_message() -> String {
    "Hello from the relay".to_string()
}

fn default_heartbeat_enabled() -> bool {
    true
}

fn default_heartbeat_interval() -> u64 {
    30 // 30 seconds
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        // Load .env file if exists
        let _ = dotenvy::dotenv();

        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Config::builder()
            .set_default("server.host", default_host())?
            .set_default("server.port", i64::from(default_port()))?
            .set_default("store.backend", default_store_backend())?
            .set_default("transport.backend", default_transport_backend())?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // RELAY__SERVER__PORT, RELAY__STORE__BACKEND, RELAY__TRANSPORT__ENDPOINT, ...
            .add_source(
                Environment::with_prefix("RELAY")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("server.cors_origins"),
            );

        builder.build()?.try_deserialize()
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: vec![],
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
            redis_url: default_redis_url(),
            key_prefix: default_key_prefix(),
            scan_count: default_scan_count(),
            instance_id: None,
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            backend: default_transport_backend(),
            endpoint: None,
            send_timeout_ms: default_send_timeout_ms(),
            channel_buffer: default_channel_buffer(),
        }
    }
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            max_concurrent_sends: default_max_concurrent_sends(),
            default_message: default_broadcast_message(),
        }
    }
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            enabled: default_heartbeat_enabled(),
            interval_secs: default_heartbeat_interval(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: default_log_format(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let settings = Settings::default();
        assert_eq!(settings.server.host, "0.0.0.0");
        assert_eq!(settings.server.port, 8081);
        assert_eq!(settings.store.backend, "memory");
        assert_eq!(settings.transport.backend, "local");
        assert!(settings.transport.endpoint.is_none());
        assert_eq!(settings.broadcast.max_concurrent_sends, 100);
        assert!(settings.heartbeat.enabled);
    }

    #[test]
    fn test_server_addr() {
        let settings = Settings::default();
        assert_eq!(settings.server_addr(), "0.0.0.0:8081");
    }

    #[test]
    fn test_partial_deserialize_fills_defaults() {
        let raw = r#"{
            "store": {"backend": "redis"},
            "transport": {"endpoint": "https://gw.example/prod"}
        }"#;
        let settings: Settings = serde_json::from_str(raw).unwrap();
        assert_eq!(settings.store.backend, "redis");
        assert_eq!(settings.store.key_prefix, "relay");
        assert_eq!(settings.transport.backend, "local");
        assert_eq!(
            settings.transport.endpoint.as_deref(),
            Some("https://gw.example/prod")
        );
        assert_eq!(settings.transport.send_timeout_ms, 5000);
    }
}
