mod settings;

pub use settings::{
    BroadcastConfig, HeartbeatConfig, LoggingConfig, ServerConfig, Settings, StoreConfig,
    TransportConfig,
};
