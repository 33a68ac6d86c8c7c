use anyhow::{Context, Result};
use clap::Parser;
use lib_inventory::core::channel::DEFAULT_CAPACITY;
use lib_inventory::ingestors::IngestionConfig;
use lib_inventory::retrieve::ApiClientOptions;
use lib_inventory::sync::SyncAgentConfig;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Options layered as defaults, then the JSON config file, then env/CLI.
pub trait Layered: Parser + DeserializeOwned + Sized {
    const DEFAULT_FILE: &'static str;

    fn defaults() -> Self;

    // Merge two configs, where 'other' overrides 'self' for Some values
    fn merge(self, other: Self) -> Self;

    fn config_path(&self) -> Option<&PathBuf>;
}

#[derive(Parser, Deserialize, Serialize, Debug, Clone, Default)]
#[clap(about = "Inventory sync server: upstream ingestion, pull endpoint and channel transport", version)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    #[clap(long, env = "INVENTORY_PORT", help = "Port to listen on for dashboard connections.")]
    pub port: Option<u16>,

    #[clap(long, env = "INVENTORY_CONFIG_PATH", help = "Path to the JSON configuration file.")]
    pub config_path: Option<PathBuf>,

    #[clap(long, env = "INVENTORY_LOG_DIR", help = "Directory for log files.")]
    pub log_dir: Option<PathBuf>,

    #[clap(long, env = "INVENTORY_LOG_LEVEL", help = "Logging level (trace, debug, info, warn, error).")]
    pub log_level: Option<String>,

    #[clap(long, env = "WEBSOCKET_HOST", help = "Host of the upstream inventory feed (port 8080).")]
    pub websocket_host: Option<String>,

    #[clap(long, env = "INVENTORY_MAX_ATTEMPTS", help = "Reconnects attempted before the error signal is broadcast.")]
    pub max_attempts: Option<u32>,

    #[clap(long, env = "INVENTORY_RETRY_DELAY_MS", help = "Delay in milliseconds before each upstream reconnect.")]
    pub retry_delay_ms: Option<u64>,

    #[clap(long, env = "INVENTORY_CONNECT_TIMEOUT_MS", help = "Timeout in milliseconds for opening the upstream socket.")]
    pub connect_timeout_ms: Option<u64>,

    #[clap(long, env = "INVENTORY_CHANNEL_CAPACITY", help = "Payloads buffered per channel subscriber.")]
    pub channel_capacity: Option<usize>,

    #[clap(long, env = "INVENTORY_AUTOSTART", help = "Start upstream ingestion at boot (true/false).")]
    pub autostart: Option<bool>,
}

impl ServerConfig {
    pub fn port(&self) -> u16 {
        self.port.unwrap_or(3000)
    }

    pub fn log_dir(&self) -> PathBuf {
        self.log_dir.clone().unwrap_or_else(|| PathBuf::from("./logs"))
    }

    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or("info")
    }

    pub fn channel_capacity(&self) -> usize {
        self.channel_capacity.unwrap_or(DEFAULT_CAPACITY)
    }

    pub fn autostart(&self) -> bool {
        self.autostart.unwrap_or(true)
    }

    pub fn ingestion_config(&self) -> IngestionConfig {
        let mut config = IngestionConfig::for_host(self.websocket_host.as_deref().unwrap_or("localhost"));
        if let Some(max_attempts) = self.max_attempts {
            config.max_attempts = max_attempts;
        }
        if let Some(ms) = self.retry_delay_ms {
            config.retry_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = self.connect_timeout_ms {
            config.connect_timeout = Duration::from_millis(ms);
        }
        config
    }
}

impl Layered for ServerConfig {
    const DEFAULT_FILE: &'static str = "server_inventory.conf";

    fn defaults() -> Self {
        ServerConfig {
            port: Some(3000),
            log_dir: Some(PathBuf::from("./logs")),
            log_level: Some("info".to_string()),
            websocket_host: Some("localhost".to_string()),
            max_attempts: Some(2),
            retry_delay_ms: Some(2000),
            connect_timeout_ms: Some(5000),
            channel_capacity: Some(DEFAULT_CAPACITY),
            autostart: Some(true),
            ..Default::default()
        }
    }

    fn merge(self, other: ServerConfig) -> ServerConfig {
        ServerConfig {
            port: other.port.or(self.port),
            config_path: other.config_path.or(self.config_path),
            log_dir: other.log_dir.or(self.log_dir),
            log_level: other.log_level.or(self.log_level),
            websocket_host: other.websocket_host.or(self.websocket_host),
            max_attempts: other.max_attempts.or(self.max_attempts),
            retry_delay_ms: other.retry_delay_ms.or(self.retry_delay_ms),
            connect_timeout_ms: other.connect_timeout_ms.or(self.connect_timeout_ms),
            channel_capacity: other.channel_capacity.or(self.channel_capacity),
            autostart: other.autostart.or(self.autostart),
        }
    }

    fn config_path(&self) -> Option<&PathBuf> {
        self.config_path.as_ref()
    }
}

#[derive(Parser, Deserialize, Serialize, Debug, Clone, Default)]
#[clap(about = "Headless inventory dashboard: channel subscription with fallback polling", version)]
#[serde(rename_all = "camelCase")]
pub struct WatchConfig {
    #[clap(long, env = "INVENTORY_BACKEND_URL", help = "Base URL of the inventory backend.")]
    pub backend_url: Option<String>,

    #[clap(long, env = "INVENTORY_WATCH_CONFIG_PATH", help = "Path to the JSON configuration file.")]
    pub config_path: Option<PathBuf>,

    #[clap(long, env = "INVENTORY_WATCH_LOG_DIR", help = "Directory for log files.")]
    pub log_dir: Option<PathBuf>,

    #[clap(long, env = "INVENTORY_WATCH_LOG_LEVEL", help = "Logging level (trace, debug, info, warn, error).")]
    pub log_level: Option<String>,

    #[clap(long, env = "INVENTORY_FALLBACK_TIMEOUT_MS", help = "Milliseconds to wait for a confirmed subscription before pulling once.")]
    pub fallback_timeout_ms: Option<u64>,

    #[clap(long, env = "INVENTORY_CABLE_RECONNECT_DELAY_MS", help = "Delay in milliseconds before re-opening a dropped channel transport.")]
    pub reconnect_delay_ms: Option<u64>,

    #[clap(long, env = "INVENTORY_REQUEST_TIMEOUT_MS", help = "Timeout in milliseconds for backend HTTP requests.")]
    pub request_timeout_ms: Option<u64>,
}

impl WatchConfig {
    pub fn backend_url(&self) -> &str {
        self.backend_url.as_deref().unwrap_or("http://localhost:3000")
    }

    pub fn log_dir(&self) -> PathBuf {
        self.log_dir.clone().unwrap_or_else(|| PathBuf::from("./logs"))
    }

    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or("info")
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms.unwrap_or(3000))
    }

    pub fn agent_config(&self) -> SyncAgentConfig {
        let mut config = SyncAgentConfig::default();
        if let Some(ms) = self.fallback_timeout_ms {
            config.fallback_timeout = Duration::from_millis(ms);
        }
        config
    }

    pub fn client_options(&self) -> ApiClientOptions {
        let mut options = ApiClientOptions::default();
        if let Some(ms) = self.request_timeout_ms {
            options.timeout = Duration::from_millis(ms);
        }
        options
    }
}

impl Layered for WatchConfig {
    const DEFAULT_FILE: &'static str = "inventory_watch.conf";

    fn defaults() -> Self {
        WatchConfig {
            backend_url: Some("http://localhost:3000".to_string()),
            log_dir: Some(PathBuf::from("./logs")),
            log_level: Some("info".to_string()),
            fallback_timeout_ms: Some(10_000),
            reconnect_delay_ms: Some(3000),
            request_timeout_ms: Some(10_000),
            ..Default::default()
        }
    }

    fn merge(self, other: WatchConfig) -> WatchConfig {
        WatchConfig {
            backend_url: other.backend_url.or(self.backend_url),
            config_path: other.config_path.or(self.config_path),
            log_dir: other.log_dir.or(self.log_dir),
            log_level: other.log_level.or(self.log_level),
            fallback_timeout_ms: other.fallback_timeout_ms.or(self.fallback_timeout_ms),
            reconnect_delay_ms: other.reconnect_delay_ms.or(self.reconnect_delay_ms),
            request_timeout_ms: other.request_timeout_ms.or(self.request_timeout_ms),
        }
    }

    fn config_path(&self) -> Option<&PathBuf> {
        self.config_path.as_ref()
    }
}

/// Parses env/CLI and resolves the full layering.
pub fn load_config<C: Layered>() -> Result<C> {
    resolve(C::parse())
}

/// Layers `defaults → file → cli`. The file is the one named by `cli`, or
/// `C::DEFAULT_FILE` in the working directory. A missing file is skipped; an
/// unreadable or malformed one is an error.
pub fn resolve<C: Layered>(cli: C) -> Result<C> {
    let config_file_path = cli
        .config_path()
        .cloned()
        .unwrap_or_else(|| PathBuf::from(C::DEFAULT_FILE));

    let mut current_config = C::defaults();
    if config_file_path.exists() {
        current_config = current_config.merge(read_file::<C>(&config_file_path)?);
    }
    Ok(current_config.merge(cli))
}

fn read_file<C: Layered>(path: &Path) -> Result<C> {
    let config_str = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    serde_json::from_str::<C>(&config_str)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}
