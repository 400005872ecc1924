//! # Sync Configuration
//!
//! Configuration management for the sync engine.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     MEDSCAN_API_URL=https://api.medscan.app/v1                         │
//! │     MEDSCAN_MAX_RETRIES=3                                              │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/medscan/sync.toml (Linux)                                │
//! │     ~/Library/Application Support/com.medscan.app/sync.toml (macOS)    │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     max_retries = 3, history = 100, search = 20                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # sync.toml
//! [storage]
//! db_path = "/data/medscan.db"
//!
//! [sync]
//! mode = "auto"  # auto | manual
//! max_retries = 3
//! dispatch_timeout_secs = 30
//!
//! [history]
//! max_records = 100
//!
//! [reference]
//! search_limit = 20
//! bundled_path = "/app/assets/reference.json"
//!
//! [network]
//! probe_enabled = true
//! probe_addr = "api.medscan.app:443"
//! probe_interval_secs = 15
//!
//! [remote]
//! api_url = "https://api.medscan.app/v1"
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use medscan_core::{DEFAULT_HISTORY_LIMIT, DEFAULT_MAX_RETRIES, DEFAULT_SEARCH_LIMIT};

use crate::error::{SyncError, SyncResult};

// =============================================================================
// Sync Mode
// =============================================================================

/// When the engine drains the queue on its own.
///
/// ## Mode Selection
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │                        Sync Mode Behavior                               │
/// │                                                                         │
/// │  AUTO (Default)                                                        │
/// │  ──────────────                                                        │
/// │  • One drain per offline → online edge                                 │
/// │  • Manual "sync now" also available                                    │
/// │                                                                         │
/// │  MANUAL                                                                │
/// │  ──────                                                                │
/// │  • Reconnects are observed and reported, nothing drains on its own     │
/// │  • Only force_sync() reaches the remote service                        │
/// │  • Use for metered connections or testing                              │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// Drain automatically on reconnect.
    #[default]
    Auto,

    /// Drain only on explicit request.
    Manual,
}

impl SyncMode {
    /// Returns true if reconnect edges should trigger a drain.
    pub fn drains_on_reconnect(&self) -> bool {
        matches!(self, SyncMode::Auto)
    }
}

impl std::fmt::Display for SyncMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncMode::Auto => write!(f, "auto"),
            SyncMode::Manual => write!(f, "manual"),
        }
    }
}

impl std::str::FromStr for SyncMode {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" | "automatic" => Ok(SyncMode::Auto),
            "manual" => Ok(SyncMode::Manual),
            other => Err(SyncError::InvalidConfig(format!(
                "Unknown sync mode: '{}'. Valid options: auto, manual",
                other
            ))),
        }
    }
}

// =============================================================================
// Storage Settings
// =============================================================================

/// Local device storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
}

fn default_db_path() -> PathBuf {
    directories::ProjectDirs::from("com", "medscan", "app")
        .map(|dirs| dirs.data_dir().join("medscan.db"))
        .unwrap_or_else(|| PathBuf::from("./medscan.db"))
}

impl Default for StorageSettings {
    fn default() -> Self {
        StorageSettings {
            db_path: default_db_path(),
        }
    }
}

// =============================================================================
// Sync Settings
// =============================================================================

/// Drain behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    /// When draining happens without a caller asking.
    #[serde(default)]
    pub mode: SyncMode,

    /// Retryable failures allowed per operation before it is abandoned.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Upper bound for one dispatch call (seconds). Exceeding it counts as a
    /// retryable failure.
    #[serde(default = "default_dispatch_timeout")]
    pub dispatch_timeout_secs: u64,
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}
fn default_dispatch_timeout() -> u64 {
    30
}

impl Default for SyncSettings {
    fn default() -> Self {
        SyncSettings {
            mode: SyncMode::default(),
            max_retries: default_max_retries(),
            dispatch_timeout_secs: default_dispatch_timeout(),
        }
    }
}

// =============================================================================
// History Settings
// =============================================================================

/// Scan history retention.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistorySettings {
    /// Records kept before the oldest are truncated.
    #[serde(default = "default_max_records")]
    pub max_records: usize,
}

fn default_max_records() -> usize {
    DEFAULT_HISTORY_LIMIT
}

impl Default for HistorySettings {
    fn default() -> Self {
        HistorySettings {
            max_records: default_max_records(),
        }
    }
}

// =============================================================================
// Reference Settings
// =============================================================================

/// Reference dataset cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceSettings {
    /// Maximum hits per search.
    #[serde(default = "default_search_limit")]
    pub search_limit: usize,

    /// Dataset shipped with the app, used when nothing is persisted yet.
    #[serde(default)]
    pub bundled_path: Option<PathBuf>,
}

fn default_search_limit() -> usize {
    DEFAULT_SEARCH_LIMIT
}

impl Default for ReferenceSettings {
    fn default() -> Self {
        ReferenceSettings {
            search_limit: default_search_limit(),
            bundled_path: None,
        }
    }
}

// =============================================================================
// Network Settings
// =============================================================================

/// Reachability probing.
///
/// The platform normally feeds observations into the monitor. The probe is a
/// fallback for hosts without a reachability API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkSettings {
    /// Run the TCP probe loop.
    #[serde(default)]
    pub probe_enabled: bool,

    /// `host:port` the probe connects to.
    #[serde(default = "default_probe_addr")]
    pub probe_addr: String,

    /// Interval between probes (seconds).
    #[serde(default = "default_probe_interval")]
    pub probe_interval_secs: u64,

    /// Connect timeout for one probe (milliseconds).
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_ms: u64,
}

fn default_probe_addr() -> String {
    "api.medscan.app:443".to_string()
}
fn default_probe_interval() -> u64 {
    15
}
fn default_probe_timeout() -> u64 {
    3000
}

impl Default for NetworkSettings {
    fn default() -> Self {
        NetworkSettings {
            probe_enabled: false,
            probe_addr: default_probe_addr(),
            probe_interval_secs: default_probe_interval(),
            probe_timeout_ms: default_probe_timeout(),
        }
    }
}

// =============================================================================
// Remote Settings
// =============================================================================

/// Remote service the dispatcher talks to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteSettings {
    /// Base URL, without trailing slash.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// HTTP connect timeout (seconds).
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

fn default_api_url() -> String {
    "https://api.medscan.app/v1".to_string()
}
fn default_connect_timeout() -> u64 {
    10
}

impl Default for RemoteSettings {
    fn default() -> Self {
        RemoteSettings {
            api_url: default_api_url(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

// =============================================================================
// Main Sync Configuration
// =============================================================================

/// Complete sync configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Local storage.
    #[serde(default)]
    pub storage: StorageSettings,

    /// Drain behavior.
    #[serde(default)]
    pub sync: SyncSettings,

    /// History retention.
    #[serde(default)]
    pub history: HistorySettings,

    /// Reference cache.
    #[serde(default)]
    pub reference: ReferenceSettings,

    /// Reachability probing.
    #[serde(default)]
    pub network: NetworkSettings,

    /// Remote service.
    #[serde(default)]
    pub remote: RemoteSettings,
}

impl SyncConfig {
    /// Creates a new config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (sync.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> SyncResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading sync config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load sync config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> SyncResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| SyncError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Sync config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> SyncResult<()> {
        let url = &self.remote.api_url;
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(SyncError::InvalidUrl(format!(
                "API URL must start with http:// or https://, got: {}",
                url
            )));
        }

        if self.sync.max_retries == 0 {
            return Err(SyncError::InvalidConfig(
                "max_retries must be greater than 0".into(),
            ));
        }

        if self.sync.dispatch_timeout_secs == 0 {
            return Err(SyncError::InvalidConfig(
                "dispatch_timeout_secs must be greater than 0".into(),
            ));
        }

        if self.history.max_records == 0 {
            return Err(SyncError::InvalidConfig(
                "history.max_records must be greater than 0".into(),
            ));
        }

        if self.network.probe_enabled && !self.network.probe_addr.contains(':') {
            return Err(SyncError::InvalidConfig(format!(
                "probe_addr must be host:port, got: {}",
                self.network.probe_addr
            )));
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("MEDSCAN_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.storage.db_path = PathBuf::from(path);
        }

        if let Ok(url) = std::env::var("MEDSCAN_API_URL") {
            debug!(url = %url, "Overriding API URL from environment");
            self.remote.api_url = url.trim_end_matches('/').to_string();
        }

        if let Ok(mode) = std::env::var("MEDSCAN_SYNC_MODE") {
            match mode.parse() {
                Ok(parsed) => self.sync.mode = parsed,
                Err(_) => warn!(mode = %mode, "Unknown sync mode in environment"),
            }
        }

        if let Ok(retries) = std::env::var("MEDSCAN_MAX_RETRIES") {
            if let Ok(n) = retries.parse::<u32>() {
                debug!(max_retries = n, "Overriding max retries from environment");
                self.sync.max_retries = n;
            }
        }

        if let Ok(addr) = std::env::var("MEDSCAN_PROBE_ADDR") {
            debug!(addr = %addr, "Enabling reachability probe from environment");
            self.network.probe_addr = addr;
            self.network.probe_enabled = true;
        }

        if let Ok(limit) = std::env::var("MEDSCAN_HISTORY_LIMIT") {
            if let Ok(n) = limit.parse::<usize>() {
                self.history.max_records = n;
            }
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "medscan", "app")
            .map(|dirs| dirs.config_dir().join("sync.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Returns the sync mode.
    pub fn mode(&self) -> SyncMode {
        self.sync.mode
    }

    /// Returns the per-dispatch timeout.
    pub fn dispatch_timeout(&self) -> Duration {
        Duration::from_secs(self.sync.dispatch_timeout_secs)
    }

    /// Returns the probe interval.
    pub fn probe_interval(&self) -> Duration {
        Duration::from_secs(self.network.probe_interval_secs)
    }

    /// Returns the probe connect timeout.
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.network.probe_timeout_ms)
    }
}
