use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::utils::error::{AppError, Result};
use crate::utils::fs::write_json_atomic;

pub const CONFIG_FILE_NAME: &str = "config.json";
pub const DATA_FILE_NAME: &str = "price_data.json";
const APP_DIR_NAME: &str = "pricewatch";

/// When recorded readings reach the state file during a pass.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PersistMode {
    /// Save after every recorded reading; an interrupted pass loses nothing.
    #[default]
    PerItem,
    /// Save once when the pass completes.
    EndOfPass,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub check_interval_seconds: u64,
    pub price_drop_threshold_percent: f64,
    /// `None` lifts the product limit.
    pub max_products_free: Option<usize>,
    pub retention_cap: usize,
    pub min_price: Decimal,
    pub max_price: Decimal,
    pub fallback_line_max_len: usize,
    pub persist_mode: PersistMode,
    pub probe_on_add: bool,
    pub fetch: FetchConfig,
    pub email: EmailConfig,
    pub notifications: NotificationsConfig,
    /// Keys this version does not know about, written back untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FetchConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub timeout_seconds: u64,
    pub user_agent: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmailConfig {
    pub enabled: bool,
    pub smtp_server: String,
    pub smtp_port: u16,
    pub sender_email: String,
    pub sender_password: String,
    pub recipient_email: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NotificationsConfig {
    pub enabled: bool,
    pub sound: Option<String>,
    pub persistent: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            check_interval_seconds: 3600,
            price_drop_threshold_percent: 5.0,
            max_products_free: Some(3),
            retention_cap: 100,
            min_price: Decimal::new(1, 2),
            max_price: Decimal::from(100_000),
            fallback_line_max_len: 100,
            persist_mode: PersistMode::PerItem,
            probe_on_add: true,
            fetch: FetchConfig::default(),
            email: EmailConfig::default(),
            notifications: NotificationsConfig::default(),
            extra: Map::new(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
            timeout_seconds: 15,
            user_agent: None,
            extra: Map::new(),
        }
    }
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            smtp_server: "smtp.gmail.com".to_string(),
            smtp_port: 587,
            sender_email: String::new(),
            sender_password: String::new(),
            recipient_email: String::new(),
            extra: Map::new(),
        }
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sound: Some("Glass".to_string()),
            persistent: false,
            extra: Map::new(),
        }
    }
}

impl FetchConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl EmailConfig {
    /// Email is only usable once the account and recipient are filled in.
    pub fn is_complete(&self) -> bool {
        !self.smtp_server.is_empty()
            && !self.sender_email.is_empty()
            && !self.sender_password.is_empty()
            && !self.recipient_email.is_empty()
    }
}

impl AppConfig {
    /// Load the configuration at `path`.
    ///
    /// Never fails: a missing file yields the defaults, and an unreadable,
    /// malformed or invalid file is logged and replaced by the defaults.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Self::default();
        }

        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("Failed to read config {}: {}; using defaults", path.display(), e);
                return Self::default();
            }
        };

        let config: AppConfig = match serde_json::from_str(&text) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Invalid JSON in config {}: {}; using defaults", path.display(), e);
                return Self::default();
            }
        };

        if let Err(e) = config.validate() {
            tracing::warn!("Rejected config {}: {}; using defaults", path.display(), e);
            return Self::default();
        }

        config
    }

    /// Write the configuration, including keys this version did not recognise.
    pub fn save(&self, path: &Path) -> Result<()> {
        write_json_atomic(path, self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.check_interval_seconds == 0 {
            return Err(AppError::Config("check_interval_seconds must be greater than 0".into()));
        }

        if !self.price_drop_threshold_percent.is_finite() || self.price_drop_threshold_percent < 0.0 {
            return Err(AppError::Config(
                "price_drop_threshold_percent must be a non-negative number".into(),
            ));
        }

        if self.max_products_free == Some(0) {
            return Err(AppError::Config("max_products_free must be greater than 0".into()));
        }

        if self.retention_cap == 0 {
            return Err(AppError::Config("retention_cap must be greater than 0".into()));
        }

        if self.min_price <= Decimal::ZERO {
            return Err(AppError::Config("min_price must be greater than 0".into()));
        }

        if self.min_price >= self.max_price {
            return Err(AppError::Config("min_price must be below max_price".into()));
        }

        if self.fetch.max_attempts == 0 {
            return Err(AppError::Config("fetch.max_attempts must be greater than 0".into()));
        }

        if self.fetch.timeout_seconds == 0 {
            return Err(AppError::Config("fetch.timeout_seconds must be greater than 0".into()));
        }

        if self.email.enabled && self.email.smtp_port == 0 {
            return Err(AppError::Config("email.smtp_port must be greater than 0".into()));
        }

        Ok(())
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_seconds)
    }
}

/// Directory holding the config, state file and logs.
///
/// `PRICEWATCH_HOME` wins; otherwise the platform data directory.
pub fn default_home_dir() -> PathBuf {
    if let Ok(home) = env::var("PRICEWATCH_HOME") {
        return PathBuf::from(home);
    }
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}

pub fn default_config_path() -> PathBuf {
    env::var("PRICEWATCH_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| default_home_dir().join(CONFIG_FILE_NAME))
}

pub fn default_data_path() -> PathBuf {
    env::var("PRICEWATCH_DATA")
        .map(PathBuf::from)
        .unwrap_or_else(|_| default_home_dir().join(DATA_FILE_NAME))
}
