use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::app::actions::Action;
use crate::gesture::{GestureSettings, SoftmaxRegression, TrainingRequirements};
use crate::motion::MotionSettings;
use crate::session::SessionOptions;
use crate::transport::TcpEndpoint;

/// Environment variable naming the config file.
pub const CONFIG_PATH_ENV: &str = "AIRMOUSE_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "airmouse.toml";

/// Top-level configuration. Every section falls back to its defaults when
/// missing from the file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub transport: TransportConfig,
    pub session: SessionConfig,
    pub cursor: CursorConfig,
    pub gesture: GestureConfig,
    pub storage: StorageConfig,
    pub channels: ChannelConfig,
    pub actions: BTreeMap<String, Action>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub host: String,
    pub port: u16,
    pub connect_timeout_ms: u64,
    pub read_buffer_size: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub handshake_timeout_ms: u64,
    pub calibration_timeout_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CursorConfig {
    pub sensitivity: f64,
    pub smoothing: f64,
    pub deadzone: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    pub confidence_threshold: f64,
    pub min_classes: usize,
    pub min_samples: usize,
    pub default_cooldown_ms: u64,
    pub gesture_cooldowns: BTreeMap<String, u64>,
    pub training: TrainingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub epochs: usize,
    pub learning_rate: f64,
    pub l2: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Duckdb,
    Json,
    Memory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub path: String,
    pub auto_create_dir: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    pub event_channel_capacity: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            host: "192.168.4.1".to_string(),
            port: 80,
            connect_timeout_ms: 5000,
            read_buffer_size: 1024,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            handshake_timeout_ms: 5000,
            calibration_timeout_ms: 5000,
        }
    }
}

impl Default for CursorConfig {
    fn default() -> Self {
        let motion = MotionSettings::default();
        Self {
            sensitivity: motion.sensitivity,
            smoothing: motion.smoothing,
            deadzone: motion.deadzone,
        }
    }
}

impl Default for GestureConfig {
    fn default() -> Self {
        let gesture_cooldowns = [
            ("CIRCLE", 800),
            ("SHAKE", 800),
            ("UP", 200),
            ("DOWN", 200),
            ("LEFT", 200),
            ("RIGHT", 200),
        ]
        .into_iter()
        .map(|(label, ms)| (label.to_string(), ms))
        .collect();

        Self {
            confidence_threshold: 0.70,
            min_classes: 2,
            min_samples: 10,
            default_cooldown_ms: 300,
            gesture_cooldowns,
            training: TrainingConfig::default(),
        }
    }
}

impl Default for TrainingConfig {
    fn default() -> Self {
        let strategy = SoftmaxRegression::default();
        Self {
            epochs: strategy.epochs,
            learning_rate: strategy.learning_rate,
            l2: strategy.l2,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Duckdb,
            path: "data/gestures.db".to_string(),
            auto_create_dir: true,
        }
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            event_channel_capacity: 1024,
        }
    }
}

impl AppConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::IoError)?;
        let config: AppConfig = toml::from_str(&content).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(ConfigError::SerializeError)?;
        std::fs::write(path, content).map_err(ConfigError::IoError)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.transport.host.trim().is_empty() {
            return Err(ConfigError::ValidationError("Transport host must not be empty".to_string()));
        }

        if self.transport.read_buffer_size == 0 || self.channels.event_channel_capacity == 0 {
            return Err(ConfigError::ValidationError("Buffer and channel sizes must be positive".to_string()));
        }

        if self.transport.connect_timeout_ms == 0
            || self.session.handshake_timeout_ms == 0
            || self.session.calibration_timeout_ms == 0
        {
            return Err(ConfigError::ValidationError("Timeouts must be positive".to_string()));
        }

        let threshold = self.gesture.confidence_threshold;
        if !(threshold > 0.0 && threshold < 1.0) {
            return Err(ConfigError::ValidationError(
                "Confidence threshold must be between 0 and 1".to_string(),
            ));
        }

        if !(self.cursor.deadzone >= 0.0) || !(self.cursor.sensitivity >= 0.0) {
            return Err(ConfigError::ValidationError(
                "Deadzone and sensitivity must not be negative".to_string(),
            ));
        }

        if self.gesture.min_classes < 2 {
            return Err(ConfigError::ValidationError("At least 2 gesture classes are required".to_string()));
        }

        if self.gesture.training.epochs == 0 || !(self.gesture.training.learning_rate > 0.0) {
            return Err(ConfigError::ValidationError(
                "Training needs positive epochs and learning rate".to_string(),
            ));
        }

        Ok(())
    }

    /// Applies `AIRMOUSE_HOST` / `AIRMOUSE_PORT` when set.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(host) = std::env::var("AIRMOUSE_HOST") {
            self.transport.host = host;
        }
        if let Ok(port) = std::env::var("AIRMOUSE_PORT") {
            self.transport.port = port
                .trim()
                .parse()
                .map_err(|_| ConfigError::ValidationError(format!("Invalid AIRMOUSE_PORT: {}", port)))?;
        }
        Ok(())
    }

    pub fn endpoint(&self) -> TcpEndpoint {
        TcpEndpoint::new(self.transport.host.clone(), self.transport.port)
            .with_connect_timeout(Duration::from_millis(self.transport.connect_timeout_ms))
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            handshake_timeout: Duration::from_millis(self.session.handshake_timeout_ms),
            calibration_timeout: Duration::from_millis(self.session.calibration_timeout_ms),
            read_buffer_size: self.transport.read_buffer_size,
            event_channel_capacity: self.channels.event_channel_capacity,
        }
    }

    pub fn motion_settings(&self) -> MotionSettings {
        MotionSettings {
            sensitivity: self.cursor.sensitivity,
            smoothing: self.cursor.smoothing,
            deadzone: self.cursor.deadzone,
        }
    }

    pub fn gesture_settings(&self) -> GestureSettings {
        GestureSettings {
            confidence_threshold: self.gesture.confidence_threshold,
            requirements: TrainingRequirements {
                min_classes: self.gesture.min_classes,
                min_samples: self.gesture.min_samples,
            },
        }
    }

    pub fn classifier(&self) -> SoftmaxRegression {
        SoftmaxRegression {
            epochs: self.gesture.training.epochs,
            learning_rate: self.gesture.training.learning_rate,
            l2: self.gesture.training.l2,
        }
    }

    pub fn default_cooldown(&self) -> Duration {
        Duration::from_millis(self.gesture.default_cooldown_ms)
    }

    pub fn gesture_cooldowns(&self) -> BTreeMap<String, Duration> {
        self.gesture
            .gesture_cooldowns
            .iter()
            .map(|(label, ms)| (label.clone(), Duration::from_millis(*ms)))
            .collect()
    }

    pub fn storage_path(&self) -> PathBuf {
        PathBuf::from(&self.storage.path)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(std::io::Error),
    #[error("Parse error: {0}")]
    ParseError(toml::de::Error),
    #[error("Serialize error: {0}")]
    SerializeError(toml::ser::Error),
    #[error("Validation error: {0}")]
    ValidationError(String),
}

pub struct ConfigManager {
    config: AppConfig,
    config_path: Option<PathBuf>,
}

impl ConfigManager {
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
            config_path: None,
        }
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config = AppConfig::load_from_file(&path)?;
        Ok(Self {
            config,
            config_path: Some(path.as_ref().to_path_buf()),
        })
    }

    /// Loads `.env`, then the file named by `AIRMOUSE_CONFIG` (or
    /// `airmouse.toml`) if it exists, then the environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let mut manager = if Path::new(&path).exists() {
            log::info!("Loading configuration from {}", path);
            Self::load_from_file(&path)?
        } else {
            log::info!("No configuration file at {}, using defaults", path);
            Self::new()
        };

        manager.config.apply_env_overrides()?;
        manager.config.validate()?;
        Ok(manager)
    }

    pub fn get_config(&self) -> &AppConfig {
        &self.config
    }

    pub fn get_config_mut(&mut self) -> &mut AppConfig {
        &mut self.config
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        if let Some(path) = &self.config_path {
            self.config.save_to_file(path)?;
        }
        Ok(())
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        self.config.save_to_file(path)
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}
