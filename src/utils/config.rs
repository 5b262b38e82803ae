use crate::core::constants::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// How competing target writes for the same vehicle are reconciled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UpdateOrdering {
    /// Whichever write arrives last wins, regardless of source timestamps
    #[default]
    LastWriteWins,
    /// A write carrying an older source timestamp than the stored one is refused
    NewestTimestampWins,
}

/// Engine-wide tuning parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Fraction of the remaining distance closed per animation frame, in (0, 1]
    pub convergence_fraction: f64,
    /// Snap distance in degrees
    pub convergence_epsilon: f64,
    /// Animation frame cadence used by timer-driven hosts (milliseconds)
    pub frame_interval_ms: u64,
    /// Simulated track sample interval (milliseconds)
    pub track_tick_interval_ms: u64,
    /// Snapshot poll interval (milliseconds)
    pub poll_interval_ms: u64,
    /// Backend health check interval (milliseconds)
    pub health_check_interval_ms: u64,
    /// Lifetime of a notification before it expires (milliseconds)
    pub notification_ttl_ms: u64,
    /// Cross-source write reconciliation
    pub update_ordering: UpdateOrdering,
    /// Arrival estimate parameters
    pub eta: EtaConfig,
}

/// Naive ETA estimate parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EtaConfig {
    /// Assumed average speed (km/h)
    pub average_speed_kmh: f64,
    /// Kilometres per degree used for the flat-earth distance
    pub km_per_degree: f64,
    /// Maximum rows on an arrivals board
    pub max_arrivals: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            convergence_fraction: DEFAULT_CONVERGENCE_FRACTION,
            convergence_epsilon: DEFAULT_CONVERGENCE_EPSILON,
            frame_interval_ms: DEFAULT_FRAME_INTERVAL_MS,
            track_tick_interval_ms: DEFAULT_TRACK_TICK_INTERVAL_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            health_check_interval_ms: DEFAULT_HEALTH_CHECK_INTERVAL_MS,
            notification_ttl_ms: DEFAULT_NOTIFICATION_TTL_MS,
            update_ordering: UpdateOrdering::LastWriteWins,
            eta: EtaConfig::default(),
        }
    }
}

impl Default for EtaConfig {
    fn default() -> Self {
        Self {
            average_speed_kmh: DEFAULT_AVERAGE_SPEED_KMH,
            km_per_degree: DEFAULT_KM_PER_DEGREE,
            max_arrivals: DEFAULT_MAX_ARRIVALS,
        }
    }
}

impl TrackerConfig {
    /// Divide every timer interval by `factor` (minimum 1 ms) for fast playback.
    pub fn accelerated(mut self, factor: u64) -> Self {
        let factor = factor.max(1);
        let scale = |ms: u64| (ms / factor).max(1);
        self.frame_interval_ms = scale(self.frame_interval_ms);
        self.track_tick_interval_ms = scale(self.track_tick_interval_ms);
        self.poll_interval_ms = scale(self.poll_interval_ms);
        self.health_check_interval_ms = scale(self.health_check_interval_ms);
        self.notification_ttl_ms = scale(self.notification_ttl_ms);
        self
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }

    pub fn track_tick_interval(&self) -> Duration {
        Duration::from_millis(self.track_tick_interval_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn health_check_interval(&self) -> Duration {
        Duration::from_millis(self.health_check_interval_ms)
    }

    pub fn notification_ttl(&self) -> Duration {
        Duration::from_millis(self.notification_ttl_ms)
    }

    /// Check every parameter, returning the first violation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.convergence_fraction > 0.0 && self.convergence_fraction <= 1.0) {
            return Err(ConfigError::invalid(
                "convergence_fraction",
                self.convergence_fraction,
                "must be within (0, 1]",
            ));
        }
        if !(self.convergence_epsilon.is_finite() && self.convergence_epsilon >= MIN_CONVERGENCE_EPSILON) {
            return Err(ConfigError::invalid(
                "convergence_epsilon",
                self.convergence_epsilon,
                "must be a finite distance of at least 1e-12 degrees",
            ));
        }
        let intervals = [
            ("frame_interval_ms", self.frame_interval_ms),
            ("track_tick_interval_ms", self.track_tick_interval_ms),
            ("poll_interval_ms", self.poll_interval_ms),
            ("health_check_interval_ms", self.health_check_interval_ms),
            ("notification_ttl_ms", self.notification_ttl_ms),
        ];
        for (name, value) in intervals {
            if value == 0 {
                return Err(ConfigError::invalid(name, value, "interval must be non-zero"));
            }
        }
        if !(self.eta.average_speed_kmh.is_finite() && self.eta.average_speed_kmh > 0.0) {
            return Err(ConfigError::invalid(
                "eta.average_speed_kmh",
                self.eta.average_speed_kmh,
                "speed must be positive",
            ));
        }
        if !(self.eta.km_per_degree.is_finite() && self.eta.km_per_degree > 0.0) {
            return Err(ConfigError::invalid(
                "eta.km_per_degree",
                self.eta.km_per_degree,
                "scale must be positive",
            ));
        }
        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// Invalid parameter value
    #[error("invalid {parameter} = {value}: {reason}")]
    InvalidParameter { parameter: String, value: String, reason: String },
    /// Configuration file I/O error
    #[error("config I/O error: {message}")]
    Io { message: String },
    /// JSON serialization/deserialization error
    #[error("config serialization error: {message}")]
    Serialization { message: String },
}

impl ConfigError {
    fn invalid(parameter: &str, value: impl ToString, reason: &str) -> Self {
        ConfigError::InvalidParameter {
            parameter: parameter.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl From<ConfigError> for crate::api::types::TrackerError {
    fn from(error: ConfigError) -> Self {
        match error {
            ConfigError::InvalidParameter { parameter, value, reason } => {
                crate::api::types::TrackerError::Configuration { parameter, value, reason }
            }
            other => crate::api::types::TrackerError::Configuration {
                parameter: "config".to_string(),
                value: String::new(),
                reason: other.to_string(),
            },
        }
    }
}

/// Point-in-time copy of the configuration for rollback
#[derive(Debug, Clone)]
pub struct ConfigurationSnapshot {
    config: TrackerConfig,
}

/// Main configuration manager
pub struct ConfigurationManager {
    /// Current configuration
    config: TrackerConfig,
    /// Configuration file path
    config_file_path: Option<String>,
    /// Whether configuration has been modified
    is_modified: bool,
}

impl ConfigurationManager {
    /// Create a new configuration manager with default settings
    pub fn new() -> Self {
        Self {
            config: TrackerConfig::default(),
            config_file_path: None,
            is_modified: false,
        }
    }

    /// Create configuration manager and load from file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut manager = Self::new();
        manager.load_from_file(path)?;
        Ok(manager)
    }

    /// Get current configuration
    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Replace the configuration after validation
    pub fn update_config(&mut self, config: TrackerConfig) -> Result<(), ConfigError> {
        config.validate()?;
        self.config = config;
        self.is_modified = true;
        Ok(())
    }

    /// Load configuration from JSON file
    pub fn load_from_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), ConfigError> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        let content = fs::read_to_string(&path).map_err(|e| ConfigError::Io {
            message: format!("Failed to read config file '{}': {}", path_str, e),
        })?;

        let config: TrackerConfig = serde_json::from_str(&content).map_err(|e| {
            ConfigError::Serialization {
                message: format!("Failed to parse config file '{}': {}", path_str, e),
            }
        })?;

        // Validate before applying
        config.validate()?;

        self.config = config;
        self.config_file_path = Some(path_str);
        self.is_modified = false;
        Ok(())
    }

    /// Save configuration to JSON file
    pub fn save_to_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), ConfigError> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        let content = serde_json::to_string_pretty(&self.config).map_err(|e| {
            ConfigError::Serialization {
                message: format!("Failed to serialize config: {}", e),
            }
        })?;

        fs::write(&path, content).map_err(|e| ConfigError::Io {
            message: format!("Failed to write config file '{}': {}", path_str, e),
        })?;

        self.config_file_path = Some(path_str);
        self.is_modified = false;
        Ok(())
    }

    /// Save to the currently loaded file path
    pub fn save(&mut self) -> Result<(), ConfigError> {
        if let Some(path) = self.config_file_path.clone() {
            self.save_to_file(path)
        } else {
            Err(ConfigError::Io {
                message: "No file path set for saving configuration".to_string(),
            })
        }
    }

    /// Check if configuration has been modified since last save
    pub fn is_modified(&self) -> bool {
        self.is_modified
    }

    // Runtime parameter adjustment

    /// Update the convergence fraction, returning the previous value
    pub fn set_convergence_fraction(&mut self, fraction: f64) -> Result<f64, ConfigError> {
        self.apply(|c| {
            let old = c.convergence_fraction;
            c.convergence_fraction = fraction;
            old
        })
    }

    /// Update the convergence epsilon, returning the previous value
    pub fn set_convergence_epsilon(&mut self, epsilon: f64) -> Result<f64, ConfigError> {
        self.apply(|c| {
            let old = c.convergence_epsilon;
            c.convergence_epsilon = epsilon;
            old
        })
    }

    /// Update the track tick interval, returning the previous value
    pub fn set_track_tick_interval(&mut self, interval_ms: u64) -> Result<u64, ConfigError> {
        self.apply(|c| {
            let old = c.track_tick_interval_ms;
            c.track_tick_interval_ms = interval_ms;
            old
        })
    }

    /// Update the poll interval, returning the previous value
    pub fn set_poll_interval(&mut self, interval_ms: u64) -> Result<u64, ConfigError> {
        self.apply(|c| {
            let old = c.poll_interval_ms;
            c.poll_interval_ms = interval_ms;
            old
        })
    }

    /// Switch write reconciliation, returning the previous mode
    pub fn set_update_ordering(&mut self, ordering: UpdateOrdering) -> UpdateOrdering {
        let old = self.config.update_ordering;
        self.config.update_ordering = ordering;
        self.is_modified = true;
        old
    }

    /// Create a snapshot of the current configuration
    pub fn create_snapshot(&self) -> ConfigurationSnapshot {
        ConfigurationSnapshot { config: self.config.clone() }
    }

    /// Restore configuration from a snapshot
    pub fn restore_from_snapshot(&mut self, snapshot: ConfigurationSnapshot) {
        self.config = snapshot.config;
        self.is_modified = true;
    }

    /// Apply an edit to a scratch copy; commit only if it validates.
    fn apply<T>(&mut self, edit: impl FnOnce(&mut TrackerConfig) -> T) -> Result<T, ConfigError> {
        let mut candidate = self.config.clone();
        let old = edit(&mut candidate);
        candidate.validate()?;
        self.config = candidate;
        self.is_modified = true;
        Ok(old)
    }
}

impl Default for ConfigurationManager {
    fn default() -> Self {
        Self::new()
    }
}
