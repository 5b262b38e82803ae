//! Configuration utilities

pub mod config;

pub use config::{ConfigError, ConfigurationManager, EtaConfig, TrackerConfig, UpdateOrdering};
