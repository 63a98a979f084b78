//! yieldfiber configuration
//!
//! # Configuration hierarchy
//!
//! ```text
//! Priority (high → low):
//! 1. CLI arguments
//! 2. Environment variables (YIELDFIBER_STACK_SIZE)
//! 3. User-level (~/.config/yieldfiber/config.toml)
//! 4. Default values
//! ```
//!
//! The engine reads the process-wide *active* configuration; the binary
//! installs the merged result with `set_active` before running anything.
//!
//! # Usage
//!
//! ```rust
//! use yieldfiber::util::config;
//!
//! let config = config::load_user_config().unwrap_or_default();
//! config::set_active(config);
//! assert!(config::active().fiber.stack_size > 0);
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::runtime::fiber::DEFAULT_STACK_SIZE;
use crate::util::logger::LogLevel;

/// Environment variable overriding `fiber.stack_size`.
pub const STACK_SIZE_ENV: &str = "YIELDFIBER_STACK_SIZE";

/// Smallest fiber stack accepted.
pub const MIN_STACK_SIZE: usize = 16 * 1024;

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EngineConfig {
    /// Fiber settings
    #[serde(default)]
    pub fiber: FiberConfig,
    /// Collector cooperation settings
    #[serde(default)]
    pub gc: GcConfig,
    /// Logging settings
    #[serde(default)]
    pub log: LogConfig,
}

/// Fiber configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FiberConfig {
    /// Native stack size of each coroutine, in bytes
    #[serde(default = "default_stack_size")]
    pub stack_size: usize,
}

fn default_stack_size() -> usize {
    DEFAULT_STACK_SIZE
}

impl Default for FiberConfig {
    fn default() -> Self {
        Self {
            stack_size: DEFAULT_STACK_SIZE,
        }
    }
}

/// Collector cooperation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GcConfig {
    /// Report closure cells, parameters, frame, awaited object and pending
    /// exception when a collector traverses a coroutine. When off, the
    /// traversal reports nothing.
    #[serde(default = "default_report_owned_children")]
    pub report_owned_children: bool,
}

fn default_report_owned_children() -> bool {
    true
}

impl Default for GcConfig {
    fn default() -> Self {
        Self {
            report_owned_children: true,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct LogConfig {
    #[serde(default)]
    pub level: LogLevel,
}

impl EngineConfig {
    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fiber.stack_size < MIN_STACK_SIZE {
            return Err(ConfigError::StackTooSmall {
                size: self.fiber.stack_size,
                min: MIN_STACK_SIZE,
            });
        }
        Ok(())
    }

    /// Apply environment overrides read through `lookup`.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(raw) = lookup(STACK_SIZE_ENV) {
            self.fiber.stack_size = raw.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                var: STACK_SIZE_ENV,
                value: raw.clone(),
            })?;
        }
        Ok(())
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|var| std::env::var(var).ok())
    }
}

/// Get the user config directory
pub fn get_config_dir() -> Option<PathBuf> {
    // Try XDG config directory on Unix
    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        return Some(PathBuf::from(xdg_config).join("yieldfiber"));
    }

    // Fallback to ~/.config/yieldfiber
    if let Ok(home) = std::env::var("HOME") {
        return Some(PathBuf::from(home).join(".config").join("yieldfiber"));
    }

    // On Windows, try %APPDATA%
    if let Ok(appdata) = std::env::var("APPDATA") {
        return Some(PathBuf::from(appdata).join("yieldfiber"));
    }

    None
}

/// Get the user config file path (~/.config/yieldfiber/config.toml)
pub fn get_config_path() -> Option<PathBuf> {
    get_config_dir().map(|dir| dir.join("config.toml"))
}

/// Load configuration from `path`.
pub fn load_config_from(path: &Path) -> Result<EngineConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: EngineConfig = toml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

/// Load user-level configuration
/// Returns default config if file doesn't exist
pub fn load_user_config() -> Result<EngineConfig, ConfigError> {
    match get_config_path() {
        Some(path) if path.exists() => load_config_from(&path),
        _ => Ok(EngineConfig::default()),
    }
}

/// Save configuration to `path`, creating parent directories.
pub fn save_config_to(
    config: &EngineConfig,
    path: &Path,
) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        if !dir.exists() {
            fs::create_dir_all(dir)?;
        }
    }
    let content = toml::to_string_pretty(config)?;
    fs::write(path, content)?;
    Ok(())
}

static ACTIVE: Lazy<RwLock<EngineConfig>> = Lazy::new(|| RwLock::new(EngineConfig::default()));

/// The configuration the engine currently runs with.
pub fn active() -> EngineConfig {
    ACTIVE.read().clone()
}

/// Install a new active configuration, returning the previous one.
pub fn set_active(config: EngineConfig) -> EngineConfig {
    std::mem::replace(&mut *ACTIVE.write(), config)
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Config serialize error: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("Invalid value {value:?} in {var}")]
    InvalidEnv { var: &'static str, value: String },

    #[error("Fiber stack size {size} is below the minimum of {min} bytes")]
    StackTooSmall { size: usize, min: usize },
}

#[cfg(test)]
mod tests;
