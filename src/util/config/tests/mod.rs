//! Config 单元测试
//!
//! 测试 TOML 解析、环境变量覆盖与校验

use std::collections::HashMap;

use tempfile::TempDir;

use crate::runtime::fiber::DEFAULT_STACK_SIZE;
use crate::util::config::{self, ConfigError, EngineConfig, MIN_STACK_SIZE, STACK_SIZE_ENV};
use crate::util::logger::LogLevel;

#[cfg(test)]
mod parse_tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.fiber.stack_size, DEFAULT_STACK_SIZE);
        assert!(config.gc.report_owned_children);
        assert_eq!(config.log.level, LogLevel::Info);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: EngineConfig = toml::from_str("[gc]\nreport_owned_children = false\n").unwrap();
        assert!(!config.gc.report_owned_children);
        assert_eq!(config.fiber.stack_size, DEFAULT_STACK_SIZE);
    }

    #[test]
    fn test_log_level_lowercase() {
        let config: EngineConfig = toml::from_str("[log]\nlevel = \"debug\"\n").unwrap();
        assert_eq!(config.log.level, LogLevel::Debug);
    }
}

#[cfg(test)]
mod file_tests {
    use super::*;

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = EngineConfig::default();
        config.fiber.stack_size = 512 * 1024;
        config.log.level = LogLevel::Trace;
        config::save_config_to(&config, &path).unwrap();

        let loaded = config::load_config_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_rejects_tiny_stack() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[fiber]\nstack_size = 1024\n").unwrap();

        match config::load_config_from(&path) {
            Err(ConfigError::StackTooSmall { size, min }) => {
                assert_eq!(size, 1024);
                assert_eq!(min, MIN_STACK_SIZE);
            }
            other => panic!("expected StackTooSmall, got {:?}", other),
        }
    }

    #[test]
    fn test_load_reports_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[fiber\n").unwrap();
        assert!(matches!(config::load_config_from(&path), Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let result = config::load_config_from(&dir.path().join("absent.toml"));
        assert!(matches!(result, Err(ConfigError::IoError(_))));
    }
}

#[cfg(test)]
mod override_tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_stack_size_override() {
        let mut config = EngineConfig::default();
        config.apply_overrides(env(&[(STACK_SIZE_ENV, " 131072 ")])).unwrap();
        assert_eq!(config.fiber.stack_size, 131072);
    }

    #[test]
    fn test_invalid_override() {
        let mut config = EngineConfig::default();
        let err = config.apply_overrides(env(&[(STACK_SIZE_ENV, "big")])).unwrap_err();
        assert!(err.to_string().contains(STACK_SIZE_ENV));
        assert_eq!(config.fiber.stack_size, DEFAULT_STACK_SIZE);
    }

    #[test]
    fn test_no_override() {
        let mut config = EngineConfig::default();
        config.apply_overrides(env(&[])).unwrap();
        assert_eq!(config, EngineConfig::default());
    }
}
