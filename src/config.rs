use serde::Deserialize;
use thiserror::Error;

use crate::logger::{init_logger, parse_log_level};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read file: {0}")]
    ReadFile(#[from] std::io::Error),
    #[error("failed to parse YAML: {0}")]
    ParseYaml(#[from] serde_yaml::Error),
    #[error("validation error: {0}")]
    Validation(String),
}

/// ErrorConfig は structured-error のログ出力設定。
///
/// ```yaml
/// environment: dev
/// log:
///   level: debug
///   format: text
/// ```
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ErrorConfig {
    #[serde(default = "default_environment")]
    pub environment: String,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LogConfig {
    /// 未指定の場合は environment から決まる
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default = "default_format")]
    pub format: String,
}

fn default_environment() -> String {
    "dev".to_string()
}

fn default_format() -> String {
    "json".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: None,
            format: default_format(),
        }
    }
}

impl Default for ErrorConfig {
    fn default() -> Self {
        Self {
            environment: default_environment(),
            log: LogConfig::default(),
        }
    }
}

/// YAML を読み込み ErrorConfig を返す。
pub fn load(path: &str) -> Result<ErrorConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: ErrorConfig = serde_yaml::from_str(&content)?;
    Ok(config)
}

/// 設定値のバリデーション。
pub fn validate(config: &ErrorConfig) -> Result<(), ConfigError> {
    if !["dev", "staging", "prod"].contains(&config.environment.as_str()) {
        return Err(ConfigError::Validation(
            "environment must be dev, staging, or prod".into(),
        ));
    }
    if !["json", "text"].contains(&config.log.format.as_str()) {
        return Err(ConfigError::Validation(
            "log.format must be json or text".into(),
        ));
    }
    if let Some(ref level) = config.log.level {
        if parse_log_level(level).is_none() {
            return Err(ConfigError::Validation(
                "log.level must be trace, debug, info, warn, or error".into(),
            ));
        }
    }
    Ok(())
}

/// 設定を検証し、ログ出力を初期化する。起動時に一度だけ呼び出す。
pub fn init(config: &ErrorConfig) -> Result<(), ConfigError> {
    validate(config)?;
    init_logger(
        &config.environment,
        &config.log.format,
        config.log.level.as_deref().and_then(parse_log_level),
    );
    tracing::debug!(
        environment = %config.environment,
        format = %config.log.format,
        "structured error logging initialized"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load() {
        let mut f = NamedTempFile::new().unwrap();
        write!(
            f,
            "environment: staging\nlog:\n  level: warn\n  format: text\n"
        )
        .unwrap();
        let cfg = load(f.path().to_str().unwrap()).unwrap();
        assert_eq!(cfg.environment, "staging");
        assert_eq!(cfg.log.level.as_deref(), Some("warn"));
        assert_eq!(cfg.log.format, "text");
    }

    #[test]
    fn test_load_defaults() {
        let mut f = NamedTempFile::new().unwrap();
        write!(f, "{{}}").unwrap();
        let cfg = load(f.path().to_str().unwrap()).unwrap();
        assert_eq!(cfg, ErrorConfig::default());
        assert!(validate(&cfg).is_ok());
    }

    #[test]
    fn test_load_file_not_found() {
        let err = load("/nonexistent/structured-error.yaml").unwrap_err();
        assert!(err.to_string().contains("failed to read file"));
    }

    #[test]
    fn test_load_invalid_yaml() {
        let mut f = NamedTempFile::new().unwrap();
        write!(f, "log: [broken").unwrap();
        let err = load(f.path().to_str().unwrap()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseYaml(_)));
    }

    #[test]
    fn test_validate_rejects_unknown_values() {
        let mut cfg = ErrorConfig::default();
        cfg.environment = "qa".to_string();
        assert!(validate(&cfg).is_err());

        let mut cfg = ErrorConfig::default();
        cfg.log.format = "xml".to_string();
        assert!(validate(&cfg).is_err());

        let mut cfg = ErrorConfig::default();
        cfg.log.level = Some("verbose".to_string());
        assert!(validate(&cfg).is_err());
    }

    #[test]
    fn test_validate_accepts_every_known_level() {
        for level in ["trace", "debug", "info", "warn", "error"] {
            let mut cfg = ErrorConfig::default();
            cfg.log.level = Some(level.to_string());
            assert!(validate(&cfg).is_ok(), "level {level}");
        }
    }

    #[test]
    fn test_init_rejects_invalid_config() {
        let mut cfg = ErrorConfig::default();
        cfg.environment = "qa".to_string();
        assert!(matches!(init(&cfg), Err(ConfigError::Validation(_))));
    }
}
