//! 配置系统
//! 从环境变量加载所有配置（前缀 ACCOUNT_）

use config::{Config, ConfigError, Environment};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// 后端 API 地址，例如 "http://localhost:8080"
    pub base_url: String,
    /// 公开部署路径，例如 "/"
    pub public_path: String,
    /// 请求超时时间（秒），0 表示不超时
    pub timeout_secs: u64,
}

impl ApiConfig {
    /// 请求超时；`timeout_secs = 0` 时返回 None
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppMode {
    /// 生产模式
    pub production: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别: trace, debug, info, warn, error
    pub level: String,
    /// 日志格式: json, pretty
    pub format: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// 会话存储文件路径
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub app: AppMode,
    pub logging: LoggingConfig,
    pub storage: StorageConfig,
}

impl AppConfig {
    /// 从环境变量加载配置
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut settings = Config::builder();

        // 添加默认配置
        settings = settings
            .set_default("api.base_url", "http://localhost:8080")?
            .set_default("api.public_path", "/")?
            .set_default("api.timeout_secs", 0)?
            .set_default("app.production", false)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            .set_default("storage.path", ".account-console.json")?;

        // 从环境变量加载配置（前缀为 ACCOUNT_）
        settings = settings.add_source(
            Environment::with_prefix("ACCOUNT")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: AppConfig = settings.build()?.try_deserialize()?;

        // 验证配置
        config.validate()?;

        Ok(config)
    }

    pub fn is_production(&self) -> bool {
        self.app.production
    }

    /// 验证配置合法性
    fn validate(&self) -> Result<(), ConfigError> {
        // 验证 API 地址
        let url = url::Url::parse(&self.api.base_url).map_err(|e| {
            ConfigError::Message(format!("Invalid api.base_url {}: {}", self.api.base_url, e))
        })?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::Message(format!(
                "api.base_url must use http or https, got {}",
                url.scheme()
            )));
        }

        if !self.api.public_path.starts_with('/') {
            return Err(ConfigError::Message(
                "api.public_path must start with '/'".to_string(),
            ));
        }

        // 验证日志级别
        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::Message(format!(
                    "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                    self.logging.level
                )))
            }
        }

        // 验证日志格式
        match self.logging.format.to_lowercase().as_str() {
            "json" | "pretty" => {}
            _ => {
                return Err(ConfigError::Message(format!(
                    "Invalid log format: {}. Must be one of: json, pretty",
                    self.logging.format
                )))
            }
        }

        if self.storage.path.trim().is_empty() {
            return Err(ConfigError::Message("storage.path must not be empty".to_string()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for key in [
            "ACCOUNT_API__BASE_URL",
            "ACCOUNT_API__PUBLIC_PATH",
            "ACCOUNT_API__TIMEOUT_SECS",
            "ACCOUNT_APP__PRODUCTION",
            "ACCOUNT_LOGGING__LEVEL",
            "ACCOUNT_LOGGING__FORMAT",
            "ACCOUNT_STORAGE__PATH",
        ] {
            std::env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn test_config_defaults() {
        clear_env();

        let config = AppConfig::from_env().unwrap();
        assert_eq!(config.api.base_url, "http://localhost:8080");
        assert_eq!(config.api.public_path, "/");
        assert!(config.api.timeout().is_none());
        assert!(!config.is_production());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    #[serial]
    fn test_config_from_env_overrides() {
        clear_env();
        std::env::set_var("ACCOUNT_API__BASE_URL", "https://api.example.com/v1");
        std::env::set_var("ACCOUNT_API__TIMEOUT_SECS", "15");
        std::env::set_var("ACCOUNT_APP__PRODUCTION", "true");

        let config = AppConfig::from_env().unwrap();
        assert_eq!(config.api.base_url, "https://api.example.com/v1");
        assert_eq!(config.api.timeout(), Some(Duration::from_secs(15)));
        assert!(config.is_production());

        clear_env();
    }

    #[test]
    #[serial]
    fn test_config_validation_invalid_base_url() {
        clear_env();
        std::env::set_var("ACCOUNT_API__BASE_URL", "ftp://files.example.com");

        assert!(AppConfig::from_env().is_err());

        std::env::set_var("ACCOUNT_API__BASE_URL", "not a url");
        assert!(AppConfig::from_env().is_err());

        clear_env();
    }

    #[test]
    #[serial]
    fn test_config_validation_invalid_log_level() {
        clear_env();
        std::env::set_var("ACCOUNT_LOGGING__LEVEL", "invalid");

        let result = AppConfig::from_env();
        assert!(result.is_err());

        clear_env();
    }
}
