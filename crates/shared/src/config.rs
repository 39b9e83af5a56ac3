//! 配置管理模块
//!
//! 支持多格式配置文件加载，环境变量覆盖，以及类型安全的配置访问。

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

use crate::observability::ObservabilityConfig;

/// 规则引擎配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// 是否记录逐条件的评估追踪
    pub trace_enabled: bool,
    /// 宿主回放补丁时的最大稳定轮数
    pub max_settle_passes: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            trace_enabled: false,
            max_settle_passes: 8,
        }
    }
}

/// 应用配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service_name: String,
    pub environment: String,
    pub engine: EngineConfig,
    pub observability: ObservabilityConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            service_name: "watch-engine".to_string(),
            environment: "development".to_string(),
            engine: EngineConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl AppConfig {
    /// 从配置文件和环境变量加载配置
    ///
    /// 加载顺序（后加载的会覆盖先加载的同名配置项）：
    /// 1. config/default.toml（默认配置）
    /// 2. config/{environment}.toml（环境特定配置）
    /// 3. config/{service_name}.toml（服务特定配置）
    /// 4. 环境变量（WATCH_ 前缀，双下划线分隔层级，如
    ///    WATCH_ENGINE__MAX_SETTLE_PASSES -> engine.max_settle_passes）
    pub fn load(service_name: &str) -> Result<Self, ConfigError> {
        let env = std::env::var("WATCH_ENV").unwrap_or_else(|_| "development".to_string());
        let config_dir = std::env::var("CONFIG_DIR").unwrap_or_else(|_| "config".to_string());

        Self::load_from(&config_dir, service_name, &env)
    }

    /// 从指定目录加载配置，不读取 WATCH_ENV / CONFIG_DIR
    pub fn load_from(config_dir: &str, service_name: &str, env: &str) -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .set_default("service_name", service_name)?
            .set_default("environment", env)?
            .add_source(File::from(Path::new(config_dir).join("default.toml")).required(false))
            .add_source(
                File::from(Path::new(config_dir).join(format!("{}.toml", env))).required(false),
            )
            .add_source(
                File::from(Path::new(config_dir).join(format!("{}.toml", service_name)))
                    .required(false),
            )
            // 字段名本身含下划线，层级分隔使用双下划线
            .add_source(
                Environment::with_prefix("WATCH")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        let mut config: Self = builder.build()?.try_deserialize()?;

        if config.observability.service_name.is_empty() {
            config.observability.service_name = config.service_name.clone();
        }

        Ok(config)
    }

    /// 是否为生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.service_name, "watch-engine");
        assert!(!config.engine.trace_enabled);
        assert_eq!(config.engine.max_settle_passes, 8);
        assert!(!config.is_production());
    }

    #[test]
    fn test_load_without_files_uses_defaults() {
        // 目录不存在时所有文件源都是可选的
        let config = AppConfig::load_from("/nonexistent-config-dir", "watch-cli", "test").unwrap();

        assert_eq!(config.service_name, "watch-cli");
        assert_eq!(config.environment, "test");
        assert_eq!(config.engine.max_settle_passes, 8);
        assert_eq!(config.observability.service_name, "watch-cli");
    }

    #[test]
    fn test_load_from_toml_file() {
        let dir = std::env::temp_dir().join(format!("watch-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("default.toml"),
            "[engine]\ntrace_enabled = true\nmax_settle_passes = 3\n\n[observability]\nlog_level = \"debug\"\n",
        )
        .unwrap();

        let config = AppConfig::load_from(dir.to_str().unwrap(), "watch-engine", "test").unwrap();

        assert!(config.engine.trace_enabled);
        assert_eq!(config.engine.max_settle_passes, 3);
        assert_eq!(config.observability.log_level, "debug");

        std::fs::remove_dir_all(&dir).ok();
    }
}
