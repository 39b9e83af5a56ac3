//! 共享库
//!
//! 包含规则引擎与命令行工具共用的配置和可观测性基础设施。

pub mod config;
pub mod observability;

pub use config::{AppConfig, EngineConfig};
pub use observability::ObservabilityConfig;
