//! 规则引擎错误类型
//!
//! 前四类错误在引擎内部就地恢复，只以诊断信息的形式返回给宿主，
//! 不会穿过公开入口向外传播。

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("规则树格式错误: {0}")]
    MalformedRule(String),

    #[error("条件评估失败: {0}")]
    Evaluation(String),

    #[error("路径不存在: {path}")]
    PathMissing { path: String },

    #[error("类型不兼容: {path} 当前为 {existing}, 写入值为 {incoming}")]
    TypeIncompatible {
        path: String,
        existing: &'static str,
        incoming: &'static str,
    },

    #[error("规则集未找到: {0}")]
    RuleSetNotFound(String),

    #[error("会话未找到: {0}")]
    SessionNotFound(String),

    #[error("规则集解析失败: {0}")]
    Parse(String),
}

impl EngineError {
    /// 诊断类别，用于日志与指标标签
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MalformedRule(_) => "malformed_rule",
            Self::Evaluation(_) => "evaluation",
            Self::PathMissing { .. } => "path_missing",
            Self::TypeIncompatible { .. } => "type_incompatible",
            Self::RuleSetNotFound(_) => "rule_set_not_found",
            Self::SessionNotFound(_) => "session_not_found",
            Self::Parse(_) => "parse",
        }
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

impl From<serde_yaml::Error> for EngineError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
