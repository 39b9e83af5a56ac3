//! 条件操作符定义

use serde::{Deserialize, Serialize};
use std::fmt;

/// 条件操作符
///
/// 序列化形式沿用规则表中的符号写法（`>`、`===`、`include` 等），
/// 缺省时为相等比较。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    // 数值比较
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">=")]
    Gte,
    #[serde(rename = "<=")]
    Lte,

    // 通用比较
    #[default]
    #[serde(rename = "===", alias = "==")]
    Eq,
    #[serde(rename = "!==", alias = "!=")]
    Neq,

    // 集合成员
    #[serde(rename = "include")]
    Include,
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Gte => ">=",
            Self::Lte => "<=",
            Self::Eq => "===",
            Self::Neq => "!==",
            Self::Include => "include",
        };
        write!(f, "{}", s)
    }
}
