//! CLI 模块
//!
//! - `flatten` - 展平规则树并列出监听的字段
//! - `replay` - 回放场景，输出每一轮的评估结果
//!
//! # 使用示例
//!
//! ```bash
//! watch-engine flatten --rules rules.yaml
//! watch-engine replay --scenario reranker.json --settle
//! ```

pub mod commands;
pub mod runner;

pub use commands::{Cli, Commands};
pub use runner::CommandRunner;
