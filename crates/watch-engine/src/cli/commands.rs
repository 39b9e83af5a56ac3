//! CLI 命令定义

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// 字段联动规则引擎命令行工具
#[derive(Parser, Debug)]
#[command(name = "watch-engine")]
#[command(version, about = "字段联动规则调试工具")]
#[command(propagate_version = true)]
pub struct Cli {
    /// 日志级别 (trace, debug, info, warn, error)，缺省时使用配置文件
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// 配置目录，覆盖 CONFIG_DIR
    #[arg(long)]
    pub config_dir: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// 子命令
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// 展平规则树
    ///
    /// 输出展平后的规则、监听字段和展平诊断。
    Flatten {
        /// 规则文件（JSON/YAML），可以是规则数组或规则集对象
        #[arg(short, long)]
        rules: PathBuf,
    },

    /// 回放场景
    Replay {
        /// 场景文件（JSON/YAML）
        #[arg(short, long)]
        scenario: PathBuf,

        /// 每一步之后持续评估直到补丁为空
        #[arg(long)]
        settle: bool,

        /// 输出条件评估追踪
        #[arg(long)]
        trace: bool,
    },
}
