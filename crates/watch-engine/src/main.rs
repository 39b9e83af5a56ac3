//! 字段联动规则引擎命令行入口
//!
//! 提供规则树展平与场景回放，用于在宿主之外调试联动规则。

use anyhow::Result;
use clap::Parser;
use tracing::debug;
use watch_engine::cli::{Cli, CommandRunner, Commands};
use watch_shared::config::AppConfig;
use watch_shared::observability;

const SERVICE_NAME: &str = "watch-engine";

fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded = match cli.config_dir.as_deref() {
        Some(dir) => {
            let env = std::env::var("WATCH_ENV").unwrap_or_else(|_| "development".to_string());
            AppConfig::load_from(dir, SERVICE_NAME, &env)
        }
        None => AppConfig::load(SERVICE_NAME),
    };
    let config = loaded.unwrap_or_else(|e| {
        eprintln!("Failed to load config, using defaults: {}", e);
        AppConfig::default()
    });

    // 命令行日志级别优先于配置文件
    let obs_config = config
        .observability
        .clone()
        .with_service_name(&config.service_name)
        .with_log_level(cli.log_level.as_deref());
    observability::init(&obs_config)?;
    watch_engine::describe_metrics();

    debug!(
        environment = %config.environment,
        max_settle_passes = config.engine.max_settle_passes,
        "配置已加载"
    );

    let runner = CommandRunner::new(
        config.engine.max_settle_passes,
        config.engine.trace_enabled,
    );

    match cli.command {
        Commands::Flatten { rules } => runner.run_flatten(&rules)?,
        Commands::Replay {
            scenario,
            settle,
            trace,
        } => runner.run_replay(&scenario, settle, trace)?,
    }

    Ok(())
}
