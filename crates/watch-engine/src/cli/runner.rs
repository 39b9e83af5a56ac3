//! 命令执行器
//!
//! 负责读取规则与场景文件，调用引擎并把结果以 JSON 输出到标准输出。
//! 日志写入标准错误，因此输出可以直接交给其他工具处理。

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::flattener::{Flattened, RuleFlattener};
use crate::models::FlatRule;
use crate::scenario::{ReplayReport, Scenario, ScenarioRunner};

/// flatten 命令的输出
#[derive(Debug, Serialize)]
pub struct FlattenReport {
    pub rules: Vec<FlatRule>,
    pub watched_keys: Vec<String>,
    pub diagnostics: Vec<String>,
}

impl From<Flattened> for FlattenReport {
    fn from(flattened: Flattened) -> Self {
        Self {
            watched_keys: RuleFlattener::watched_keys(&flattened.rules)
                .into_iter()
                .collect(),
            diagnostics: flattened
                .diagnostics
                .iter()
                .map(ToString::to_string)
                .collect(),
            rules: flattened.rules,
        }
    }
}

/// 命令执行器
pub struct CommandRunner {
    max_settle_passes: usize,
    trace_enabled: bool,
}

impl CommandRunner {
    /// 创建命令执行器
    ///
    /// `trace_enabled` 来自配置，命令行的 `--trace` 可以额外打开追踪。
    pub fn new(max_settle_passes: usize, trace_enabled: bool) -> Self {
        Self {
            max_settle_passes,
            trace_enabled,
        }
    }

    /// 执行 flatten 命令
    pub fn run_flatten(&self, path: &Path) -> Result<()> {
        let report = self.flatten_file(path)?;
        info!(
            rules = report.rules.len(),
            watched = report.watched_keys.len(),
            "规则树已展平"
        );
        for diagnostic in &report.diagnostics {
            warn!("{}", diagnostic);
        }
        print_json(&report)
    }

    /// 执行 replay 命令
    pub fn run_replay(&self, path: &Path, settle: bool, trace: bool) -> Result<()> {
        let report = self.replay_file(path, settle, trace)?;
        print_json(&report)
    }

    /// 读取规则文件并展平
    ///
    /// 文件内容可以是规则数组，也可以是带 `rules` 字段的规则集对象。
    pub fn flatten_file(&self, path: &Path) -> Result<FlattenReport> {
        let document = load_document(path)?;
        let rules = match document {
            Value::Object(mut map) => match map.remove("rules") {
                Some(rules) => rules,
                None => bail!("规则集对象缺少 rules 字段: {}", path.display()),
            },
            rules @ Value::Array(_) => rules,
            _ => bail!("规则文件必须是规则数组或规则集对象: {}", path.display()),
        };

        Ok(RuleFlattener::flatten_json(&rules).into())
    }

    /// 读取场景文件并回放
    pub fn replay_file(&self, path: &Path, settle: bool, trace: bool) -> Result<ReplayReport> {
        let document = load_document(path)?;
        let scenario: Scenario = serde_json::from_value(document)
            .with_context(|| format!("场景文件格式错误: {}", path.display()))?;

        let mut runner = ScenarioRunner::new().with_trace(trace || self.trace_enabled);
        if settle {
            runner = runner.with_settle(self.max_settle_passes);
        }

        Ok(runner.run(&scenario))
    }
}

/// 按扩展名读取 JSON 或 YAML 文档
fn load_document(path: &Path) -> Result<Value> {
    let content =
        fs::read_to_string(path).with_context(|| format!("读取文件失败: {}", path.display()))?;

    let is_yaml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));

    if is_yaml {
        serde_yaml::from_str(&content)
            .with_context(|| format!("解析 YAML 失败: {}", path.display()))
    } else {
        serde_json::from_str(&content)
            .with_context(|| format!("解析 JSON 失败: {}", path.display()))
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let output = serde_json::to_string_pretty(value).context("序列化输出失败")?;
    println!("{}", output);
    Ok(())
}
