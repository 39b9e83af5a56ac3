//! 监听评估器
//!
//! 对展平后的每条规则解析全部条件操作数并计算命中结果，
//! 同时与上一轮快照比较，实现边沿触发：
//! - 首轮（没有上一轮快照）只有全部条件标记 immediate 的规则可以命中
//! - 之后每轮只有操作数向量发生变化的规则可以命中

use crate::error::{EngineError, Result};
use crate::evaluator::ConditionEvaluator;
use crate::models::{Action, Condition, FlatRule};
use crate::path::{FieldPath, Operand};
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

/// 单条规则的评估详情
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WatchStatusItem {
    pub conditions: Vec<Condition>,
    pub actions: Vec<Action>,
    pub conditions_value: Vec<Operand>,
    pub conditions_result: bool,
}

/// 一轮完整评估的快照
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Snapshot {
    pub status: Vec<WatchStatusItem>,
    pub values: Vec<Vec<Operand>>,
    pub results: Vec<bool>,
}

impl Snapshot {
    /// 命中规则的下标
    pub fn fired(&self) -> Vec<usize> {
        self.results
            .iter()
            .enumerate()
            .filter_map(|(i, &hit)| hit.then_some(i))
            .collect()
    }

    pub fn any_fired(&self) -> bool {
        self.results.iter().any(|&hit| hit)
    }

    /// 结构化比较两轮快照
    pub fn same_as(&self, other: &Snapshot) -> bool {
        self.results == other.results
            && self.values.len() == other.values.len()
            && self
                .values
                .iter()
                .zip(&other.values)
                .all(|(a, b)| operands_equal(a, b))
            && self.status.len() == other.status.len()
            && self.status.iter().zip(&other.status).all(|(a, b)| {
                a.conditions_result == b.conditions_result
                    && a.conditions == b.conditions
                    && a.actions == b.actions
                    && operands_equal(&a.conditions_value, &b.conditions_value)
            })
    }
}

/// 评估状态
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(tag = "state", content = "snapshot", rename_all = "snake_case")]
pub enum Evaluation {
    /// 尚未评估过
    #[default]
    Uninitialized,
    /// 本轮评估失败，不触发任何动作
    Error,
    Settled(Snapshot),
}

impl Evaluation {
    pub fn snapshot(&self) -> Option<&Snapshot> {
        match self {
            Self::Settled(snapshot) => Some(snapshot),
            _ => None,
        }
    }

    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Settled(_))
    }

    pub fn same_as(&self, other: &Evaluation) -> bool {
        match (self, other) {
            (Self::Settled(a), Self::Settled(b)) => a.same_as(b),
            (Self::Uninitialized, Self::Uninitialized) | (Self::Error, Self::Error) => true,
            _ => false,
        }
    }
}

/// 一轮评估的输出
#[derive(Debug, Clone, Default)]
pub struct WatchPass {
    pub evaluation: Evaluation,
    pub diagnostics: Vec<EngineError>,
    pub trace: Vec<String>,
}

/// 监听评估器
#[derive(Debug)]
pub struct WatchEvaluator {
    /// 是否记录详细评估追踪
    trace_enabled: bool,
}

impl WatchEvaluator {
    pub fn new() -> Self {
        Self {
            trace_enabled: false,
        }
    }

    /// 启用评估追踪
    pub fn with_trace(mut self) -> Self {
        self.trace_enabled = true;
        self
    }

    pub fn set_trace(&mut self, enabled: bool) {
        self.trace_enabled = enabled;
    }

    /// 执行一轮评估
    ///
    /// # Arguments
    /// * `rules` - 展平后的规则
    /// * `subject` - 当前节点数据
    /// * `external` - 当前监听字段的值，供未设置 key 的条件使用
    /// * `prior` - 上一轮评估状态
    pub fn evaluate(
        &self,
        rules: &[FlatRule],
        subject: &Value,
        external: Option<&Value>,
        prior: &Evaluation,
    ) -> WatchPass {
        let mut trace = Vec::new();

        match self.evaluate_rules(rules, subject, external, prior, &mut trace) {
            Ok(snapshot) => WatchPass {
                evaluation: Evaluation::Settled(snapshot),
                diagnostics: Vec::new(),
                trace,
            },
            Err(err) => {
                warn!(error = %err, "监听评估失败，本轮不触发任何动作");
                WatchPass {
                    evaluation: Evaluation::Error,
                    diagnostics: vec![err],
                    trace,
                }
            }
        }
    }

    fn evaluate_rules(
        &self,
        rules: &[FlatRule],
        subject: &Value,
        external: Option<&Value>,
        prior: &Evaluation,
        trace: &mut Vec<String>,
    ) -> Result<Snapshot> {
        let first_pass = matches!(prior, Evaluation::Uninitialized);
        let prior_values = prior.snapshot().map(|s| &s.values);

        let mut snapshot = Snapshot {
            status: Vec::with_capacity(rules.len()),
            values: Vec::with_capacity(rules.len()),
            results: Vec::with_capacity(rules.len()),
        };

        for (i, rule) in rules.iter().enumerate() {
            let mut values = Vec::with_capacity(rule.conditions.len());
            let mut result = true;

            // 不短路：每个条件的操作数都要记录，供下一轮比较
            for (j, cond) in rule.conditions.iter().enumerate() {
                let operand = match cond.subject_key() {
                    Some(key) => FieldPath::parse(key)?.resolve(subject),
                    None => Operand::from(external.cloned()),
                };

                let matched = ConditionEvaluator::evaluate_condition(&operand, cond);
                result = result && matched;
                if first_pass && !cond.immediate {
                    result = false;
                }

                if self.trace_enabled {
                    trace.push(format!(
                        "rules[{}].conditions[{}]: {} {} {} => {}",
                        i,
                        j,
                        cond.subject_key().unwrap_or("<value>"),
                        cond.operator,
                        cond.value,
                        if matched { "MATCHED" } else { "NOT_MATCHED" }
                    ));
                }

                values.push(operand);
            }

            if let Some(prior_values) = prior_values {
                let changed = prior_values
                    .get(i)
                    .is_none_or(|previous| !operands_equal(previous, &values));
                if result && !changed && self.trace_enabled {
                    trace.push(format!("rules[{}]: 操作数未变化，抑制触发", i));
                }
                result = result && changed;
            } else if first_pass && self.trace_enabled && !result {
                trace.push(format!("rules[{}]: 首轮评估，未标记 immediate", i));
            }

            snapshot.status.push(WatchStatusItem {
                conditions: rule.conditions.clone(),
                actions: rule.actions.clone(),
                conditions_value: values.clone(),
                conditions_result: result,
            });
            snapshot.values.push(values);
            snapshot.results.push(result);
        }

        Ok(snapshot)
    }
}

impl Default for WatchEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

fn operands_equal(a: &[Operand], b: &[Operand]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.same_as(y))
}
