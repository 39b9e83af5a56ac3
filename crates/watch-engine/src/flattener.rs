//! 规则树展平
//!
//! 将带 children 的规则树展开为线性列表：每个子规则的条件为
//! 祖先条件与自身条件的拼接。父规则先于子规则输出，兄弟规则保持声明顺序。

use crate::error::EngineError;
use crate::models::{FlatRule, Rule};
use serde_json::Value;
use std::collections::BTreeSet;
use tracing::warn;

/// 展平结果
#[derive(Debug, Clone, Default)]
pub struct Flattened {
    pub rules: Vec<FlatRule>,
    pub diagnostics: Vec<EngineError>,
}

/// 规则树展平器
pub struct RuleFlattener;

impl RuleFlattener {
    /// 展平规则树
    ///
    /// 输入只读，输出中的条件与动作均为独立副本。
    pub fn flatten(rules: &[Rule]) -> Flattened {
        let mut flattened = Flattened::default();
        Self::flatten_into(rules, None, "rules", &mut flattened);
        flattened
    }

    /// 从未定型的 JSON 规则表展平
    ///
    /// 结构不合法时按“没有规则”处理，并返回诊断信息。
    pub fn flatten_json(value: &Value) -> Flattened {
        match serde_json::from_value::<Vec<Rule>>(value.clone()) {
            Ok(rules) => Self::flatten(&rules),
            Err(e) => {
                let err = EngineError::MalformedRule(e.to_string());
                warn!(error = %err, "规则树解析失败，本轮按无规则处理");
                Flattened {
                    rules: Vec::new(),
                    diagnostics: vec![err],
                }
            }
        }
    }

    /// 提取展平规则中引用的全部主体路径
    pub fn watched_keys(rules: &[FlatRule]) -> BTreeSet<String> {
        rules
            .iter()
            .flat_map(|rule| rule.conditions.iter())
            .filter_map(|cond| cond.subject_key())
            .map(str::to_string)
            .collect()
    }

    fn flatten_into(rules: &[Rule], parent: Option<&FlatRule>, path: &str, out: &mut Flattened) {
        for (i, rule) in rules.iter().enumerate() {
            let rule_path = format!("{}[{}]", path, i);

            let conditions = match parent {
                Some(parent) => parent
                    .conditions
                    .iter()
                    .chain(rule.conditions.iter())
                    .cloned()
                    .collect(),
                None => rule.conditions.clone(),
            };
            let item = FlatRule {
                conditions,
                actions: rule.actions.clone(),
            };

            out.rules.push(item.clone());

            if let Some(children) = &rule.children {
                let before = out.rules.len();
                let children_path = format!("{}.children", rule_path);
                Self::flatten_into(children, Some(&item), &children_path, out);

                if out.rules.len() == before {
                    let err = EngineError::MalformedRule(format!(
                        "'{}' 声明了 children 但没有展开出任何子规则",
                        rule_path
                    ));
                    warn!(error = %err, "规则树展平异常");
                    out.diagnostics.push(err);
                }
            }
        }
    }
}
