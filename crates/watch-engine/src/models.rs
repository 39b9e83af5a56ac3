//! 规则引擎领域模型

use crate::operators::Operator;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// 规则集：某类节点某个字段上挂载的规则树
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleSet {
    #[serde(default = "new_rule_set_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub rules: Vec<Rule>,
}

fn new_rule_set_id() -> String {
    Uuid::new_v4().to_string()
}

impl RuleSet {
    pub fn new(name: impl Into<String>, rules: Vec<Rule>) -> Self {
        Self {
            id: new_rule_set_id(),
            name: name.into(),
            rules,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }
}

/// 规则树节点
///
/// 子规则继承父规则的全部条件（逻辑与），父规则本身仍然独立生效。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub actions: Vec<Action>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<Rule>>,
}

impl Rule {
    pub fn new(conditions: Vec<Condition>, actions: Vec<Action>) -> Self {
        Self {
            conditions,
            actions,
            children: None,
        }
    }

    pub fn with_children(mut self, children: Vec<Rule>) -> Self {
        self.children = Some(children);
        self
    }
}

/// 条件
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// 主体中的点号路径；缺省时比较宿主传入的当前字段值
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default)]
    pub value: Value,
    #[serde(default)]
    pub operator: Operator,
    /// 允许在首轮评估（没有上一轮快照）时命中
    #[serde(default, alias = "immdiate")]
    pub immediate: bool,
}

impl Condition {
    /// 针对主体路径的条件
    pub fn new(key: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Self {
            key: Some(key.into()),
            value: value.into(),
            operator,
            immediate: false,
        }
    }

    /// 针对当前字段值的条件
    ///
    /// 宿主未传入当前值时操作数为 NotFound，任何操作符（包括 `!==`）都不满足。
    pub fn on_value(operator: Operator, value: impl Into<Value>) -> Self {
        Self {
            key: None,
            value: value.into(),
            operator,
            immediate: false,
        }
    }

    pub fn immediate(mut self) -> Self {
        self.immediate = true;
        self
    }

    /// 实际生效的主体路径；空字符串等同于未设置
    pub fn subject_key(&self) -> Option<&str> {
        self.key.as_deref().filter(|k| !k.is_empty())
    }
}

/// 动作：向主体路径写入一个值
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub key: String,
    #[serde(default)]
    pub value: Value,
    /// 对象浅合并 / 数组按下标合并，而非整体替换
    #[serde(default)]
    pub extend: bool,
}

impl Action {
    pub fn set(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            extend: false,
        }
    }

    pub fn extend(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            extend: true,
        }
    }
}

/// 展平后的规则：祖先条件已内联
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlatRule {
    pub conditions: Vec<Condition>,
    pub actions: Vec<Action>,
}
