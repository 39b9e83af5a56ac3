//! 动作执行器
//!
//! 在主体副本上依次执行命中规则的动作，再与原主体按顶层键比较，
//! 只返回真正发生变化的键。单个动作失败只跳过该动作。

use crate::error::EngineError;
use crate::path::set;
use crate::value::deep_equal;
use crate::watcher::WatchStatusItem;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// 补丁：顶层键到新值的映射
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Patch(Map<String, Value>);

impl Patch {
    pub fn new() -> Self {
        Self::default()
    }

    /// 计算两个主体之间的顶层差异
    pub fn diff(original: &Value, updated: &Value) -> Self {
        let Some(updated) = updated.as_object() else {
            return Self::default();
        };

        let changed = updated
            .iter()
            .filter(|(key, value)| {
                original
                    .get(key.as_str())
                    .is_none_or(|previous| !deep_equal(previous, value))
            })
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        Self(changed)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }

    /// 宿主侧合并补丁；主体不是对象时不做任何事
    pub fn apply_to(&self, subject: &mut Value) {
        if let Some(map) = subject.as_object_mut() {
            for (key, value) in &self.0 {
                map.insert(key.clone(), value.clone());
            }
        }
    }
}

impl From<Map<String, Value>> for Patch {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// 动作执行结果
#[derive(Debug, Clone, Default)]
pub struct Applied {
    pub patch: Patch,
    /// 成功写入的动作数
    pub applied: usize,
    pub diagnostics: Vec<EngineError>,
}

/// 动作执行器
pub struct ActionApplicator;

impl ActionApplicator {
    /// 执行命中规则的全部动作
    ///
    /// 按展平顺序执行，同一路径上后写入者覆盖先写入者。
    pub fn apply(status: &[WatchStatusItem], subject: &Value) -> Applied {
        let mut working = subject.clone();
        let mut applied = 0;
        let mut diagnostics = Vec::new();

        for (i, item) in status.iter().enumerate() {
            if !item.conditions_result {
                continue;
            }

            for action in &item.actions {
                match set(&action.key, &mut working, action.value.clone(), action.extend) {
                    Ok(()) => {
                        applied += 1;
                        debug!(rule = i, key = %action.key, extend = action.extend, "动作已执行");
                    }
                    Err(err) => {
                        warn!(rule = i, key = %action.key, error = %err, "动作执行失败，已跳过");
                        diagnostics.push(err);
                    }
                }
            }
        }

        Applied {
            patch: Patch::diff(subject, &working),
            applied,
            diagnostics,
        }
    }
}
