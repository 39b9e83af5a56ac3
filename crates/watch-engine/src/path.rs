//! 路径解析
//!
//! 点号分隔的路径读写，如 `config__parameters.3._check_names`。
//! 对象按键访问，数组按数字下标访问。

use crate::error::{EngineError, Result};
use crate::value::{deep_equal, extend_value, type_compatible, type_name};
use serde::Serialize;
use serde_json::Value;

/// 解析后的字段路径
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    raw: String,
    segments: Vec<String>,
}

impl FieldPath {
    /// 解析路径；空段（`a..b`、`a.`）视为格式错误
    pub fn parse(path: &str) -> Result<Self> {
        let segments: Vec<String> = path.split('.').map(str::to_string).collect();
        if segments.iter().any(String::is_empty) {
            return Err(EngineError::Evaluation(format!("路径格式错误: '{}'", path)));
        }

        Ok(Self {
            raw: path.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// 读取路径上的值
    pub fn resolve(&self, subject: &Value) -> Operand {
        let mut current = subject;
        for segment in &self.segments {
            match step(current, segment) {
                Some(next) => current = next,
                None => return Operand::NotFound,
            }
        }
        Operand::Found(current.clone())
    }

    /// 向路径写入值
    ///
    /// 中间节点缺失时失败，不会自动创建结构。
    pub fn assign(&self, subject: &mut Value, value: Value, extend: bool) -> Result<()> {
        let (last, parents) = self
            .segments
            .split_last()
            .ok_or_else(|| self.missing())?;

        let mut current = subject;
        for segment in parents {
            current = step_mut(current, segment).ok_or_else(|| self.missing())?;
        }

        match current {
            Value::Object(map) => {
                let next = self.merged(map.get(last.as_str()), value, extend)?;
                map.insert(last.clone(), next);
                Ok(())
            }
            Value::Array(items) => {
                let index = array_index(last).ok_or_else(|| self.missing())?;
                if index < items.len() {
                    let next = self.merged(Some(&items[index]), value, extend)?;
                    items[index] = next;
                    Ok(())
                } else if index == items.len() {
                    items.push(value);
                    Ok(())
                } else {
                    Err(self.missing())
                }
            }
            _ => Err(self.missing()),
        }
    }

    fn merged(&self, existing: Option<&Value>, value: Value, extend: bool) -> Result<Value> {
        let Some(existing) = existing else {
            return Ok(value);
        };

        if !type_compatible(existing, &value) {
            return Err(EngineError::TypeIncompatible {
                path: self.raw.clone(),
                existing: type_name(existing),
                incoming: type_name(&value),
            });
        }

        if extend {
            Ok(extend_value(existing, value))
        } else {
            Ok(value)
        }
    }

    fn missing(&self) -> EngineError {
        EngineError::PathMissing {
            path: self.raw.clone(),
        }
    }
}

/// 数组下标：只接受规范的十进制写法（`0`、`12`），`+0`、`01`、`-1` 都不是下标
fn array_index(segment: &str) -> Option<usize> {
    let canonical = !segment.is_empty()
        && segment.bytes().all(|b| b.is_ascii_digit())
        && (segment == "0" || !segment.starts_with('0'));
    if canonical { segment.parse().ok() } else { None }
}

fn step<'a>(current: &'a Value, segment: &str) -> Option<&'a Value> {
    match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => array_index(segment).and_then(|i| items.get(i)),
        _ => None,
    }
}

fn step_mut<'a>(current: &'a mut Value, segment: &str) -> Option<&'a mut Value> {
    let next = match current {
        Value::Object(map) => map.get_mut(segment),
        Value::Array(items) => array_index(segment).and_then(move |i| items.get_mut(i)),
        _ => None,
    }?;

    // null 中间节点无法继续写入
    if next.is_null() { None } else { Some(next) }
}

/// 条件操作数
///
/// `NotFound` 与 `Found(Value::Null)` 不同：前者表示路径上没有这个字段，
/// 后者表示字段存在且值为 null。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum Operand {
    Found(Value),
    NotFound,
}

impl Operand {
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Found(value) => Some(value),
            Self::NotFound => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    /// 结构化比较两个操作数
    pub fn same_as(&self, other: &Operand) -> bool {
        match (self, other) {
            (Self::Found(a), Self::Found(b)) => deep_equal(a, b),
            (Self::NotFound, Self::NotFound) => true,
            _ => false,
        }
    }
}

impl From<Option<Value>> for Operand {
    fn from(value: Option<Value>) -> Self {
        match value {
            Some(value) => Self::Found(value),
            None => Self::NotFound,
        }
    }
}

/// 按路径读取
pub fn get(path: &str, subject: &Value) -> Result<Operand> {
    Ok(FieldPath::parse(path)?.resolve(subject))
}

/// 按路径写入；路径格式错误按路径缺失处理
pub fn set(path: &str, subject: &mut Value, value: Value, extend: bool) -> Result<()> {
    let field = FieldPath::parse(path).map_err(|_| EngineError::PathMissing {
        path: path.to_string(),
    })?;
    field.assign(subject, value, extend)
}
