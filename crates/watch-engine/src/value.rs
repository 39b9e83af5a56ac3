//! 值比较与类型分类
//!
//! 引擎内所有相等判断、类型兼容检查和合并逻辑都基于这里的辅助函数，
//! 直接在 `serde_json::Value` 上做结构化比较，不经过文本序列化。

use serde_json::{Map, Number, Value};
use std::cmp::Ordering;

/// 粗粒度类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Nullish,
    Object,
    Array,
    Scalar,
}

impl ValueKind {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => Self::Nullish,
            Value::Object(_) => Self::Object,
            Value::Array(_) => Self::Array,
            Value::Bool(_) | Value::Number(_) | Value::String(_) => Self::Scalar,
        }
    }
}

/// 结构化相等
///
/// 对象比较与键顺序无关；数值按数值大小比较（`1` 与 `1.0` 相等）。
pub fn deep_equal(a: &Value, b: &Value) -> bool {
    if std::ptr::eq(a, b) {
        return true;
    }

    match (a, b) {
        (Value::Number(x), Value::Number(y)) => compare_numbers(x, y).is_some_and(Ordering::is_eq),
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(a, b)| deep_equal(a, b))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x
                    .iter()
                    .all(|(key, v)| y.get(key).is_some_and(|w| deep_equal(v, w)))
        }
        _ => a == b,
    }
}

pub fn is_nullish(value: &Value) -> bool {
    value.is_null()
}

/// 数值比较
///
/// 两侧均为整数时精确比较，超过 2^53 的整数也不会混淆；
/// 任一侧为浮点数时按 f64 比较。
pub fn compare_numbers(a: &Number, b: &Number) -> Option<Ordering> {
    match (integer_of(a), integer_of(b)) {
        (Some(x), Some(y)) => Some(x.cmp(&y)),
        _ => a.as_f64()?.partial_cmp(&b.as_f64()?),
    }
}

fn integer_of(n: &Number) -> Option<i128> {
    n.as_i64()
        .map(i128::from)
        .or_else(|| n.as_u64().map(i128::from))
}

/// 写入前的类型兼容检查：任一侧为空，或两侧粗粒度类型相同
pub fn type_compatible(existing: &Value, incoming: &Value) -> bool {
    is_nullish(existing) || is_nullish(incoming) || ValueKind::of(existing) == ValueKind::of(incoming)
}

/// 获取值的类型名称
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// 按 extend 语义合并
///
/// - 对象：浅合并，新值的键覆盖旧值
/// - 数组：以新数组为准，同下标两侧均为对象时做一层浅合并
/// - 其他：直接替换
pub fn extend_value(existing: &Value, incoming: Value) -> Value {
    match (existing, incoming) {
        (Value::Object(old), Value::Object(new)) => Value::Object(merge_objects(old, new)),
        (Value::Array(old), Value::Array(new)) => Value::Array(
            new.into_iter()
                .enumerate()
                .map(|(index, item)| match (old.get(index), item) {
                    (Some(Value::Object(old_item)), Value::Object(new_item)) => {
                        Value::Object(merge_objects(old_item, new_item))
                    }
                    (_, item) => item,
                })
                .collect(),
        ),
        (_, incoming) => incoming,
    }
}

fn merge_objects(old: &Map<String, Value>, new: Map<String, Value>) -> Map<String, Value> {
    let mut merged = old.clone();
    for (key, value) in new {
        merged.insert(key, value);
    }
    merged
}
