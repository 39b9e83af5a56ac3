//! 条件评估器
//!
//! 每次字段变更都会执行，因此评估本身永不失败：
//! 类型不匹配或字段不存在一律视为不满足。

use crate::models::Condition;
use crate::operators::Operator;
use crate::path::Operand;
use crate::value::{compare_numbers, deep_equal};
use serde_json::Value;
use std::cmp::Ordering;

/// 条件评估器
pub struct ConditionEvaluator;

impl ConditionEvaluator {
    /// 评估条件
    ///
    /// # Arguments
    /// * `operand` - 从主体或当前字段值解析出的操作数
    /// * `operator` - 操作符
    /// * `expected_value` - 规则中定义的期望值
    pub fn evaluate(operand: &Operand, operator: Operator, expected_value: &Value) -> bool {
        // 字段不存在时任何操作符都不满足
        let Operand::Found(field_value) = operand else {
            return false;
        };

        match operator {
            Operator::Eq => deep_equal(field_value, expected_value),
            Operator::Neq => !deep_equal(field_value, expected_value),
            Operator::Gt => Self::compare(field_value, expected_value, Ordering::is_gt),
            Operator::Gte => Self::compare(field_value, expected_value, Ordering::is_ge),
            Operator::Lt => Self::compare(field_value, expected_value, Ordering::is_lt),
            Operator::Lte => Self::compare(field_value, expected_value, Ordering::is_le),
            Operator::Include => Self::included(field_value, expected_value),
        }
    }

    /// 评估一个条件记录
    pub fn evaluate_condition(operand: &Operand, condition: &Condition) -> bool {
        Self::evaluate(operand, condition.operator, &condition.value)
    }

    /// 大小比较：数值按数值比较，字符串按字典序比较，其余组合不满足
    fn compare<F>(field: &Value, expected: &Value, cmp: F) -> bool
    where
        F: Fn(Ordering) -> bool,
    {
        let ordering = match (field, expected) {
            (Value::Number(a), Value::Number(b)) => compare_numbers(a, b),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            _ => None,
        };

        ordering.is_some_and(cmp)
    }

    /// 集合成员检查：期望值为数组且包含与字段值结构相等的元素
    fn included(field: &Value, expected: &Value) -> bool {
        expected
            .as_array()
            .is_some_and(|items| items.iter().any(|item| deep_equal(item, field)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn found(value: Value) -> Operand {
        Operand::Found(value)
    }

    #[test]
    fn test_eq_numbers() {
        assert!(ConditionEvaluator::evaluate(&found(json!(100)), Operator::Eq, &json!(100)));
        assert!(ConditionEvaluator::evaluate(&found(json!(100.0)), Operator::Eq, &json!(100)));
        assert!(!ConditionEvaluator::evaluate(&found(json!("100")), Operator::Eq, &json!(100)));
    }

    #[test]
    fn test_eq_structures() {
        assert!(ConditionEvaluator::evaluate(
            &found(json!({"b": [1, 2], "a": "x"})),
            Operator::Eq,
            &json!({"a": "x", "b": [1, 2]})
        ));
        assert!(ConditionEvaluator::evaluate(
            &found(json!(["str"])),
            Operator::Neq,
            &json!(["file"])
        ));
    }

    #[test]
    fn test_null_is_a_value() {
        assert!(ConditionEvaluator::evaluate(&found(Value::Null), Operator::Eq, &Value::Null));
        assert!(ConditionEvaluator::evaluate(&found(Value::Null), Operator::Neq, &json!("content")));
    }

    #[test]
    fn test_numeric_comparisons() {
        assert!(ConditionEvaluator::evaluate(&found(json!(100)), Operator::Gt, &json!(50)));
        assert!(ConditionEvaluator::evaluate(&found(json!(100)), Operator::Gte, &json!(100)));
        assert!(ConditionEvaluator::evaluate(&found(json!(50)), Operator::Lt, &json!(100)));
        assert!(ConditionEvaluator::evaluate(&found(json!(100)), Operator::Lte, &json!(100.0)));
        assert!(!ConditionEvaluator::evaluate(&found(json!(10)), Operator::Gt, &json!(50)));
    }

    #[test]
    fn test_string_ordering() {
        assert!(ConditionEvaluator::evaluate(&found(json!("b")), Operator::Gt, &json!("a")));
        assert!(!ConditionEvaluator::evaluate(&found(json!("a")), Operator::Gte, &json!("b")));
    }

    #[test]
    fn test_incompatible_comparisons_are_false() {
        assert!(!ConditionEvaluator::evaluate(&found(json!({"a": 1})), Operator::Gt, &json!(0)));
        assert!(!ConditionEvaluator::evaluate(&found(json!("10")), Operator::Gt, &json!(5)));
        assert!(!ConditionEvaluator::evaluate(&found(json!(null)), Operator::Lte, &json!(5)));
        assert!(!ConditionEvaluator::evaluate(&found(json!([1])), Operator::Lt, &json!([2])));
    }

    #[test]
    fn test_large_integer_ids() {
        let id = found(json!(9007199254740993u64));
        assert!(!ConditionEvaluator::evaluate(&id, Operator::Eq, &json!(9007199254740992u64)));
        assert!(ConditionEvaluator::evaluate(&id, Operator::Neq, &json!(9007199254740992u64)));
        assert!(ConditionEvaluator::evaluate(&id, Operator::Gt, &json!(9007199254740992u64)));
        assert!(!ConditionEvaluator::evaluate(&id, Operator::Lte, &json!(9007199254740992u64)));
        assert!(!ConditionEvaluator::evaluate(
            &id,
            Operator::Include,
            &json!([9007199254740992u64, 1])
        ));
    }

    #[test]
    fn test_include() {
        assert!(ConditionEvaluator::evaluate(
            &found(json!("KeywordFilter")),
            Operator::Include,
            &json!(["ModuleReranker", "KeywordFilter"])
        ));
        assert!(!ConditionEvaluator::evaluate(
            &found(json!("d")),
            Operator::Include,
            &json!(["a", "b", "c"])
        ));
        assert!(ConditionEvaluator::evaluate(
            &found(json!({"id": 1})),
            Operator::Include,
            &json!([{"id": 1}])
        ));
        // 期望值不是数组
        assert!(!ConditionEvaluator::evaluate(&found(json!("a")), Operator::Include, &json!("abc")));
    }

    #[test]
    fn test_not_found_never_matches() {
        let operators = [
            Operator::Gt,
            Operator::Lt,
            Operator::Gte,
            Operator::Lte,
            Operator::Eq,
            Operator::Neq,
            Operator::Include,
        ];
        for operator in operators {
            assert!(
                !ConditionEvaluator::evaluate(&Operand::NotFound, operator, &json!([null])),
                "operator {} matched a missing field",
                operator
            );
        }
    }

    #[test]
    fn test_evaluate_condition_record() {
        let cond = Condition::new("mode", Operator::Eq, "advanced");
        assert!(ConditionEvaluator::evaluate_condition(&found(json!("advanced")), &cond));
        assert!(!ConditionEvaluator::evaluate_condition(&found(json!("basic")), &cond));
    }
}
