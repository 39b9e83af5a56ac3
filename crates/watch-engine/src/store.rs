//! 会话存储管理
//!
//! 使用 DashMap 保存规则集与按节点划分的引擎会话。不同节点可以在不同线程上
//! 并行评估；同一节点的评估由条目锁串行化。

use crate::error::{EngineError, Result};
use crate::models::RuleSet;
use crate::session::{EngineSession, PassOutcome};
use dashmap::DashMap;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// 会话存储
#[derive(Clone, Default)]
pub struct SessionStore {
    /// 已注册的规则集
    rule_sets: Arc<DashMap<String, RuleSet>>,
    /// 节点 ID -> 会话
    sessions: Arc<DashMap<String, EngineSession>>,
    /// 新会话是否启用评估追踪
    trace_enabled: bool,
}

impl SessionStore {
    /// 创建新的会话存储
    pub fn new() -> Self {
        Self::default()
    }

    /// 新建会话时启用评估追踪
    pub fn with_trace(mut self, enabled: bool) -> Self {
        self.trace_enabled = enabled;
        self
    }

    /// 注册规则集（同 ID 覆盖）
    #[instrument(skip(self, rule_set), fields(rule_set_id = %rule_set.id, rule_set_name = %rule_set.name))]
    pub fn register(&self, rule_set: RuleSet) -> String {
        let id = rule_set.id.clone();
        self.rule_sets.insert(id.clone(), rule_set);
        info!("规则集已注册: {}", id);
        id
    }

    /// 注册规则集（从 JSON 字符串）
    #[instrument(skip(self, json))]
    pub fn register_from_json(&self, json: &str) -> Result<String> {
        let rule_set: RuleSet = serde_json::from_str(json)?;
        Ok(self.register(rule_set))
    }

    /// 注册规则集（从 YAML 字符串）
    #[instrument(skip(self, yaml))]
    pub fn register_from_yaml(&self, yaml: &str) -> Result<String> {
        let rule_set: RuleSet = serde_yaml::from_str(yaml)?;
        Ok(self.register(rule_set))
    }

    /// 获取规则集
    pub fn rule_set(&self, id: &str) -> Option<RuleSet> {
        self.rule_sets.get(id).map(|r| r.clone())
    }

    /// 为节点打开会话；已存在的会话会被替换并重新从首轮开始
    #[instrument(skip(self))]
    pub fn open(&self, node_id: &str, rule_set_id: &str) -> Result<()> {
        let rule_set = self
            .rule_sets
            .get(rule_set_id)
            .ok_or_else(|| EngineError::RuleSetNotFound(rule_set_id.to_string()))?;

        let session = EngineSession::new(&rule_set.rules).with_trace(self.trace_enabled);
        drop(rule_set);

        if self.sessions.insert(node_id.to_string(), session).is_some() {
            debug!("节点会话已替换: {}", node_id);
        }
        Ok(())
    }

    /// 评估节点
    ///
    /// 节点 ID 为空时不做评估，直接返回跳过结果。
    pub fn evaluate(
        &self,
        node_id: &str,
        subject: &Value,
        external: Option<&Value>,
    ) -> Result<PassOutcome> {
        if node_id.is_empty() {
            return Ok(PassOutcome::default());
        }

        let mut session = self
            .sessions
            .get_mut(node_id)
            .ok_or_else(|| EngineError::SessionNotFound(node_id.to_string()))?;

        Ok(session.evaluate(subject, external))
    }

    /// 重置节点会话的历史状态
    pub fn reset(&self, node_id: &str) -> Result<()> {
        let mut session = self
            .sessions
            .get_mut(node_id)
            .ok_or_else(|| EngineError::SessionNotFound(node_id.to_string()))?;
        session.reset();
        Ok(())
    }

    /// 关闭节点会话
    #[instrument(skip(self))]
    pub fn close(&self, node_id: &str) -> Result<()> {
        if self.sessions.remove(node_id).is_some() {
            debug!("节点会话已关闭: {}", node_id);
            Ok(())
        } else {
            warn!("关闭不存在的会话: {}", node_id);
            Err(EngineError::SessionNotFound(node_id.to_string()))
        }
    }

    /// 检查节点会话是否存在
    pub fn contains(&self, node_id: &str) -> bool {
        self.sessions.contains_key(node_id)
    }

    /// 当前会话数量
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// 获取统计信息
    pub fn stats(&self) -> SessionStoreStats {
        let sessions_count = self.sessions.len();
        let total_rules: usize = self.sessions.iter().map(|s| s.rules().len()).sum();

        SessionStoreStats {
            rule_sets_count: self.rule_sets.len(),
            sessions_count,
            avg_rules_per_session: if sessions_count > 0 {
                total_rules as f64 / sessions_count as f64
            } else {
                0.0
            },
        }
    }
}

/// 会话存储统计信息
#[derive(Debug, Clone)]
pub struct SessionStoreStats {
    /// 已注册规则集数量
    pub rule_sets_count: usize,
    /// 打开的会话数量
    pub sessions_count: usize,
    /// 平均每个会话展平后的规则数
    pub avg_rules_per_session: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Action, Condition, Rule};
    use crate::operators::Operator;
    use crate::session::PassState;
    use serde_json::json;

    fn sample_rule_set(id: &str) -> RuleSet {
        RuleSet::new(
            "output_format",
            vec![Rule::new(
                vec![Condition::on_value(Operator::Eq, "content")],
                vec![Action::set("hidden", false)],
            )],
        )
        .with_id(id)
    }

    #[test]
    fn test_register_and_open() {
        let store = SessionStore::new();
        store.register(sample_rule_set("reranker.output_format"));

        store.open("node-1", "reranker.output_format").unwrap();

        assert!(store.contains("node-1"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_open_unknown_rule_set() {
        let store = SessionStore::new();
        let err = store.open("node-1", "missing").unwrap_err();
        assert_eq!(err, EngineError::RuleSetNotFound("missing".to_string()));
    }

    #[test]
    fn test_register_from_json_and_yaml() {
        let store = SessionStore::new();
        let id = store
            .register_from_json(r#"{"id": "a", "name": "json", "rules": [{"conditions": [], "actions": []}]}"#)
            .unwrap();
        assert_eq!(id, "a");

        let yaml = "id: b\nname: yaml\nrules:\n  - conditions:\n      - key: mode\n        value: advanced\n    actions:\n      - key: extra\n        value: {}\n";
        let id = store.register_from_yaml(yaml).unwrap();
        assert_eq!(id, "b");
        assert_eq!(store.rule_set("b").unwrap().rules[0].actions[0].key, "extra");

        assert!(matches!(store.register_from_json("not json"), Err(EngineError::Parse(_))));
    }

    #[test]
    fn test_sessions_are_independent() {
        let store = SessionStore::new();
        store.register(sample_rule_set("fmt"));
        store.open("node-1", "fmt").unwrap();
        store.open("node-2", "fmt").unwrap();

        let subject = json!({"hidden": true});
        store.evaluate("node-1", &subject, Some(&json!("node"))).unwrap();
        let fired = store.evaluate("node-1", &subject, Some(&json!("content"))).unwrap();
        assert_eq!(fired.state, PassState::Fired);

        // node-2 仍处于首轮
        let first = store.evaluate("node-2", &subject, Some(&json!("content"))).unwrap();
        assert_eq!(first.state, PassState::Quiet);
    }

    #[test]
    fn test_empty_node_id_skips() {
        let store = SessionStore::new();
        let outcome = store.evaluate("", &json!({}), None).unwrap();
        assert_eq!(outcome.state, PassState::Skipped);
    }

    #[test]
    fn test_unknown_session() {
        let store = SessionStore::new();
        assert!(matches!(
            store.evaluate("ghost", &json!({}), None),
            Err(EngineError::SessionNotFound(_))
        ));
        assert!(store.close("ghost").is_err());
    }

    #[test]
    fn test_close_and_stats() {
        let store = SessionStore::new();
        store.register(sample_rule_set("fmt"));
        store.open("node-1", "fmt").unwrap();
        store.open("node-2", "fmt").unwrap();

        let stats = store.stats();
        assert_eq!(stats.rule_sets_count, 1);
        assert_eq!(stats.sessions_count, 2);
        assert_eq!(stats.avg_rules_per_session, 1.0);

        store.close("node-1").unwrap();
        assert_eq!(store.len(), 1);
        assert!(!store.contains("node-1"));
    }

    #[test]
    fn test_parallel_evaluation_across_nodes() {
        let store = SessionStore::new();
        store.register(sample_rule_set("fmt"));
        for i in 0..8 {
            store.open(&format!("node-{}", i), "fmt").unwrap();
        }

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                std::thread::spawn(move || {
                    let node_id = format!("node-{}", i);
                    let subject = json!({"hidden": true});
                    store.evaluate(&node_id, &subject, Some(&json!("node"))).unwrap();
                    store
                        .evaluate(&node_id, &subject, Some(&json!("content")))
                        .unwrap()
                })
            })
            .collect();

        for handle in handles {
            let outcome = handle.join().unwrap();
            assert_eq!(outcome.patch.get("hidden"), Some(&json!(false)));
        }
    }
}
