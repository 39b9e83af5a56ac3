//! 引擎会话
//!
//! 每个节点实例持有一个会话，保存展平后的规则、上一轮评估快照和上一轮输入。
//! 同一会话的评估必须串行进行；不同会话之间没有共享状态。

use crate::applicator::{ActionApplicator, Patch};
use crate::error::EngineError;
use crate::flattener::{Flattened, RuleFlattener};
use crate::models::{FlatRule, Rule};
use crate::value::deep_equal;
use crate::watcher::{Evaluation, WatchEvaluator};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

/// 注册评估指标的描述信息
///
/// 宿主安装指标记录器之后调用一次即可。
pub fn describe_metrics() {
    metrics::describe_counter!("watch_passes_total", "Total number of evaluation passes by state");
    metrics::describe_counter!(
        "watch_actions_applied_total",
        "Total number of actions written to a subject"
    );
    metrics::describe_counter!(
        "watch_diagnostics_total",
        "Total number of recovered engine errors by kind"
    );
}

/// 一轮评估的结局
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PassState {
    /// 主体与当前值都未变化，未重新评估
    #[default]
    Skipped,
    /// 评估失败，未触发动作
    Failed,
    /// 快照与上一轮相同，未触发动作
    Unchanged,
    /// 快照已更新，但没有规则命中
    Quiet,
    /// 有规则命中并执行了动作
    Fired,
}

impl PassState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Skipped => "skipped",
            Self::Failed => "failed",
            Self::Unchanged => "unchanged",
            Self::Quiet => "quiet",
            Self::Fired => "fired",
        }
    }
}

/// 一轮评估的输出
#[derive(Debug, Clone, Default)]
pub struct PassOutcome {
    pub state: PassState,
    pub patch: Patch,
    /// 命中规则在展平列表中的下标
    pub fired: Vec<usize>,
    /// 本轮被就地恢复的错误
    pub diagnostics: Vec<EngineError>,
    pub trace: Vec<String>,
}

impl PassOutcome {
    fn new(state: PassState) -> Self {
        Self {
            state,
            ..Self::default()
        }
    }
}

/// 引擎会话
#[derive(Debug)]
pub struct EngineSession {
    rules: Vec<FlatRule>,
    evaluator: WatchEvaluator,
    prior: Evaluation,
    last_inputs: Option<(Value, Option<Value>)>,
    /// 展平阶段的诊断，随下一轮评估返回
    pending_diagnostics: Vec<EngineError>,
}

impl EngineSession {
    pub fn new(rules: &[Rule]) -> Self {
        Self::from_flattened(RuleFlattener::flatten(rules))
    }

    /// 从未定型的 JSON 规则表创建；格式错误时会话没有任何规则
    pub fn from_json(rules: &Value) -> Self {
        Self::from_flattened(RuleFlattener::flatten_json(rules))
    }

    pub fn from_flattened(flattened: Flattened) -> Self {
        Self {
            rules: flattened.rules,
            evaluator: WatchEvaluator::new(),
            prior: Evaluation::Uninitialized,
            last_inputs: None,
            pending_diagnostics: flattened.diagnostics,
        }
    }

    /// 启用或关闭评估追踪
    pub fn with_trace(mut self, enabled: bool) -> Self {
        self.evaluator.set_trace(enabled);
        self
    }

    pub fn rules(&self) -> &[FlatRule] {
        &self.rules
    }

    /// 上一轮保留的评估状态
    pub fn prior(&self) -> &Evaluation {
        &self.prior
    }

    /// 忘记全部历史状态，下一轮按首轮处理
    pub fn reset(&mut self) {
        self.prior = Evaluation::Uninitialized;
        self.last_inputs = None;
    }

    /// 执行一轮评估
    ///
    /// # Arguments
    /// * `subject` - 当前节点数据
    /// * `external` - 当前监听字段的值
    pub fn evaluate(&mut self, subject: &Value, external: Option<&Value>) -> PassOutcome {
        let mut outcome = self.run(subject, external);
        let mut diagnostics = std::mem::take(&mut self.pending_diagnostics);
        diagnostics.append(&mut outcome.diagnostics);
        outcome.diagnostics = diagnostics;

        metrics::counter!("watch_passes_total", "state" => outcome.state.as_str()).increment(1);
        for err in &outcome.diagnostics {
            metrics::counter!("watch_diagnostics_total", "kind" => err.kind()).increment(1);
        }

        outcome
    }

    fn run(&mut self, subject: &Value, external: Option<&Value>) -> PassOutcome {
        if let Some((last_subject, last_external)) = &self.last_inputs {
            let external_same = match (last_external, external) {
                (Some(a), Some(b)) => deep_equal(a, b),
                (None, None) => true,
                _ => false,
            };
            if external_same && deep_equal(last_subject, subject) {
                return PassOutcome::new(PassState::Skipped);
            }
        }
        self.last_inputs = Some((subject.clone(), external.cloned()));

        let pass = self.evaluator.evaluate(&self.rules, subject, external, &self.prior);

        let mut outcome = PassOutcome {
            diagnostics: pass.diagnostics,
            trace: pass.trace,
            ..PassOutcome::default()
        };

        let Evaluation::Settled(snapshot) = pass.evaluation else {
            outcome.state = PassState::Failed;
            return outcome;
        };

        if let Evaluation::Settled(prior) = &self.prior {
            if prior.same_as(&snapshot) {
                outcome.state = PassState::Unchanged;
                return outcome;
            }
        }

        outcome.fired = snapshot.fired();
        let applied = if snapshot.any_fired() {
            Some(ActionApplicator::apply(&snapshot.status, subject))
        } else {
            None
        };
        self.prior = Evaluation::Settled(snapshot);

        let Some(applied) = applied else {
            outcome.state = PassState::Quiet;
            return outcome;
        };

        metrics::counter!("watch_actions_applied_total").increment(applied.applied as u64);
        debug!(
            fired = ?outcome.fired,
            patched = applied.patch.len(),
            "规则命中"
        );

        outcome.state = PassState::Fired;
        outcome.patch = applied.patch;
        outcome.diagnostics.extend(applied.diagnostics);
        outcome
    }

    /// 以宿主身份反复评估并合并补丁，直到补丁为空或达到轮数上限
    ///
    /// 返回每一轮的结果；`subject` 最终为合并全部补丁后的状态。
    pub fn settle(
        &mut self,
        subject: &mut Value,
        external: Option<&Value>,
        max_passes: usize,
    ) -> Vec<PassOutcome> {
        let mut outcomes = Vec::new();

        for _ in 0..max_passes {
            let outcome = self.evaluate(subject, external);
            let done = outcome.patch.is_empty();
            outcome.patch.apply_to(subject);
            outcomes.push(outcome);
            if done {
                return outcomes;
            }
        }

        warn!(max_passes, "规则在轮数上限内未稳定");
        outcomes
    }
}
