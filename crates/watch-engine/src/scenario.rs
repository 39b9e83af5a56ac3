//! 回放场景
//!
//! 场景描述一个节点的初始数据和一串用户编辑，执行器扮演宿主：
//! 每一步先应用编辑，再评估规则，并把得到的补丁合并回主体。

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, instrument};

use crate::applicator::Patch;
use crate::error::Result;
use crate::session::{EngineSession, PassOutcome, PassState};

// ---------------------------------------------------------------------------
// 场景定义
// ---------------------------------------------------------------------------

/// 场景定义
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub name: String,
    /// 规则树；保持未定型，格式错误时按无规则处理
    #[serde(default = "empty_array")]
    pub rules: Value,
    /// 初始节点数据
    #[serde(default = "empty_object")]
    pub subject: Value,
    /// 初始的当前字段值
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default)]
    pub steps: Vec<ScenarioStep>,
}

fn empty_array() -> Value {
    Value::Array(Vec::new())
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

/// 一次用户编辑
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScenarioStep {
    /// 覆盖到主体顶层的字段
    #[serde(default)]
    pub set: Map<String, Value>,
    /// 新的当前字段值；缺省时沿用上一步
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default)]
    pub note: Option<String>,
}

impl Scenario {
    /// 从 JSON 字符串解析场景
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// 从 YAML 字符串解析场景
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }
}

// ---------------------------------------------------------------------------
// 执行结果
// ---------------------------------------------------------------------------

/// 单轮评估记录
#[derive(Debug, Clone, Serialize)]
pub struct PassRecord {
    /// 步骤序号，0 表示挂载时的初始评估
    pub step: usize,
    pub state: PassState,
    pub fired: Vec<usize>,
    pub patch: Patch,
    pub diagnostics: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub trace: Vec<String>,
}

impl PassRecord {
    fn new(step: usize, outcome: PassOutcome) -> Self {
        Self {
            step,
            state: outcome.state,
            fired: outcome.fired,
            patch: outcome.patch,
            diagnostics: outcome.diagnostics.iter().map(ToString::to_string).collect(),
            trace: outcome.trace,
        }
    }
}

/// 场景执行结果
#[derive(Debug, Clone, Serialize)]
pub struct ReplayReport {
    pub name: String,
    pub passes: Vec<PassRecord>,
    pub final_subject: Value,
}

impl ReplayReport {
    /// 触发过动作的轮数
    pub fn fired_count(&self) -> usize {
        self.passes
            .iter()
            .filter(|p| p.state == PassState::Fired)
            .count()
    }

    pub fn diagnostics_count(&self) -> usize {
        self.passes.iter().map(|p| p.diagnostics.len()).sum()
    }
}

// ---------------------------------------------------------------------------
// 执行器
// ---------------------------------------------------------------------------

/// 场景执行器
#[derive(Debug, Clone)]
pub struct ScenarioRunner {
    /// 每步之后持续评估直到补丁为空
    settle: bool,
    max_settle_passes: usize,
    trace: bool,
}

impl ScenarioRunner {
    pub fn new() -> Self {
        Self {
            settle: false,
            max_settle_passes: 8,
            trace: false,
        }
    }

    pub fn with_settle(mut self, max_passes: usize) -> Self {
        self.settle = true;
        self.max_settle_passes = max_passes.max(1);
        self
    }

    pub fn with_trace(mut self, enabled: bool) -> Self {
        self.trace = enabled;
        self
    }

    /// 执行场景
    #[instrument(skip(self, scenario), fields(scenario = %scenario.name, steps = scenario.steps.len()))]
    pub fn run(&self, scenario: &Scenario) -> ReplayReport {
        let mut session = EngineSession::from_json(&scenario.rules).with_trace(self.trace);
        let mut subject = scenario.subject.clone();
        let mut external = scenario.value.clone();
        let mut passes = Vec::new();

        self.evaluate_step(&mut session, 0, &mut subject, external.as_ref(), &mut passes);

        for (index, step) in scenario.steps.iter().enumerate() {
            if let Some(map) = subject.as_object_mut() {
                for (key, value) in &step.set {
                    map.insert(key.clone(), value.clone());
                }
            }
            if step.value.is_some() {
                external = step.value.clone();
            }

            self.evaluate_step(&mut session, index + 1, &mut subject, external.as_ref(), &mut passes);
        }

        let report = ReplayReport {
            name: scenario.name.clone(),
            passes,
            final_subject: subject,
        };
        info!(
            passes = report.passes.len(),
            fired = report.fired_count(),
            diagnostics = report.diagnostics_count(),
            "场景回放完成"
        );
        report
    }

    fn evaluate_step(
        &self,
        session: &mut EngineSession,
        step: usize,
        subject: &mut Value,
        external: Option<&Value>,
        passes: &mut Vec<PassRecord>,
    ) {
        if self.settle {
            for outcome in session.settle(subject, external, self.max_settle_passes) {
                passes.push(PassRecord::new(step, outcome));
            }
        } else {
            let outcome = session.evaluate(subject, external);
            outcome.patch.apply_to(subject);
            passes.push(PassRecord::new(step, outcome));
        }
    }
}

impl Default for ScenarioRunner {
    fn default() -> Self {
        Self::new()
    }
}
