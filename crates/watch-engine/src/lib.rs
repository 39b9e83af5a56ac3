//! 字段联动规则引擎
//!
//! 在表单节点数据上评估声明式的联动规则，提供：
//! - 嵌套规则树展平
//! - 点分路径读写与浅合并写入
//! - 带边沿触发的条件评估
//! - 只包含变化键的补丁计算
//! - 按节点划分的会话管理与场景回放

pub mod applicator;
pub mod cli;
pub mod error;
pub mod evaluator;
pub mod flattener;
pub mod models;
pub mod operators;
pub mod path;
pub mod scenario;
pub mod session;
pub mod store;
pub mod value;
pub mod watcher;

pub use applicator::{ActionApplicator, Applied, Patch};
pub use error::{EngineError, Result};
pub use evaluator::ConditionEvaluator;
pub use flattener::{Flattened, RuleFlattener};
pub use models::{Action, Condition, FlatRule, Rule, RuleSet};
pub use operators::Operator;
pub use path::{FieldPath, Operand, get, set};
pub use scenario::{PassRecord, ReplayReport, Scenario, ScenarioRunner, ScenarioStep};
pub use session::{EngineSession, PassOutcome, PassState, describe_metrics};
pub use store::{SessionStore, SessionStoreStats};
pub use watcher::{Evaluation, Snapshot, WatchEvaluator, WatchPass, WatchStatusItem};
