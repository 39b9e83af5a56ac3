//! 联动引擎性能基准测试
//!
//! 测试覆盖：
//! - 规则树展平
//! - 单轮评估（含输入未变化的快速路径）
//! - 不同规则数量下的评估曲线

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use serde_json::{Value, json};
use std::hint::black_box;
use watch_engine::{Action, Condition, EngineSession, Operator, Rule, RuleFlattener};

/// 创建 n 条互相独立的规则，每条带一个子规则
fn create_rules(count: usize) -> Vec<Rule> {
    (0..count)
        .map(|i| {
            Rule::new(
                vec![Condition::new(format!("field_{}", i), Operator::Eq, "on")],
                vec![Action::set(format!("flag_{}", i), true)],
            )
            .with_children(vec![Rule::new(
                vec![Condition::new(format!("level_{}", i), Operator::Gte, 3)],
                vec![Action::extend(format!("cfg_{}", i), json!({"advanced": true}))],
            )])
        })
        .collect()
}

fn create_subject(count: usize, state: &str) -> Value {
    let mut map = serde_json::Map::new();
    for i in 0..count {
        map.insert(format!("field_{}", i), json!(state));
        map.insert(format!("level_{}", i), json!(i % 5));
        map.insert(format!("flag_{}", i), json!(false));
        map.insert(format!("cfg_{}", i), json!({"advanced": false}));
    }
    Value::Object(map)
}

/// 展平基准
fn bench_flatten(c: &mut Criterion) {
    let mut group = c.benchmark_group("flatten");

    for count in [10usize, 100, 1000].iter() {
        let rules = create_rules(*count);
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, _| {
            b.iter(|| RuleFlattener::flatten(black_box(&rules)))
        });
    }

    group.finish();
}

/// 单轮评估基准：交替切换主体，每轮都触发
fn bench_toggle_pass(c: &mut Criterion) {
    let mut group = c.benchmark_group("toggle_pass");

    for count in [10usize, 100].iter() {
        let rules = create_rules(*count);
        let on = create_subject(*count, "on");
        let off = create_subject(*count, "off");

        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, _| {
            let mut session = EngineSession::new(&rules);
            let mut flip = false;
            b.iter(|| {
                flip = !flip;
                let subject = if flip { &on } else { &off };
                session.evaluate(black_box(subject), None)
            })
        });
    }

    group.finish();
}

/// 输入未变化时的快速路径
fn bench_unchanged_pass(c: &mut Criterion) {
    let rules = create_rules(100);
    let subject = create_subject(100, "on");
    let mut session = EngineSession::new(&rules);
    session.evaluate(&subject, None);

    c.bench_function("unchanged_pass_100", |b| {
        b.iter(|| session.evaluate(black_box(&subject), None))
    });
}

criterion_group!(benches, bench_flatten, bench_toggle_pass, bench_unchanged_pass);
criterion_main!(benches);
