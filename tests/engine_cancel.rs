// tests/engine_cancel.rs

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;

use fanflow::context::RunContext;
use fanflow::engine::{Engine, EngineOptions};
use fanflow::errors::FanflowError;
use fanflow::exec::ExecutorSet;
use fanflow::fs::mock::MockDiscovery;
use fanflow::graph::StepGraph;

use fanflow_test_utils::builders::csv_pipeline_config;
use fanflow_test_utils::fake_executor::FakeExecutor;
use fanflow_test_utils::init_tracing;

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn cancelling_mid_fanout_is_a_distinct_terminal_state() -> TestResult {
    init_tracing();

    // Branches that would run for far longer than the test allows; only
    // cancellation can end the run this quickly.
    let exec = FakeExecutor::new().delay_when(".csv", Duration::from_secs(30));

    let cfg = csv_pipeline_config();
    let graph = StepGraph::from_config(&cfg);
    let ctx = Arc::new(RunContext::new(cfg.pipeline.clone(), Some("r1".to_string())));
    let engine = Engine::new(
        ExecutorSet::uniform(Arc::new(exec.clone())),
        Arc::new(MockDiscovery::new(["a.csv", "b.csv"])),
        EngineOptions::default(),
    );

    let cancel = engine.cancel_token();
    let handle = tokio::spawn(async move { engine.run(&graph, ctx).await });

    tokio::time::sleep(Duration::from_millis(50)).await;
    cancel.cancel();

    let result = timeout(Duration::from_secs(2), handle).await??;

    match result {
        Err(FanflowError::Cancelled) => {}
        Ok(_) => return Err("run unexpectedly succeeded".into()),
        Err(other) => return Err(format!("unexpected error: {other}").into()),
    }

    // The join never ran.
    assert!(!exec.invocation_lines().iter().any(|l| l.contains("--inputs")));

    Ok(())
}

#[tokio::test]
async fn cancelling_before_the_run_short_circuits() -> TestResult {
    init_tracing();

    let exec = FakeExecutor::new();
    let cfg = csv_pipeline_config();
    let graph = StepGraph::from_config(&cfg);
    let ctx = Arc::new(RunContext::new(cfg.pipeline.clone(), Some("r1".to_string())));
    let engine = Engine::new(
        ExecutorSet::uniform(Arc::new(exec.clone())),
        Arc::new(MockDiscovery::new(["a.csv"])),
        EngineOptions::default(),
    );

    engine.cancel_token().cancel();

    let result = engine.run(&graph, ctx).await;
    assert!(matches!(result, Err(FanflowError::Cancelled)));
    assert!(exec.invocation_lines().is_empty());

    Ok(())
}
