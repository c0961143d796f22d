// tests/engine_fanout.rs

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use fanflow::context::RunContext;
use fanflow::engine::{Engine, EngineOptions};
use fanflow::exec::ExecutorSet;
use fanflow::fs::mock::MockDiscovery;
use fanflow::graph::StepGraph;

use fanflow_test_utils::builders::csv_pipeline_config;
use fanflow_test_utils::fake_executor::FakeExecutor;
use fanflow_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

/// Wire the canonical discover → process → combine pipeline with a mocked
/// input set and the given fake backend.
fn engine_with(exec: &FakeExecutor, items: &[&str], options: EngineOptions) -> (Engine, StepGraph, Arc<RunContext>) {
    let cfg = csv_pipeline_config();
    let graph = StepGraph::from_config(&cfg);
    let ctx = Arc::new(RunContext::new(cfg.pipeline.clone(), Some("r1".to_string())));
    let engine = Engine::new(
        ExecutorSet::uniform(Arc::new(exec.clone())),
        Arc::new(MockDiscovery::new(items.to_vec())),
        options,
    );
    (engine, graph, ctx)
}

#[tokio::test]
async fn every_input_gets_a_branch_and_join_sees_input_order() -> TestResult {
    init_tracing();

    // Slow down earlier items so completion order is the reverse of input
    // order; the join must still consume artifacts in input order.
    let exec = FakeExecutor::new()
        .delay_when("student_a.csv", Duration::from_millis(60))
        .delay_when("student_b.csv", Duration::from_millis(30));

    let (engine, graph, ctx) = engine_with(
        &exec,
        &[
            "data/student_a.csv",
            "data/student_b.csv",
            "data/student_c.csv",
        ],
        EngineOptions::default(),
    );

    let report = with_timeout(engine.run(&graph, ctx)).await?;

    assert_eq!(report.branch_count, 3);

    let lines = exec.invocation_lines();
    let branch_lines: Vec<_> = lines.iter().filter(|l| l.contains("--input ")).collect();
    assert_eq!(branch_lines.len(), 3);

    let join_line = lines
        .iter()
        .find(|l| l.contains("--inputs"))
        .expect("join was invoked");

    let pos_a = join_line
        .find("processed_student_a_r1.csv")
        .ok_or("artifact for a missing from join")?;
    let pos_b = join_line
        .find("processed_student_b_r1.csv")
        .ok_or("artifact for b missing from join")?;
    let pos_c = join_line
        .find("processed_student_c_r1.csv")
        .ok_or("artifact for c missing from join")?;
    assert!(pos_a < pos_b && pos_b < pos_c);

    assert!(report
        .final_artifact
        .location()
        .ends_with("final_combined_r1.csv"));

    Ok(())
}

#[tokio::test]
async fn empty_input_set_still_runs_the_join() -> TestResult {
    init_tracing();

    let exec = FakeExecutor::new();
    let (engine, graph, ctx) = engine_with(&exec, &[], EngineOptions::default());

    let report = with_timeout(engine.run(&graph, ctx)).await?;

    assert_eq!(report.branch_count, 0);
    assert!(report
        .final_artifact
        .location()
        .ends_with("final_combined_r1.csv"));

    // Only the join ran, with zero locations between the flags.
    let lines = exec.invocation_lines();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].contains("--inputs --output"));

    Ok(())
}

#[tokio::test]
async fn branch_outputs_are_distinct_and_carry_the_run_tag() -> TestResult {
    init_tracing();

    let exec = FakeExecutor::new();
    let (engine, graph, ctx) = engine_with(&exec, &["a.csv", "b.csv"], EngineOptions::default());

    with_timeout(engine.run(&graph, ctx)).await?;

    let lines = exec.invocation_lines();
    let branch_lines: Vec<_> = lines.iter().filter(|l| l.contains("--input ")).collect();
    assert_eq!(branch_lines.len(), 2);

    let output_of = |line: &str| -> String {
        line.split("--output ")
            .nth(1)
            .expect("branch line has an --output")
            .to_string()
    };
    let outputs: Vec<String> = branch_lines.iter().map(|l| output_of(l)).collect();
    assert_ne!(outputs[0], outputs[1]);
    assert!(outputs.iter().all(|o| o.contains("_r1")));
    assert!(outputs.iter().any(|o| o.ends_with("processed_a_r1.csv")));
    assert!(outputs.iter().any(|o| o.ends_with("processed_b_r1.csv")));

    // The run tag rides in every invocation spec as an explicit env entry.
    assert!(exec.invocations().iter().all(|spec| {
        spec.env
            .iter()
            .any(|(k, v)| k == "FANFLOW_RUN_ID" && v == "r1")
    }));

    Ok(())
}

#[tokio::test]
async fn max_in_flight_bounds_concurrent_branches() -> TestResult {
    init_tracing();

    let exec = FakeExecutor::new().delay_when(".csv", Duration::from_millis(25));
    let (engine, graph, ctx) = engine_with(
        &exec,
        &["a.csv", "b.csv", "c.csv", "d.csv"],
        EngineOptions {
            max_in_flight: Some(1),
            ..EngineOptions::default()
        },
    );

    with_timeout(engine.run(&graph, ctx)).await?;

    assert_eq!(exec.max_observed_in_flight(), 1);

    Ok(())
}

#[tokio::test]
async fn two_file_scenario_end_to_end() -> TestResult {
    init_tracing();

    let exec = FakeExecutor::new();
    let (engine, graph, ctx) = engine_with(&exec, &["a.csv", "b.csv"], EngineOptions::default());

    let report = with_timeout(engine.run(&graph, ctx)).await?;

    assert_eq!(report.branch_count, 2);
    assert!(report.observation_failures.is_empty());
    assert!(report
        .final_artifact
        .location()
        .ends_with("final_combined_r1.csv"));
    assert_eq!(report.final_artifact.producer(), "combine");

    let lines = exec.invocation_lines();
    let join_line = lines
        .iter()
        .find(|l| l.contains("--inputs"))
        .expect("join was invoked");
    let pos_a = join_line.find("processed_a_r1.csv").ok_or("a missing")?;
    let pos_b = join_line.find("processed_b_r1.csv").ok_or("b missing")?;
    assert!(pos_a < pos_b);

    Ok(())
}
