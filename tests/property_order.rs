// tests/property_order.rs

use std::sync::Arc;
use std::time::Duration;

use proptest::prelude::*;

use fanflow::context::RunContext;
use fanflow::engine::{Engine, EngineOptions};
use fanflow::exec::ExecutorSet;
use fanflow::fs::mock::MockDiscovery;
use fanflow::graph::StepGraph;

use fanflow_test_utils::builders::csv_pipeline_config;
use fanflow_test_utils::fake_executor::FakeExecutor;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// The join consumes artifacts in input-set order no matter how branch
    /// completion is scheduled.
    #[test]
    fn join_order_matches_input_order(
        stems in proptest::collection::hash_set("[a-z]{2,6}", 1..6),
        delays in proptest::collection::vec(0u64..5, 6),
    ) {
        let rt = tokio::runtime::Runtime::new().expect("runtime");
        rt.block_on(async move {
            let stems: Vec<String> = stems.into_iter().collect();

            let mut exec = FakeExecutor::new();
            for (i, stem) in stems.iter().enumerate() {
                exec = exec.delay_when(
                    &format!("{stem}.csv"),
                    Duration::from_millis(delays[i % delays.len()]),
                );
            }

            let items: Vec<String> = stems.iter().map(|s| format!("data/{s}.csv")).collect();

            let cfg = csv_pipeline_config();
            let graph = StepGraph::from_config(&cfg);
            let ctx = Arc::new(RunContext::new(cfg.pipeline.clone(), Some("prop".to_string())));
            let engine = Engine::new(
                ExecutorSet::uniform(Arc::new(exec.clone())),
                Arc::new(MockDiscovery::new(items)),
                EngineOptions::default(),
            );

            let report = engine.run(&graph, ctx).await.expect("run succeeds");
            assert_eq!(report.branch_count, stems.len());

            let join_line = exec
                .invocation_lines()
                .into_iter()
                .find(|l| l.contains("--inputs"))
                .expect("join invoked");

            let mut last = 0usize;
            for stem in &stems {
                let needle = format!("processed_{stem}_prop.csv");
                let pos = join_line.find(&needle).expect("artifact present in join");
                assert!(pos >= last, "artifact out of input order");
                last = pos;
            }
        });
    }
}
