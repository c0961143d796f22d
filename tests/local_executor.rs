// tests/local_executor.rs

//! Real-process tests for the executor backends, using `sh` and script
//! doubles placed on a temporary search path.

#![cfg(unix)]

use std::error::Error;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use fanflow::errors::FanflowError;
use fanflow::exec::{
    invoke_with_retry, BatchQueueExecutor, CommandSpec, ContainerExecutor, Executor,
    LocalProcessExecutor, RetryPolicy, VolumeMapping,
};
use fanflow_test_utils::init_tracing;

type TestResult = Result<(), Box<dyn Error>>;

fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write script");
    let mut perms = fs::metadata(&path).expect("metadata").permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).expect("chmod");
    path
}

#[tokio::test]
async fn local_executor_captures_output_and_exit_status() -> TestResult {
    init_tracing();

    let outcome = LocalProcessExecutor::new()
        .invoke(CommandSpec::new("sh").arg("-c").arg("echo hello"))
        .await?;

    assert!(outcome.success());
    assert_eq!(outcome.exit_code, 0);
    assert_eq!(outcome.stdout.trim(), "hello");

    Ok(())
}

#[tokio::test]
async fn nonzero_exit_is_surfaced_not_swallowed() -> TestResult {
    init_tracing();

    let outcome = LocalProcessExecutor::new()
        .invoke(CommandSpec::new("sh").arg("-c").arg("echo oops >&2; exit 3"))
        .await?;

    assert!(!outcome.success());
    assert_eq!(outcome.exit_code, 3);
    assert!(outcome.stderr.contains("oops"));
    assert!(outcome.failure_detail().contains("exit code 3"));

    Ok(())
}

#[tokio::test]
async fn missing_binary_is_the_distinct_not_found_error() -> TestResult {
    init_tracing();

    let err = LocalProcessExecutor::new()
        .invoke(CommandSpec::new("fanflow-no-such-binary"))
        .await
        .expect_err("binary does not exist");

    assert!(matches!(err, FanflowError::ExecutorNotFound { .. }));

    Ok(())
}

#[tokio::test]
async fn spec_env_and_search_path_are_applied_explicitly() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    write_script(dir.path(), "probe", "echo \"$FANFLOW_RUN_ID\"");

    let outcome = LocalProcessExecutor::new()
        .invoke(
            CommandSpec::new("probe")
                .env("FANFLOW_RUN_ID", "r42")
                .prepend_path(dir.path()),
        )
        .await?;

    assert!(outcome.success());
    assert_eq!(outcome.stdout.trim(), "r42");

    Ok(())
}

#[tokio::test]
async fn batch_executor_finds_the_client_on_the_configured_path() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    write_script(dir.path(), "fakequeue", "echo \"$@\"");

    let executor =
        BatchQueueExecutor::new("fakequeue", "short").with_client_path(dir.path());

    let outcome = executor
        .invoke(CommandSpec::new("python3").arg("scripts/process.py"))
        .await?;

    assert!(outcome.success());
    assert_eq!(
        outcome.stdout.trim(),
        "--wait --queue short -- python3 scripts/process.py"
    );

    Ok(())
}

#[tokio::test]
async fn container_executor_assembles_an_isolated_run() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    write_script(dir.path(), "fakedocker", "echo \"$@\"");

    let executor = ContainerExecutor::new("fakedocker", "csv-tools:latest")
        .with_volume(VolumeMapping::parse("data:/work/data")?)
        .with_workdir("/work");

    let outcome = executor
        .invoke(
            CommandSpec::new("python3")
                .arg("scripts/analyze.py")
                .env("FANFLOW_RUN_ID", "r7")
                .prepend_path(dir.path()),
        )
        .await?;

    assert!(outcome.success());
    assert_eq!(
        outcome.stdout.trim(),
        "run --rm -v data:/work/data -w /work -e FANFLOW_RUN_ID=r7 csv-tools:latest python3 scripts/analyze.py"
    );

    Ok(())
}

#[tokio::test]
async fn missing_container_runtime_is_the_distinct_not_found_error() -> TestResult {
    init_tracing();

    let executor = ContainerExecutor::new("fanflow-no-such-runtime", "img");
    let err = executor
        .invoke(CommandSpec::new("python3"))
        .await
        .expect_err("runtime does not exist");

    assert!(matches!(err, FanflowError::ExecutorNotFound { .. }));

    Ok(())
}

#[tokio::test]
async fn retry_reinvokes_until_success() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    let marker = dir.path().join("first-attempt-done");
    write_script(
        dir.path(),
        "flaky",
        "if [ -f \"$MARKER\" ]; then echo ok; exit 0; fi\ntouch \"$MARKER\"\nexit 1",
    );

    let spec = CommandSpec::new("flaky")
        .env("MARKER", marker.display().to_string())
        .prepend_path(dir.path());

    let outcome = invoke_with_retry(
        &LocalProcessExecutor::new(),
        &spec,
        RetryPolicy::new(2, Duration::from_millis(10)),
    )
    .await?;

    assert!(outcome.success());
    assert_eq!(outcome.stdout.trim(), "ok");

    Ok(())
}

#[tokio::test]
async fn single_attempt_policy_does_not_retry() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    let counter = dir.path().join("attempts");
    write_script(
        dir.path(),
        "counting",
        "echo x >> \"$COUNTER\"\nexit 1",
    );

    let spec = CommandSpec::new("counting")
        .env("COUNTER", counter.display().to_string())
        .prepend_path(dir.path());

    let outcome = invoke_with_retry(
        &LocalProcessExecutor::new(),
        &spec,
        RetryPolicy::default(),
    )
    .await?;

    assert!(!outcome.success());
    let attempts = fs::read_to_string(&counter)?;
    assert_eq!(attempts.lines().count(), 1);

    Ok(())
}
