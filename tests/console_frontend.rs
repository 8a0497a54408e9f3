mod common;
use crate::common::{init_tracing, with_timeout};

use std::error::Error;
use std::sync::Arc;

use tokio::sync::Mutex;

use relaybot::exec::ExecutionOutcome;
use relaybot::frontend::serve;
use relaybot::relay::messages;
use relaybot::relay::CommandRouter;
use relaybot_test_utils::builders::ConfigFileBuilder;
use relaybot_test_utils::fakes::FakeRunner;

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn serves_every_line_and_waits_for_inflight_work() -> TestResult {
    init_tracing();

    let cfg = ConfigFileBuilder::new()
        .allow_user(7)
        .repo_path("/srv/app")
        .build();
    let runner = FakeRunner::new(ExecutionOutcome::Blocked);
    let router = Arc::new(CommandRouter::new(
        cfg.operations().iter().cloned(),
        cfg.allow_list().clone(),
        runner.clone(),
    ));

    let input: &[u8] = b"7 /start\n8 /pull\nnot a command\n\n7 /pull\n";
    let out = Arc::new(Mutex::new(Vec::<u8>::new()));

    with_timeout(serve(router, input, Arc::clone(&out), std::future::pending())).await?;

    let written = String::from_utf8(out.lock().await.clone())?;
    let lines: Vec<&str> = written.lines().collect();

    assert!(lines.contains(&format!("[7] {}", messages::GREETING).as_str()));
    assert!(lines.contains(&format!("[8] {}", messages::REFUSAL).as_str()));
    assert!(lines.contains(&"[7] Running git pull..."));
    assert!(written.contains(&format!("[7] {}", messages::BLOCKED)));
    assert_eq!(runner.spawn_count(), 1);
    Ok(())
}

#[tokio::test]
async fn shutdown_stops_intake() -> TestResult {
    init_tracing();

    let cfg = ConfigFileBuilder::new()
        .allow_user(7)
        .repo_path("/srv/app")
        .build();
    let runner = FakeRunner::succeeding();
    let router = Arc::new(CommandRouter::new(
        cfg.operations().iter().cloned(),
        cfg.allow_list().clone(),
        runner.clone(),
    ));

    // Input that never ends; shutdown is already resolved.
    let (_keep_open, reader) = tokio::io::duplex(64);
    let reader = tokio::io::BufReader::new(reader);
    let out = Arc::new(Mutex::new(Vec::<u8>::new()));

    with_timeout(serve(router, reader, out, async {})).await?;

    assert_eq!(runner.spawn_count(), 0);
    Ok(())
}
