mod common;
use crate::common::init_tracing;

use std::error::Error;

use relaybot::exec::ExecutionOutcome;
use relaybot::relay::messages;
use relaybot::relay::{AllowList, CommandRouter, Dispatch, RelayCommand};
use relaybot_test_utils::builders::ConfigFileBuilder;
use relaybot_test_utils::fakes::{FakeRunner, RecordingReply};

type TestResult = Result<(), Box<dyn Error>>;

const OPERATOR: i64 = 1001;
const STRANGER: i64 = 666;

fn router(runner: FakeRunner) -> CommandRouter<FakeRunner, AllowList> {
    let cfg = ConfigFileBuilder::new()
        .allow_user(OPERATOR)
        .repo_path("/srv/app")
        .build();
    CommandRouter::new(cfg.operations().iter().cloned(), cfg.allow_list().clone(), runner)
}

#[tokio::test]
async fn unauthorized_callers_never_spawn_and_get_one_refusal() -> TestResult {
    init_tracing();

    let runner = FakeRunner::succeeding();
    let router = router(runner.clone());

    for command in ["/pull", "/pushdb", "/restart"] {
        let reply = RecordingReply::new();
        let result = router.dispatch(STRANGER, command, &reply).await?;

        assert_eq!(result, Dispatch::Refused);
        assert_eq!(reply.replies(), vec![messages::REFUSAL.to_string()]);
    }

    assert_eq!(runner.spawn_count(), 0);
    Ok(())
}

#[tokio::test]
async fn start_greets_operators_and_rebuffs_strangers() -> TestResult {
    init_tracing();

    let runner = FakeRunner::succeeding();
    let router = router(runner.clone());

    let reply = RecordingReply::new();
    assert_eq!(router.dispatch(OPERATOR, "/start", &reply).await?, Dispatch::Greeted);
    assert_eq!(reply.replies(), vec![messages::GREETING.to_string()]);

    let reply = RecordingReply::new();
    assert_eq!(router.dispatch(STRANGER, "/start", &reply).await?, Dispatch::Refused);
    assert_eq!(reply.replies(), vec![messages::START_REFUSAL.to_string()]);

    assert_eq!(runner.spawn_count(), 0);
    Ok(())
}

#[tokio::test]
async fn authorized_operation_acknowledges_then_replies_once() -> TestResult {
    init_tracing();

    let runner = FakeRunner::new(ExecutionOutcome::Success {
        stdout: "Already up to date.\n".into(),
    });
    let router = router(runner.clone());
    let reply = RecordingReply::new();

    let result = router.dispatch(OPERATOR, "/pull", &reply).await?;

    assert!(matches!(result, Dispatch::Executed(ExecutionOutcome::Success { .. })));
    let pull = router.operation(RelayCommand::Pull).expect("pull registered");
    assert_eq!(
        reply.replies(),
        vec![
            pull.starting_message.clone(),
            pull.spec.success_message.clone().unwrap(),
        ]
    );
    assert_eq!(runner.spawn_count(), 1);
    assert_eq!(runner.seen_specs()[0].name, "pull");
    Ok(())
}

#[tokio::test]
async fn every_outcome_produces_exactly_one_reply_after_ack() -> TestResult {
    init_tracing();

    let outcomes = [
        ExecutionOutcome::Success { stdout: "ok".into() },
        ExecutionOutcome::Failure { stderr: "boom".into(), exit_code: 2 },
        ExecutionOutcome::Blocked,
        ExecutionOutcome::internal("spawn failed"),
    ];

    for outcome in outcomes {
        let runner = FakeRunner::new(outcome.clone());
        let router = router(runner.clone());
        let reply = RecordingReply::new();

        let result = router.dispatch(OPERATOR, "/restart", &reply).await?;

        assert_eq!(result, Dispatch::Executed(outcome.clone()));
        assert_eq!(reply.replies().len(), 2, "outcome {outcome:?}");
        assert_eq!(runner.spawn_count(), 1);
    }
    Ok(())
}

#[tokio::test]
async fn unknown_command_gets_single_reply_and_no_spawn() -> TestResult {
    init_tracing();

    let runner = FakeRunner::succeeding();
    let router = router(runner.clone());
    let reply = RecordingReply::new();

    assert_eq!(router.dispatch(OPERATOR, "/deploy", &reply).await?, Dispatch::Unknown);
    assert_eq!(reply.replies().len(), 1);
    assert!(reply.replies()[0].contains("/deploy"));
    assert_eq!(runner.spawn_count(), 0);
    Ok(())
}

#[tokio::test]
async fn closure_authorizer_is_consulted_per_call() -> TestResult {
    init_tracing();

    let cfg = ConfigFileBuilder::new()
        .allow_user(OPERATOR)
        .repo_path("/srv/app")
        .build();
    let runner = FakeRunner::succeeding();
    let router = CommandRouter::new(
        cfg.operations().iter().cloned(),
        |user: i64| user % 2 == 0,
        runner.clone(),
    );

    router.dispatch(3, "/pushdb", &RecordingReply::new()).await?;
    router.dispatch(4, "/pushdb", &RecordingReply::new()).await?;

    assert_eq!(runner.spawn_count(), 1);
    Ok(())
}
