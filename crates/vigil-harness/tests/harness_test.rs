//! Integration tests for running feature batches against the in-process engine.

use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures::FutureExt;
use vigil_engine::{Engine, EngineConfig, WorkflowContext, WorkflowDefinition, WorkflowError};
use vigil_harness::{
    AllOf, CustomCheck, CustomExecution, Feature, Harness, HarnessConfig, HarnessError, Outcome,
    PayloadFixture, ScalarEquality, SignalAfterStart, SkipUnless, UpdateAfterStart,
    UpdateExpectation,
};
use vigil_types::{
    Capabilities, Capability, FromPayload, Json, Payload, SignalEnvelope, ToPayload,
    UpdateEnvelope,
};

const DEADBEEF_FIXTURE: &str = r#"{"metadata":{"encoding":"YmluYXJ5L3BsYWlu"},"data":"3q2+7w=="}"#;

fn harness(engine: Engine) -> Harness {
    Harness::new(engine, HarnessConfig::default())
}

fn returns(name: &str, value: &'static str) -> WorkflowDefinition {
    WorkflowDefinition::typed(name, move |_ctx: WorkflowContext, (): ()| async move {
        Ok(value.to_string())
    })
}

fn signal_workflow() -> WorkflowDefinition {
    WorkflowDefinition::typed("SignalWorkflow", |ctx: WorkflowContext, (): ()| async move {
        let payload = ctx.signal_channel("mySignal").recv().await;
        Ok(String::from_payload(&payload.unwrap_or_else(Payload::null))?)
    })
}

fn update_workflow() -> WorkflowDefinition {
    WorkflowDefinition::typed("UpdateWorkflow", |ctx: WorkflowContext, (): ()| async move {
        let done = Rc::new(Cell::new(false));
        {
            let done = done.clone();
            ctx.set_update_handler_with_validator(
                "update",
                move |_args| {
                    let done = done.clone();
                    async move {
                        done.set(true);
                        Ok("update-result".to_payload()?)
                    }
                },
                |args| {
                    if String::from_arg(args, 0)? == "reject-me" {
                        return Err(WorkflowError::application("InvalidValue", "rejected"));
                    }
                    Ok(())
                },
            );
        }
        ctx.wait_condition(move || done.get()).await;
        Ok("update-arg".to_string())
    })
}

fn update(arg: &str) -> UpdateEnvelope {
    UpdateEnvelope::new("update").with_arg(arg.to_payload().unwrap())
}

#[tokio::test]
async fn test_signal_feature_passes() {
    let feature = Feature::builder("signal/basic", signal_workflow())
        .execute(SignalAfterStart::new(
            SignalEnvelope::new("mySignal").with_payload("signal-data".to_payload().unwrap()),
        ))
        .expect_result("signal-data")
        .build()
        .unwrap();

    let summary = harness(Engine::new(EngineConfig::default()))
        .run(vec![feature])
        .await;
    assert!(summary.success(), "{summary:?}");
    assert_eq!(summary.passed(), 1);
    let report = summary.report("signal/basic").unwrap();
    assert!(report.task_queue.starts_with("vigil-signal-basic-"));
}

#[tokio::test]
async fn test_mismatch_does_not_abort_batch() {
    let wrong = Feature::builder("result/wrong", returns("Wrong", "actual"))
        .expect_result("expected")
        .build()
        .unwrap();
    let right = Feature::builder("result/right", returns("Right", "value"))
        .expect_result("value")
        .build()
        .unwrap();

    let summary = harness(Engine::new(EngineConfig::default()))
        .run(vec![wrong, right])
        .await;
    assert!(!summary.success());
    assert_eq!(summary.to_string(), "1 passed, 1 failed, 0 skipped");
    // Reports keep input order.
    assert_eq!(summary.reports[0].name, "result/wrong");
    match &summary.reports[0].outcome {
        Outcome::Failed { error } => {
            assert!(error.contains("expected"), "{error}");
            assert!(error.contains("actual"), "{error}");
        }
        other => panic!("Expected failure, got: {other:?}"),
    }
    assert!(summary.reports[1].outcome.is_passed());
}

#[tokio::test]
async fn test_missing_capability_is_a_skip() {
    let engine = Engine::new(EngineConfig {
        capabilities: Capabilities::all().without(Capability::Updates),
        ..Default::default()
    });
    let gated = Feature::builder("update/basic", update_workflow())
        .execute(SkipUnless::new(
            Capability::Updates,
            UpdateAfterStart::new(update("called")),
        ))
        .build()
        .unwrap();
    let plain = Feature::builder("result/plain", returns("Plain", "ok"))
        .build()
        .unwrap();

    let summary = harness(engine).run(vec![gated, plain]).await;
    assert!(summary.success());
    assert_eq!(summary.skipped(), 1);
    assert_eq!(summary.passed(), 1);
    match &summary.report("update/basic").unwrap().outcome {
        Outcome::Skipped { reason } => assert_eq!(reason, "server does not support updates"),
        other => panic!("Expected skip, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_skip_never_submits() {
    let engine = Engine::new(EngineConfig {
        capabilities: Capabilities::all().without(Capability::Updates),
        ..Default::default()
    });
    let submitted = Arc::new(AtomicBool::new(false));
    let flag = submitted.clone();
    let feature = Feature::builder("update/gated", update_workflow())
        .execute(SkipUnless::new(
            Capability::Updates,
            CustomExecution::new(move |runner| {
                flag.store(true, Ordering::SeqCst);
                runner.execute_with_args(vec![]).boxed()
            }),
        ))
        .build()
        .unwrap();

    let summary = harness(engine.clone()).run(vec![feature]).await;
    assert_eq!(summary.skipped(), 1);
    assert!(!submitted.load(Ordering::SeqCst));
    assert_eq!(engine.run_count(), 0);
}

#[tokio::test]
async fn test_update_expectations() {
    let result = Feature::builder("update/result", update_workflow())
        .execute(UpdateAfterStart::new(update("called")).expecting(
            UpdateExpectation::ResultEquals("update-result".to_payload().unwrap()),
        ))
        .expect_result("update-arg")
        .build()
        .unwrap();
    let rejected = Feature::builder("update/rejected", update_workflow())
        .execute(
            UpdateAfterStart::new(update("reject-me"))
                .expecting(UpdateExpectation::FailsWith("InvalidValue".into())),
        )
        // The run stays open after a rejection; only the update outcome matters.
        .check(CustomCheck::new(|_runner, _run| {
            async { Ok::<_, HarnessError>(()) }.boxed()
        }))
        .build()
        .unwrap();

    let summary = harness(Engine::new(EngineConfig::default()))
        .run(vec![result, rejected])
        .await;
    assert!(summary.success(), "{summary:?}");
    assert_eq!(summary.passed(), 2);
}

#[tokio::test]
async fn test_binary_payload_matches_fixture() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("payload.json"), DEADBEEF_FIXTURE).unwrap();

    let deadbeef = WorkflowDefinition::typed("Binary", |_ctx: WorkflowContext, (): ()| async {
        Ok(vec![0xdeu8, 0xad, 0xbe, 0xef])
    });
    let feature = Feature::builder("data_converter/binary", deadbeef)
        .dir(dir.path())
        .check(
            AllOf::new()
                .and(ScalarEquality::of(vec![0xdeu8, 0xad, 0xbe, 0xef]).unwrap())
                .and(PayloadFixture::new("payload.json")),
        )
        .build()
        .unwrap();

    let summary = harness(Engine::new(EngineConfig::default()))
        .run(vec![feature])
        .await;
    assert!(summary.success(), "{summary:?}");
}

#[tokio::test]
async fn test_json_bytes_fail_binary_expectation() {
    let json_bytes = WorkflowDefinition::typed("JsonBytes", |_ctx: WorkflowContext, (): ()| async {
        Ok(Json(vec![0xdeu8, 0xad, 0xbe, 0xef]))
    });
    let feature = Feature::builder("data_converter/json_bytes", json_bytes)
        .check(ScalarEquality::of(vec![0xdeu8, 0xad, 0xbe, 0xef]).unwrap())
        .build()
        .unwrap();

    let summary = harness(Engine::new(EngineConfig::default()))
        .run(vec![feature])
        .await;
    match &summary.reports[0].outcome {
        Outcome::Failed { error } => {
            assert!(error.contains("binary/plain"), "{error}");
            assert!(error.contains("json/plain"), "{error}");
        }
        other => panic!("Expected encoding mismatch, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_fixture_mismatch_and_missing_fixture_fail() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("payload.json"), DEADBEEF_FIXTURE).unwrap();

    let other_bytes = WorkflowDefinition::typed("OtherBytes", |_ctx: WorkflowContext, (): ()| async {
        Ok(vec![0xdeu8, 0xad, 0xbe, 0xee])
    });
    let mismatch = Feature::builder("data_converter/mismatch", other_bytes.clone())
        .dir(dir.path())
        .check(PayloadFixture::new("payload.json"))
        .build()
        .unwrap();
    let missing = Feature::builder("data_converter/missing", other_bytes)
        .dir(dir.path())
        .check(PayloadFixture::new("absent.json"))
        .build()
        .unwrap();

    let summary = harness(Engine::new(EngineConfig::default()))
        .run(vec![mismatch, missing])
        .await;
    assert_eq!(summary.failed(), 2);
    match &summary.reports[0].outcome {
        Outcome::Failed { error } => assert!(error.contains("offset 3"), "{error}"),
        other => panic!("Expected failure, got: {other:?}"),
    }
    match &summary.reports[1].outcome {
        Outcome::Failed { error } => assert!(error.contains("absent.json"), "{error}"),
        other => panic!("Expected failure, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_custom_execution_passes_arguments() {
    let echo = WorkflowDefinition::typed("Echo", |_ctx: WorkflowContext, input: String| async move {
        Ok(input)
    });
    let feature = Feature::builder("custom/echo", echo)
        .execute(CustomExecution::new(|runner| {
            let args = vec!["hello".to_payload().unwrap()];
            runner.execute_with_args(args).boxed()
        }))
        .expect_result("hello")
        .build()
        .unwrap();

    let summary = harness(Engine::new(EngineConfig::default()))
        .run(vec![feature])
        .await;
    assert!(summary.success(), "{summary:?}");
}

#[tokio::test]
async fn test_workflow_failure_is_reported() {
    let failing = WorkflowDefinition::typed("Failing", |_ctx: WorkflowContext, (): ()| async {
        Err::<(), _>(WorkflowError::application("Boom", "workflow blew up"))
    });
    let feature = Feature::builder("failure/basic", failing).build().unwrap();

    let summary = harness(Engine::new(EngineConfig::default()))
        .run(vec![feature])
        .await;
    match &summary.reports[0].outcome {
        Outcome::Failed { error } => assert!(error.contains("workflow blew up"), "{error}"),
        other => panic!("Expected failure, got: {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_feature_timeout() {
    let config = HarnessConfig {
        feature_timeout: Duration::from_secs(5),
        execution_timeout: Duration::from_secs(3600),
        ..Default::default()
    };
    // Nobody ever signals, so the run never closes.
    let feature = Feature::builder("signal/never", signal_workflow())
        .build()
        .unwrap();

    let summary = Harness::new(Engine::new(EngineConfig::default()), config)
        .run(vec![feature])
        .await;
    match &summary.reports[0].outcome {
        Outcome::Failed { error } => {
            assert_eq!(error, &HarnessError::Timeout(Duration::from_secs(5)).to_string())
        }
        other => panic!("Expected timeout, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_cancelled_batch() {
    let harness = harness(Engine::new(EngineConfig::default()));
    harness.cancellation_token().cancel();

    let feature = Feature::builder("signal/cancelled", signal_workflow())
        .build()
        .unwrap();
    let summary = harness.run(vec![feature]).await;
    assert_eq!(
        summary.reports[0].outcome,
        Outcome::Failed {
            error: "Cancelled".into()
        }
    );
}
