// Copyright (c) The runlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::fixtures::*;
use color_eyre::eyre::{Result, ensure};
use pretty_assertions::assert_eq;
use runlens_core::{
    aggregate::{CUSTOM_TESTS_REQUEST, NO_REQUESTS_FOUND},
    directives::{ManifestDirectiveSource, StaticDirectiveSource},
    engine::{CorrelationEngine, FileInput, RunOptions},
    errors::RunCancelledError,
    wait::WaitOutcome,
};
use runlens_metadata::{GroupStatus, RequestStatus, RunSummary, RunlensExitCode, TestSource};
use std::{
    fs::File,
    time::{Duration, SystemTime},
};

fn request_statuses(summary: &RunSummary) -> Vec<(&str, RequestStatus)> {
    summary.groups[0]
        .requests
        .iter()
        .map(|result| (result.name.as_str(), result.status))
        .collect()
}

#[tokio::test]
async fn correlates_users_fixture() -> Result<()> {
    test_init();

    let workspace = temp_workspace("users-api")?;
    let config = load_config(workspace.path(), "")?;
    let directives = ManifestDirectiveSource::from_path(&workspace.path().join("directives.json"))?;
    let engine = CorrelationEngine::new(&config);

    let inputs = [FileInput::new(
        USERS_SOURCE,
        workspace.path().join("execution.jsonl"),
    )];
    let run = engine
        .run(&inputs, &directives, RunOptions::default(), std::future::pending())
        .await?;

    assert_eq!(run.wait_outcome, None);
    assert_eq!(run.report_path.as_deref(), Some(engine.latest_report_path()));

    let summary = run.summary;
    assert_eq!(
        request_statuses(&summary),
        [
            ("create-user", RequestStatus::Passed),
            ("get-user", RequestStatus::TestsFailed),
            ("delete-user", RequestStatus::Failed),
            (CUSTOM_TESTS_REQUEST, RequestStatus::TestsFailed),
        ]
    );

    let group = &summary.groups[0];
    assert_eq!(group.name, "users.http");
    assert_eq!(group.status, GroupStatus::Failed);
    assert_eq!(group.duration, "145ms");
    assert_eq!(summary.exit_code(), RunlensExitCode::RUN_FAILED);

    // Entities are decoded in names and messages.
    let create_user = &group.requests[0];
    let create_tests: Vec<_> = create_user
        .tests
        .as_ref()
        .expect("create-user has tests")
        .iter()
        .map(|test| test.name.as_str())
        .collect();
    assert_eq!(create_tests, ["status is 201", "body echoes \"name\""]);
    assert_eq!(
        create_user.request.as_ref().unwrap().headers["Accept"],
        "application/json, text/plain"
    );

    // The retry chain keeps the last response and every attempt.
    let get_user = &group.requests[1];
    let response = get_user.response.as_ref().expect("get-user has a response");
    assert_eq!(response.status_code, 200);
    assert_eq!(response.duration, "45ms");
    let retry_info = get_user.retry_info.as_ref().expect("retry info present");
    assert_eq!(retry_info.actual_attempts, 2);
    assert!(retry_info.was_retried);
    assert_eq!(retry_info.strategy_name.as_deref(), Some("exponential-backoff"));
    assert_eq!(get_user.error_message.as_deref(), Some("upstream busy"));
    let get_tests = get_user.tests.as_ref().expect("get-user has tests");
    assert_eq!(
        get_tests[0].message.as_deref(),
        Some("expected id > 0 but was <null>")
    );

    let custom = &group.requests[3];
    let custom_tests: Vec<_> = custom
        .tests
        .as_ref()
        .expect("custom tests present")
        .iter()
        .map(|test| (test.name.as_str(), test.passed, test.source))
        .collect();
    assert_eq!(
        custom_tests,
        [
            ("trailing inline check", true, TestSource::Csx),
            ("users & roles are consistent", true, TestSource::Csx),
            ("audit log written", false, TestSource::Csx),
        ]
    );

    Ok(())
}

#[tokio::test]
async fn summary_round_trips_through_json() -> Result<()> {
    test_init();

    let workspace = temp_workspace("users-api")?;
    let config = load_config(workspace.path(), "")?;
    let directives = ManifestDirectiveSource::from_path(&workspace.path().join("directives.json"))?;
    let inputs = [FileInput::new(
        USERS_SOURCE,
        workspace.path().join("execution.jsonl"),
    )];
    let run = CorrelationEngine::new(&config)
        .run(&inputs, &directives, RunOptions::default(), std::future::pending())
        .await?;

    let json = serde_json::to_string(&run.summary)?;
    ensure!(json.contains("\"TestsFailed\""), "status serialized as PascalCase");
    ensure!(json.contains("\"RetryInfo\""), "keys serialized as PascalCase");
    assert_eq!(RunSummary::parse_json(&json)?, run.summary);
    Ok(())
}

#[tokio::test]
async fn connection_refused_short_circuits() -> Result<()> {
    test_init();

    let workspace = temp_workspace("connection-refused")?;
    let config = load_config(workspace.path(), "")?;
    let inputs = [FileInput::new(
        HEALTH_SOURCE,
        workspace.path().join("execution.jsonl"),
    )];
    let run = CorrelationEngine::new(&config)
        .run(
            &inputs,
            &StaticDirectiveSource::default(),
            RunOptions::default(),
            std::future::pending(),
        )
        .await?;

    assert_eq!(run.report_path, None);
    assert_eq!(request_statuses(&run.summary), [("health", RequestStatus::Failed)]);
    let message = run.summary.groups[0].requests[0]
        .error_message
        .as_deref()
        .expect("error message present");
    assert_eq!(
        message,
        "Reason: Connection refused\n\
         Details: Connection refused (localhost:5999); connect ECONNREFUSED 127.0.0.1:5999"
    );
    Ok(())
}

#[tokio::test]
async fn empty_log_reports_no_requests() -> Result<()> {
    test_init();

    let workspace = temp_workspace("users-api")?;
    let config = load_config(workspace.path(), "")?;
    let empty_log = workspace.path().join("empty.jsonl");
    std::fs::write(&empty_log, "")?;

    let inputs = [
        FileInput::new(USERS_SOURCE, &empty_log),
        FileInput::new(HEALTH_SOURCE, workspace.path().join("missing.jsonl")),
    ];
    let run = CorrelationEngine::new(&config)
        .run(
            &inputs,
            &StaticDirectiveSource::default(),
            RunOptions::default(),
            std::future::pending(),
        )
        .await?;

    assert_eq!(run.summary.groups.len(), 2);
    for group in &run.summary.groups {
        assert_eq!(group.status, GroupStatus::Failed);
        assert_eq!(group.requests.len(), 1);
        assert_eq!(group.requests[0].name, NO_REQUESTS_FOUND);
    }
    Ok(())
}

#[tokio::test]
async fn waits_for_report_rewrite() -> Result<()> {
    test_init();

    let workspace = temp_workspace("users-api")?;
    let config = load_config(workspace.path(), FAST_WAIT_CONFIG)?;
    let engine = CorrelationEngine::new(&config);
    let baseline = engine.capture_baseline();
    ensure!(baseline.is_some(), "fixture report exists");

    let report = engine.latest_report_path().to_owned();
    let rewrite = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(150)).await;
        let file = File::options().write(true).open(&report)?;
        file.set_modified(baseline.unwrap_or_else(std::time::SystemTime::now) + Duration::from_secs(1))?;
        std::io::Result::Ok(())
    });

    let inputs = [FileInput::new(
        USERS_SOURCE,
        workspace.path().join("execution.jsonl"),
    )];
    let options = RunOptions {
        wait: true,
        baseline,
        report_path: None,
    };
    let run = engine
        .run(
            &inputs,
            &StaticDirectiveSource::default(),
            options,
            std::future::pending(),
        )
        .await?;
    rewrite.await??;

    let Some(WaitOutcome::Updated { elapsed }) = run.wait_outcome else {
        panic!("expected the report to be updated, got {:?}", run.wait_outcome);
    };
    ensure!(elapsed >= Duration::from_millis(100), "elapsed: {elapsed:?}");
    Ok(())
}

#[tokio::test]
async fn stale_report_times_out_and_is_read() -> Result<()> {
    test_init();

    let workspace = temp_workspace("users-api")?;
    let config = load_config(
        workspace.path(),
        "[wait]\npoll-interval = \"20ms\"\ntimeout = \"100ms\"\n",
    )?;
    let engine = CorrelationEngine::new(&config);
    let options = RunOptions {
        wait: true,
        baseline: engine.capture_baseline(),
        report_path: None,
    };
    let inputs = [FileInput::new(
        USERS_SOURCE,
        workspace.path().join("execution.jsonl"),
    )];
    let run = engine
        .run(
            &inputs,
            &StaticDirectiveSource::default(),
            options,
            std::future::pending(),
        )
        .await?;

    assert!(matches!(run.wait_outcome, Some(WaitOutcome::TimedOut { .. })));
    // Without directives, every test in the stale report is custom.
    let custom = run.summary.groups[0]
        .requests
        .iter()
        .find(|result| result.name == CUSTOM_TESTS_REQUEST)
        .expect("custom tests present");
    assert_eq!(custom.tests.as_ref().map(Vec::len), Some(6));
    Ok(())
}

#[tokio::test]
async fn cancelled_wait_is_an_error() -> Result<()> {
    test_init();

    let workspace = temp_workspace("users-api")?;
    let config = load_config(workspace.path(), FAST_WAIT_CONFIG)?;
    let engine = CorrelationEngine::new(&config);
    let options = RunOptions {
        wait: true,
        baseline: engine.capture_baseline(),
        report_path: None,
    };
    let inputs = [FileInput::new(
        USERS_SOURCE,
        workspace.path().join("execution.jsonl"),
    )];
    let result = engine
        .run(
            &inputs,
            &StaticDirectiveSource::default(),
            options,
            tokio::time::sleep(Duration::from_millis(50)),
        )
        .await;

    assert_eq!(result.err(), Some(RunCancelledError));
    Ok(())
}

#[tokio::test]
async fn tests_stay_with_their_source_file() -> Result<()> {
    test_init();

    let workspace = temp_workspace("users-api")?;
    let config = load_config(workspace.path(), "")?;

    // A second file whose only request declares one inline test. The report
    // has no suite for it.
    let health_log = workspace.path().join("health.jsonl");
    std::fs::write(
        &health_log,
        serde_json::json!({
            "RequestLog": {
                "DurationMs": 4.0,
                "Request": { "Name": "health", "Method": "GET", "Uri": "http://localhost:5000/health" },
                "Response": { "StatusCode": 200, "ReasonPhrase": "OK" },
            }
        })
        .to_string(),
    )?;
    let mut manifest: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(workspace.path().join("directives.json"))?)?;
    manifest[HEALTH_SOURCE] = serde_json::json!([
        { "name": "health", "hasTestDirectives": true, "testDirectiveCount": 1 }
    ]);
    let directives = ManifestDirectiveSource::from_json(&manifest.to_string())?;

    let inputs = [
        FileInput::new(HEALTH_SOURCE, &health_log),
        FileInput::new(USERS_SOURCE, workspace.path().join("execution.jsonl")),
    ];
    let run = CorrelationEngine::new(&config)
        .run(&inputs, &directives, RunOptions::default(), std::future::pending())
        .await?;

    let [health, users] = run.summary.groups.as_slice() else {
        panic!("expected two groups, got {:?}", run.summary.groups);
    };

    assert_eq!(health.name, "health.http");
    assert_eq!(health.status, GroupStatus::Passed);
    assert_eq!(health.requests.len(), 1);
    assert_eq!(health.requests[0].status, RequestStatus::Passed);
    assert_eq!(health.requests[0].tests, None);

    let statuses: Vec<_> = users
        .requests
        .iter()
        .map(|result| (result.name.as_str(), result.status))
        .collect();
    assert_eq!(
        statuses,
        [
            ("create-user", RequestStatus::Passed),
            ("get-user", RequestStatus::TestsFailed),
            ("delete-user", RequestStatus::Failed),
            (CUSTOM_TESTS_REQUEST, RequestStatus::TestsFailed),
        ]
    );
    assert_eq!(users.requests[3].tests.as_ref().map(Vec::len), Some(3));
    Ok(())
}

#[tokio::test]
async fn waits_for_new_timestamped_report() -> Result<()> {
    test_init();

    let workspace = temp_workspace("users-api")?;
    let config = load_config(workspace.path(), FAST_WAIT_CONFIG)?;
    let engine = CorrelationEngine::new(&config);

    // The runner only writes timestamped reports: the previous run left one
    // behind, and the next one appears under a new name.
    let reports = workspace.path().join(".runlens/reports");
    let stale = reports.join("report-100.xml");
    std::fs::rename(engine.latest_report_path(), &stale)?;
    File::options()
        .write(true)
        .open(&stale)?
        .set_modified(SystemTime::now() - Duration::from_secs(60))?;
    let baseline = engine.capture_baseline();
    ensure!(baseline.is_some(), "baseline comes from the stale report");

    let fresh = reports.join("report-200.xml");
    let write_path = fresh.clone();
    let write = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(150)).await;
        std::fs::write(
            &write_path,
            r#"<testsuites><testsuite name="requests/users.http"><testcase name="fresh check"/></testsuite></testsuites>"#,
        )
    });

    let inputs = [FileInput::new(
        USERS_SOURCE,
        workspace.path().join("execution.jsonl"),
    )];
    let options = RunOptions {
        wait: true,
        baseline,
        report_path: None,
    };
    let run = engine
        .run(
            &inputs,
            &StaticDirectiveSource::default(),
            options,
            std::future::pending(),
        )
        .await?;
    write.await??;

    let Some(WaitOutcome::Updated { elapsed }) = run.wait_outcome else {
        panic!("expected the new report to be seen, got {:?}", run.wait_outcome);
    };
    ensure!(elapsed < Duration::from_secs(1), "elapsed: {elapsed:?}");
    assert_eq!(run.report_path.as_deref(), Some(fresh.as_path()));

    let custom = run.summary.groups[0]
        .requests
        .iter()
        .find(|result| result.name == CUSTOM_TESTS_REQUEST)
        .expect("custom tests present");
    let names: Vec<_> = custom
        .tests
        .as_ref()
        .expect("tests present")
        .iter()
        .map(|test| test.name.as_str())
        .collect();
    assert_eq!(names, ["fresh check"]);
    Ok(())
}
