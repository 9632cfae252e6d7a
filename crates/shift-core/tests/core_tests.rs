use shift_core::{
    ConflictPolicy, CopyJobHandle, CopyJobProgress, CopyJobRequest, Destination, FailureClass,
    JobEventKind, JobLogRecord, JobState, MigrationDirection, MoveRequest, MoveStrategy,
    ShiftConfig, ShiftError, Site,
};
use std::time::Duration;

fn site(path: &str) -> Site {
    Site::parse(&format!("https://contoso.example{path}")).unwrap()
}

#[test]
fn test_config_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");

    // Missing file means defaults.
    let config = ShiftConfig::load(&path).unwrap();
    assert_eq!(config.max_attempts, 5);
    assert_eq!(config.strategy, MoveStrategy::CopyJob);

    std::fs::write(
        &path,
        "strategy = \"direct\"\nrunning_poll_ms = 250\nmax_poll_secs = 900\n",
    )
    .unwrap();
    let config = ShiftConfig::load(&path).unwrap();
    assert_eq!(config.strategy, MoveStrategy::Direct);
    assert_eq!(config.running_poll_interval(), Duration::from_millis(250));
    assert_eq!(config.queued_poll_interval(), Duration::from_millis(5_000));
    assert_eq!(config.max_poll_duration(), Some(Duration::from_secs(900)));
}

#[test]
fn test_config_rejects_zero_interval() {
    assert!(ShiftConfig::from_toml("queued_poll_ms = 0").is_err());
    assert!(ShiftConfig::builder().job_attempts(0u32).build().is_err());
}

#[test]
fn test_failure_classes() {
    assert_eq!(ShiftError::http(429, "").class(), FailureClass::Throttled);
    assert_eq!(ShiftError::http(503, "").class(), FailureClass::Throttled);
    assert_eq!(ShiftError::http(500, "").class(), FailureClass::Transient);
    assert_eq!(ShiftError::http(504, "").class(), FailureClass::Transient);
    assert_eq!(ShiftError::http(404, "").class(), FailureClass::Permanent);
    assert_eq!(ShiftError::network("reset").class(), FailureClass::Unknown);
    assert_eq!(
        ShiftError::JobRejected {
            message: "bad".into()
        }
        .class(),
        FailureClass::Permanent
    );
}

#[test]
fn test_cross_site_move_request() {
    let request = MoveRequest::new(
        "0b5c",
        false,
        site("/sites/hr"),
        "/sites/hr/Shared Documents/Plans",
        Destination::new(site("/sites/finance"), "/sites/finance/Shared Documents"),
    )
    .with_conflict_policy(ConflictPolicy::Replace);

    request.validate().unwrap();
    assert_eq!(
        request.destination.uri(),
        "https://contoso.example/sites/finance/Shared Documents"
    );

    let body = CopyJobRequest::new(
        vec![request.source_uri()],
        request.destination.uri(),
        request.conflict_policy,
    );
    let value = serde_json::to_value(&body).unwrap();
    assert_eq!(
        value["exportObjectUris"][0],
        "https://contoso.example/sites/hr/Shared Documents/Plans"
    );
    assert_eq!(value["options"]["NameConflictBehavior"], 1);
    assert_eq!(value["options"]["IsMoveMode"], true);
}

#[test]
fn test_progress_payload_decoding() {
    let payload = r#"{
        "JobState": 4,
        "Logs": [
            "{\"Event\":\"JobStart\",\"JobId\":\"j\",\"MigrationDirection\":\"Import\"}",
            "{\"Event\":\"JobProgress\",\"ObjectsProcessed\":\"3\",\"TotalExpectedSPObjects\":\"8\"}",
            "{\"Event\":\"JobSomethingNew\"}"
        ]
    }"#;
    let progress: CopyJobProgress = serde_json::from_str(payload).unwrap();
    assert_eq!(progress.state(), JobState::Processing);

    let records: Vec<JobLogRecord> = progress
        .logs
        .iter()
        .map(|raw| JobLogRecord::parse(raw).unwrap())
        .collect();
    assert_eq!(records[0].kind(), JobEventKind::JobStart);
    assert_eq!(records[0].direction(), Some(MigrationDirection::Import));
    assert_eq!(records[1].objects_processed, Some(3));
    assert_eq!(records[1].total_expected_sp_objects, Some(8));
    assert_eq!(
        records[2].kind(),
        JobEventKind::Other("JobSomethingNew".into())
    );
}

#[test]
fn test_handle_wire_names() {
    let handle: CopyJobHandle = serde_json::from_str(
        r#"{"EncryptionKey":"a2V5","JobId":"6f1c","JobQueueUri":"https://q.example/x","SourceListItemUniqueIds":[]}"#,
    )
    .unwrap();
    assert_eq!(handle.job_id, "6f1c");

    let value = serde_json::to_value(&handle).unwrap();
    assert_eq!(value["EncryptionKey"], "a2V5");
    assert!(!format!("{handle:?}").contains("a2V5"));
}
