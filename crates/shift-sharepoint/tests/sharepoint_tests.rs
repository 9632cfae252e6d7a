use httpmock::prelude::*;
use serde_json::json;
use shift_core::{
    ConflictPolicy, CopyJobHandle, CopyJobRequest, FailureClass, FolderRef, ItemId, ShiftError,
    Site,
};
use shift_ops::{CopyJobService, DirectoryService, ItemService};
use shift_sharepoint::SharePointClient;

fn site_for(server: &MockServer) -> Site {
    Site::parse(&format!("{}/sites/hr", server.base_url())).unwrap()
}

fn client() -> SharePointClient {
    SharePointClient::new("token-123").unwrap()
}

fn handle() -> CopyJobHandle {
    CopyJobHandle {
        job_id: "6f1c".into(),
        encryption_key: "a2V5".into(),
        job_queue_uri: "https://queue.example/q".into(),
    }
}

#[tokio::test]
async fn test_list_folders_by_id() {
    let server = MockServer::start_async().await;
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/sites/hr/_api/web/GetFolderById('f1')/Folders")
            .query_param("$select", "ServerRelativeUrl,Name,UniqueId")
            .header("authorization", "Bearer token-123")
            .header("accept", "application/json;odata=nometadata");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({
                "value": [
                    { "ServerRelativeUrl": "/sites/hr/Docs/Plans/A", "Name": "A", "UniqueId": "a1" },
                    { "ServerRelativeUrl": "/sites/hr/Docs/Plans/B", "Name": "B", "UniqueId": "b1" }
                ]
            }));
    });

    let folders = client()
        .list_folders(&site_for(&server), &FolderRef::Id(ItemId::new("f1")))
        .await
        .unwrap();

    mock.assert();
    assert_eq!(folders.len(), 2);
    assert_eq!(folders[1].name, "B");
    assert_eq!(folders[1].server_relative_path, "/sites/hr/Docs/Plans/B");
    assert!(!folders[0].is_file);
}

#[tokio::test]
async fn test_list_files_by_path() {
    let server = MockServer::start_async().await;
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/sites/hr/_api/web/GetFolderByServerRelativeUrl(@p1)/Files")
            .query_param("@p1", "'/sites/hr/Shared Documents/Bob''s'");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({
                "value": [
                    { "ServerRelativeUrl": "/sites/hr/Shared Documents/Bob's/x.txt", "Name": "x.txt", "UniqueId": "x1" }
                ]
            }));
    });

    let files = client()
        .list_files(
            &site_for(&server),
            &FolderRef::Path("/sites/hr/Shared Documents/Bob's".into()),
        )
        .await
        .unwrap();

    mock.assert();
    assert_eq!(files.len(), 1);
    assert!(files[0].is_file);
    assert_eq!(files[0].id.as_str(), "x1");
}

#[tokio::test]
async fn test_create_folder() {
    let server = MockServer::start_async().await;
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/sites/hr/_api/web/folders/add(@p1)")
            .query_param("@p1", "'/sites/hr/Archive/Q1 Plans'");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({
                "ServerRelativeUrl": "/sites/hr/Archive/Q1 Plans",
                "Name": "Q1 Plans",
                "UniqueId": "n1"
            }));
    });

    let folder = client()
        .create_folder(&site_for(&server), "/sites/hr/Archive/Q1 Plans")
        .await
        .unwrap();

    mock.assert();
    assert_eq!(folder.id.as_str(), "n1");
    assert_eq!(folder.server_relative_path, "/sites/hr/Archive/Q1 Plans");
}

#[tokio::test]
async fn test_move_file_by_id() {
    let server = MockServer::start_async().await;
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/sites/hr/_api/web/GetFileById('x1')/moveTo(newurl=@p1,flags=1)")
            .query_param("@p1", "'/sites/hr/Archive/x.txt'");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({ "odata.null": true }));
    });

    client()
        .move_file(&site_for(&server), &ItemId::new("x1"), "/sites/hr/Archive/x.txt")
        .await
        .unwrap();

    mock.assert();
}

#[tokio::test]
async fn test_delete_folder_headers() {
    let server = MockServer::start_async().await;
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/sites/hr/_api/web/GetFolderById('f1')")
            .header("X-HTTP-Method", "DELETE")
            .header("IF-MATCH", "*");
        then.status(200);
    });

    client()
        .delete_folder(&site_for(&server), &ItemId::new("f1"))
        .await
        .unwrap();

    mock.assert();
}

#[tokio::test]
async fn test_create_copy_job() {
    let server = MockServer::start_async().await;
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/sites/hr/_api/site/CreateCopyJobs")
            .json_body(json!({
                "exportObjectUris": ["https://contoso.example/sites/hr/Docs/Plans"],
                "destinationUri": "https://contoso.example/sites/hr/Archive",
                "options": {
                    "IgnoreVersionHistory": true,
                    "IsMoveMode": true,
                    "AllowSchemaMismatch": true,
                    "NameConflictBehavior": 0
                }
            }));
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({
                "value": [{
                    "EncryptionKey": "a2V5",
                    "JobId": "6f1c",
                    "JobQueueUri": "https://queue.example/q",
                    "SourceListItemUniqueIds": ["p1"]
                }]
            }));
    });

    let request = CopyJobRequest::new(
        vec!["https://contoso.example/sites/hr/Docs/Plans".into()],
        "https://contoso.example/sites/hr/Archive",
        ConflictPolicy::Fail,
    );
    let handle = client()
        .create_copy_job(&site_for(&server), &request)
        .await
        .unwrap();

    mock.assert();
    assert_eq!(handle, self::handle());
}

#[tokio::test]
async fn test_rejected_copy_job() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(POST).path("/sites/hr/_api/site/CreateCopyJobs");
        then.status(400)
            .header("content-type", "application/json")
            .json_body(json!({
                "odata.error": {
                    "code": "-2147024809, System.ArgumentException",
                    "message": { "lang": "en-US", "value": "Source and destination are the same." }
                }
            }));
    });

    let request = CopyJobRequest::new(
        vec!["https://contoso.example/sites/hr/Docs".into()],
        "https://contoso.example/sites/hr/Docs",
        ConflictPolicy::Fail,
    );
    let err = client()
        .create_copy_job(&site_for(&server), &request)
        .await
        .unwrap_err();

    match err {
        ShiftError::JobRejected { message } => {
            assert_eq!(message, "Source and destination are the same.");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_copy_job_progress() {
    let server = MockServer::start_async().await;
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/sites/hr/_api/site/GetCopyJobProgress")
            .json_body(json!({
                "copyJobInfo": {
                    "JobId": "6f1c",
                    "EncryptionKey": "a2V5",
                    "JobQueueUri": "https://queue.example/q"
                }
            }));
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({
                "JobState": 2,
                "Logs": ["{\"Event\":\"JobQueued\",\"JobId\":\"6f1c\"}"]
            }));
    });

    let progress = client()
        .copy_job_progress(&site_for(&server), &handle())
        .await
        .unwrap();

    mock.assert();
    assert_eq!(progress.job_state, 2);
    assert_eq!(progress.logs.len(), 1);
}

#[tokio::test]
async fn test_status_classification() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(GET)
            .path("/sites/hr/_api/web/GetFolderById('busy')/Folders");
        then.status(429);
    });
    server.mock(|when, then| {
        when.method(GET)
            .path("/sites/hr/_api/web/GetFolderById('gone')/Folders");
        then.status(404)
            .header("content-type", "application/json")
            .json_body(json!({
                "odata.error": {
                    "code": "-2147024894, System.IO.FileNotFoundException",
                    "message": { "lang": "en-US", "value": "File Not Found." }
                }
            }));
    });

    let site = site_for(&server);
    let busy = client()
        .list_folders(&site, &FolderRef::Id(ItemId::new("busy")))
        .await
        .unwrap_err();
    assert_eq!(busy.class(), FailureClass::Throttled);

    let gone = client()
        .list_folders(&site, &FolderRef::Id(ItemId::new("gone")))
        .await
        .unwrap_err();
    assert_eq!(gone.class(), FailureClass::Permanent);
    assert!(matches!(
        gone,
        ShiftError::Http { status: 404, ref message } if message == "File Not Found."
    ));
}

#[tokio::test]
async fn test_connection_failure_is_network_error() {
    let site = Site::parse("http://127.0.0.1:9/sites/hr").unwrap();
    let err = client()
        .list_files(&site, &FolderRef::Id(ItemId::new("f1")))
        .await
        .unwrap_err();
    assert_eq!(err.class(), FailureClass::Unknown);
}
